mod estimations;
mod users;
