//! Payload logging gated by a module-level `LOG_PAYLOADS` flag.
//!
//! Usage:
//! ```rust,ignore
//! // In your module, define the flag first:
//! const LOG_PAYLOADS: bool = true;
//!
//! // Then use the macro (exported at the crate root):
//! use crate::log_payload;
//!
//! log_payload!("Estimate request: {body}");
//! ```

/// Debug-level log of a request or response body.
///
/// Each module that uses this macro must define:
/// ```rust,ignore
/// const LOG_PAYLOADS: bool = true; // or false
/// ```
#[macro_export]
macro_rules! log_payload {
    ($($arg:tt)*) => {
        if LOG_PAYLOADS {
            log::debug!(target: "estimator::payload", $($arg)*);
        }
    };
}
