//! Tracing setup shared by every designdiff binary.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize process-wide tracing with the format from `LOG_FORMAT`.
///
/// An unrecognized format falls back to JSON and is reported once logging is
/// up. This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let requested = LogFormat::from_setting(std::env::var("LOG_FORMAT").ok().as_deref());
    subscriber::init(requested.clone().unwrap_or_default());

    if let Err(reason) = requested {
        tracing::warn!(variable = "LOG_FORMAT", %reason, "invalid log format, using json");
    }
}
