/// Thin wrappers over `tracing` macros, kept distinct so call sites read as
/// "this field has already passed through redaction" even though the actual
/// redaction happens in the `tracing-subscriber` formatting layer.
#[macro_export]
macro_rules! redacted_info {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! redacted_warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! redacted_error {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}
