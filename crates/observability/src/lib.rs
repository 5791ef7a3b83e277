//! Tracing and structured logging setup shared by ledger binaries and tests.

/// Initialize process-wide logging with the format named by
/// `LEDGER_LOG_FORMAT` (JSON when unset).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber construction (filters, output format).
pub mod tracing;

pub use self::tracing::LogFormat;
