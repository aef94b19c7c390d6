use std::sync::OnceLock;

#[cfg(feature = "telemetry")]
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize tracing subscriber once per process.
pub fn init_tracing() {
    #[cfg(feature = "telemetry")]
    static INIT: OnceLock<()> = OnceLock::new();

    #[cfg(feature = "telemetry")]
    {
        INIT.get_or_init(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("svtools=info"));
            let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
        });
    }
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing() {}

/// Emit a debug-level phase marker when telemetry is enabled.
#[macro_export]
macro_rules! trace_phase {
    ($($arg:tt)*) => {{
        #[cfg(feature = "telemetry")]
        tracing::debug!($($arg)*);
    }};
}
