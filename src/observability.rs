//! Logging and observability helpers.

pub mod sensitive;

pub use sensitive::Sensitive;

use tracing_subscriber::EnvFilter;

/// Initializes tracing for the pipeline process.
///
/// Logs go to stderr: stdout is owned by the result sink, and a single
/// stray log line there would corrupt the emitted rows. Verbosity follows
/// `RUST_LOG`, defaulting to `joinpipe=info`.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("joinpipe=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();

    // Route panics through tracing before the default hook runs.
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("PANIC: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("PANIC: {}", s)
        } else {
            "PANIC: unknown cause".to_string()
        };

        tracing::error!(target: "panic", location = %location, message = %msg, "Pipeline panicked");

        previous_hook(panic_info);
    }));
}
