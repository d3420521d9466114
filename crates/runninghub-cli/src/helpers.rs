//! Shared helpers for the `runninghub` binary.

use std::fmt::Write as _;

use runninghub_api::TaskStatus;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install the global subscriber.  `RUST_LOG` wins over `default_level`.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// One line per batch item, in input order, followed by a tally.
pub fn render_batch<E: std::fmt::Display>(outcomes: &[Result<TaskStatus, E>]) -> String {
    let mut out = String::new();
    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Ok(status) => {
                let _ = writeln!(out, "✅ #{} task {} {}", index + 1, status.task_id, status.state);
            }
            Err(e) => {
                let _ = writeln!(out, "❌ #{} {e}", index + 1);
            }
        }
    }
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    let _ = write!(
        out,
        "{} succeeded, {failed} failed",
        outcomes.len() - failed
    );
    out
}
