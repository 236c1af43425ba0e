//! Operator-facing progress output
//!
//! Purely observational: nothing reported here changes control flow.

/// Receives progress and outcome messages from long running operations.
pub trait Reporter: Send + Sync {
    /// Progress text for the step currently running.
    fn update(&self, msg: &str);
    fn info(&self, msg: &str);
    fn success(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Writes emoji prefixed lines to the terminal.
///
/// Progress and successes go to stdout, warnings and errors to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

impl Reporter for Console {
    fn update(&self, msg: &str) {
        println!("🔧 {msg}");
    }

    fn info(&self, msg: &str) {
        println!("ℹ️  {msg}");
    }

    fn success(&self, msg: &str) {
        println!("✅ {msg}");
    }

    fn warn(&self, msg: &str) {
        eprintln!("⚠️  {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("❌ {msg}");
    }
}
