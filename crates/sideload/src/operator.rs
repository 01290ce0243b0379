//! Operator-facing status output

use std::io::Write;
use tracing::debug;

/// Line-oriented output shown to the person at the device
pub trait Operator: Send + Sync {
    fn print(&self, message: &str);
}

/// Writes messages to stdout and mirrors them to the debug log
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    fn print(&self, message: &str) {
        debug!(target: "operator", "{}", message.trim_end());
        let mut stdout = std::io::stdout().lock();
        // A closed stdout must not abort the session
        let _ = writeln!(stdout, "{}", message.trim_end());
        let _ = stdout.flush();
    }
}
