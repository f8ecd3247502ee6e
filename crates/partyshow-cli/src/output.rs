//! Human and JSON rendering for command results
//!
//! JSON mode keeps stdout machine-readable: only `print_json` and
//! `success` write there, and progress is suppressed.

use serde_json::{json, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Renders command output in one format
pub trait OutputFormatter: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// Download progress of a running sync
    fn progress(&self, done: usize, total: usize);
    fn print_json(&self, value: &Value);
}

/// Terminal output with status marks
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {message}");
    }

    fn info(&self, message: &str) {
        println!("  {message}");
    }

    fn progress(&self, done: usize, total: usize) {
        if done == total {
            println!("  Downloaded {total} photo(s)");
        } else if done > 0 {
            println!("  [{done:>width$}/{total}] downloading", width = digits(total));
        }
    }

    fn print_json(&self, _value: &Value) {}
}

/// `--quiet`: warnings and errors only
pub struct QuietFormatter;

impl OutputFormatter for QuietFormatter {
    fn success(&self, _message: &str) {}

    fn error(&self, message: &str) {
        HumanFormatter.error(message);
    }

    fn warn(&self, message: &str) {
        HumanFormatter.warn(message);
    }

    fn info(&self, _message: &str) {}

    fn progress(&self, _done: usize, _total: usize) {}

    fn print_json(&self, _value: &Value) {}
}

/// One JSON document per message; errors and warnings go to stderr
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", json!({ "success": true, "message": message }));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", json!({ "success": false, "error": message }));
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", json!({ "level": "warning", "message": message }));
    }

    fn info(&self, _message: &str) {}

    fn progress(&self, _done: usize, _total: usize) {}

    fn print_json(&self, value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat, quiet: bool) -> Box<dyn OutputFormatter> {
    match (format, quiet) {
        (OutputFormat::Json, _) => Box::new(JsonFormatter),
        (OutputFormat::Human, true) => Box::new(QuietFormatter),
        (OutputFormat::Human, false) => Box::new(HumanFormatter),
    }
}

/// Formats a byte count with binary units, e.g. `1.5 MiB`
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn digits(n: usize) -> usize {
    n.to_string().len()
}
