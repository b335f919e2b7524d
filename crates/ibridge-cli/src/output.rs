use ibridge_core::domain::SyncSummary;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

pub fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

pub fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

/// Print the end-of-pass summary
pub fn print_summary(formatter: &dyn OutputFormatter, format: OutputFormat, summary: &SyncSummary) {
    if format.is_json() {
        match serde_json::to_value(summary) {
            Ok(value) => formatter.print_json(&value),
            Err(e) => formatter.error(&format!("Failed to serialize summary: {}", e)),
        }
        return;
    }

    if summary.total_transferred() == 0 && summary.errors == 0 {
        formatter.success(&format!(
            "Already up to date ({})",
            format_duration(summary.duration_ms)
        ));
    } else {
        formatter.success(&format!(
            "{} sync completed in {}",
            summary.mode,
            format_duration(summary.duration_ms)
        ));
    }

    if summary.downloaded > 0 {
        formatter.info(&format!(
            "Downloaded: {} file{}",
            summary.downloaded,
            plural(summary.downloaded)
        ));
    }
    if summary.transferred > 0 {
        formatter.info(&format!(
            "Uploaded:   {} file{}",
            summary.transferred,
            plural(summary.transferred)
        ));
    }
    if summary.skipped > 0 {
        formatter.info(&format!(
            "Skipped:    {} file{}",
            summary.skipped,
            plural(summary.skipped)
        ));
    }

    if summary.errors > 0 {
        formatter.error(&format!(
            "{} error{} occurred:",
            summary.errors,
            plural(summary.errors)
        ));
        for err in &summary.error_messages {
            formatter.info(&format!("  - {}", err));
        }
    }
}
