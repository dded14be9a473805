use crate::error::{ProdTotalError, UserFriendlyError};
use crate::report::{format_currency, AnalysisReport};
use crate::storage::StoredReport;
use console::{style, Emoji, Term};
use serde_json;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &ProdTotalError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Raw report text, as the clerk sees it before processing.
    pub fn print_preview(&self, source: &str, text: &str) {
        if self.mode == OutputMode::Json || self.quiet {
            return;
        }

        self.print_header(&format!("Preview: {}", source));
        println!("{}", text.trim_end());
        self.print_separator();
    }

    pub fn print_analysis_report(&self, report: &AnalysisReport) {
        match self.mode {
            OutputMode::Human => self.print_human_report(report),
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    /// A batch prints as one JSON array so the output stays a single document.
    pub fn print_analysis_reports(&self, reports: &[AnalysisReport]) {
        if self.mode == OutputMode::Json && reports.len() > 1 {
            let json_output =
                serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json_output);
            return;
        }

        for report in reports {
            self.print_analysis_report(report);
        }
    }

    pub fn print_listing(&self, folder: &str, reports: &[StoredReport]) {
        match self.mode {
            OutputMode::Human => {
                self.print_header(&format!("Reports in {}", folder));
                if reports.is_empty() {
                    println!("  (no reports)");
                }
                for report in reports {
                    println!(
                        "  {}  {:>10}  {}",
                        report.modified.format("%Y-%m-%d %H:%M"),
                        crate::error::format_bytes(report.size),
                        if self.use_colors {
                            style(&report.name).cyan().to_string()
                        } else {
                            report.name.clone()
                        }
                    );
                }
            }
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => {
                for report in reports {
                    println!("{}\t{}\t{}", report.id, report.size, report.modified.to_rfc3339());
                }
            }
        }
    }

    // Specialized output methods
    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {} // No separator in JSON mode
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_report(&self, report: &AnalysisReport) {
        self.print_header(&format!("Análise: {}", report.kind.label()));

        println!("Report:      {}", report.source);
        println!("Column:      {}", report.column);
        if !self.quiet {
            println!("Rows summed: {}", report.rows_counted);
            if report.tax_rate > 0.0 {
                println!(
                    "Gross:       {} (tax {:.2}%)",
                    format_currency(report.gross_total),
                    report.tax_rate * 100.0
                );
            }
        }

        let total = report.formatted_total();
        println!(
            "Total da produção: {}",
            if self.use_colors {
                style(total).green().bold().to_string()
            } else {
                total
            }
        );

        if let Some(ref file_id) = report.stored_as {
            println!("Stored as:   {}", file_id);
        }

        if report.column_missing {
            self.warning(&format!(
                "Column {} not found in the report header; total is zero",
                report.column
            ));
        }

        let unparseable = report.unparseable();
        if !unparseable.is_empty() {
            println!();
            self.warning(&format!("{} value(s) could not be converted:", unparseable.len()));
            for row in unparseable {
                println!("  line {}: {}", row.line, row.reason);
            }
        }

        if self.should_show_message(2) {
            for row in report
                .skipped
                .iter()
                .filter(|row| !matches!(row.reason, crate::extractor::SkipReason::Unparseable { .. }))
            {
                self.debug(&format!("line {} skipped ({})", row.line, row.reason));
            }
        }
    }

    fn print_plain_report(&self, report: &AnalysisReport) {
        println!("{}", report.summary_line());
        println!("Source: {}", report.source);
        println!("Rows: {}", report.rows_counted);
        if let Some(ref file_id) = report.stored_as {
            println!("Stored: {}", file_id);
        }
        if report.column_missing {
            println!("WARNING: column {} not found", report.column);
        }
        for row in report.unparseable() {
            println!("SKIPPED: line {}: {}", row.line, row.reason);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputMode::Human, 1, false);
        assert_eq!(formatter.mode, OutputMode::Human);
        assert_eq!(formatter.verbose_level, 1);
        assert!(!formatter.quiet);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(formatter.quiet);
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_json_mode_never_uses_colors() {
        let formatter = OutputFormatter::new(OutputMode::Json, 0, false);
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(formatter.should_show_message(2));
        assert!(!formatter.should_show_message(3));

        let quiet_formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert!(!quiet_formatter.should_show_message(0));
        assert!(!quiet_formatter.should_show_message(1));
        assert!(!quiet_formatter.should_show_message(2));
    }
}
