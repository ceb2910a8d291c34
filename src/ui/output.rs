use crate::error::{TangleError, UserFriendlyError};
use crate::extractor::TangleReport;
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

static DONE: Emoji = Emoji("✅ ", "✓ ");
static FAILED: Emoji = Emoji("❌ ", "Error: ");
static NOTE: Emoji = Emoji("ℹ️  ", "i ");
static STEP: Emoji = Emoji("⚙️  ", "> ");

#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    Success,
    Error,
    Suggestion,
    Step,
    Info,
    Debug,
}

impl Level {
    /// Verbosity needed to show a message. `None` means always shown.
    fn threshold(self) -> Option<u8> {
        match self {
            Level::Error => None,
            Level::Success | Level::Suggestion => Some(0),
            Level::Step | Level::Info => Some(1),
            Level::Debug => Some(2),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
            Level::Suggestion => "suggestion",
            Level::Step => "step",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

/// User-facing messages. Everything goes to stdout, errors included.
pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = mode == OutputMode::Human
            && !quiet
            && Term::stdout().features().colors_supported();

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    pub fn start_operation(&self, operation: &str) {
        self.emit(Level::Step, operation);
    }

    pub fn print_user_friendly_error(&self, error: &TangleError) {
        self.error(&error.user_message());
        if let Some(suggestion) = error.suggestion() {
            self.emit(Level::Suggestion, &suggestion);
        }
    }

    /// Command output is printed verbatim outside json mode, even when quiet.
    pub fn print_command_output(&self, command: &str, output: &str) {
        match self.mode {
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({ "type": "command_output", "command": command, "output": output })
            ),
            _ if !output.is_empty() => println!("{}", output.trim_end_matches('\n')),
            _ => {}
        }
    }

    pub fn print_dry_run(&self, report: &TangleReport) {
        if self.mode == OutputMode::Json {
            return self.print_json_report(report);
        }

        if !self.quiet {
            if self.use_colors {
                println!("{}", style("Dry run, nothing written").bold().cyan());
            } else {
                println!("=== Dry run ===");
            }
        }

        if report.blocks.is_empty() {
            println!("  no blocks found");
        }
        for block in &report.blocks {
            println!(
                "  {} ({} lines, {})",
                block.file_name,
                block.lines,
                format_bytes(block.bytes)
            );
        }
        for error in &report.errors {
            println!("  error: {}", error);
        }
    }

    /// Silent for a clean run at default verbosity.
    pub fn print_report(&self, report: &TangleReport) {
        if self.mode == OutputMode::Json {
            return self.print_json_report(report);
        }
        if self.quiet || (self.verbose_level == 0 && report.is_clean()) {
            return;
        }

        if self.verbose_level == 0 {
            println!(
                "Completed with {} error(s); {} of {} file(s) written",
                report.errors.len(),
                report.files.len(),
                report.blocks.len()
            );
            return;
        }

        let read = report.inputs.len() - report.inputs_failed;
        let rows = [
            ("Inputs read", format!("{}/{}", read, report.inputs.len())),
            ("Files written", report.files.len().to_string()),
            ("Lines", report.total_lines().to_string()),
            ("Bytes written", format_bytes(report.total_bytes_written())),
            ("Time taken", format_duration(report.duration)),
        ];

        let rule = "-".repeat(60);
        println!("{}", rule);
        if report.is_clean() {
            self.success("Extraction completed");
        } else {
            println!("Extraction completed with errors");
        }
        for (label, value) in rows {
            println!("  {:<14} {}", format!("{}:", label), value);
        }
        if let Some(ref concatenated) = report.concatenated {
            println!("  {:<14} {}", "Concatenated:", concatenated.path.display());
        }
        for file in &report.files {
            self.debug(&format!("{} ({} lines)", file.path.display(), file.lines));
        }
        if !report.errors.is_empty() {
            println!("Issues encountered:");
            for error in &report.errors {
                println!("  - {}", error);
            }
        }
        println!("{}", rule);
    }

    fn shows(&self, level: Level) -> bool {
        match level.threshold() {
            None => true,
            Some(min) => !self.quiet && self.verbose_level >= min,
        }
    }

    fn emit(&self, level: Level, message: &str) {
        if !self.shows(level) {
            return;
        }

        match self.mode {
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({
                    "type": "message",
                    "level": level.name(),
                    "message": message,
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })
            ),
            OutputMode::Plain => println!("{}: {}", level.name().to_uppercase(), message),
            OutputMode::Human => self.emit_human(level, message),
        }
    }

    fn emit_human(&self, level: Level, message: &str) {
        if !self.use_colors {
            let prefix = match level {
                Level::Success => "✓ ",
                Level::Error => "Error: ",
                Level::Suggestion => "Suggestion: ",
                Level::Step => "> ",
                Level::Info => "i ",
                Level::Debug => "  DEBUG: ",
            };
            println!("{}{}", prefix, message);
            return;
        }

        match level {
            Level::Success => println!("{}{}", DONE, style(message).green().bold()),
            Level::Error => println!("{}{}", FAILED, style(message).red().bold()),
            Level::Suggestion => println!("{}{}", NOTE, style(format!("Suggestion: {}", message)).cyan()),
            Level::Step => println!("{}{}", STEP, style(message).bold()),
            Level::Info => println!("{}{}", NOTE, style(message).cyan()),
            Level::Debug => println!("  {}", style(message).dim()),
        }
    }

    fn print_json_report(&self, report: &TangleReport) {
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
