use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blocktangle")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract delimiter-marked code blocks from text files")]
#[command(
    long_about = "BlockTangle scans documents for code blocks such as \\begin{code}{main.rs} ... \\end{code}, \
                  writes every block to the file named on its begin line, and can run a build \
                  command afterwards."
)]
#[command(after_help = "EXAMPLES:\n  \
    blocktangle notes.tex\n  \
    blocktangle -begin '<<<' -end '>>>' chapter1.md chapter2.md\n  \
    blocktangle --options tangle.json --command 'cargo build' book.tex\n\n\
    Single-dash flags (-begin, -fstart, ...) are accepted as well as --begin, --fstart.")]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Input files to scan for code blocks
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Begin marker
    #[arg(long, allow_hyphen_values = true, help = "Begin marker (default: \\begin{code})")]
    pub begin: Option<String>,

    /// End marker
    #[arg(long, allow_hyphen_values = true, help = "End marker (default: \\end{code})")]
    pub end: Option<String>,

    /// Start of the file name on a begin line
    #[arg(long, allow_hyphen_values = true, help = "Start of file name (default: {)")]
    pub fstart: Option<String>,

    /// End of the file name on a begin line
    #[arg(long, allow_hyphen_values = true, help = "End of file name (default: })")]
    pub fend: Option<String>,

    /// Output file used by --concat
    #[arg(short = 'o', long = "output-file", help = "Output file for --concat (default: output.txt)")]
    pub output_file: Option<PathBuf>,

    /// Shell command to run after all files are written
    #[arg(long, allow_hyphen_values = true, help = "Command to run after output")]
    pub command: Option<String>,

    /// JSON options file
    #[arg(long, help = "Path to JSON options file (overrides flags)")]
    pub options: Option<PathBuf>,

    /// Also write every block into the output file
    #[arg(long, help = "Also concatenate all blocks into the output file")]
    pub concat: bool,

    /// Process inputs one after another
    #[arg(long, help = "Read input files one at a time instead of concurrently")]
    pub sequential: bool,

    /// Directory extracted file names are resolved against
    #[arg(long = "dir", value_name = "DIR", help = "Directory to write extracted files into")]
    pub directory: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show what would be written without writing
    #[arg(long, help = "List the blocks that would be written without writing them")]
    pub dry_run: bool,

    /// Generate sample options file
    #[arg(long, help = "Write a sample JSON options file and exit")]
    pub generate_options: bool,

    /// Shows help
    #[arg(short = 'h', long, action = ArgAction::SetTrue, help = "Shows help")]
    pub help: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

/// Long flags that may be spelled with a single dash.
const LONG_FLAGS: &[&str] = &[
    "begin",
    "end",
    "fstart",
    "fend",
    "command",
    "options",
    "help",
    "concat",
    "sequential",
    "dir",
    "output-file",
    "output-format",
    "dry-run",
    "generate-options",
    "verbose",
    "quiet",
    "version",
];

/// Flags whose value may follow as the next argument.
const VALUE_FLAGS: &[&str] = &[
    "begin",
    "end",
    "fstart",
    "fend",
    "command",
    "options",
    "dir",
    "output-file",
    "output-format",
    "o",
];

impl Cli {
    /// Parses the process arguments, accepting `-begin` as well as `--begin`.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn load_config(&self) -> Result<Config> {
        let overrides = self.create_cli_overrides();
        Config::load(&overrides, self.options.as_deref())
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_begin(self.begin.clone())
            .with_end(self.end.clone())
            .with_file_name_delimiters(self.fstart.clone(), self.fend.clone())
            .with_output_file(self.output_file.clone())
            .with_command(self.command.clone())
            .with_concat(self.concat.then_some(true))
            .with_base_directory(self.directory.clone())
            .with_sequential(self.sequential.then_some(true))
            .with_help(self.help.then_some(true))
    }

    pub fn options_path(&self) -> PathBuf {
        self.options
            .clone()
            .unwrap_or_else(|| PathBuf::from("blocktangle.json"))
    }

    pub fn print_usage() -> std::io::Result<()> {
        Self::command().print_help()?;
        println!();
        Ok(())
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Rewrites Go-style `-flag` spellings of known long flags into `--flag`.
///
/// Values following a value-taking flag and everything after a bare `--`
/// are passed through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut expect_value = false;
    let mut positional_only = false;

    for (index, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();

        if index == 0 || expect_value || positional_only {
            expect_value = false;
            normalized.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };

        if text == "--" {
            positional_only = true;
            normalized.push(arg);
            continue;
        }

        let (rewritten, name, has_inline_value) = if let Some(rest) = text.strip_prefix("--") {
            let (name, value) = split_inline(rest);
            (None, name, value)
        } else if let Some(rest) = text.strip_prefix('-') {
            let (name, value) = split_inline(rest);
            if LONG_FLAGS.contains(&name) {
                (Some(format!("--{}", rest)), name, value)
            } else {
                (None, name, value)
            }
        } else {
            normalized.push(arg);
            continue;
        };

        expect_value = !has_inline_value && VALUE_FLAGS.contains(&name);
        normalized.push(rewritten.map(OsString::from).unwrap_or(arg));
    }

    normalized
}

fn split_inline(flag: &str) -> (&str, bool) {
    match flag.split_once('=') {
        Some((name, _)) => (name, true),
        None => (flag, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["blocktangle"];
        full.extend_from_slice(args);
        Cli::try_parse_from(normalize_args(full)).unwrap()
    }

    fn empty_cli() -> Cli {
        Cli {
            files: Vec::new(),
            begin: None,
            end: None,
            fstart: None,
            fend: None,
            output_file: None,
            command: None,
            options: None,
            concat: false,
            sequential: false,
            directory: None,
            output_format: OutputFormat::Human,
            verbose: 0,
            quiet: false,
            dry_run: false,
            generate_options: false,
            help: false,
        }
    }

    #[test]
    fn test_go_style_flags() {
        let cli = parse(&["-begin", "<<<", "-end=>>>", "-fstart", "[", "-o", "all.txt", "a.md", "b.md"]);

        assert_eq!(cli.begin.as_deref(), Some("<<<"));
        assert_eq!(cli.end.as_deref(), Some(">>>"));
        assert_eq!(cli.fstart.as_deref(), Some("["));
        assert_eq!(cli.output_file, Some(PathBuf::from("all.txt")));
        assert_eq!(cli.files, vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
    }

    #[test]
    fn test_values_are_not_rewritten() {
        let cli = parse(&["--begin", "-end", "-command", "-help", "doc.txt"]);

        assert_eq!(cli.begin.as_deref(), Some("-end"));
        assert_eq!(cli.command.as_deref(), Some("-help"));
        assert!(!cli.help);
    }

    #[test]
    fn test_double_dash_separator() {
        let cli = parse(&["-sequential", "--", "-begin"]);

        assert!(cli.sequential);
        assert_eq!(cli.files, vec![PathBuf::from("-begin")]);
    }

    #[test]
    fn test_help_flag_single_dash() {
        assert!(parse(&["-help"]).help);
        assert!(parse(&["-h"]).help);
    }

    #[test]
    fn test_normalize_leaves_short_flags() {
        let args = normalize_args(["bt", "-vv", "-q", "-o", "-x"]);
        assert_eq!(args, vec!["bt", "-vv", "-q", "-o", "-x"]);
    }

    #[test]
    fn test_overrides_from_flags() {
        let mut cli = empty_cli();
        cli.begin = Some("BEGIN".to_string());
        cli.concat = true;

        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.begin.as_deref(), Some("BEGIN"));
        assert_eq!(overrides.concat, Some(true));
        assert_eq!(overrides.sequential, None);
    }

    #[test]
    fn test_load_config_without_options() {
        let mut cli = empty_cli();
        cli.command = Some("make".to_string());

        let config = cli.load_config().unwrap();
        assert_eq!(config.command_line(), Some("make"));
        assert_eq!(cli.options_path(), PathBuf::from("blocktangle.json"));
    }

    #[test]
    fn test_print_usage_reports_success() {
        assert!(Cli::print_usage().is_ok());
    }

    #[test]
    fn test_verbosity() {
        let mut cli = empty_cli();
        cli.verbose = 2;
        assert_eq!(cli.verbosity_level(), 2);

        cli.quiet = true;
        assert_eq!(cli.verbosity_level(), 0);
    }
}
