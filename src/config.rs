use crate::error::{Result, TangleError};
use crate::extractor::Delimiters;
use crate::orchestrator::ProcessingMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub delimiters: Delimiters,
    pub output: OutputConfig,
    pub command: Option<String>,
    pub mode: ProcessingMode,
    pub help: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    pub output_file: PathBuf,
    pub concat: bool,
    pub base_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            output: OutputConfig::default(),
            command: None,
            mode: ProcessingMode::default(),
            help: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("output.txt"),
            concat: false,
            base_directory: PathBuf::from("."),
        }
    }
}

/// Contents of a JSON options file. Every key is optional and unknown keys
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OptionsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl OptionsFile {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| TangleError::OptionsRead {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| TangleError::OptionsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl From<&Config> for OptionsFile {
    fn from(config: &Config) -> Self {
        Self {
            begin: Some(config.delimiters.begin.clone()),
            end: Some(config.delimiters.end.clone()),
            command: Some(config.command.clone().unwrap_or_default()),
            output_file: Some(config.output.output_file.clone()),
            file_name_start: Some(config.delimiters.file_name_start.clone()),
            file_name_end: Some(config.delimiters.file_name_end.clone()),
            options: None,
            help: None,
            concat: Some(config.output.concat),
            sequential: Some(config.mode == ProcessingMode::Sequential),
            directory: Some(config.output.base_directory.clone()),
        }
    }
}

impl Config {
    /// Defaults, then command-line flags, then the options file.
    pub fn load(cli_args: &CliOverrides, options_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        config.merge_with_cli_args(cli_args);

        if let Some(path) = options_path {
            let options = OptionsFile::load_from_file(path)?;
            config.apply_options(&options);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref begin) = cli_args.begin {
            self.delimiters.begin = begin.clone();
        }

        if let Some(ref end) = cli_args.end {
            self.delimiters.end = end.clone();
        }

        if let Some(ref start) = cli_args.file_name_start {
            self.delimiters.file_name_start = start.clone();
        }

        if let Some(ref end) = cli_args.file_name_end {
            self.delimiters.file_name_end = end.clone();
        }

        if let Some(ref output_file) = cli_args.output_file {
            self.output.output_file = output_file.clone();
        }

        if let Some(ref command) = cli_args.command {
            self.command = non_empty(command);
        }

        if let Some(concat) = cli_args.concat {
            self.output.concat = concat;
        }

        if let Some(ref dir) = cli_args.base_directory {
            self.output.base_directory = dir.clone();
        }

        if let Some(true) = cli_args.sequential {
            self.mode = ProcessingMode::Sequential;
        }

        if let Some(help) = cli_args.help {
            self.help = help;
        }
    }

    /// Present keys override the current values, absent keys leave them.
    pub fn apply_options(&mut self, options: &OptionsFile) {
        if let Some(ref begin) = options.begin {
            self.delimiters.begin = begin.clone();
        }

        if let Some(ref end) = options.end {
            self.delimiters.end = end.clone();
        }

        if let Some(ref start) = options.file_name_start {
            self.delimiters.file_name_start = start.clone();
        }

        if let Some(ref end) = options.file_name_end {
            self.delimiters.file_name_end = end.clone();
        }

        if let Some(ref output_file) = options.output_file {
            self.output.output_file = output_file.clone();
        }

        if let Some(ref command) = options.command {
            self.command = non_empty(command);
        }

        if let Some(concat) = options.concat {
            self.output.concat = concat;
        }

        if let Some(ref dir) = options.directory {
            self.output.base_directory = dir.clone();
        }

        if let Some(sequential) = options.sequential {
            self.mode = if sequential {
                ProcessingMode::Sequential
            } else {
                ProcessingMode::Concurrent
            };
        }

        if let Some(help) = options.help {
            self.help = help;
        }

        if let Some(ref nested) = options.options {
            tracing::debug!("ignoring nested options path {}", nested.display());
        }
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.delimiters;
        let named = [
            ("begin", &d.begin),
            ("end", &d.end),
            ("file name start", &d.file_name_start),
            ("file name end", &d.file_name_end),
        ];

        for (name, value) in named {
            if value.is_empty() {
                return Err(TangleError::Config {
                    message: format!("The {} delimiter must not be empty", name),
                });
            }
        }

        if d.begin == d.end {
            return Err(TangleError::Config {
                message: format!("Begin and end markers are both '{}'", d.begin),
            });
        }

        if self.output.output_file.as_os_str().is_empty() {
            return Err(TangleError::Config {
                message: "Output file name must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn command_line(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn save_options_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_options_json()).map_err(|source| TangleError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    fn to_options_json(&self) -> String {
        let options = OptionsFile::from(self);
        let mut json = serde_json::to_string_pretty(&options).unwrap_or_else(|_| "{}".to_string());
        json.push('\n');
        json
    }
}

fn non_empty(command: &str) -> Option<String> {
    if command.trim().is_empty() {
        None
    } else {
        Some(command.to_string())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub begin: Option<String>,
    pub end: Option<String>,
    pub file_name_start: Option<String>,
    pub file_name_end: Option<String>,
    pub output_file: Option<PathBuf>,
    pub command: Option<String>,
    pub concat: Option<bool>,
    pub base_directory: Option<PathBuf>,
    pub sequential: Option<bool>,
    pub help: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_begin(mut self, begin: Option<String>) -> Self {
        self.begin = begin;
        self
    }

    pub fn with_end(mut self, end: Option<String>) -> Self {
        self.end = end;
        self
    }

    pub fn with_file_name_delimiters(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.file_name_start = start;
        self.file_name_end = end;
        self
    }

    pub fn with_output_file(mut self, output_file: Option<PathBuf>) -> Self {
        self.output_file = output_file;
        self
    }

    pub fn with_command(mut self, command: Option<String>) -> Self {
        self.command = command;
        self
    }

    pub fn with_concat(mut self, concat: Option<bool>) -> Self {
        self.concat = concat;
        self
    }

    pub fn with_base_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.base_directory = dir;
        self
    }

    pub fn with_sequential(mut self, sequential: Option<bool>) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn with_help(mut self, help: Option<bool>) -> Self {
        self.help = help;
        self
    }
}
