use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TangleError {
    #[error("Failed to read options file {path}: {source}")]
    OptionsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse options file {path}: {source}")]
    OptionsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed begin line {line_number} in {path}: {reason}")]
    MalformedDelimiter {
        path: PathBuf,
        line_number: usize,
        reason: String,
    },

    #[error("Failed to create output file {path}: {source}")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to output file {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start command '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' failed ({status})\nOutput: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Please provide at least one file name")]
    NoInputFiles,

    #[error("Worker task failed: {message}")]
    Task { message: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for TangleError {
    fn user_message(&self) -> String {
        match self {
            TangleError::OptionsRead { path, source } => {
                format!("Could not read options file {}: {}", path.display(), source)
            }
            TangleError::OptionsParse { path, source } => {
                format!("Options file {} is not valid JSON: {}", path.display(), source)
            }
            TangleError::InputRead { path, source } => {
                format!("Failed to read file {}: {}", path.display(), source)
            }
            TangleError::MalformedDelimiter {
                path,
                line_number,
                reason,
            } => {
                format!("{}:{}: malformed begin line, {}", path.display(), line_number, reason)
            }
            TangleError::OutputCreate { path, source } => {
                format!("Failed to create output file {}: {}", path.display(), source)
            }
            TangleError::OutputWrite { path, source } => {
                format!("Failed to write to output file {}: {}", path.display(), source)
            }
            TangleError::CommandSpawn { command, source } => {
                format!("Failed to execute command {}: {}", command, source)
            }
            TangleError::CommandFailed {
                command,
                status,
                output,
            } => {
                format!(
                    "Failed to execute command {}: {}\nOutput: {}",
                    command, status, output
                )
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            TangleError::OptionsParse { .. } => Some(
                "Options must be a JSON object, e.g. {\"begin\": \"<<<\", \"end\": \">>>\"}. Use --generate-options for a template.".to_string()
            ),
            TangleError::MalformedDelimiter { .. } => Some(
                "Begin lines must embed the target file name, e.g. \\begin{code}{main.rs}. Adjust --fstart/--fend if your markers differ.".to_string()
            ),
            TangleError::NoInputFiles => Some(
                "Pass one or more input files, e.g. blocktangle notes.tex".to_string()
            ),
            TangleError::Config { .. } => Some(
                "Check the delimiter flags and the options file; delimiters must be non-empty.".to_string()
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TangleError>;
