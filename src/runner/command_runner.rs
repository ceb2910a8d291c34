use crate::error::{Result, TangleError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command: String,
    pub exit_code: Option<i32>,
    pub output: String,
}

/// Runs the post-extraction command through a shell interpreter.
pub struct CommandRunner {
    shell: String,
    shell_flag: String,
    working_dir: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new() -> Self {
        #[cfg(windows)]
        let (shell, shell_flag) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (shell, shell_flag) = ("bash", "-c");

        Self {
            shell: shell.to_string(),
            shell_flag: shell_flag.to_string(),
            working_dir: None,
        }
    }

    pub fn with_shell<S: Into<String>>(mut self, shell: S, flag: S) -> Self {
        self.shell = shell.into();
        self.shell_flag = flag.into();
        self
    }

    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Runs `command` to completion. A spawn failure or a non-zero exit is
    /// an error carrying whatever the command printed.
    pub async fn run(&self, command: &str) -> Result<CommandOutcome> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(&self.shell_flag).arg(command);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("running `{} {} {}`", self.shell, self.shell_flag, command);

        let output = cmd
            .output()
            .await
            .map_err(|source| TangleError::CommandSpawn {
                command: command.to_string(),
                source,
            })?;

        let combined = combined_output(&output);

        if !output.status.success() {
            return Err(TangleError::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                output: combined,
            });
        }

        Ok(CommandOutcome {
            command: command.to_string(),
            exit_code: output.status.code(),
            output: combined,
        })
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Stdout followed by stderr.
fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_successful_command_output() {
        let outcome = CommandRunner::new().run("echo hello").await.unwrap();

        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.output, "hello\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let err = CommandRunner::new()
            .run("echo building; echo broken >&2; exit 3")
            .await
            .unwrap_err();

        match err {
            TangleError::CommandFailed { status, output, .. } => {
                assert!(status.contains('3'));
                assert!(output.contains("building"));
                assert!(output.contains("broken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bash_syntax_is_available() {
        let outcome = CommandRunner::new()
            .run("echo {a,b}; [[ 1 == 1 ]] && echo ok")
            .await
            .unwrap();

        assert_eq!(outcome.output, "a b\nok\n");
    }

    #[tokio::test]
    async fn test_shell_can_be_overridden() {
        let outcome = CommandRunner::new()
            .with_shell("sh", "-c")
            .run("echo plain")
            .await
            .unwrap();

        assert_eq!(outcome.output, "plain\n");
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_spawn_error() {
        let err = CommandRunner::new()
            .with_shell("/nonexistent/shell", "-c")
            .run("true")
            .await
            .unwrap_err();

        assert!(matches!(err, TangleError::CommandSpawn { .. }));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let outcome = CommandRunner::new()
            .with_working_dir(dir.path())
            .run("cat marker.txt")
            .await
            .unwrap();

        assert_eq!(outcome.output, "here");
    }
}
