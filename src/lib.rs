pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod runner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, OptionsFile, OutputConfig};
pub use error::{Result, TangleError, UserFriendlyError};

pub use extractor::{
    BlockExtractor, BlockSet, BlockSummary, Delimiters, ExtractedBlock, OutputWriter,
    TangleReport, WriteProgress, WrittenFile,
};
pub use orchestrator::{process_file, CollectionOutcome, FileOrchestrator, ProcessingMode};
pub use runner::{CommandOutcome, CommandRunner};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task;

/// Extracts blocks from a set of documents, writes them out and runs the
/// configured command.
pub struct Tangler {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl Tangler {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(config, output_mode, cli_args.verbose, cli_args.quiet))
    }

    /// Runs the whole batch. Per-file failures end up in the report's
    /// `errors`; a failing command is returned as an error.
    pub async fn tangle(&self, inputs: &[PathBuf]) -> Result<TangleReport> {
        let start_time = Instant::now();

        let outcome = self.collect_blocks(inputs).await?;
        let mut report = TangleReport::from_collection(&outcome, false);

        let progress = self.write_outputs(outcome.blocks, &mut report).await?;
        report.files = progress.written;
        for failure in &progress.failures {
            self.output_formatter.print_user_friendly_error(failure);
        }
        report
            .errors
            .extend(progress.failures.iter().map(|e| e.to_string()));

        if let Some(command) = self.config.command_line() {
            report.command = Some(self.run_command(command).await?);
        }

        report.duration = start_time.elapsed();
        Ok(report)
    }

    /// Reads and extracts every input without touching the filesystem.
    pub async fn dry_run(&self, inputs: &[PathBuf]) -> Result<TangleReport> {
        let start_time = Instant::now();

        let outcome = self.collect_blocks(inputs).await?;
        let mut report = TangleReport::from_collection(&outcome, true);
        report.duration = start_time.elapsed();

        Ok(report)
    }

    async fn collect_blocks(&self, inputs: &[PathBuf]) -> Result<CollectionOutcome> {
        self.output_formatter
            .start_operation(&format!("Reading {} input file(s)", inputs.len()));

        let file_progress = self.progress_manager.create_file_progress(inputs.len() as u64);
        let on_file_done = {
            let pb = file_progress.clone();
            move |path: &Path| {
                pb.inc(1);
                pb.set_message(path.display().to_string());
            }
        };

        let orchestrator =
            FileOrchestrator::new(self.config.delimiters.clone()).with_mode(self.config.mode);
        let outcome = orchestrator.collect(inputs, Some(&on_file_done)).await;

        file_progress.finish_and_clear();
        let outcome = outcome?;

        for failure in &outcome.failures {
            self.output_formatter.print_user_friendly_error(failure);
        }

        self.output_formatter.info(&format!(
            "Found {} block file(s) in {}/{} input(s)",
            outcome.blocks.len(),
            outcome.inputs_succeeded(),
            outcome.inputs.len()
        ));

        Ok(outcome)
    }

    async fn write_outputs(
        &self,
        blocks: BlockSet,
        report: &mut TangleReport,
    ) -> Result<WriteProgress> {
        self.output_formatter
            .start_operation(&format!("Writing {} file(s)", blocks.len()));

        let writer = OutputWriter::new(self.config.output.base_directory.clone());
        let concat_target = self
            .config
            .output
            .concat
            .then(|| self.config.output.output_file.clone());

        let write_progress = self.progress_manager.create_file_progress(blocks.len() as u64);
        let pb = write_progress.clone();

        let (progress, concatenated) = task::spawn_blocking(move || {
            let callback = |progress: &WriteProgress| {
                crate::ui::progress::update_write_progress(&pb, progress);
            };
            let progress = writer.write_blocks(&blocks, Some(&callback));
            let concatenated = concat_target.map(|target| writer.write_concatenated(&blocks, &target));
            (progress, concatenated)
        })
        .await
        .map_err(|e| TangleError::Task {
            message: format!("Write task failed: {}", e),
        })?;

        crate::ui::progress::finish_progress_with_summary(
            &write_progress,
            &format!("Wrote {} file(s)", progress.files_written()),
            progress.elapsed(),
        );

        match concatenated {
            Some(Ok(written)) => report.concatenated = Some(written),
            Some(Err(e)) => {
                self.output_formatter.print_user_friendly_error(&e);
                report.errors.push(e.to_string());
            }
            None => {}
        }

        Ok(progress)
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutcome> {
        self.output_formatter
            .start_operation(&format!("Running command: {}", command));

        let spinner = self.progress_manager.create_spinner(command);
        let result = CommandRunner::new()
            .with_working_dir(self.config.output.base_directory.clone())
            .run(command)
            .await;
        spinner.finish_and_clear();

        let outcome = result?;
        self.output_formatter
            .print_command_output(&outcome.command, &outcome.output);

        Ok(outcome)
    }

    /// Writes an options file populated with the defaults.
    pub fn generate_sample_options<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_options_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn handle_error(&self, error: &TangleError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}
