use blocktangle::{Cli, OutputFormat, OutputFormatter, OutputMode, TangleError, Tangler};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse_normalized();
    setup_logging(cli.verbosity_level());

    if cli.help {
        return show_usage();
    }

    if cli.generate_options {
        return handle_generate_options(&cli);
    }

    let tangler = match Tangler::from_cli(&cli) {
        Ok(tangler) => tangler,
        Err(e) => {
            print_startup_error(&cli, &e);
            return 1;
        }
    };

    // The options file may ask for help too.
    if tangler.config().help {
        return show_usage();
    }

    if cli.files.is_empty() {
        tangler.handle_error(&TangleError::NoInputFiles);
        return 1;
    }

    if cli.dry_run {
        return match tangler.dry_run(&cli.files).await {
            Ok(report) => {
                tangler.output_formatter().print_dry_run(&report);
                exit_code_for(report.is_clean())
            }
            Err(e) => {
                tangler.handle_error(&e);
                1
            }
        };
    }

    match tangler.tangle(&cli.files).await {
        Ok(report) => {
            tangler.output_formatter().print_report(&report);
            exit_code_for(report.is_clean())
        }
        Err(e) => {
            tracing::debug!("batch aborted: {:?}", e);
            tangler.handle_error(&e);
            1
        }
    }
}

fn show_usage() -> i32 {
    if let Err(e) = Cli::print_usage() {
        tracing::debug!("could not print usage: {}", e);
    }
    0
}

fn exit_code_for(clean: bool) -> i32 {
    if clean {
        0
    } else {
        1
    }
}

fn handle_generate_options(cli: &Cli) -> i32 {
    let options_path = cli.options_path();
    let formatter = formatter_for(cli);

    match Tangler::generate_sample_options(&options_path) {
        Ok(()) => {
            formatter.success(&format!(
                "Generated sample options file: {}",
                options_path.display()
            ));
            formatter.info(&format!(
                "Use it with: blocktangle --options {} <files>",
                options_path.display()
            ));
            0
        }
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            1
        }
    }
}

fn print_startup_error(cli: &Cli, error: &TangleError) {
    formatter_for(cli).print_user_friendly_error(error);
}

fn formatter_for(cli: &Cli) -> OutputFormatter {
    let mode = match cli.output_format {
        OutputFormat::Human => OutputMode::Human,
        OutputFormat::Json => OutputMode::Json,
        OutputFormat::Plain => OutputMode::Plain,
    };
    OutputFormatter::new(mode, cli.verbosity_level(), cli.quiet)
}

/// Logs go to stderr; RUST_LOG wins over the verbosity flags.
fn setup_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 | 1 => "blocktangle=warn",
        2 => "blocktangle=info",
        _ => "blocktangle=debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocktangle::OptionsFile;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli_from(args: &[&str]) -> Cli {
        let mut full = vec!["blocktangle"];
        full.extend_from_slice(args);
        Cli::parse_from(blocktangle::cli::normalize_args(full))
    }

    #[test]
    fn test_generate_options_command() {
        let temp_dir = TempDir::new().unwrap();
        let options_path = temp_dir.path().join("tangle.json");
        let path_arg = options_path.to_string_lossy().to_string();

        let cli = cli_from(&["--generate-options", "-options", &path_arg, "-q"]);

        assert_eq!(handle_generate_options(&cli), 0);

        let options = OptionsFile::load_from_file(&options_path).unwrap();
        assert_eq!(options.file_name_start.as_deref(), Some("{"));
    }

    #[test]
    fn test_generate_options_into_missing_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        let options_path = temp_dir.path().join("no/such/dir/tangle.json");
        let path_arg = options_path.to_string_lossy().to_string();

        let cli = cli_from(&["--generate-options", "--options", &path_arg, "-q"]);

        assert_eq!(handle_generate_options(&cli), 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(true), 0);
        assert_eq!(exit_code_for(false), 1);
    }
}
