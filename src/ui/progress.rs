use crate::extractor::WriteProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bars on stderr. A disabled manager hands out hidden bars.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_file_progress(&self, total_files: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_files));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} files {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }
}

pub fn update_write_progress(pb: &ProgressBar, progress: &WriteProgress) {
    let done = progress.written.len() + progress.failures.len();
    pb.set_length(progress.total_files as u64);
    pb.set_position(done as u64);

    match progress.written.last() {
        Some(last) => pb.set_message(last.path.display().to_string()),
        None => pb.set_message("Writing files..."),
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::WrittenFile;
    use std::path::PathBuf;

    #[test]
    fn test_disabled_progress_bars() {
        let manager = ProgressManager::new(false);

        assert!(manager.create_file_progress(10).is_hidden());
        assert!(manager.create_spinner("make").is_hidden());
    }

    #[test]
    fn test_spinner_keeps_message() {
        let manager = ProgressManager::new(true);
        let spinner = manager.create_spinner("cargo build");
        assert_eq!(spinner.message(), "cargo build");
        spinner.finish_and_clear();
    }

    #[test]
    fn test_update_write_progress() {
        let pb = ProgressBar::hidden();

        let mut progress = WriteProgress::new(3);
        progress.written.push(WrittenFile {
            path: PathBuf::from("a.txt"),
            lines: 1,
            bytes: 2,
        });
        update_write_progress(&pb, &progress);

        assert_eq!(pb.length(), Some(3));
        assert_eq!(pb.position(), 1);
        assert_eq!(pb.message(), "a.txt");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
