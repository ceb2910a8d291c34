use crate::error::{Result, TangleError};
use crate::extractor::{BlockExtractor, BlockSet, Delimiters};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// One task per input file, results fanned in over a channel.
    #[default]
    Concurrent,
    /// Inputs read and extracted one after another.
    Sequential,
}

/// Merged result of reading every input.
#[derive(Debug)]
pub struct CollectionOutcome {
    pub inputs: Vec<PathBuf>,
    pub blocks: BlockSet,
    pub failures: Vec<TangleError>,
}

impl CollectionOutcome {
    pub fn inputs_succeeded(&self) -> usize {
        self.inputs.len() - self.failures.len()
    }
}

type FileResult = (usize, Result<BlockSet>);

pub struct FileOrchestrator {
    delimiters: Arc<Delimiters>,
    mode: ProcessingMode,
}

impl FileOrchestrator {
    pub fn new(delimiters: Delimiters) -> Self {
        Self {
            delimiters: Arc::new(delimiters),
            mode: ProcessingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reads and extracts every input, then merges the blocks in argument
    /// order. A failing input is recorded in the outcome and skipped.
    pub async fn collect(
        &self,
        inputs: &[PathBuf],
        on_file_done: Option<&dyn Fn(&Path)>,
    ) -> Result<CollectionOutcome> {
        if inputs.is_empty() {
            return Err(TangleError::NoInputFiles);
        }

        let results = match self.mode {
            ProcessingMode::Concurrent => self.collect_concurrent(inputs, on_file_done).await,
            ProcessingMode::Sequential => self.collect_sequential(inputs, on_file_done).await,
        };

        Ok(merge_results(inputs, results))
    }

    async fn collect_sequential(
        &self,
        inputs: &[PathBuf],
        on_file_done: Option<&dyn Fn(&Path)>,
    ) -> Vec<Option<Result<BlockSet>>> {
        let mut results = Vec::with_capacity(inputs.len());

        for path in inputs {
            results.push(Some(process_file(path, &self.delimiters).await));

            if let Some(callback) = on_file_done {
                callback(path);
            }
        }

        results
    }

    async fn collect_concurrent(
        &self,
        inputs: &[PathBuf],
        on_file_done: Option<&dyn Fn(&Path)>,
    ) -> Vec<Option<Result<BlockSet>>> {
        // Sized so that no worker ever waits on a send.
        let (tx, mut rx) = mpsc::channel::<FileResult>(inputs.len());

        for (index, path) in inputs.iter().enumerate() {
            let tx = tx.clone();
            let delimiters = Arc::clone(&self.delimiters);
            let path = path.clone();

            tokio::spawn(async move {
                let result = process_file(&path, &delimiters).await;
                if tx.send((index, result)).await.is_err() {
                    tracing::warn!("result for {} dropped, collector is gone", path.display());
                }
            });
        }

        // The channel closes once the last worker drops its sender.
        drop(tx);

        let mut results: Vec<Option<Result<BlockSet>>> = inputs.iter().map(|_| None).collect();
        while let Some((index, result)) = rx.recv().await {
            tracing::debug!("collected {}", inputs[index].display());
            results[index] = Some(result);

            if let Some(callback) = on_file_done {
                callback(&inputs[index]);
            }
        }

        results
    }
}

/// Reads one input and extracts its blocks.
pub async fn process_file(path: &Path, delimiters: &Delimiters) -> Result<BlockSet> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| TangleError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;

    let content = String::from_utf8_lossy(&bytes);
    let blocks = BlockExtractor::new(delimiters).extract(&content, path)?;

    tracing::debug!(
        "{}: {} blocks, {} lines",
        path.display(),
        blocks.len(),
        blocks.total_lines()
    );

    Ok(blocks)
}

fn merge_results(inputs: &[PathBuf], results: Vec<Option<Result<BlockSet>>>) -> CollectionOutcome {
    let mut blocks = BlockSet::new();
    let mut failures = Vec::new();

    for (path, result) in inputs.iter().zip(results) {
        match result {
            Some(Ok(file_blocks)) => blocks.merge(file_blocks),
            Some(Err(e)) => {
                tracing::debug!("skipping {}: {}", path.display(), e);
                failures.push(e);
            }
            None => failures.push(TangleError::Task {
                message: format!("worker for {} exited without a result", path.display()),
            }),
        }
    }

    CollectionOutcome {
        inputs: inputs.to_vec(),
        blocks,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn block(name: &str, lines: &[&str]) -> String {
        format!("\\begin{{code}}{{{}}}\n{}\n\\end{{code}}\n", name, lines.join("\n"))
    }

    #[tokio::test]
    async fn test_no_inputs_is_an_error() {
        let orchestrator = FileOrchestrator::new(Delimiters::default());
        let result = orchestrator.collect(&[], None).await;
        assert!(matches!(result, Err(TangleError::NoInputFiles)));
    }

    #[tokio::test]
    async fn test_merges_across_files_in_argument_order() {
        let dir = TempDir::new().unwrap();
        let inputs: Vec<PathBuf> = (0..8)
            .map(|i| write_input(&dir, &format!("part{i}.tex"), &block("all.txt", &[&i.to_string()])))
            .collect();

        for mode in [ProcessingMode::Concurrent, ProcessingMode::Sequential] {
            let outcome = FileOrchestrator::new(Delimiters::default())
                .with_mode(mode)
                .collect(&inputs, None)
                .await
                .unwrap();

            let lines = &outcome.blocks.get("all.txt").unwrap().lines;
            assert_eq!(lines, &["0", "1", "2", "3", "4", "5", "6", "7"], "mode {mode:?}");
        }
    }

    #[tokio::test]
    async fn test_unreadable_file_does_not_abort_batch() {
        let dir = TempDir::new().unwrap();
        let good = write_input(&dir, "good.tex", &block("ok.txt", &["fine"]));
        let missing = dir.path().join("missing.tex");

        let outcome = FileOrchestrator::new(Delimiters::default())
            .collect(&[missing, good], None)
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(outcome.failures[0], TangleError::InputRead { .. }));
        assert_eq!(outcome.inputs_succeeded(), 1);
        assert_eq!(outcome.blocks.get("ok.txt").unwrap().lines, vec!["fine"]);
    }

    #[tokio::test]
    async fn test_malformed_file_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        let bad = write_input(
            &dir,
            "bad.tex",
            &format!("{}\\begin{{code}}\noops\n\\end{{code}}\n", block("shared.txt", &["from bad"])),
        );
        let good = write_input(&dir, "good.tex", &block("shared.txt", &["from good"]));

        let outcome = FileOrchestrator::new(Delimiters::default())
            .with_mode(ProcessingMode::Sequential)
            .collect(&[bad, good], None)
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0],
            TangleError::MalformedDelimiter { line_number: 4, .. }
        ));
        assert_eq!(outcome.blocks.get("shared.txt").unwrap().lines, vec!["from good"]);
    }

    #[tokio::test]
    async fn test_callback_sees_every_input() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write_input(&dir, "a.tex", &block("a", &["1"])),
            write_input(&dir, "b.tex", &block("b", &["2"])),
            dir.path().join("nope.tex"),
        ];
        let seen = std::cell::RefCell::new(Vec::new());
        let callback = |p: &Path| seen.borrow_mut().push(p.to_path_buf());

        FileOrchestrator::new(Delimiters::default())
            .collect(&inputs, Some(&callback))
            .await
            .unwrap();

        let mut seen = seen.into_inner();
        seen.sort();
        let mut expected = inputs.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_read_lossily() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.tex");
        let mut content = b"\\begin{code}{l.txt}\ncaf".to_vec();
        content.push(0xE9);
        content.extend_from_slice(b"\n\\end{code}\n");
        fs::write(&path, content).unwrap();

        let blocks = process_file(&path, &Delimiters::default()).await.unwrap();
        assert_eq!(blocks.get("l.txt").unwrap().lines, vec!["caf\u{FFFD}"]);
    }
}
