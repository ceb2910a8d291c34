use crate::error::{Result, TangleError};
use crate::extractor::{BlockSet, ExtractedBlock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub lines: usize,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct WriteProgress {
    pub written: Vec<WrittenFile>,
    pub total_files: usize,
    pub failures: Vec<TangleError>,
    pub start_time: Instant,
}

impl WriteProgress {
    pub fn new(total_files: usize) -> Self {
        Self {
            written: Vec::new(),
            total_files,
            failures: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn files_written(&self) -> usize {
        self.written.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Writes extracted blocks to disk, one file per block.
///
/// File names come straight from the input documents and are joined onto
/// the base directory as-is. Absolute names and `..` components are not
/// rejected.
pub struct OutputWriter {
    base_directory: PathBuf,
}

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

impl OutputWriter {
    pub fn new<P: Into<PathBuf>>(base_directory: P) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }

    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.base_directory.join(file_name)
    }

    /// Writes every block. A failing file is recorded and skipped.
    pub fn write_blocks(
        &self,
        blocks: &BlockSet,
        progress_callback: Option<&dyn Fn(&WriteProgress)>,
    ) -> WriteProgress {
        let mut progress = WriteProgress::new(blocks.len());

        for block in blocks {
            match self.write_block(block) {
                Ok(written) => {
                    tracing::debug!(
                        "wrote {} ({} lines, {} bytes)",
                        written.path.display(),
                        written.lines,
                        written.bytes
                    );
                    progress.written.push(written);
                }
                Err(e) => {
                    tracing::debug!("{}", e);
                    progress.failures.push(e);
                }
            }

            if let Some(callback) = progress_callback {
                callback(&progress);
            }
        }

        progress
    }

    pub fn write_block(&self, block: &ExtractedBlock) -> Result<WrittenFile> {
        let path = self.resolve(&block.file_name);
        self.write_lines(&path, block.lines.iter())
    }

    /// Writes all blocks, in order, into the single file `file_name`.
    pub fn write_concatenated(&self, blocks: &BlockSet, file_name: &Path) -> Result<WrittenFile> {
        let path = self.base_directory.join(file_name);
        self.write_lines(&path, blocks.iter().flat_map(|b| b.lines.iter()))
    }

    fn write_lines<'l, I>(&self, path: &Path, lines: I) -> Result<WrittenFile>
    where
        I: Iterator<Item = &'l String>,
    {
        let file = self.create_file(path)?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        let write_err = |source: std::io::Error| TangleError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };

        let mut line_count = 0;
        let mut bytes = 0u64;
        for line in lines {
            writer.write_all(line.as_bytes()).map_err(write_err)?;
            writer.write_all(b"\n").map_err(write_err)?;
            line_count += 1;
            bytes += line.len() as u64 + 1;
        }

        writer.flush().map_err(write_err)?;

        Ok(WrittenFile {
            path: path.to_path_buf(),
            lines: line_count,
            bytes,
        })
    }

    fn create_file(&self, path: &Path) -> Result<fs::File> {
        let create_err = |source: std::io::Error| TangleError::OutputCreate {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(create_err)?;
            }
        }

        fs::File::create(path).map_err(create_err)
    }
}
