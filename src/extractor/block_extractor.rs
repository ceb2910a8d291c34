use crate::error::{Result, TangleError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Marker strings recognizing block boundaries and the embedded file name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Delimiters {
    pub begin: String,
    pub end: String,
    pub file_name_start: String,
    pub file_name_end: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            begin: "\\begin{code}".to_string(),
            end: "\\end{code}".to_string(),
            file_name_start: "{".to_string(),
            file_name_end: "}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedBlock {
    pub file_name: String,
    pub lines: Vec<String>,
}

impl ExtractedBlock {
    pub fn new<S: Into<String>>(file_name: S) -> Self {
        Self {
            file_name: file_name.into(),
            lines: Vec::new(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Size of the block once written, one `\n` per line.
    pub fn byte_len(&self) -> u64 {
        self.lines.iter().map(|l| l.len() as u64 + 1).sum()
    }
}

/// Blocks keyed by file name, kept in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    blocks: Vec<ExtractedBlock>,
    index: HashMap<String, usize>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, file_name: &str) -> Option<&ExtractedBlock> {
        self.index.get(file_name).map(|&i| &self.blocks[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractedBlock> {
        self.blocks.iter()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.file_name.as_str()).collect()
    }

    pub fn total_lines(&self) -> usize {
        self.blocks.iter().map(ExtractedBlock::line_count).sum()
    }

    /// Returns the block for `file_name`, creating an empty one on first use.
    pub fn entry(&mut self, file_name: &str) -> &mut ExtractedBlock {
        let position = match self.index.get(file_name) {
            Some(&i) => i,
            None => {
                self.blocks.push(ExtractedBlock::new(file_name));
                self.index.insert(file_name.to_string(), self.blocks.len() - 1);
                self.blocks.len() - 1
            }
        };
        &mut self.blocks[position]
    }

    /// Appends every block of `other` after the lines already held here.
    pub fn merge(&mut self, other: BlockSet) {
        for block in other.blocks {
            self.entry(&block.file_name).lines.extend(block.lines);
        }
    }
}

impl IntoIterator for BlockSet {
    type Item = ExtractedBlock;
    type IntoIter = std::vec::IntoIter<ExtractedBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a BlockSet {
    type Item = &'a ExtractedBlock;
    type IntoIter = std::slice::Iter<'a, ExtractedBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

pub struct BlockExtractor<'a> {
    delimiters: &'a Delimiters,
}

impl<'a> BlockExtractor<'a> {
    pub fn new(delimiters: &'a Delimiters) -> Self {
        Self { delimiters }
    }

    /// Scans `content` line by line and collects the lines of every block.
    ///
    /// Begin and end marker lines are never part of a block. A begin marker
    /// seen inside an open block switches the target file without closing
    /// the block. `source` is only used to label errors.
    pub fn extract(&self, content: &str, source: &Path) -> Result<BlockSet> {
        let mut blocks = BlockSet::new();
        let mut in_block = false;
        let mut current = String::new();

        for (index, line) in split_lines(content).enumerate() {
            if line.contains(&self.delimiters.begin) {
                let file_name = self.embedded_file_name(line).map_err(|reason| {
                    TangleError::MalformedDelimiter {
                        path: source.to_path_buf(),
                        line_number: index + 1,
                        reason,
                    }
                })?;

                if in_block {
                    tracing::debug!(
                        "{}:{}: begin marker inside open block for {}, switching to {}",
                        source.display(),
                        index + 1,
                        current,
                        file_name
                    );
                }

                in_block = true;
                current = file_name.to_string();
                blocks.entry(&current);
                continue;
            }

            if line.contains(&self.delimiters.end) {
                in_block = false;
                continue;
            }

            if in_block {
                blocks.entry(&current).lines.push(line.to_string());
            }
        }

        Ok(blocks)
    }

    fn embedded_file_name<'l>(&self, line: &'l str) -> std::result::Result<&'l str, String> {
        let Delimiters {
            begin,
            file_name_start,
            file_name_end,
            ..
        } = self.delimiters;

        // The name delimiters may also occur inside the begin marker itself.
        let after_marker = match line.find(begin.as_str()) {
            Some(pos) => &line[pos + begin.len()..],
            None => line,
        };

        let start = after_marker.find(file_name_start.as_str()).ok_or_else(|| {
            format!("missing file name start delimiter '{}'", file_name_start)
        })?;
        let rest = &after_marker[start + file_name_start.len()..];

        let end = rest
            .find(file_name_end.as_str())
            .ok_or_else(|| format!("missing file name end delimiter '{}'", file_name_end))?;

        let name = &rest[..end];
        if name.is_empty() {
            return Err("empty file name".to_string());
        }

        Ok(name)
    }
}

/// Splits on `\n` only. A final `\n` does not start another line, and `\r`
/// is left in place so CRLF input round-trips.
pub fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .split_inclusive('\n')
        .map(|line| line.strip_suffix('\n').unwrap_or(line))
}
