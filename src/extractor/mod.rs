pub mod block_extractor;
pub mod output_writer;
pub mod report;

pub use block_extractor::{BlockExtractor, BlockSet, Delimiters, ExtractedBlock};
pub use output_writer::{OutputWriter, WriteProgress, WrittenFile};
pub use report::{BlockSummary, TangleReport};
