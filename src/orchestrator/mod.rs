pub mod file_orchestrator;

pub use file_orchestrator::{process_file, CollectionOutcome, FileOrchestrator, ProcessingMode};
