pub mod error;
pub mod memory;
pub mod repository;

pub use error::{StorageError, StorageResult};
pub use memory::{CorpusDocument, CorpusFile, MemoryStore};
pub use repository::{PostingRepository, VectorRepository};
