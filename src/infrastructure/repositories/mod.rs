pub mod memory_document_store;

// Repositorios PostgreSQL
pub mod pg;

pub use memory_document_store::MemoryDocumentStore;
pub use pg::DocumentPgRepository;
