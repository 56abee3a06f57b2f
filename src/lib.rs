// Exportar los módulos principales del proyecto
pub mod common;
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod interfaces;

// Re-exportaciones públicas comunes
pub use application::services::trash_service::TrashService;
pub use infrastructure::repositories::memory_document_store::MemoryDocumentStore;
pub use infrastructure::repositories::pg::DocumentPgRepository;
