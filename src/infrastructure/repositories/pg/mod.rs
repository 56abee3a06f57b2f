mod document_pg_repository;

pub use document_pg_repository::DocumentPgRepository;
