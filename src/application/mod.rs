pub mod dtos;
pub mod ports;
pub mod services;

// Re-exportación del puerto principal
pub use ports::trash_ports::TrashUseCase;
