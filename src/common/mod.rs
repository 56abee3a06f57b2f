pub mod config;
pub mod db;
pub mod di;
pub mod errors;
