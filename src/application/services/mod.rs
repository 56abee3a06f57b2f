pub mod trash_service;
