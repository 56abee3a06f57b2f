pub mod trash_cleanup_service;
