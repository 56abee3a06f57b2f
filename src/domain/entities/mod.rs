pub mod collection;
pub mod trash_entry;
