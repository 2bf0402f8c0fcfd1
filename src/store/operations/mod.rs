pub mod collections;
pub mod settings;
