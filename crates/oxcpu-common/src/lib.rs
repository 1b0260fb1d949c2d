pub mod namespace;
pub mod types;
