pub mod backend;
pub mod document;
pub mod documentation;
pub mod features;
pub mod file_resolver;
pub mod models;
pub mod sourcemap;
pub mod workspace;
