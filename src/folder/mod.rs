pub mod handlers;
pub mod models;
pub mod tree;

pub use tree::FolderTree;
