//! Writing generated files into the output tree.

pub mod summary;
pub mod writer;

pub use summary::render_summary;
pub use writer::{normalize_content, write_files, OutputLayout, WriteReport};
