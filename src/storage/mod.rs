//! Storage abstraction layer.
//!
//! Blocks and the merged dictionary are named files in a [`Storage`]. The file
//! system backend is used in production; the in-memory backend keeps tests
//! fast and lets them observe exactly what was published.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::*;
pub use memory::*;
pub use traits::*;
