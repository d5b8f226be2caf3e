pub mod compare;
pub mod providers;

pub use compare::{sha256_file, Comparer};
pub use providers::{BinaryInspector, ToolInspector};
