pub mod engine;
pub mod memory;
pub mod table;

pub use engine::Backend;
pub use memory::InMemoryBackend;
pub use table::{Table, TableSchema};
