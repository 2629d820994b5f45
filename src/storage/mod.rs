pub mod engine;
pub mod keys;
pub mod memory;

pub use engine::KeyValueStore;
pub use keys::generate_key;
pub use memory::MemoryStore;
