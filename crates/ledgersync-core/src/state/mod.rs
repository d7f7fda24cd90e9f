// # Session Store Implementations
//
// Implementations of the SessionStore trait for different persistence
// strategies.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
