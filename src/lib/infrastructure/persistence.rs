//! Status store adapters

mod memory;

pub use memory::InMemoryEmailStatusStore;
