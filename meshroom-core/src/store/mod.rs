mod memory;
mod subscription;

pub use memory::{MemoryStore, StoreConnection};
pub use subscription::Subscription;
