mod allocator;
mod host;
mod memory;
mod store;

pub use allocator::*;
pub use host::*;
pub use memory::*;
pub use store::*;
