mod atomic;
mod config;
mod interface;
mod lock;
mod mutex;
mod state;
mod status;

pub use atomic::*;
pub use config::*;
pub use interface::*;
pub use lock::*;
pub use mutex::*;
pub use state::GeneratorState;
pub use status::*;
