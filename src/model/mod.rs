pub mod hierarchy;
pub mod state;

pub use hierarchy::*;
pub use state::*;
