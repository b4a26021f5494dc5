pub mod context;
pub mod utils;

pub use context::*;
pub use utils::*;
