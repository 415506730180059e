#![forbid(unsafe_code)]

mod attrs;
mod ids;
mod tree;
mod types;

pub use attrs::*;
pub use ids::*;
pub use tree::*;
pub use types::*;
