pub mod flow;
pub mod node;

pub use flow::*;
pub use node::*;
