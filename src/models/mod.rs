pub mod category;
pub mod tool;

pub use category::*;
pub use tool::*;
