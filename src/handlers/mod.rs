pub mod category;
pub mod maintenance;
pub mod tool;
