pub mod category;
pub mod locks;
pub mod reconcile;
pub mod tool;

pub use category::CategoryService;
pub use locks::ToolLocks;
pub use reconcile::ReconcileService;
pub use tool::ToolService;
