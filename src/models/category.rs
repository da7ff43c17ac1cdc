use serde::Serialize;
use sqlx::FromRow;

/// Tool category model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ToolCategory {
    pub id: i64,
    pub name: String,
}
