use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, Result};
use crate::models::ToolCategory;

/// Tool model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Tool {
    pub id: i64,
    pub description: String,
    pub hire_price: f64,
    pub tool_category_id: i64,
    /// Name of the blob holding the tool's image
    pub image: String,
}

/// Row shape of `tool INNER JOIN tool_category`
#[derive(Debug, Clone, FromRow)]
pub struct ToolCategoryRow {
    pub id: i64,
    pub description: String,
    pub hire_price: f64,
    pub tool_category_id: i64,
    pub image: String,
    pub category_name: String,
}

/// Tool response with its category embedded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub id: i64,
    pub description: String,
    pub hire_price: f64,
    pub tool_category_id: i64,
    pub image: String,
    pub tool_category: ToolCategory,
}

impl From<ToolCategoryRow> for ToolResponse {
    fn from(row: ToolCategoryRow) -> Self {
        Self {
            id: row.id,
            description: row.description,
            hire_price: row.hire_price,
            tool_category_id: row.tool_category_id,
            image: row.image,
            tool_category: ToolCategory {
                id: row.tool_category_id,
                name: row.category_name,
            },
        }
    }
}

impl ToolResponse {
    pub fn new(tool: Tool, category: ToolCategory) -> Self {
        Self {
            id: tool.id,
            description: tool.description,
            hire_price: tool.hire_price,
            tool_category_id: tool.tool_category_id,
            image: tool.image,
            tool_category: category,
        }
    }
}

/// An uploaded image part
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Scalar fields of a create/update form, as received
#[derive(Debug, Clone, Default)]
pub struct ToolForm {
    pub id: Option<String>,
    pub description: Option<String>,
    pub hire_price: Option<String>,
    pub tool_category_id: Option<String>,
}

/// Validated tool fields
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFields {
    pub description: String,
    pub hire_price: f64,
    pub tool_category_id: i64,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ToolForm {
    /// Validate the descriptive fields
    pub fn validate(&self) -> Result<ToolFields> {
        // description is kept as sent so lookups by the same string match
        let (Some(description), Some(hire_price), Some(category_id)) = (
            self.description.as_deref().filter(|d| !d.trim().is_empty()),
            present(&self.hire_price),
            present(&self.tool_category_id),
        ) else {
            return Err(AppError::Validation("Essential fields missing".to_string()));
        };

        let hire_price: f64 = hire_price
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid hire_price: {}", hire_price)))?;
        if !hire_price.is_finite() || hire_price < 0.0 {
            return Err(AppError::Validation(
                "hire_price must be a non-negative number".to_string(),
            ));
        }

        let tool_category_id: i64 = category_id.parse().map_err(|_| {
            AppError::Validation(format!("Invalid tool_category_id: {}", category_id))
        })?;

        Ok(ToolFields {
            description: description.to_string(),
            hire_price,
            tool_category_id,
        })
    }

    /// Validate the id of the tool being updated
    pub fn validate_id(&self) -> Result<i64> {
        let id = present(&self.id)
            .ok_or_else(|| AppError::Validation("Essential fields missing".to_string()))?;
        id.parse()
            .map_err(|_| AppError::Validation(format!("Invalid id: {}", id)))
    }
}

/// Delete tool request
#[derive(Debug, Deserialize)]
pub struct DeleteToolRequest {
    pub id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(desc: &str, price: &str, category: &str) -> ToolForm {
        ToolForm {
            id: None,
            description: Some(desc.to_string()),
            hire_price: Some(price.to_string()),
            tool_category_id: Some(category.to_string()),
        }
    }

    #[test]
    fn test_validate_ok() {
        let fields = form("Chisel", "3.2", "2").validate().unwrap();
        assert_eq!(
            fields,
            ToolFields {
                description: "Chisel".to_string(),
                hire_price: 3.2,
                tool_category_id: 2,
            }
        );
    }

    #[test]
    fn test_validate_missing_fields() {
        let mut f = form("Chisel", "3.2", "2");
        f.hire_price = None;
        assert!(matches!(f.validate(), Err(AppError::Validation(m)) if m == "Essential fields missing"));

        let f = form("   ", "3.2", "2");
        assert!(matches!(f.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        assert!(form("Chisel", "-1", "2").validate().is_err());
        assert!(form("Chisel", "NaN", "2").validate().is_err());
        assert!(form("Chisel", "cheap", "2").validate().is_err());
        assert!(form("Chisel", "3.2", "two").validate().is_err());
    }

    #[test]
    fn test_validate_keeps_description_as_sent() {
        let fields = form(" Chisel ", " 3.2 ", "2").validate().unwrap();
        assert_eq!(fields.description, " Chisel ");
        assert_eq!(fields.hire_price, 3.2);
    }

    #[test]
    fn test_validate_id() {
        let mut f = ToolForm::default();
        assert!(f.validate_id().is_err());
        f.id = Some("15".to_string());
        assert_eq!(f.validate_id().unwrap(), 15);
    }
}
