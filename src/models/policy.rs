use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::api::validation::validate_not_blank;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Policy {
    pub id: i32,
    pub name: String,
    pub criteria: String,
    pub value: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePolicyRequest {
    #[validate(
        length(min = 1, max = 255, message = "Name must be 1-255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 255, message = "Criteria must be 1-255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub criteria: String,
    pub value: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_patch"))]
pub struct PatchPolicyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Criteria must be 1-255 characters"))]
    pub criteria: Option<String>,
    pub value: Option<i32>,
}

impl PatchPolicyRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.criteria.is_none() && self.value.is_none()
    }
}

fn validate_patch(request: &PatchPolicyRequest) -> Result<(), ValidationError> {
    if request.is_empty() {
        return Err(ValidationError::new("patch_empty")
            .with_message("At least one of name, criteria or value must be set".into()));
    }

    for field in [&request.name, &request.criteria].into_iter().flatten() {
        validate_not_blank(field)?;
    }

    Ok(())
}
