use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::domain::ProjectState;

use super::Freelancer;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub freelancer_id: Uuid,
    pub description: String,
    /// Total quoted by the freelancer on acceptance; 0 while open.
    pub amount: f64,
    pub state: ProjectState,
    pub advance_payment_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: Uuid,
    pub freelancer_id: Uuid,
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    pub freelancer_id: Uuid,
    #[validate(length(min = 1, max = 5000, message = "Please describe the project"))]
    pub description: String,
}

/// A project as listed for its requester, with the freelancer expanded.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithFreelancer {
    #[serde(flatten)]
    pub project: Project,
    pub freelancer: Option<Freelancer>,
}
