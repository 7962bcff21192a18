//! Freelancer engagements: request, accept with a quote, complete, and pay
//! the freelancer's advance.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::PaymentConfig;
use crate::db::{
    CreateProjectRequest, DatabaseError, NewProject, Project, ProjectWithFreelancer, Store,
    UserRole,
};
use crate::domain::parse_amount;
use crate::error::{AppError, AppResult};
use crate::payment::{advance_checkout, CheckoutOrder, PaymentConfirmation};
use crate::session::Session;

/// The freelancer's quote, either as typed text or as a JSON number.
#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub amount: Value,
}

impl AcceptRequest {
    fn amount_text(&self) -> String {
        match &self.amount {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

fn state_conflict(err: DatabaseError) -> AppError {
    match err {
        DatabaseError::Conflict(msg) => AppError::Conflict(msg),
        other => other.into(),
    }
}

async fn load(store: &dyn Store, project_id: Uuid) -> AppResult<Project> {
    store
        .get_project(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {project_id} not found")))
}

fn ensure_targeted(session: &Session, project: &Project) -> AppResult<()> {
    if session.require_freelancer()? != project.freelancer_id {
        return Err(AppError::Authorization(
            "This project was not requested from you".to_string(),
        ));
    }
    Ok(())
}

#[instrument(skip(store, session, request), fields(user_id = %session.user_id))]
pub async fn create(
    store: &dyn Store,
    session: &Session,
    request: CreateProjectRequest,
) -> AppResult<Project> {
    session.require_role(UserRole::User)?;
    request.validate()?;

    let project = store
        .create_project(NewProject {
            user_id: session.user_id,
            freelancer_id: request.freelancer_id,
            description: request.description.trim().to_string(),
        })
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound => {
                AppError::NotFound(format!("Freelancer {} not found", request.freelancer_id))
            }
            other => other.into(),
        })?;
    info!(project_id = %project.id, "Project requested");
    Ok(project)
}

/// The requester's projects with the freelancer expanded.
pub async fn list_for_user(
    store: &dyn Store,
    session: &Session,
) -> AppResult<Vec<ProjectWithFreelancer>> {
    let projects = store.list_projects_for_user(session.user_id).await?;
    let mut listed = Vec::with_capacity(projects.len());
    for project in projects {
        let freelancer = store.get_freelancer(project.freelancer_id).await?;
        listed.push(ProjectWithFreelancer { project, freelancer });
    }
    Ok(listed)
}

/// Accept an open project at the quoted amount. A bad amount leaves the
/// project untouched.
#[instrument(skip(store, session, request))]
pub async fn accept(
    store: &dyn Store,
    session: &Session,
    project_id: Uuid,
    request: AcceptRequest,
) -> AppResult<Project> {
    let project = load(store, project_id).await?;
    ensure_targeted(session, &project)?;
    let amount = parse_amount(&request.amount_text())?;
    let next = project.state.accept()?;

    let project = store
        .transition_project(project_id, project.state, next, Some(amount))
        .await
        .map_err(state_conflict)?;
    info!(project_id = %project_id, amount, "Project accepted");
    Ok(project)
}

#[instrument(skip(store, session))]
pub async fn complete(
    store: &dyn Store,
    session: &Session,
    project_id: Uuid,
) -> AppResult<Project> {
    let project = load(store, project_id).await?;
    ensure_targeted(session, &project)?;
    let next = project.state.complete()?;

    let project = store
        .transition_project(project_id, project.state, next, None)
        .await
        .map_err(state_conflict)?;
    info!(project_id = %project_id, "Project completed");
    Ok(project)
}

async fn owned(store: &dyn Store, session: &Session, project_id: Uuid) -> AppResult<Project> {
    let project = load(store, project_id).await?;
    if project.user_id != session.user_id {
        return Err(AppError::Authorization("This is not your project".to_string()));
    }
    Ok(project)
}

/// Checkout descriptor for the advance of an accepted project.
#[instrument(skip(store, payment, session))]
pub async fn checkout(
    store: &dyn Store,
    payment: &PaymentConfig,
    session: &Session,
    project_id: Uuid,
) -> AppResult<CheckoutOrder> {
    let project = owned(store, session, project_id).await?;
    project.state.ensure_payable()?;

    let freelancer = store
        .get_freelancer(project.freelancer_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Freelancer {} not found", project.freelancer_id))
        })?;
    if freelancer.advance <= 0 {
        return Err(AppError::Validation("Freelancer has not set an advance.".to_string()));
    }
    Ok(advance_checkout(payment, project.id, freelancer.advance))
}

/// Record the gateway's payment id. The project state is not changed.
#[instrument(skip(store, session, confirmation))]
pub async fn record_payment(
    store: &dyn Store,
    session: &Session,
    project_id: Uuid,
    confirmation: PaymentConfirmation,
) -> AppResult<Project> {
    confirmation.validate()?;
    let project = owned(store, session, project_id).await?;
    project.state.ensure_payable()?;

    let project = store
        .record_advance_payment(project_id, confirmation.payment_id.trim())
        .await?;
    info!(project_id = %project_id, "Advance payment recorded");
    Ok(project)
}
