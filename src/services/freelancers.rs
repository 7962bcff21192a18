use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::{Freelancer, FreelancerProfile, NewSkill, Project, Store, UpdateFreelancerProfile};
use crate::domain::{ProjectState, Skills};
use crate::error::{AppError, AppResult};

pub async fn list(store: &dyn Store) -> AppResult<Vec<Freelancer>> {
    Ok(store.list_freelancers().await?)
}

pub async fn get(store: &dyn Store, freelancer_id: Uuid) -> AppResult<Freelancer> {
    store
        .get_freelancer(freelancer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Freelancer {freelancer_id} not found")))
}

/// Merge a partial update into the stored profile.
#[instrument(skip(store, update))]
pub async fn update_own(
    store: &dyn Store,
    freelancer_id: Uuid,
    update: UpdateFreelancerProfile,
) -> AppResult<Freelancer> {
    update.validate()?;
    let current = get(store, freelancer_id).await?;

    let mut profile = FreelancerProfile::from(&current);
    if let Some(experience) = update.experience {
        profile.experience = experience;
    }
    if let Some(projects_completed) = update.projects_completed {
        profile.projects_completed = projects_completed;
    }
    if let Some(skills) = &update.skills {
        profile.skills = Skills::from_value(skills)?;
    }
    if let Some(contact) = update.contact {
        profile.contact = Some(contact).filter(|c| !c.trim().is_empty());
    }
    if let Some(advance) = update.advance {
        profile.advance = advance;
    }

    let freelancer = store.update_freelancer(freelancer_id, &profile).await?;
    info!(freelancer_id = %freelancer_id, "Freelancer profile updated");
    Ok(freelancer)
}

pub async fn add_skill(
    store: &dyn Store,
    freelancer_id: Uuid,
    skill: NewSkill,
) -> AppResult<Freelancer> {
    skill.validate()?;
    let current = get(store, freelancer_id).await?;
    let mut profile = FreelancerProfile::from(&current);
    profile.skills.insert(skill.key.trim(), skill.value.trim());
    Ok(store.update_freelancer(freelancer_id, &profile).await?)
}

/// Projects still waiting for the freelancer's answer.
pub async fn open_requests(store: &dyn Store, freelancer_id: Uuid) -> AppResult<Vec<Project>> {
    Ok(store
        .list_projects_for_freelancer(freelancer_id, Some(ProjectState::Open))
        .await?)
}
