//! The four section generators and the seam they share.
//!
//! Generators run sequentially in a fixed order (profile, repositories,
//! skills, projects) because skills and projects consume the repository
//! list the repositories generator leaves in the context.

pub mod profile;
pub mod projects;
pub mod repositories;
pub mod skills;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::github::{GithubClient, GithubError};
use crate::models::portfolio::{RepositorySnapshot, SectionData, SectionName};
use crate::render::PreviewRenderer;

#[derive(Debug, Error)]
pub enum SectionError {
    #[error(transparent)]
    Github(#[from] GithubError),

    #[error("repository list unavailable")]
    MissingRepositories,
}

impl SectionError {
    /// Fatal errors abort the whole job; everything else fails only the
    /// section that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SectionError::Github(e) if e.is_auth())
    }
}

/// Everything a generator may touch during one job run. The delegated
/// credential lives inside the `GithubClient` and nowhere else.
pub struct GenerationContext {
    pub owner: String,
    pub github: GithubClient,
    pub renderer: Arc<PreviewRenderer>,
    pub include_private: bool,
    /// Filled by the repositories generator; later sections read it
    /// instead of re-querying the API.
    pub repositories: Option<Vec<RepositorySnapshot>>,
}

impl GenerationContext {
    pub fn new(
        owner: impl Into<String>,
        github: GithubClient,
        renderer: Arc<PreviewRenderer>,
        include_private: bool,
    ) -> Self {
        Self {
            owner: owner.into(),
            github,
            renderer,
            include_private,
            repositories: None,
        }
    }
}

/// One independently-generated part of a portfolio.
#[async_trait]
pub trait SectionGenerator: Send + Sync {
    fn name(&self) -> SectionName;

    async fn generate(&self, ctx: &mut GenerationContext) -> Result<SectionData, SectionError>;
}

/// The production generator set, in execution order.
pub fn default_generators(
    language_concurrency: usize,
    project_cap: usize,
    render_concurrency: usize,
) -> Vec<Box<dyn SectionGenerator>> {
    vec![
        Box::new(profile::ProfileGenerator),
        Box::new(repositories::RepositoriesGenerator::new(
            language_concurrency,
        )),
        Box::new(skills::SkillsGenerator),
        Box::new(projects::ProjectsGenerator::new(
            project_cap,
            render_concurrency,
        )),
    ]
}
