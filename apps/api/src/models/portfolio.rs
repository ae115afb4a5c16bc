//! Portfolio document model — the Job record, its four typed sections, and
//! the payloads each section carries.
//!
//! This is the wire format for both status polling and durable storage:
//! serialized field names are camelCase and status strings are the exact
//! values pollers match on, so renames here are breaking changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Statuses
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle of one portfolio generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Initializing,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Initializing => "initializing",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initializing" => Some(JobStatus::Initializing),
            "in_progress" => Some(JobStatus::InProgress),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Initializing => 0,
            JobStatus::InProgress => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether moving to `next` respects the ordering guarantee: a status
    /// never regresses and a terminal status is never overwritten.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single section within a Job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl SectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionStatus::Pending => "pending",
            SectionStatus::InProgress => "in_progress",
            SectionStatus::Completed => "completed",
            SectionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four portfolio sections, in generation order. `skills` and `projects`
/// consume the repository list produced by `repositories`, so the order is
/// load-bearing, not cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Profile,
    Repositories,
    Skills,
    Projects,
}

impl SectionName {
    pub const ALL: [SectionName; 4] = [
        SectionName::Profile,
        SectionName::Repositories,
        SectionName::Skills,
        SectionName::Projects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Profile => "profile",
            SectionName::Repositories => "repositories",
            SectionName::Skills => "skills",
            SectionName::Projects => "projects",
        }
    }
}

impl std::fmt::Display for SectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section payloads
// ────────────────────────────────────────────────────────────────────────────

/// Owner profile mapped from the external account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_username: Option<String>,
}

/// One repository as captured at generation time.
///
/// Upsert identity is `(ownerId, name)` — renames create new snapshots and
/// deletions leave stale ones behind until the next full recompute.
/// `languages` keeps the external API's own ordering (byte count descending),
/// so the first entry is the primary language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    pub name: String,
    pub description: Option<String>,
    pub canonical_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
    pub languages: Vec<String>,
    pub star_count: u32,
    pub fork_count: u32,
    pub is_private: bool,
}

/// Language names ranked by frequency across the owner's repositories.
/// Ties keep first-seen order; the list is never re-sorted alphabetically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(pub Vec<String>);

/// How a project's preview image was obtained. Retained so consumers can
/// distinguish a live screenshot from a degraded fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderTier {
    Rendered,
    OgImage,
    Placeholder,
}

impl RenderTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderTier::Rendered => "rendered",
            RenderTier::OgImage => "og-image",
            RenderTier::Placeholder => "placeholder",
        }
    }
}

/// One showcased project with its preview image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPreview {
    pub name: String,
    pub description: Option<String>,
    pub source_url: String,
    pub preview_image: String,
    pub render_tier: RenderTier,
}

// ────────────────────────────────────────────────────────────────────────────
// Sections — one typed field per section name
// ────────────────────────────────────────────────────────────────────────────

/// Status + payload for one section. `data` is only populated once the
/// section reaches `completed`; a failed section carries no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionState<T> {
    pub status: SectionStatus,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> SectionState<T> {
    pub fn pending() -> Self {
        SectionState {
            status: SectionStatus::Pending,
            data: None,
        }
    }
}

/// The four sections, each with its own payload type. Consumers read the
/// field they care about without any runtime shape-checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    pub profile: SectionState<ProfileData>,
    pub repositories: SectionState<Vec<RepositorySnapshot>>,
    pub skills: SectionState<SkillSet>,
    pub projects: SectionState<Vec<ProjectPreview>>,
}

impl Default for Sections {
    fn default() -> Self {
        Sections {
            profile: SectionState::pending(),
            repositories: SectionState::pending(),
            skills: SectionState::pending(),
            projects: SectionState::pending(),
        }
    }
}

impl Sections {
    pub fn status_of(&self, name: SectionName) -> SectionStatus {
        match name {
            SectionName::Profile => self.profile.status,
            SectionName::Repositories => self.repositories.status,
            SectionName::Skills => self.skills.status,
            SectionName::Projects => self.projects.status,
        }
    }

    /// Routes a section update to its typed field, replacing status and data
    /// atomically from the reader's point of view (&mut exclusivity).
    pub fn apply(&mut self, update: SectionUpdate) {
        let SectionUpdate { name, status, data } = update;
        match (name, data) {
            (SectionName::Profile, Some(SectionData::Profile(d))) => {
                self.profile = SectionState {
                    status,
                    data: Some(d),
                };
            }
            (SectionName::Profile, _) => {
                self.profile = SectionState { status, data: None };
            }
            (SectionName::Repositories, Some(SectionData::Repositories(d))) => {
                self.repositories = SectionState {
                    status,
                    data: Some(d),
                };
            }
            (SectionName::Repositories, _) => {
                self.repositories = SectionState { status, data: None };
            }
            (SectionName::Skills, Some(SectionData::Skills(d))) => {
                self.skills = SectionState {
                    status,
                    data: Some(d),
                };
            }
            (SectionName::Skills, _) => {
                self.skills = SectionState { status, data: None };
            }
            (SectionName::Projects, Some(SectionData::Projects(d))) => {
                self.projects = SectionState {
                    status,
                    data: Some(d),
                };
            }
            (SectionName::Projects, _) => {
                self.projects = SectionState { status, data: None };
            }
        }
    }

    pub fn completed_count(&self) -> usize {
        SectionName::ALL
            .iter()
            .filter(|n| self.status_of(**n) == SectionStatus::Completed)
            .count()
    }

    /// `completedSections / totalSections * 100`, recomputed on every call.
    pub fn progress_percent(&self) -> u8 {
        (self.completed_count() * 100 / SectionName::ALL.len()) as u8
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section updates flowing from generators into the store
// ────────────────────────────────────────────────────────────────────────────

/// Payload produced by a section generator, tagged by section name.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionData {
    Profile(ProfileData),
    Repositories(Vec<RepositorySnapshot>),
    Skills(SkillSet),
    Projects(Vec<ProjectPreview>),
}

impl SectionData {
    pub fn section(&self) -> SectionName {
        match self {
            SectionData::Profile(_) => SectionName::Profile,
            SectionData::Repositories(_) => SectionName::Repositories,
            SectionData::Skills(_) => SectionName::Skills,
            SectionData::Projects(_) => SectionName::Projects,
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            SectionData::Profile(d) => serde_json::to_value(d),
            SectionData::Repositories(d) => serde_json::to_value(d),
            SectionData::Skills(d) => serde_json::to_value(d),
            SectionData::Projects(d) => serde_json::to_value(d),
        }
    }
}

/// One write against a single section of a Job. Constructors keep the
/// name/payload pairing correct by deriving the name from the payload.
#[derive(Debug, Clone)]
pub struct SectionUpdate {
    pub name: SectionName,
    pub status: SectionStatus,
    pub data: Option<SectionData>,
}

impl SectionUpdate {
    pub fn in_progress(name: SectionName) -> Self {
        SectionUpdate {
            name,
            status: SectionStatus::InProgress,
            data: None,
        }
    }

    pub fn completed(data: SectionData) -> Self {
        SectionUpdate {
            name: data.section(),
            status: SectionStatus::Completed,
            data: Some(data),
        }
    }

    pub fn failed(name: SectionName) -> Self {
        SectionUpdate {
            name,
            status: SectionStatus::Failed,
            data: None,
        }
    }

    /// The `{status, data?}` JSON object stored under the section's key.
    pub fn to_state_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "status".to_string(),
            serde_json::Value::String(self.status.as_str().to_string()),
        );
        if let Some(data) = &self.data {
            obj.insert("data".to_string(), data.to_json()?);
        }
        Ok(serde_json::Value::Object(obj))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job
// ────────────────────────────────────────────────────────────────────────────

/// One end-to-end portfolio generation run for one owner.
///
/// The identifier is opaque and minted once at Start; the delegated
/// credential used for the run is carried in memory only and never lands in
/// this document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "jobId")]
    pub id: Uuid,
    pub owner_id: String,
    pub status: JobStatus,
    pub sections: Sections,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            status: JobStatus::Initializing,
            sections: Sections::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
