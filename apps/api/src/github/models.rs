//! Wire DTOs for the GitHub REST v3 endpoints the client touches.
//!
//! Field names mirror the provider's JSON exactly; mapping into portfolio
//! types happens in the section generators, not here.

use serde::Deserialize;

/// `GET /users/{owner}` response, trimmed to the fields the profile
/// section consumes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GhUser {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: String,
    pub location: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub twitter_username: Option<String>,
}

/// One item of `GET /users/{owner}/repos`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GhRepo {
    pub name: String,
    pub description: Option<String>,
    pub fork: bool,
    pub private: bool,
    pub html_url: String,
    pub homepage: Option<String>,
    /// Primary language as reported on the list item. Fallback only; the
    /// per-repository languages endpoint is authoritative.
    pub language: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
    #[serde(default)]
    pub has_pages: bool,
    #[serde(default)]
    pub topics: Vec<String>,
}
