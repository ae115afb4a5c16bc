//! Resolves the "website" URL for a repository. Fixed precedence: explicit
//! homepage field, then a pages deployment, then a naming-convention guess.
//! The last tier is best-effort only; a wrong guess degrades to a preview
//! of a dead page, which the render tiers already absorb.

use crate::github::models::GhRepo;

/// Topics owners use to mark a repository that backs a deployed site.
const PAGES_TOPICS: [&str; 3] = ["github-pages", "website", "portfolio"];

pub fn resolve_website(owner: &str, repo: &GhRepo) -> Option<String> {
    if let Some(homepage) = repo.homepage.as_deref().and_then(normalize_homepage) {
        return Some(homepage);
    }

    if repo.has_pages {
        return Some(pages_url(owner, &repo.name));
    }

    convention_guess(owner, repo)
}

/// Weakest tier: a naming-convention or topic guess. A `*.github.io` repo
/// name encodes its own site URL; the pages topics suggest a project site
/// under the owner's pages domain.
fn convention_guess(owner: &str, repo: &GhRepo) -> Option<String> {
    let name = repo.name.to_lowercase();
    if name.ends_with(".github.io") {
        return Some(format!("https://{name}"));
    }
    if repo
        .topics
        .iter()
        .any(|t| PAGES_TOPICS.contains(&t.as_str()))
    {
        return Some(pages_url(owner, &repo.name));
    }

    None
}

/// Canonical pages URL: the user site lives at the apex, project sites
/// under a path.
fn pages_url(owner: &str, name: &str) -> String {
    if name.eq_ignore_ascii_case(&format!("{owner}.github.io")) {
        format!("https://{}", name.to_lowercase())
    } else {
        format!("https://{}.github.io/{name}/", owner.to_lowercase())
    }
}

/// Homepage fields come back as free text; empty strings mean "unset" and
/// bare domains get a scheme.
fn normalize_homepage(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}
