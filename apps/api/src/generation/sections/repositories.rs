//! Repositories section: full pagination, fork/visibility filtering, a
//! bounded per-repository language fan-out, and website resolution. The
//! result is written as one atomic list replace so a poller never sees a
//! half-built section.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::{GenerationContext, SectionError, SectionGenerator};
use crate::generation::website;
use crate::github::models::GhRepo;
use crate::github::{GithubError, PER_PAGE};
use crate::models::portfolio::{RepositorySnapshot, SectionData, SectionName};

pub struct RepositoriesGenerator {
    language_concurrency: usize,
}

impl RepositoriesGenerator {
    pub fn new(language_concurrency: usize) -> Self {
        Self {
            language_concurrency: language_concurrency.max(1),
        }
    }

    /// Pages from 1 until a page comes back shorter than `PER_PAGE`. The
    /// short page is the termination signal; no total-count header is
    /// trusted.
    async fn fetch_all_pages(&self, ctx: &GenerationContext) -> Result<Vec<GhRepo>, GithubError> {
        let mut repos = Vec::new();
        let mut page = 1;
        loop {
            let batch = ctx
                .github
                .list_repositories(&ctx.owner, page, PER_PAGE)
                .await?;
            let batch_len = batch.len() as u32;
            repos.extend(batch);
            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(repos)
    }
}

#[async_trait]
impl SectionGenerator for RepositoriesGenerator {
    fn name(&self) -> SectionName {
        SectionName::Repositories
    }

    async fn generate(&self, ctx: &mut GenerationContext) -> Result<SectionData, SectionError> {
        let all = self.fetch_all_pages(ctx).await?;
        let total = all.len();
        let include_private = ctx.include_private;
        let retained: Vec<GhRepo> = all
            .into_iter()
            .filter(|r| !r.fork && (include_private || !r.private))
            .collect();
        info!(
            "Retained {} of {total} repositories for {}",
            retained.len(),
            ctx.owner
        );

        let owner = ctx.owner.clone();
        let github = ctx.github.clone();
        let results: Vec<Result<RepositorySnapshot, GithubError>> = stream::iter(retained)
            .map(|repo| {
                let github = github.clone();
                let owner = owner.clone();
                async move {
                    let languages = match github.list_languages(&owner, &repo.name).await {
                        Ok(langs) => langs,
                        // Only a credential failure crosses the section
                        // boundary; anything else degrades to the list
                        // item's own language field.
                        Err(e) if e.is_auth() => return Err(e),
                        Err(e) => {
                            warn!("Language lookup failed for {owner}/{}: {e}", repo.name);
                            repo.language.clone().into_iter().collect()
                        }
                    };
                    Ok(build_snapshot(&owner, repo, languages))
                }
            })
            .buffered(self.language_concurrency)
            .collect()
            .await;

        let mut snapshots: Vec<RepositorySnapshot> = Vec::with_capacity(results.len());
        for result in results {
            upsert(&mut snapshots, result?);
        }

        ctx.repositories = Some(snapshots.clone());
        Ok(SectionData::Repositories(snapshots))
    }
}

fn build_snapshot(owner: &str, repo: GhRepo, languages: Vec<String>) -> RepositorySnapshot {
    let homepage_url = website::resolve_website(owner, &repo);
    RepositorySnapshot {
        name: repo.name,
        description: repo.description,
        canonical_url: repo.html_url,
        homepage_url,
        languages,
        star_count: repo.stargazers_count,
        fork_count: repo.forks_count,
        is_private: repo.private,
    }
}

/// Insert-or-replace keyed by repository name. Identity is (owner, name);
/// the owner is fixed within one run.
fn upsert(snapshots: &mut Vec<RepositorySnapshot>, snapshot: RepositorySnapshot) {
    match snapshots.iter_mut().find(|s| s.name == snapshot.name) {
        Some(existing) => *existing = snapshot,
        None => snapshots.push(snapshot),
    }
}
