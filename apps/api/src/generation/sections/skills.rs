//! Skills section: derived entirely from the repository list already in
//! the context. No API calls of its own.

use async_trait::async_trait;
use tracing::info;

use super::{GenerationContext, SectionError, SectionGenerator};
use crate::models::portfolio::{RepositorySnapshot, SectionData, SectionName, SkillSet};

pub struct SkillsGenerator;

#[async_trait]
impl SectionGenerator for SkillsGenerator {
    fn name(&self) -> SectionName {
        SectionName::Skills
    }

    async fn generate(&self, ctx: &mut GenerationContext) -> Result<SectionData, SectionError> {
        let snapshots = ctx
            .repositories
            .as_deref()
            .ok_or(SectionError::MissingRepositories)?;
        let skills = tally_skills(snapshots);
        info!("Derived {} skills for {}", skills.0.len(), ctx.owner);
        Ok(SectionData::Skills(skills))
    }
}

/// Tallies each repository's primary language (its first entry, which the
/// API orders by byte count), then ranks by repository count. The sort is
/// stable, so ties keep first-seen order.
fn tally_skills(snapshots: &[RepositorySnapshot]) -> SkillSet {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for snapshot in snapshots {
        let Some(primary) = snapshot.languages.first() else {
            continue;
        };
        match counts.iter_mut().find(|(lang, _)| lang == primary) {
            Some((_, n)) => *n += 1,
            None => counts.push((primary.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    SkillSet(counts.into_iter().map(|(lang, _)| lang).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, languages: &[&str]) -> RepositorySnapshot {
        RepositorySnapshot {
            name: name.to_string(),
            description: None,
            canonical_url: format!("https://github.com/ada/{name}"),
            homepage_url: None,
            languages: languages.iter().map(|l| l.to_string()).collect(),
            star_count: 0,
            fork_count: 0,
            is_private: false,
        }
    }

    #[test]
    fn test_skills_ranked_by_repository_count() {
        let snapshots = vec![
            snapshot("one", &["Rust", "HTML"]),
            snapshot("two", &["Rust"]),
            snapshot("three", &["TypeScript", "CSS"]),
        ];
        assert_eq!(
            tally_skills(&snapshots).0,
            vec!["Rust".to_string(), "TypeScript".to_string()]
        );
    }

    #[test]
    fn test_only_primary_language_counts() {
        // HTML appears in both repos but never as the primary language
        let snapshots = vec![
            snapshot("one", &["Rust", "HTML"]),
            snapshot("two", &["TypeScript", "HTML"]),
        ];
        let skills = tally_skills(&snapshots).0;
        assert!(!skills.contains(&"HTML".to_string()));
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let snapshots = vec![
            snapshot("one", &["Go"]),
            snapshot("two", &["Zig"]),
            snapshot("three", &["Go"]),
            snapshot("four", &["Zig"]),
        ];
        assert_eq!(
            tally_skills(&snapshots).0,
            vec!["Go".to_string(), "Zig".to_string()]
        );
    }

    #[test]
    fn test_repositories_without_languages_are_skipped() {
        let snapshots = vec![snapshot("one", &[]), snapshot("two", &["Rust"])];
        assert_eq!(tally_skills(&snapshots).0, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_empty_repository_list_yields_empty_skills() {
        assert!(tally_skills(&[]).0.is_empty());
    }
}
