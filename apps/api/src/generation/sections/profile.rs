//! Profile section: one profile fetch, straight field mapping.

use async_trait::async_trait;
use tracing::info;

use super::{GenerationContext, SectionError, SectionGenerator};
use crate::github::models::GhUser;
use crate::models::portfolio::{ProfileData, SectionData, SectionName};

pub struct ProfileGenerator;

#[async_trait]
impl SectionGenerator for ProfileGenerator {
    fn name(&self) -> SectionName {
        SectionName::Profile
    }

    async fn generate(&self, ctx: &mut GenerationContext) -> Result<SectionData, SectionError> {
        let user = ctx.github.get_profile(&ctx.owner).await?;
        info!("Fetched profile for {}", ctx.owner);
        Ok(SectionData::Profile(map_profile(user)))
    }
}

/// Display name falls back to the handle; empty strings from the API mean
/// "unset" and become None.
fn map_profile(user: GhUser) -> ProfileData {
    ProfileData {
        name: user
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.login.clone()),
        bio: user.bio.filter(|b| !b.trim().is_empty()),
        avatar_url: user.avatar_url,
        location: user.location.filter(|l| !l.trim().is_empty()),
        company: user.company.filter(|c| !c.trim().is_empty()),
        blog: user.blog.filter(|b| !b.trim().is_empty()),
        twitter_username: user.twitter_username.filter(|t| !t.trim().is_empty()),
    }
}
