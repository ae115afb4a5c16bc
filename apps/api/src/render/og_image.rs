//! Tier-2 preview extraction: pull a social preview image reference out of
//! a page's HTML. Precedence is `og:image`, then `twitter:image`, then the
//! first inline `<img>` as a last resort.

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::RenderError;

/// Fetches `url` and returns an absolute image URL for its social preview.
pub async fn extract_preview_image(client: &Client, url: &str) -> Result<String, RenderError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RenderError::Backend(format!(
            "preview page returned {status}"
        )));
    }

    let body = response.text().await?;
    // Html is parsed and dropped inside the helper; it is not Send and must
    // not be held across an await point.
    let reference = find_image_reference(&body).ok_or(RenderError::NoImageTag)?;
    resolve_reference(url, &reference)
}

/// Scans parsed HTML for a preview image reference, in precedence order.
fn find_image_reference(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let og = Selector::parse(r#"meta[property="og:image"]"#).unwrap();
    let twitter = Selector::parse(r#"meta[name="twitter:image"]"#).unwrap();
    let img = Selector::parse("img").unwrap();

    if let Some(content) = document
        .select(&og)
        .filter_map(|el| el.value().attr("content"))
        .find(|c| !c.trim().is_empty())
    {
        return Some(content.trim().to_string());
    }

    if let Some(content) = document
        .select(&twitter)
        .filter_map(|el| el.value().attr("content"))
        .find(|c| !c.trim().is_empty())
    {
        return Some(content.trim().to_string());
    }

    document
        .select(&img)
        .filter_map(|el| el.value().attr("src"))
        .find(|src| !src.trim().is_empty())
        .map(|src| src.trim().to_string())
}

/// Resolves a possibly-relative image reference against the page URL.
fn resolve_reference(base: &str, reference: &str) -> Result<String, RenderError> {
    let base = Url::parse(base)?;
    Ok(base.join(reference)?.to_string())
}
