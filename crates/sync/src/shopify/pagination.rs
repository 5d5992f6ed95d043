//! `Link` header pagination.
//!
//! Shopify's REST listings paginate with a header of the form
//! `<https://{shop}.myshopify.com/admin/api/..?page_info=..>; rel="next"`,
//! optionally preceded by a `rel="previous"` entry.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::ShopifyError;

static NEXT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]*)>\s*;\s*rel="?next"?"#).expect("Invalid regex"));

/// Extract the `rel="next"` target of a `Link` header as a store-relative
/// path with its query string.
///
/// Returns `Ok(None)` when the header has no `rel="next"` entry, which ends
/// pagination. The host is dropped so the next page is always requested from
/// the same store the listing came from.
///
/// # Errors
///
/// Returns `ShopifyError::InvalidUrl` if the `rel="next"` target is not an
/// absolute URL.
pub fn next_page_path(link_header: &str) -> Result<Option<String>, ShopifyError> {
    let Some(target) = NEXT_LINK_RE
        .captures(link_header)
        .and_then(|caps| caps.get(1))
    else {
        return Ok(None);
    };

    let url = Url::parse(target.as_str().trim())?;
    let path = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    };
    Ok(Some(path))
}
