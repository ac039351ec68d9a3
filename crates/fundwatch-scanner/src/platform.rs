//! Campaign URL cleanup and platform detection.

use fundwatch_core::Platform;
use url::Url;

/// Query parameters that only carry tracking or sharing state.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "_ga",
    "ref",
    "source",
    "campaign",
    "medium",
    "ref_src",
    "ref_url",
    "ref_map",
    "ref_type",
    "ref_id",
    "ref_content",
    "_hsenc",
    "_hsmi",
    "mc_cid",
    "mc_eid",
    "ml_subscriber",
    "ml_subscriber_hash",
    "s",
    "t",
    "twclid",
    "share",
    "action",
    "feature",
    "tracking",
    "tracked",
    "debug",
    "dm_i",
    "eh",
    "sa",
    "ved",
    "ei",
    "url",
    "src",
    "source_id",
    "sourceid",
    "_ke",
    "hsctatracking",
    "hash",
    "_branch_match_id",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Normalise a campaign link: trim it, drop tracking parameters and trailing slashes.
///
/// Returns `None` for empty or unparseable links. Links without a scheme
/// are read as `https`.
#[must_use]
pub fn clean_campaign_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut url = if trimmed.contains("://") {
        Url::parse(trimmed).ok()?
    } else {
        Url::parse(&format!("https://{trimmed}")).ok()?
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);

    let mut cleaned = url.to_string();
    if url.query().is_none() && url.fragment().is_none() {
        while cleaned.ends_with('/') {
            cleaned.pop();
        }
    }
    Some(cleaned)
}

/// Work out which platform serves `url`, by host.
#[must_use]
pub fn detect_platform(url: &str) -> Option<Platform> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let on = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

    if on("gofundme.com") {
        Some(Platform::GoFundMe)
    } else if on("chuffed.org") {
        Some(Platform::Chuffed)
    } else {
        None
    }
}
