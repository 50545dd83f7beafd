//! URL manipulation helpers.

use chrono::Utc;
use url::Url;

use super::FetchError;

fn parse(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Return the URL with the given query parameters set, replacing any
/// existing parameters with the same names.
pub fn add_url_params(url: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
    let mut parsed = parse(url)?;

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .filter(|(k, _)| !params.iter().any(|(name, _)| name == k))
        .collect();
    pairs.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        let mut serializer = parsed.query_pairs_mut();
        serializer.clear();
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        drop(serializer);
    }

    Ok(parsed.into())
}

/// Append a `__ts` cache-buster so the tracker's page cache is bypassed.
pub fn add_timestamp(url: &str) -> Result<String, FetchError> {
    add_url_params(url, &[("__ts", Utc::now().timestamp().to_string())])
}

/// Host component of a URL, lowercased.
pub fn host_of(url: &str) -> Result<String, FetchError> {
    let parsed = parse(url)?;
    parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "no host".to_string(),
        })
}
