use crate::url::UrlError;
use url::Url;

/// Query parameters that never change which category a page shows
const TRACKING_PARAMS: &[&str] = &["utm_source", "utm_medium", "utm_campaign", "fbclid", "gclid"];

/// Resolves a category href against the site base and normalizes it
///
/// # Normalization Steps
///
/// 1. Resolve relative hrefs (`/catalog/shoes`) against `base`
/// 2. Reject non-HTTP(S) schemes (`javascript:`, `mailto:`)
/// 3. Lowercase the host
/// 4. Collapse duplicate slashes, remove dot segments and trailing slash
/// 5. Remove fragment
/// 6. Remove tracking query parameters and sort the rest
///
/// # Examples
///
/// ```
/// use catalog_ripple::url::normalize_category_url;
/// use url::Url;
///
/// let base = Url::parse("https://shop.example/").unwrap();
/// let url = normalize_category_url(&base, "/catalog/shoes/#top").unwrap();
/// assert_eq!(url.as_str(), "https://shop.example/catalog/shoes");
/// ```
pub fn normalize_category_url(base: &Url, href: &str) -> Result<Url, UrlError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut url = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        url.set_host(Some(&lowered))
            .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Returns the comparison key used to detect a category that repeats an ancestor
///
/// Hrefs that cannot be resolved fall back to their trimmed text so that two
/// identical malformed hrefs still compare equal.
pub fn category_key(base: &Url, href: &str) -> String {
    match normalize_category_url(base, href) {
        Ok(url) => url.to_string(),
        Err(_) => href.trim().to_string(),
    }
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()) && !key.starts_with("utm_"))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}
