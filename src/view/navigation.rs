//! Navigation URLs carrying the current prefix as a query parameter.

use crate::listing::Prefix;

/// Query parameter holding the browsed prefix.
pub const PREFIX_PARAM: &str = "prefix";

/// Link to the listing of `prefix`. Segments are percent-encoded one by one so
/// the separators stay readable; the root links to `/`.
pub fn navigation_url(prefix: &Prefix) -> String {
    if prefix.is_root() {
        return "/".to_string();
    }

    let encoded: Vec<String> = prefix
        .segments()
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("/?{}={}/", PREFIX_PARAM, encoded.join("/"))
}

/// Extract and normalise the prefix from a raw query string such as
/// `prefix=docs/&sort=name`. A missing parameter means the root.
pub fn prefix_from_query(query: &str) -> Prefix {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(name, _)| *name == PREFIX_PARAM)
        .map(|(_, value)| Prefix::parse(&value.replace('+', " ")))
        .unwrap_or_default()
}
