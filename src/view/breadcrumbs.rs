//! Breadcrumb trail derived from the prefix string alone.

use crate::listing::Prefix;
use serde::Serialize;

/// One segment of the trail. The current segment has no navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub label: String,
    pub target: Prefix,
    pub is_current: bool,
}

impl Breadcrumb {
    /// Link for this segment, `None` for the current one.
    pub fn navigation_url(&self) -> Option<String> {
        (!self.is_current).then(|| super::navigation_url(&self.target))
    }
}

/// One breadcrumb per path component of `prefix`, the last marked current.
/// The bucket root is implicit: an empty prefix yields no segments.
pub fn derive_breadcrumbs(prefix: &Prefix) -> Vec<Breadcrumb> {
    let segments: Vec<&str> = prefix.segments().collect();
    let last = segments.len().saturating_sub(1);

    let mut target = String::new();
    segments
        .iter()
        .enumerate()
        .map(|(idx, segment)| {
            target.push_str(segment);
            target.push('/');
            Breadcrumb {
                label: format!("{}/", segment),
                target: Prefix::from_key(&target),
                is_current: idx == last,
            }
        })
        .collect()
}

/// Heading for a listing: the last folder name, or the bucket at the root.
pub fn listing_title(prefix: &Prefix, bucket: &str) -> String {
    prefix.leaf().unwrap_or_else(|| bucket.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_prefix_yields_trail_with_current_last() {
        let crumbs = derive_breadcrumbs(&Prefix::parse("a/b/c/"));
        let labels: Vec<_> = crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["a/", "b/", "c/"]);

        assert!(!crumbs[0].is_current);
        assert!(!crumbs[1].is_current);
        assert!(crumbs[2].is_current);

        assert_eq!(crumbs[0].target.as_str(), "a/");
        assert_eq!(crumbs[1].target.as_str(), "a/b/");
        assert_eq!(crumbs[1].navigation_url().as_deref(), Some("/?prefix=a/b/"));
        assert_eq!(crumbs[2].navigation_url(), None);
    }

    #[test]
    fn targets_are_not_decoded_again() {
        let prefix = crate::view::prefix_from_query("prefix=a%2541/b/");
        assert_eq!(prefix.as_str(), "a%41/b/");

        let crumbs = derive_breadcrumbs(&prefix);
        assert_eq!(crumbs[0].target.as_str(), "a%41/");
        assert_eq!(crumbs[1].target, prefix);
        assert_eq!(crumbs[0].navigation_url().as_deref(), Some("/?prefix=a%2541/"));
    }

    #[test]
    fn root_has_no_segments() {
        assert!(derive_breadcrumbs(&Prefix::root()).is_empty());
    }

    #[test]
    fn single_segment_is_current() {
        let crumbs = derive_breadcrumbs(&Prefix::parse("photos/"));
        assert_eq!(crumbs.len(), 1);
        assert!(crumbs[0].is_current);
    }

    #[test]
    fn title_uses_last_segment_or_bucket() {
        assert_eq!(listing_title(&Prefix::parse("a/b/"), "bucket"), "b/");
        assert_eq!(listing_title(&Prefix::root(), "bucket"), "bucket");
    }
}
