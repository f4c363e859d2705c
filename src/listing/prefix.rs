//! Normalised key prefixes
//!
//! A prefix is the folder path being browsed: empty for the bucket root,
//! otherwise a `/`-terminated key prefix with no leading `/` and no empty
//! segments.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prefix(String);

impl Prefix {
    pub fn root() -> Self {
        Prefix(String::new())
    }

    /// Normalise a raw navigation value.
    ///
    /// Percent-escapes are decoded once (an invalid escape sequence leaves the
    /// value as given), then the result is normalised like [`Prefix::from_key`].
    pub fn parse(raw: &str) -> Self {
        let decoded = urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        Prefix::from_key(&decoded)
    }

    /// Prefix for a key as stored in the bucket. No decoding: a literal `%`
    /// stays part of the name. A leading `/` is dropped, runs of `/` collapse
    /// to one, and a trailing `/` is added to non-empty prefixes.
    pub fn from_key(key: &str) -> Self {
        let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Prefix::root();
        }

        let mut normalized = segments.join("/");
        normalized.push('/');
        Prefix(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path components, without separators.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The enclosing prefix; the root is its own parent.
    pub fn parent(&self) -> Prefix {
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) => Prefix(trimmed[..=idx].to_string()),
            None => Prefix::root(),
        }
    }

    /// Last path component with its trailing `/`, `None` at the root.
    pub fn leaf(&self) -> Option<String> {
        self.segments().last().map(|s| format!("{}/", s))
    }

    /// Display name of `path` below this prefix: the full key with this prefix
    /// stripped once. Plain string-suffix semantics, matching what the backend
    /// does with the delimiter. `None` when `path` is not below this prefix.
    pub fn child_name<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.0.as_str())
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Prefix {
    fn from(raw: &str) -> Self {
        Prefix::parse(raw)
    }
}

impl AsRef<str> for Prefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::Prefix;

    #[test]
    fn parse_normalizes_slashes() {
        assert_eq!(Prefix::parse("").as_str(), "");
        assert_eq!(Prefix::parse("/").as_str(), "");
        assert_eq!(Prefix::parse("a").as_str(), "a/");
        assert_eq!(Prefix::parse("/a//b///c").as_str(), "a/b/c/");
        assert_eq!(Prefix::parse("a/b/").as_str(), "a/b/");
    }

    #[test]
    fn parse_decodes_percent_escapes() {
        assert_eq!(Prefix::parse("my%20docs%2Freports/").as_str(), "my docs/reports/");
        // Broken escapes are kept verbatim.
        assert_eq!(Prefix::parse("100%/").as_str(), "100%/");
    }

    #[test]
    fn from_key_keeps_percent_literals() {
        assert_eq!(Prefix::from_key("q%20a/").as_str(), "q%20a/");
        assert_eq!(Prefix::from_key("/a%2Fb//c").as_str(), "a%2Fb/c/");
        assert_eq!(Prefix::from_key(""), Prefix::root());
    }

    #[test]
    fn parent_and_leaf() {
        let prefix = Prefix::parse("a/b/c/");
        assert_eq!(prefix.parent().as_str(), "a/b/");
        assert_eq!(prefix.leaf().as_deref(), Some("c/"));
        assert_eq!(Prefix::parse("a/").parent(), Prefix::root());
        assert_eq!(Prefix::root().parent(), Prefix::root());
        assert_eq!(Prefix::root().leaf(), None);
    }

    #[test]
    fn child_name_strips_prefix_once() {
        let prefix = Prefix::parse("a/");
        assert_eq!(prefix.child_name("a/a/file"), Some("a/file"));
        assert_eq!(prefix.child_name("a/sub/"), Some("sub/"));
        assert_eq!(prefix.child_name("b/file"), None);
        assert_eq!(Prefix::root().child_name("top.txt"), Some("top.txt"));
    }
}
