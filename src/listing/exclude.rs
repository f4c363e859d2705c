//! Exclusion pattern applied to listed keys and prefixes.

use log::warn;
use regex::Regex;

/// Hides keys and prefixes matching a configured regular expression.
///
/// The pattern is searched anywhere in the full path. A missing, blank or
/// malformed pattern excludes nothing.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    pattern: Option<Regex>,
}

impl ExclusionFilter {
    pub fn none() -> Self {
        ExclusionFilter { pattern: None }
    }

    pub fn new(pattern: Option<&str>) -> Self {
        let Some(source) = pattern.map(str::trim).filter(|p| !p.is_empty()) else {
            return ExclusionFilter::none();
        };

        match Regex::new(source) {
            Ok(regex) => ExclusionFilter {
                pattern: Some(regex),
            },
            Err(e) => {
                warn!("exclude_pattern: ignoring invalid pattern {:?}: {}", source, e);
                ExclusionFilter::none()
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(path))
    }
}
