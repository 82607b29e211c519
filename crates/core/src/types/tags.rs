//! Product tag list.

use serde::{Deserialize, Serialize};

/// Normalized list of product tags.
///
/// Tags are trimmed, lowercased, de-duplicated (first occurrence wins) and
/// empty entries are dropped. Sellers usually type them as a comma-separated
/// string, so [`TagList::parse_csv`] is the common entry point.
///
/// ```
/// use bazaar_core::TagList;
///
/// let tags = TagList::parse_csv(" Ceramics, mugs,,ceramics ");
/// assert_eq!(tags.as_slice(), ["ceramics", "mugs"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagList(Vec<String>);

impl TagList {
    /// Longest accepted tag, in characters. Longer tags are truncated.
    pub const MAX_TAG_CHARS: usize = 32;

    /// Build a tag list from individual tags.
    #[must_use]
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag: String = tag
                .as_ref()
                .trim()
                .to_lowercase()
                .chars()
                .take(Self::MAX_TAG_CHARS)
                .collect();
            if !tag.is_empty() && !out.contains(&tag) {
                out.push(tag);
            }
        }
        Self(out)
    }

    /// Parse a comma-separated tag string.
    #[must_use]
    pub fn parse_csv(s: &str) -> Self {
        Self::new(s.split(','))
    }

    /// The tags as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Whether there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the list and returns the tags.
    #[must_use]
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for TagList {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags)
    }
}

impl From<TagList> for Vec<String> {
    fn from(tags: TagList) -> Self {
        tags.0
    }
}
