use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::TagId;

/// Tag entity - a normalized, lowercase label shared between posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Split a free-text tag phrase into its distinct normalized tag names.
///
/// Names are lowercased and split on any whitespace; empty tokens vanish and
/// duplicates collapse.
pub fn parse_tag_phrase(phrase: &str) -> BTreeSet<String> {
    phrase
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}
