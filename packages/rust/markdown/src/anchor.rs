//! Heading anchors for table-of-contents links.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Slug used when a heading normalizes to nothing.
const EMPTY_SLUG: &str = "node";

/// Derive the anchor for a heading.
///
/// Lower-cases, turns each whitespace character into `-`, then strips
/// everything except ASCII letters, digits, `-` and CJK ideographs
/// (U+4E00 to U+9FA5).
pub fn anchor_for(heading: &str) -> String {
    static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[^a-z0-9\-\x{4e00}-\x{9fa5}]").expect("valid regex")
    });

    let hyphenated: String = heading
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    DISALLOWED_RE.replace_all(&hyphenated, "").to_string()
}

/// Hands out anchors that are unique within one document.
///
/// Collisions get `-1`, `-2`, ... appended in emission order, the same way
/// GitHub de-duplicates repeated headings.
#[derive(Debug, Default)]
pub struct AnchorSet {
    taken: HashSet<String>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an anchor as used by some other heading in the document.
    pub fn reserve(&mut self, anchor: &str) {
        self.taken.insert(anchor.to_string());
    }

    /// Return a fresh anchor for `heading`.
    pub fn unique(&mut self, heading: &str) -> String {
        let mut base = anchor_for(heading);
        if base.is_empty() {
            base = EMPTY_SLUG.to_string();
        }

        if self.taken.insert(base.clone()) {
            return base;
        }

        let mut n = 1usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
