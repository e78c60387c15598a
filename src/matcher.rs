//! Target file identification.
//!
//! A cheap structural filter on base names: extension plus marker. No file
//! content is ever inspected here.

use regex::Regex;

/// How the marker part of a name is recognised.
#[derive(Debug, Clone)]
pub enum MarkerRule {
    /// Plain substring containment.
    Substring {
        marker: String,
        case_sensitive: bool,
    },
    /// Regular expression searched anywhere in the name.
    Pattern(Regex),
}

/// Decides whether a base name is a conversion target.
#[derive(Debug, Clone)]
pub struct TargetMatcher {
    /// Extension without the leading dot, lowercased.
    extension: String,
    rule: MarkerRule,
}

impl TargetMatcher {
    /// Build a matcher from an extension and a marker rule.
    ///
    /// A leading dot on `extension` is optional.
    #[must_use]
    pub fn new(extension: &str, rule: MarkerRule) -> Self {
        let rule = match rule {
            MarkerRule::Substring {
                marker,
                case_sensitive: false,
            } => MarkerRule::Substring {
                marker: marker.to_lowercase(),
                case_sensitive: false,
            },
            other => other,
        };
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
            rule,
        }
    }

    /// Matcher with a substring marker.
    #[must_use]
    pub fn with_marker(extension: &str, marker: &str, case_sensitive: bool) -> Self {
        Self::new(
            extension,
            MarkerRule::Substring {
                marker: marker.to_string(),
                case_sensitive,
            },
        )
    }

    /// True iff `name` ends with `.<extension>` (any case) and satisfies the
    /// marker rule.
    #[must_use]
    pub fn is_target(&self, name: &str) -> bool {
        self.has_extension(name) && self.has_marker(name)
    }

    fn has_extension(&self, name: &str) -> bool {
        let suffix_len = self.extension.len() + 1;
        if name.len() < suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
            return false;
        }
        let suffix = &name[name.len() - suffix_len..];
        suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(&self.extension)
    }

    fn has_marker(&self, name: &str) -> bool {
        match &self.rule {
            MarkerRule::Substring {
                marker,
                case_sensitive: true,
            } => name.contains(marker.as_str()),
            MarkerRule::Substring {
                marker,
                case_sensitive: false,
            } => name.to_lowercase().contains(marker.as_str()),
            MarkerRule::Pattern(re) => re.is_match(name),
        }
    }

    /// Configured extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Names that are filesystem noise regardless of the matcher: dotfiles and
/// Office lock files (`~$Book.xlsx`).
#[must_use]
pub fn is_noise(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("~$")
}
