//! core::naming
//!
//! Key generation for default metadata entries.
//!
//! # Features
//!
//! - Derive a stable key from a human-readable name
//! - Pluggable generator via the [`IdGenerator`] trait
//!
//! Generation is a pure function of the name. Two names that slug to the
//! same key collide; detecting that is left to the storage backend.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::core::types::{MetadataKey, TypeError};

/// Derives a stable key from an entry name.
pub trait IdGenerator: Send + Sync {
    /// Generate the key for `name`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidKey` if the name yields an empty key.
    fn generate(&self, name: &str) -> Result<MetadataKey, TypeError>;
}

/// Default generator: a lowercase, dash-separated slug of the name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugIdGenerator;

impl IdGenerator for SlugIdGenerator {
    fn generate(&self, name: &str) -> Result<MetadataKey, TypeError> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(TypeError::InvalidKey(format!(
                "name '{}' has no characters usable in a key",
                name
            )));
        }
        MetadataKey::new(slug)
    }
}

/// Generate a key slug from a name.
///
/// - Accents are stripped (NFD, combining marks dropped), base letters kept
/// - Letters and digits of any script are kept, lowercased
/// - Every run of other characters becomes a single hyphen
/// - No leading or trailing hyphens
///
/// # Example
///
/// ```
/// use metatier::core::naming::slugify;
///
/// assert_eq!(slugify("Support Email"), "support-email");
/// assert_eq!(slugify("  API / Owner  "), "api-owner");
/// assert_eq!(slugify("Café Menu"), "cafe-menu");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    // Recompose so scripts like Hangul keep their syllables.
    for c in name.nfd().filter(|c| !is_combining_mark(*c)).nfc() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase().filter(|l| !is_combining_mark(*l)));
        } else {
            pending_dash = true;
        }
    }
    slug
}
