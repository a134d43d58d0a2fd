//! URL and label handling for category pages
//!
//! This module provides the href normalization used for cycle detection and
//! the label cleanup applied to every extracted category name.

mod normalize;

use thiserror::Error;

pub use normalize::{category_key, normalize_category_url};

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Empty href")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    InvalidScheme(String),
}

/// Glyphs some layouts render in front of a category label as a separator
const SEPARATOR_GLYPHS: &[char] = &['/', '|', '•', '·', '›', '»'];

/// Cleans a category label as displayed by the page
///
/// Trims surrounding whitespace (including non-breaking spaces), strips
/// leading separator glyphs and collapses inner whitespace runs to a single
/// space.
///
/// # Examples
///
/// ```
/// use catalog_ripple::url::clean_label;
///
/// assert_eq!(clean_label(" / Sneakers "), "Sneakers");
/// assert_eq!(clean_label("Men's\u{a0}\u{a0}Boots"), "Men's Boots");
/// ```
pub fn clean_label(raw: &str) -> String {
    let trimmed = raw
        .trim_matches(|c: char| c.is_whitespace())
        .trim_start_matches(|c: char| c.is_whitespace() || SEPARATOR_GLYPHS.contains(&c));

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
