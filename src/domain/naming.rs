// Copyright (c) 2025 - Cowboy AI, Inc.
//! Record Name Normalization
//!
//! Discovered names frequently carry a domain suffix (`host01.corp.local`) and
//! have no length discipline. NetBox names are bounded, so every discovered
//! name passes through [`normalize`] before it is used as a natural key.
//!
//! Device names additionally need collision handling: when a name is occupied
//! at a site by a different resource, [`DeviceName::candidate`] produces the
//! `-1`, `-2`, ... variants, re-truncating the base so the suffix always fits.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

/// Default maximum length of a NetBox record name
pub const DEFAULT_MAX_NAME_LENGTH: usize = 64;

/// Naming error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Name is empty after normalization: {0:?}")]
    Empty(String),
}

/// Normalize a discovered name into a bounded record name
///
/// Everything from the first `.` onward is dropped, then the remainder is
/// truncated to `max_length` characters.
pub fn normalize(raw: &str, max_length: usize) -> String {
    let name = match raw.split_once('.') {
        Some((head, _)) => {
            debug!("Removed domain portion of '{}', new name: {}", raw, head);
            head
        }
        None => raw,
    };

    if name.chars().count() > max_length {
        warn!(
            "Name '{}' exceeds {} characters, truncating",
            name, max_length
        );
        return name.chars().take(max_length).collect();
    }

    name.to_string()
}

/// Append `-{suffix}` to `base`, shortening `base` so the result fits `max_length`
pub fn with_suffix(base: &str, suffix: u32, max_length: usize) -> String {
    let tail = format!("-{}", suffix);
    let room = max_length.saturating_sub(tail.chars().count());
    let head: String = base.chars().take(room).collect();
    format!("{}{}", head, tail)
}

/// Derive a NetBox slug from a display name
///
/// Lowercases, turns whitespace into `-` and drops anything NetBox rejects
/// in a slug (`[-a-z0-9_]` survive).
pub fn slugify(name: &str) -> String {
    name.trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                Some(c.to_ascii_lowercase())
            } else {
                None
            }
        })
        .collect()
}

/// A normalized device name and its disambiguation candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName {
    base: String,
    max_length: usize,
}

impl DeviceName {
    /// Normalize `raw`, rejecting names that end up empty (e.g. `.hidden`)
    pub fn new(raw: &str, max_length: usize) -> Result<Self, NamingError> {
        let base = normalize(raw, max_length);
        if base.is_empty() {
            return Err(NamingError::Empty(raw.to_string()));
        }
        Ok(Self { base, max_length })
    }

    /// The normalized name without any suffix
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Candidate name for a disambiguation attempt
    ///
    /// Attempt 0 is the base name; attempt `n` is the base with `-n` appended.
    pub fn candidate(&self, attempt: u32) -> String {
        if attempt == 0 {
            self.base.clone()
        } else {
            with_suffix(&self.base, attempt, self.max_length)
        }
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}
