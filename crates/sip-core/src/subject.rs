// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subject header (RFC 3261 Section 20.36) with security hardening.
//!
//! The Subject header provides a summary or indicates the nature of the call.
//! It's primarily used for human consumption.
//!
//! # Security
//!
//! Subject values are validated for:
//! - Maximum length to prevent DoS attacks
//! - No control characters (prevents CRLF injection)
//! - Proper UTF-8 encoding
//!
//! # Format
//!
//! ```text
//! Subject: Need more boxes
//! Subject: Tech Support
//! ```
//!
//! # Example
//!
//! ```
//! use sip_core::SubjectHeader;
//!
//! let subject = SubjectHeader::new("Need more boxes").unwrap();
//! assert_eq!(subject.value(), "Need more boxes");
//! ```

use smol_str::SmolStr;
use std::fmt;

// Security: Input size limits
const MAX_SUBJECT_LENGTH: usize = 256;

/// Error types for Subject header operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectError {
    /// Subject is empty
    Empty,
    /// Subject too long
    TooLong { max: usize },
    /// Subject contains invalid characters
    InvalidCharacters(String),
}

impl fmt::Display for SubjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectError::Empty => write!(f, "Subject cannot be empty"),
            SubjectError::TooLong { max } => {
                write!(f, "Subject too long (max {})", max)
            }
            SubjectError::InvalidCharacters(msg) => {
                write!(f, "Subject contains invalid characters: {}", msg)
            }
        }
    }
}

impl std::error::Error for SubjectError {}

/// Validates a subject value.
fn validate_subject(value: &str) -> Result<(), SubjectError> {
    if value.is_empty() || value.chars().all(|c| c == ' ' || c == '\t') {
        return Err(SubjectError::Empty);
    }

    if value.len() > MAX_SUBJECT_LENGTH {
        return Err(SubjectError::TooLong {
            max: MAX_SUBJECT_LENGTH,
        });
    }

    // Subject is a SIP text field: allow HTAB, SP, and visible ASCII.
    for ch in value.chars() {
        if ch == '\t' || ch == ' ' {
            continue;
        }
        if !ch.is_ascii_graphic() {
            return Err(SubjectError::InvalidCharacters(
                "contains non-ASCII or control characters".to_string(),
            ));
        }
    }

    if value.chars().any(|c| c.is_control() && c != '\t') {
        return Err(SubjectError::InvalidCharacters(
            "contains control characters".to_string(),
        ));
    }

    Ok(())
}

/// Subject header (RFC 3261 Section 20.36).
///
/// The Subject header field provides a summary or indicates the nature of
/// the call, allowing call filtering without having to parse the session
/// description. The session description does not have to use the same
/// subject indication as the invitation.
///
/// # Security
///
/// Subject values are validated for:
/// - Maximum length of 256 characters
/// - No control characters except tab (prevents CRLF injection)
/// - Non-empty after trimming
///
/// # Examples
///
/// ```
/// use sip_core::SubjectHeader;
///
/// // Create a subject header
/// let subject = SubjectHeader::new("Tech Support").unwrap();
/// assert_eq!(subject.value(), "Tech Support");
///
/// // Parse from string
/// let parsed = SubjectHeader::parse("Need more boxes").unwrap();
/// assert_eq!(parsed.to_string(), "Need more boxes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectHeader {
    value: SmolStr,
}

impl SubjectHeader {
    /// Creates a new Subject header with validation.
    ///
    /// # Arguments
    ///
    /// * `value` - The subject text
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if:
    /// - Value is empty or whitespace-only
    /// - Value exceeds 256 characters
    /// - Value contains control characters (except tab)
    ///
    /// # Example
    ///
    /// ```
    /// use sip_core::SubjectHeader;
    ///
    /// let subject = SubjectHeader::new("Tech Support").unwrap();
    /// assert_eq!(subject.value(), "Tech Support");
    /// ```
    pub fn new(value: &str) -> Result<Self, SubjectError> {
        validate_subject(value)?;
        Ok(Self {
            value: SmolStr::new(value),
        })
    }

    /// Gets the subject value.
    ///
    /// # Example
    ///
    /// ```
    /// use sip_core::SubjectHeader;
    ///
    /// let subject = SubjectHeader::new("Tech Support").unwrap();
    /// assert_eq!(subject.value(), "Tech Support");
    /// ```
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Parses a Subject header from a string with validation.
    ///
    /// # Returns
    ///
    /// - `Ok(SubjectHeader)` if parsing and validation succeed
    /// - `Err(SubjectError)` if validation fails
    ///
    /// # Example
    ///
    /// ```
    /// use sip_core::SubjectHeader;
    ///
    /// let subject = SubjectHeader::parse("Need more boxes").unwrap();
    /// assert_eq!(subject.value(), "Need more boxes");
    ///
    /// // Preserves whitespace
    /// let subject2 = SubjectHeader::parse("  Tech Support  ").unwrap();
    /// assert_eq!(subject2.value(), "  Tech Support  ");
    /// ```
    pub fn parse(input: &str) -> Result<Self, SubjectError> {
        Self::new(input)
    }
}

impl fmt::Display for SubjectHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
