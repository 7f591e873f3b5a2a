//! Input Validation for DMed
//!
//! Everything here is pure and I/O-free: these checks run before any network
//! call is made, so a bad address or an oversized file never reaches a
//! storage backend or the ledger.
//!
//! # What is validated
//!
//! - **Identities**: opaque 20-byte ledger addresses, written `0x` + 40 hex
//!   digits. Parsing is case-insensitive; display is lowercase.
//! - **Files**: MIME type must be PDF, JPEG, or PNG; size is capped at
//!   10 MiB. Violations name the offending file.
//! - **Record metadata**: doctor name, reason, and visit date must be
//!   non-empty after trimming.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted file size: 10 MiB
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// An opaque 20-byte ledger address identifying a patient or doctor.
///
/// Equality is byte equality; no two identities are ever conflated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; 20]);

/// Error type for identity parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdentityError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex digits, got {0}")]
    BadLength(usize),
    #[error("address contains a non-hex digit: {0:?}")]
    BadDigit(char),
}

impl Identity {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Identity(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Shortened `0x1234…abcd` form for display in lists and logs
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Identity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(ParseIdentityError::MissingPrefix)?;
        if hex_part.len() != 40 {
            return Err(ParseIdentityError::BadLength(hex_part.len()));
        }
        let mut bytes = [0u8; 20];
        for (i, chunk) in hex_part.as_bytes().chunks(2).enumerate() {
            let hi = hex_value(chunk[0] as char)?;
            let lo = hex_value(chunk[1] as char)?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Identity(bytes))
    }
}

fn hex_value(c: char) -> Result<u8, ParseIdentityError> {
    c.to_digit(16)
        .map(|v| v as u8)
        .ok_or(ParseIdentityError::BadDigit(c))
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

impl Serialize for Identity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Accepted record file formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Pdf,
    Jpeg,
    Png,
}

impl FileKind {
    /// Map a MIME type string to an accepted kind, if any
    pub fn from_mime(mime: &str) -> Option<FileKind> {
        match mime {
            "application/pdf" => Some(FileKind::Pdf),
            "image/jpeg" => Some(FileKind::Jpeg),
            "image/png" => Some(FileKind::Png),
            _ => None,
        }
    }
}

/// Error type for file validation, naming the offending file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileValidationError {
    #[error("file {file_name} is not a PDF, JPG, or PNG (got {mime})")]
    UnsupportedType { file_name: String, mime: String },
    #[error("file {file_name} is too large ({size} bytes, max {MAX_FILE_BYTES})")]
    TooLarge { file_name: String, size: usize },
}

/// Validate one file's MIME type and size before any upload is attempted
pub fn validate_file(
    file_name: &str,
    mime: &str,
    size: usize,
) -> Result<FileKind, FileValidationError> {
    let kind = FileKind::from_mime(mime).ok_or_else(|| FileValidationError::UnsupportedType {
        file_name: file_name.to_string(),
        mime: mime.to_string(),
    })?;
    if size > MAX_FILE_BYTES {
        return Err(FileValidationError::TooLarge {
            file_name: file_name.to_string(),
            size,
        });
    }
    Ok(kind)
}

/// Error type for record metadata validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("required field {0} is empty")]
pub struct MissingField(pub &'static str);

/// Require a field to be non-empty after trimming
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), MissingField> {
    if value.trim().is_empty() {
        Err(MissingField(field))
    } else {
        Ok(())
    }
}
