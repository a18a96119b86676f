// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LaminarError, LaminarResult};

/// Subject identifier: exactly nine ASCII digits.
///
/// # Examples
/// ```
/// use laminar_structures::SubjectId;
///
/// let id = SubjectId::new("012345678").unwrap();
/// assert_eq!(id.as_str(), "012345678");
/// assert!(SubjectId::new("12345").is_err());
/// assert_eq!(SubjectId::from_numeric(42).unwrap().as_str(), "000000042");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    pub const LENGTH: usize = 9;

    pub fn new(value: impl Into<String>) -> LaminarResult<Self> {
        let value = value.into();
        if !Self::is_valid(&value) {
            return Err(LaminarError::Validation(format!(
                "Invalid subject ID: '{}' (expected {} digits)",
                value,
                Self::LENGTH
            )));
        }
        Ok(Self(value))
    }

    pub fn is_valid(value: &str) -> bool {
        value.len() == Self::LENGTH && value.bytes().all(|b| b.is_ascii_digit())
    }

    /// Zero-pad a numeric id, as spreadsheets drop leading zeros.
    pub fn from_numeric(value: u64) -> LaminarResult<Self> {
        Self::new(format!("{:0width$}", value, width = Self::LENGTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SubjectId {
    type Err = LaminarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = LaminarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
