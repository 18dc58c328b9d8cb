use std::{fmt, str::FromStr};

use crate::{constants::JOIN_CODE_LEN, error::AllocationError};

/// Short human-shareable code that resolves to a hosted relay allocation.
///
/// Codes are normalized to upper case on parse, so `"abc123"` and
/// `"ABC123"` name the same allocation. Parsing checks shape only; whether
/// the code names a live allocation is for the allocation service to say.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinCode(String);

impl JoinCode {
    /// Parses and normalizes user input into a join code.
    ///
    /// Surrounding whitespace is ignored. The remaining text must be exactly
    /// [`JOIN_CODE_LEN`] ASCII alphanumeric characters.
    pub fn parse(input: &str) -> Result<Self, AllocationError> {
        let trimmed = input.trim();
        if trimmed.len() != JOIN_CODE_LEN || !trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(AllocationError::InvalidJoinCode(input.to_string()));
        }
        Ok(JoinCode(trimmed.to_ascii_uppercase()))
    }

    /// Returns the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JoinCode {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JoinCode::parse(s)
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JoinCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
