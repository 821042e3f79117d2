use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Longest accepted user or group name, in characters.
pub const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name is longer than {MAX_NAME_LEN} characters")]
    TooLong,
    #[error("name contains whitespace or control characters")]
    InvalidChar,
}

/// Names are taken as given; surrounding whitespace is not stripped and fails
/// the character check like any other whitespace.
fn validate(s: &str) -> Result<&str, NameError> {
    if s.is_empty() {
        return Err(NameError::Empty);
    }
    if s.chars().count() > MAX_NAME_LEN {
        return Err(NameError::TooLong);
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(NameError::InvalidChar);
    }
    Ok(s)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Username(String);

impl Username {
    pub fn parse(s: &str) -> Result<Self, NameError> {
        validate(s).map(|s| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Borrow<str> for Username {
    fn borrow(&self) -> &str { &self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupName(String);

impl GroupName {
    pub fn parse(s: &str) -> Result<Self, NameError> {
        validate(s).map(|s| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl AsRef<str> for GroupName {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Borrow<str> for GroupName {
    fn borrow(&self) -> &str { &self.0 }
}
