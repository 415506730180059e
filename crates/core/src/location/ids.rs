#![forbid(unsafe_code)]

/// Canonical location identifier: a hyphenated, lower-case UUID string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(String);

impl LocationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, LocationIdError> {
        let value = value.into();
        let canonical = canonicalize_location_id(&value)?;
        Ok(Self(canonical))
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocationIdError {
    Empty,
    InvalidLength,
    InvalidFormat,
}

impl LocationIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "location id must not be empty",
            Self::InvalidLength => "location id must be 36 characters",
            Self::InvalidFormat => "location id must be a hyphenated uuid",
        }
    }
}

const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

fn canonicalize_location_id(value: &str) -> Result<String, LocationIdError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LocationIdError::Empty);
    }
    if trimmed.len() != 36 {
        return Err(LocationIdError::InvalidLength);
    }
    for (index, byte) in trimmed.bytes().enumerate() {
        let ok = if HYPHEN_POSITIONS.contains(&index) {
            byte == b'-'
        } else {
            byte.is_ascii_hexdigit()
        };
        if !ok {
            return Err(LocationIdError::InvalidFormat);
        }
    }
    Ok(trimmed.to_ascii_lowercase())
}
