#![forbid(unsafe_code)]

pub const MAX_BUILDING_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_NUMBER_LEN: usize = 64;
/// Largest area representable with ten digits of precision and three decimals.
pub const MAX_AREA: f64 = 9_999_999.999;

/// Leaf payload of a location. The hierarchy engine passes it through untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationAttributes {
    pub building: String,
    pub name: String,
    pub number: String,
    pub area: f64,
}

impl LocationAttributes {
    pub fn try_new(
        building: impl Into<String>,
        name: impl Into<String>,
        number: impl Into<String>,
        area: f64,
    ) -> Result<Self, AttributeError> {
        Ok(Self {
            building: normalize_building(&building.into())?,
            name: normalize_name(&name.into())?,
            number: normalize_number(&number.into())?,
            area: normalize_area(area)?,
        })
    }
}

/// Partial attribute update. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationPatch {
    pub building: Option<String>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub area: Option<f64>,
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        self.building.is_none() && self.name.is_none() && self.number.is_none() && self.area.is_none()
    }

    pub fn apply(&self, current: &LocationAttributes) -> Result<LocationAttributes, AttributeError> {
        let building = match self.building.as_deref() {
            Some(value) => normalize_building(value)?,
            None => current.building.clone(),
        };
        let name = match self.name.as_deref() {
            Some(value) => normalize_name(value)?,
            None => current.name.clone(),
        };
        let number = match self.number.as_deref() {
            Some(value) => normalize_number(value)?,
            None => current.number.clone(),
        };
        let area = match self.area {
            Some(value) => normalize_area(value)?,
            None => current.area,
        };
        Ok(LocationAttributes {
            building,
            name,
            number,
            area,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeError {
    BuildingEmpty,
    BuildingTooLong,
    NameEmpty,
    NameTooLong,
    NumberEmpty,
    NumberTooLong,
    NumberInvalidChar { ch: char, index: usize },
    ContainsControl { field: &'static str },
    AreaNotFinite,
    AreaNegative,
    AreaTooLarge,
}

impl AttributeError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::BuildingEmpty => "building must not be empty",
            Self::BuildingTooLong => "building is too long",
            Self::NameEmpty => "location name must not be empty",
            Self::NameTooLong => "location name is too long",
            Self::NumberEmpty => "location number must not be empty",
            Self::NumberTooLong => "location number is too long",
            Self::NumberInvalidChar { .. } => {
                "location number may only contain letters, digits, '-', '_', '.' and '/'"
            }
            Self::ContainsControl { field } => match *field {
                "building" => "building contains control characters",
                "name" => "location name contains control characters",
                _ => "attribute contains control characters",
            },
            Self::AreaNotFinite => "area must be a finite number",
            Self::AreaNegative => "area must not be negative",
            Self::AreaTooLarge => "area is too large",
        }
    }
}

fn normalize_building(value: &str) -> Result<String, AttributeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AttributeError::BuildingEmpty);
    }
    if trimmed.chars().count() > MAX_BUILDING_LEN {
        return Err(AttributeError::BuildingTooLong);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(AttributeError::ContainsControl { field: "building" });
    }
    Ok(trimmed.to_string())
}

fn normalize_name(value: &str) -> Result<String, AttributeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AttributeError::NameEmpty);
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(AttributeError::NameTooLong);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(AttributeError::ContainsControl { field: "name" });
    }
    Ok(trimmed.to_string())
}

fn normalize_number(value: &str) -> Result<String, AttributeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AttributeError::NumberEmpty);
    }
    if trimmed.len() > MAX_NUMBER_LEN {
        return Err(AttributeError::NumberTooLong);
    }
    for (index, ch) in trimmed.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/') {
            continue;
        }
        return Err(AttributeError::NumberInvalidChar { ch, index });
    }
    Ok(trimmed.to_string())
}

fn normalize_area(value: f64) -> Result<f64, AttributeError> {
    if !value.is_finite() {
        return Err(AttributeError::AreaNotFinite);
    }
    if value < 0.0 {
        return Err(AttributeError::AreaNegative);
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded > MAX_AREA {
        return Err(AttributeError::AreaTooLarge);
    }
    Ok(rounded)
}
