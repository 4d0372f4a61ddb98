//! # Coordinate Systems
//!
//! Descriptive records attached to a structural model. Geodetic conversion
//! is not done here; only the identifying information is kept.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authority/code/name triple identifying a geographic coordinate system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeographicInfo {
    pub authority: String,
    pub code: String,
    pub name: String,
}

impl GeographicInfo {
    pub fn new(
        authority: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            code: code.into(),
            name: name.into(),
        }
    }

    /// `AUTHORITY:CODE`, e.g. `EPSG:4326`.
    #[must_use]
    pub fn authority_code(&self) -> String {
        format!("{}:{}", self.authority, self.code)
    }
}

impl fmt::Display for GeographicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {})", self.authority_code(), self.name)
    }
}

/// A coordinate reference system attached to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// Coordinates expressed in a registered geographic system.
    Geographic(GeographicInfo),
    /// Coordinates read from a named mesh attribute.
    Attribute { attribute_name: String },
}

impl CoordinateSystem {
    /// Registered type tag used when archiving.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Geographic(_) => GEOGRAPHIC_TAG,
            Self::Attribute { .. } => ATTRIBUTE_TAG,
        }
    }
}

pub(crate) const GEOGRAPHIC_TAG: &str = "GeographicCoordinateSystem";
pub(crate) const ATTRIBUTE_TAG: &str = "AttributeCoordinateReferenceSystem";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_formatting() {
        let info = GeographicInfo::new("EPSG", "32631", "WGS 84 / UTM zone 31N");
        assert_eq!(info.authority_code(), "EPSG:32631");
        assert_eq!(info.to_string(), "(EPSG:32631 -> WGS 84 / UTM zone 31N)");
    }

    #[test]
    fn tags_differ_per_variant() {
        let geo = CoordinateSystem::Geographic(GeographicInfo::new("EPSG", "4326", "WGS 84"));
        let attr = CoordinateSystem::Attribute {
            attribute_name: "points".to_string(),
        };
        assert_ne!(geo.type_tag(), attr.type_tag());
    }
}
