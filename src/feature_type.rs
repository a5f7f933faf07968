use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::normalize::restructure;

/// IMDF feature types.
///
/// Tables that are not a known IMDF type are still exported under their own
/// name as [`FeatureType::Other`]; they get no type-specific restructuring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Address,
    Amenity,
    Anchor,
    Building,
    Detail,
    Fixture,
    Footprint,
    Geofence,
    Kiosk,
    Level,
    Occupant,
    Opening,
    Relationship,
    Section,
    Unit,
    Venue,
    Other(String),
}

impl FeatureType {
    pub const ALL: [FeatureType; 16] = [
        Self::Address,
        Self::Amenity,
        Self::Anchor,
        Self::Building,
        Self::Detail,
        Self::Fixture,
        Self::Footprint,
        Self::Geofence,
        Self::Kiosk,
        Self::Level,
        Self::Occupant,
        Self::Opening,
        Self::Relationship,
        Self::Section,
        Self::Unit,
        Self::Venue,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Address => "address",
            Self::Amenity => "amenity",
            Self::Anchor => "anchor",
            Self::Building => "building",
            Self::Detail => "detail",
            Self::Fixture => "fixture",
            Self::Footprint => "footprint",
            Self::Geofence => "geofence",
            Self::Kiosk => "kiosk",
            Self::Level => "level",
            Self::Occupant => "occupant",
            Self::Opening => "opening",
            Self::Relationship => "relationship",
            Self::Section => "section",
            Self::Unit => "unit",
            Self::Venue => "venue",
            Self::Other(name) => name,
        }
    }

    /// Apply the type-specific reshaping of the property map.
    pub(crate) fn restructure(&self, properties: &mut Map<String, JsonValue>) {
        match self {
            Self::Opening => restructure::door(properties),
            Self::Occupant => restructure::validity(properties),
            Self::Relationship => restructure::relationship(properties),
            _ => {}
        }
    }
}

impl From<&str> for FeatureType {
    fn from(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == name)
            .unwrap_or_else(|| Self::Other(name.to_string()))
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureType;

    #[test]
    fn parses_known_and_unknown_names() {
        assert_eq!(FeatureType::from("opening"), FeatureType::Opening);
        assert_eq!(FeatureType::from("venue"), FeatureType::Venue);
        assert_eq!(
            FeatureType::from("parking_lot"),
            FeatureType::Other("parking_lot".to_string())
        );
        assert_eq!(FeatureType::from("parking_lot").to_string(), "parking_lot");
    }

    #[test]
    fn names_round_trip() {
        for ty in FeatureType::ALL {
            assert_eq!(FeatureType::from(ty.as_str()), ty);
        }
    }
}
