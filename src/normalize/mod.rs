//! Turning stored rows into IMDF features.
//!
//! A record goes through a fixed sequence of stages:
//!
//! 1. address fields are forced to strings (`address` only),
//! 2. JSON-encoded names are decoded,
//! 3. every other field is decoded from array literals or JSON, and empty
//!    lists or objects collapse to `null`,
//! 4. a `"lat, lon"` display point becomes a GeoJSON point,
//! 5. the feature type reshapes its properties (`door`, `validity`,
//!    relationship endpoints).
//!
//! Records without an id are dropped.

pub(crate) mod decode;
pub(crate) mod restructure;

use crate::feature_type::FeatureType;
use crate::reader::RawRecord;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

const FEATURE: &str = "Feature";
const FEATURE_COLLECTION: &str = "FeatureCollection";

/// A finished IMDF feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputFeature {
    pub id: JsonValue,
    #[serde(rename = "type")]
    kind: &'static str,
    pub feature_type: String,
    pub geometry: Option<JsonValue>,
    pub properties: Map<String, JsonValue>,
}

/// All exported features of one type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<OutputFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<OutputFeature>) -> Self {
        Self {
            kind: FEATURE_COLLECTION,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<OutputFeature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = OutputFeature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Normalize one record of `feature_type`.
///
/// `derived` holds the junction fields resolved for the record; they are
/// merged into the properties before decoding. Returns `None` when the
/// record has no id.
pub fn normalize(
    record: RawRecord,
    feature_type: &FeatureType,
    derived: Map<String, JsonValue>,
) -> Option<OutputFeature> {
    let RawRecord {
        fid,
        geometry,
        mut properties,
    } = record;
    properties.extend(derived);

    let id = properties.shift_remove("id").unwrap_or(JsonValue::Null);
    // A column literally named `geometry` never reaches the output properties.
    properties.shift_remove("geometry");
    if id.is_null() {
        tracing::debug!(fid, feature_type = feature_type.as_str(), "dropping record without id");
        return None;
    }

    if *feature_type == FeatureType::Address {
        decode::coerce_address_fields(&mut properties);
    }
    decode::decode_name_fields(&mut properties);
    decode::decode_other_fields(&mut properties);
    decode::derive_display_point(&mut properties);
    feature_type.restructure(&mut properties);

    Some(OutputFeature {
        id,
        kind: FEATURE,
        feature_type: feature_type.to_string(),
        geometry,
        properties,
    })
}
