use crate::error::{ImdfError, Result};
use crate::types::Value;
use std::collections::HashMap;
use std::sync::Arc;
use wkb::reader::Wkb;

/// A single row of a layer with its geometry bytes and owned properties.
#[derive(Debug, Clone)]
pub struct GpkgFeature {
    pub(super) id: i64,
    pub(super) geometry: Option<Vec<u8>>,
    pub(super) properties: Vec<Value>,
    pub(super) property_index_by_name: Arc<HashMap<String, usize>>,
}

impl GpkgFeature {
    /// Return the primary key value.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Decode the geometry column into WKB.
    ///
    /// Returns `None` when the layer has no geometry column or the value is
    /// `NULL`.
    pub fn geometry(&self) -> Result<Option<Wkb<'_>>> {
        self.geometry
            .as_deref()
            .map(gpkg_geometry_to_wkb)
            .transpose()
    }

    /// Return a property value by column name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        let idx = *self.property_index_by_name.get(name)?;
        self.properties.get(idx)
    }

    /// Consume the feature and return its property values in column order.
    pub fn into_properties(self) -> Vec<Value> {
        self.properties
    }
}

/// Strip GeoPackage header and envelope bytes to access raw WKB.
// cf. https://www.geopackage.org/spec140/index.html#gpb_format
pub(crate) fn gpkg_geometry_to_wkb(b: &[u8]) -> Result<Wkb<'_>> {
    const HEADER_SIZE: usize = 8;
    if b.len() < HEADER_SIZE {
        return Err(ImdfError::InvalidGpkgGeometryLength {
            len: b.len(),
            minimum: HEADER_SIZE,
        });
    }

    let flags = b[3];
    let envelope_size: usize = match flags & 0b00001110 {
        0b00000000 => 0,  // no envelope
        0b00000010 => 32, // envelope is [minx, maxx, miny, maxy], 32 bytes
        0b00000100 => 48, // envelope is [minx, maxx, miny, maxy, minz, maxz], 48 bytes
        0b00000110 => 48, // envelope is [minx, maxx, miny, maxy, minm, maxm], 48 bytes
        0b00001000 => 64, // envelope is [minx, maxx, miny, maxy, minz, maxz, minm, maxm], 64 bytes
        _ => {
            return Err(ImdfError::InvalidGpkgGeometryFlags(flags));
        }
    };
    let offset = HEADER_SIZE + envelope_size;
    if b.len() < offset {
        return Err(ImdfError::InvalidGpkgGeometryEnvelope {
            len: b.len(),
            required: offset,
        });
    }

    Ok(Wkb::try_new(&b[offset..])?)
}

// cf. https://www.geopackage.org/spec140/index.html#gpb_format
pub(crate) fn wkb_to_gpkg_geometry(wkb: Wkb<'_>, srs_id: u32) -> Vec<u8> {
    let mut geom = Vec::with_capacity(wkb.buf().len() + 8);
    geom.extend_from_slice(&[
        0x47u8, // magic
        0x50u8, // magic
        0x00u8, // version
        0x01u8, // flags (little endian SRS ID, no envelope)
    ]);
    geom.extend_from_slice(&srs_id.to_le_bytes());
    geom.extend_from_slice(wkb.buf());

    geom
}

#[cfg(test)]
mod tests {
    use super::{gpkg_geometry_to_wkb, wkb_to_gpkg_geometry};
    use crate::Result;
    use crate::error::ImdfError;
    use geo_types::Point;
    use wkb::reader::Wkb;

    #[test]
    fn gpkg_geometry_roundtrip() -> Result<()> {
        let point = Point::new(3.0, -1.0);
        let mut wkb = Vec::new();
        wkb::writer::write_geometry(&mut wkb, &point, &Default::default())?;
        let wkb = Wkb::try_new(&wkb)?;
        let expected = wkb.buf().to_vec();
        let gpkg_blob = wkb_to_gpkg_geometry(wkb, 4326);

        let recovered = gpkg_geometry_to_wkb(&gpkg_blob)?;
        assert_eq!(recovered.buf(), expected.as_slice());
        Ok(())
    }

    #[test]
    fn gpkg_geometry_rejects_invalid_flags() {
        let mut blob = vec![0x47, 0x50, 0x00, 0x0A, 0, 0, 0, 0];
        blob.extend_from_slice(&[0; 16]);
        let result = gpkg_geometry_to_wkb(&blob);
        assert!(matches!(result, Err(ImdfError::InvalidGpkgGeometryFlags(_))));
    }

    #[test]
    fn gpkg_geometry_rejects_truncated_blobs() {
        let result = gpkg_geometry_to_wkb(&[0x47, 0x50, 0x00]);
        assert!(matches!(
            result,
            Err(ImdfError::InvalidGpkgGeometryLength { len: 3, minimum: 8 })
        ));

        // Declares a 32 byte envelope but carries none.
        let blob = vec![0x47, 0x50, 0x00, 0x03, 0xE6, 0x10, 0, 0, 1, 2];
        let result = gpkg_geometry_to_wkb(&blob);
        assert!(matches!(
            result,
            Err(ImdfError::InvalidGpkgGeometryEnvelope {
                len: 10,
                required: 40
            })
        ));
    }
}
