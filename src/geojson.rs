//! Render geometries as GeoJSON geometry objects.

use geo_traits::{
    CoordTrait, Dimensions, GeometryCollectionTrait, GeometryTrait, LineStringTrait, LineTrait,
    MultiLineStringTrait, MultiPointTrait, MultiPolygonTrait, PointTrait, PolygonTrait, RectTrait,
    TriangleTrait,
};
use serde_json::{Value as JsonValue, json};

/// Convert any geometry into its GeoJSON object.
///
/// Z values are kept as the third coordinate; M values are dropped since
/// GeoJSON has no place for them.
pub fn geometry_to_geojson<G: GeometryTrait<T = f64>>(geom: &G) -> JsonValue {
    use geo_traits::GeometryType as GeoType;

    match geom.as_type() {
        GeoType::Point(point) => json!({
            "type": "Point",
            "coordinates": point_coordinates(point),
        }),
        GeoType::LineString(line) => json!({
            "type": "LineString",
            "coordinates": line_string_coordinates(line),
        }),
        GeoType::Polygon(polygon) => json!({
            "type": "Polygon",
            "coordinates": polygon_coordinates(polygon),
        }),
        GeoType::MultiPoint(multi) => json!({
            "type": "MultiPoint",
            "coordinates": multi
                .points()
                .map(|point| point_coordinates(&point))
                .collect::<Vec<_>>(),
        }),
        GeoType::MultiLineString(multi) => json!({
            "type": "MultiLineString",
            "coordinates": multi
                .line_strings()
                .map(|line| line_string_coordinates(&line))
                .collect::<Vec<_>>(),
        }),
        GeoType::MultiPolygon(multi) => json!({
            "type": "MultiPolygon",
            "coordinates": multi
                .polygons()
                .map(|polygon| polygon_coordinates(&polygon))
                .collect::<Vec<_>>(),
        }),
        GeoType::GeometryCollection(collection) => json!({
            "type": "GeometryCollection",
            "geometries": collection
                .geometries()
                .map(|geometry| geometry_to_geojson(&geometry))
                .collect::<Vec<_>>(),
        }),
        // WKB never yields the following, but they map cleanly.
        GeoType::Rect(rect) => {
            let (min, max) = (rect.min(), rect.max());
            let ring = [
                (min.x(), min.y()),
                (max.x(), min.y()),
                (max.x(), max.y()),
                (min.x(), max.y()),
                (min.x(), min.y()),
            ]
            .into_iter()
            .map(|(x, y)| vec![number(x), number(y)])
            .collect::<Vec<_>>();
            json!({ "type": "Polygon", "coordinates": [ring] })
        }
        GeoType::Triangle(triangle) => {
            let ring = vec![
                coordinate(&triangle.first()),
                coordinate(&triangle.second()),
                coordinate(&triangle.third()),
                coordinate(&triangle.first()),
            ];
            json!({ "type": "Polygon", "coordinates": [ring] })
        }
        GeoType::Line(line) => json!({
            "type": "LineString",
            "coordinates": [coordinate(&line.start()), coordinate(&line.end())],
        }),
    }
}

/// An empty point has no coordinates at all.
fn point_coordinates<P: PointTrait<T = f64>>(point: &P) -> JsonValue {
    match point.coord() {
        Some(coord) => coordinate(&coord),
        None => JsonValue::Array(Vec::new()),
    }
}

fn line_string_coordinates<L: LineStringTrait<T = f64>>(line: &L) -> Vec<JsonValue> {
    line.coords().map(|coord| coordinate(&coord)).collect()
}

fn polygon_coordinates<P: PolygonTrait<T = f64>>(polygon: &P) -> Vec<Vec<JsonValue>> {
    polygon
        .exterior()
        .into_iter()
        .chain(polygon.interiors())
        .map(|ring| line_string_coordinates(&ring))
        .collect()
}

fn coordinate<C: CoordTrait<T = f64>>(coord: &C) -> JsonValue {
    let mut values = vec![number(coord.x()), number(coord.y())];
    if matches!(coord.dim(), Dimensions::Xyz | Dimensions::Xyzm) {
        values.push(number(coord.nth_or_panic(2)));
    }
    JsonValue::Array(values)
}

// NaN and infinities are not representable in JSON.
fn number(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::geometry_to_geojson;
    use geo_types::{
        Geometry, GeometryCollection, LineString, MultiLineString, MultiPolygon, Point, Polygon,
    };
    use serde_json::json;

    fn square(offset: f64) -> Polygon {
        Polygon::new(
            LineString::from(vec![
                (offset, offset),
                (offset + 1.0, offset),
                (offset + 1.0, offset + 1.0),
                (offset, offset),
            ]),
            vec![],
        )
    }

    #[test]
    fn renders_point_lon_lat() {
        let point = Point::new(25.2797, 54.6872);
        assert_eq!(
            geometry_to_geojson(&point),
            json!({"type": "Point", "coordinates": [25.2797, 54.6872]})
        );
    }

    #[test]
    fn renders_polygon_rings() {
        let exterior = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)]);
        let polygon = Polygon::new(exterior, vec![hole]);

        assert_eq!(
            geometry_to_geojson(&polygon),
            json!({
                "type": "Polygon",
                "coordinates": [
                    [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]],
                    [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]]
                ]
            })
        );
    }

    #[test]
    fn renders_multi_geometries() {
        let multi = MultiPolygon::new(vec![square(0.0), square(10.0)]);
        let rendered = geometry_to_geojson(&multi);
        assert_eq!(rendered["type"], "MultiPolygon");
        assert_eq!(rendered["coordinates"].as_array().map(Vec::len), Some(2));
        assert_eq!(rendered["coordinates"][1][0][0], json!([10.0, 10.0]));

        let lines = MultiLineString::new(vec![LineString::from(vec![(0.0, 0.0), (1.0, 2.0)])]);
        assert_eq!(
            geometry_to_geojson(&lines),
            json!({"type": "MultiLineString", "coordinates": [[[0.0, 0.0], [1.0, 2.0]]]})
        );
    }

    #[test]
    fn renders_geometry_collection() {
        let collection = GeometryCollection::from(vec![
            Geometry::Point(Point::new(1.0, 2.0)),
            Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])),
        ]);
        assert_eq!(
            geometry_to_geojson(&collection),
            json!({
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Point", "coordinates": [1.0, 2.0]},
                    {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
                ]
            })
        );
    }

    #[test]
    fn renders_wkb_point() -> crate::Result<()> {
        let mut buf = Vec::new();
        wkb::writer::write_geometry(&mut buf, &Point::new(3.5, -1.0), &Default::default())?;
        let wkb = wkb::reader::Wkb::try_new(&buf)?;
        assert_eq!(
            geometry_to_geojson(&wkb),
            json!({"type": "Point", "coordinates": [3.5, -1.0]})
        );
        Ok(())
    }
}
