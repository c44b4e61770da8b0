//! GeoJSON rendering of a walk's accepted trajectory.

use crate::models::WalkPoint;
use geo::LineString;
use geojson::{Feature, Geometry, JsonObject, Value};
use uuid::Uuid;

/// Accepted points as a line in `(lon, lat)` order.
pub fn route_line(points: &[WalkPoint]) -> LineString<f64> {
    points
        .iter()
        .map(|p| (p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into()
}

/// A `Feature` with a `LineString` geometry and the walk ID as property.
///
/// Walks with fewer than two points still produce a feature; the
/// coordinates array is just short (or empty).
pub fn route_feature(walk_id: Uuid, points: &[WalkPoint]) -> Feature {
    let line = route_line(points);

    let mut properties = JsonObject::new();
    properties.insert("walk_id".to_string(), walk_id.to_string().into());

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
