//! Conversion between backend object records and [`AnnotateObject`]s.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConvertError;
use crate::model::{
    AnnotateObject, FrameId, Geometry, Point2, Point3, Rect, SourceType, ToolType, Transform,
    UserData,
};

/// Decodes raw annotation payloads and encodes objects for saving.
pub trait ShapeConverter {
    /// Decode a frame's raw object list. Individual unusable objects are
    /// skipped; a payload that is not a list is an error.
    fn convert_raw_shapes(
        &self,
        frame_id: &FrameId,
        raw: &serde_json::Value,
    ) -> Result<Vec<AnnotateObject>, ConvertError>;

    /// Encode objects into the raw list format.
    fn to_raw_shapes(&self, objects: &[&AnnotateObject]) -> serde_json::Value;
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl RawPoint {
    fn flat(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    fn spatial(self) -> Point3 {
        Point3::new(self.x, self.y, self.z.unwrap_or(0.0))
    }
}

impl From<Point2> for RawPoint {
    fn from(p: Point2) -> Self {
        Self { x: p.x, y: p.y, z: None }
    }
}

impl From<Point3> for RawPoint {
    fn from(p: Point3) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: Some(p.z),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContour {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<RawPoint>,
    #[serde(default, rename = "center3D", skip_serializing_if = "Option::is_none")]
    pub center_3d: Option<RawPoint>,
    #[serde(default, rename = "size3D", skip_serializing_if = "Option::is_none")]
    pub size_3d: Option<RawPoint>,
    #[serde(default, rename = "rotation3D", skip_serializing_if = "Option::is_none")]
    pub rotation_3d: Option<RawPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClassValue {
    pub id: String,
    pub value: serde_json::Value,
}

/// One backend object record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObject {
    /// Front-end object id
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    /// Backend record id
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub back_id: Option<String>,
    #[serde(rename = "type")]
    pub tool: String,
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default, alias = "className")]
    pub class_type: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_type: Option<SourceType>,
    #[serde(default, alias = "modelConfidence")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub class_values: Vec<RawClassValue>,
    #[serde(default)]
    pub contour: RawContour,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

/// A saved list item: the record plus the ids the backend keys it by.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObjectEnvelope {
    pub class_attributes: RawObject,
    pub class_id: Option<String>,
    pub front_id: Option<String>,
    /// Backend record id; `None` for objects the backend has not stored yet
    pub id: Option<String>,
    pub source_id: Option<String>,
    pub source_type: Option<SourceType>,
}

/// Ids arrive as strings or as plain numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(wire_id))
}

fn wire_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn outer_str(envelope: &serde_json::Value, key: &str) -> Option<String> {
    envelope.get(key).and_then(wire_id)
}

// ============================================================================
// JSON converter
// ============================================================================

/// Converter for the backend's JSON object schema.
///
/// List items may be bare object records or wrapped as
/// `{"classAttributes": {...}, "id": ..., "frontId": ...}`, where the outer
/// `id` is the backend record id. Objects are always encoded wrapped.
/// Wire ids stay in [`UserData`]; every decoded object gets a fresh uuid.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonShapeConverter;

impl JsonShapeConverter {
    pub fn new() -> Self {
        Self
    }

    fn decode(&self, frame_id: &FrameId, raw: RawObject) -> Result<AnnotateObject, ConvertError> {
        let tool = ToolType::from_wire(&raw.tool).ok_or_else(|| ConvertError::UnsupportedTool(raw.tool.clone()))?;
        let geometry = geometry_from_contour(tool, &raw.contour)?;

        let mut object = AnnotateObject::new(frame_id.clone(), geometry);
        object.transform = raw.transform.unwrap_or_default();
        object.user_data = UserData {
            id: raw.id,
            back_id: raw.back_id,
            track_id: raw.track_id,
            track_name: raw.track_name,
            class_id: raw.class_id,
            class_type: raw.class_type,
            source_id: raw.source_id,
            source_type: raw.source_type.unwrap_or_default(),
            confidence: raw.confidence,
            attrs: raw.class_values.into_iter().map(|v| (v.id, v.value)).collect(),
            modified: false,
        };
        Ok(object)
    }

    fn encode(&self, object: &AnnotateObject) -> RawObjectEnvelope {
        let data = &object.user_data;
        let front_id = data.id.clone().unwrap_or_else(|| object.uuid.to_string());
        let record = RawObject {
            id: Some(front_id.clone()),
            back_id: data.back_id.clone(),
            tool: object.tool_type().wire_name().to_string(),
            track_id: data.track_id.clone(),
            track_name: data.track_name.clone(),
            class_id: data.class_id.clone(),
            class_type: data.class_type.clone(),
            source_id: data.source_id.clone(),
            source_type: Some(data.source_type),
            confidence: data.confidence,
            class_values: data
                .attrs
                .iter()
                .map(|(id, value)| RawClassValue {
                    id: id.clone(),
                    value: value.clone(),
                })
                .collect(),
            contour: contour_from_geometry(&object.geometry),
            transform: (object.transform != Transform::default()).then_some(object.transform),
        };
        RawObjectEnvelope {
            class_id: data.class_id.clone(),
            front_id: Some(front_id),
            id: data.back_id.clone(),
            source_id: data.source_id.clone(),
            source_type: Some(data.source_type),
            class_attributes: record,
        }
    }
}

impl ShapeConverter for JsonShapeConverter {
    fn convert_raw_shapes(
        &self,
        frame_id: &FrameId,
        raw: &serde_json::Value,
    ) -> Result<Vec<AnnotateObject>, ConvertError> {
        let items = match raw {
            serde_json::Value::Null => return Ok(Vec::new()),
            serde_json::Value::Array(items) => items,
            other => {
                return Err(ConvertError::invalid_payload(format!(
                    "expected an object list, got {}",
                    json_kind(other)
                )));
            }
        };

        let mut objects = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let (record, envelope) = match item.get("classAttributes") {
                Some(inner) => (inner, Some(item)),
                None => (item, None),
            };
            let decoded = RawObject::deserialize(record)
                .map_err(ConvertError::from)
                .map(|mut raw| {
                    if let Some(envelope) = envelope {
                        raw.back_id = raw.back_id.or_else(|| outer_str(envelope, "id"));
                        raw.id = raw.id.or_else(|| outer_str(envelope, "frontId"));
                        raw.source_id = raw.source_id.or_else(|| outer_str(envelope, "sourceId"));
                    }
                    raw
                })
                .and_then(|raw| self.decode(frame_id, raw));
            match decoded {
                Ok(object) => objects.push(object),
                Err(e) => log::warn!("Skipping object {} of frame '{}': {}", index, frame_id, e),
            }
        }
        Ok(objects)
    }

    fn to_raw_shapes(&self, objects: &[&AnnotateObject]) -> serde_json::Value {
        let records: Vec<RawObjectEnvelope> = objects.iter().map(|o| self.encode(o)).collect();
        serde_json::to_value(records).unwrap_or_else(|e| {
            log::error!("Failed to encode objects: {}", e);
            serde_json::Value::Array(Vec::new())
        })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

fn require_points(tool: ToolType, points: &[RawPoint], min: usize) -> Result<(), ConvertError> {
    if points.len() < min {
        return Err(ConvertError::invalid_geometry(
            tool.name(),
            format!("needs at least {} points, got {}", min, points.len()),
        ));
    }
    Ok(())
}

fn geometry_from_contour(tool: ToolType, contour: &RawContour) -> Result<Geometry, ConvertError> {
    let points = &contour.points;
    let flat = || points.iter().map(|p| p.flat()).collect::<Vec<_>>();
    let spatial = || points.iter().map(|p| p.spatial()).collect::<Vec<_>>();

    let geometry = match tool {
        ToolType::Rect => {
            require_points(tool, points, 2)?;
            Geometry::Rect(bounding_rect(points))
        }
        ToolType::Polygon => {
            require_points(tool, points, 3)?;
            Geometry::Polygon { points: flat() }
        }
        ToolType::Polyline => {
            require_points(tool, points, 2)?;
            Geometry::Polyline { points: flat() }
        }
        ToolType::KeyPoint => {
            require_points(tool, points, 1)?;
            Geometry::KeyPoint { point: points[0].flat() }
        }
        ToolType::Iss => {
            require_points(tool, points, 3)?;
            Geometry::Mask { points: flat() }
        }
        ToolType::Cuboid => {
            let (Some(center), Some(size)) = (contour.center_3d, contour.size_3d) else {
                return Err(ConvertError::invalid_geometry(tool.name(), "missing center or size"));
            };
            Geometry::Cuboid {
                center: center.spatial(),
                size: size.spatial(),
                rotation: contour.rotation_3d.unwrap_or_default().spatial(),
            }
        }
        ToolType::Polygon3D => {
            require_points(tool, points, 3)?;
            Geometry::Polygon3D { points: spatial() }
        }
        ToolType::Polyline3D => {
            require_points(tool, points, 2)?;
            Geometry::Polyline3D { points: spatial() }
        }
        ToolType::Segmentation3D => {
            require_points(tool, points, 1)?;
            Geometry::Segmentation3D { points: spatial() }
        }
        ToolType::Comment => {
            require_points(tool, points, 1)?;
            Geometry::Comment { anchor: points[0].flat() }
        }
    };
    Ok(geometry)
}

fn bounding_rect(points: &[RawPoint]) -> Rect {
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

fn contour_from_geometry(geometry: &Geometry) -> RawContour {
    let flat = |points: &[Point2]| -> Vec<RawPoint> { points.iter().copied().map(RawPoint::from).collect() };
    let spatial = |points: &[Point3]| -> Vec<RawPoint> { points.iter().copied().map(RawPoint::from).collect() };

    match geometry {
        Geometry::Rect(r) => RawContour {
            points: vec![
                Point2::new(r.x, r.y).into(),
                Point2::new(r.x + r.width, r.y + r.height).into(),
            ],
            ..Default::default()
        },
        Geometry::Polygon { points } | Geometry::Polyline { points } | Geometry::Mask { points } => RawContour {
            points: flat(points),
            ..Default::default()
        },
        Geometry::KeyPoint { point } | Geometry::Comment { anchor: point } => RawContour {
            points: vec![(*point).into()],
            ..Default::default()
        },
        Geometry::Cuboid { center, size, rotation } => RawContour {
            center_3d: Some((*center).into()),
            size_3d: Some((*size).into()),
            rotation_3d: Some((*rotation).into()),
            ..Default::default()
        },
        Geometry::Polygon3D { points } | Geometry::Polyline3D { points } | Geometry::Segmentation3D { points } => {
            RawContour {
                points: spatial(points),
                ..Default::default()
            }
        }
    }
}
