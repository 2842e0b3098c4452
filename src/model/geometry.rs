//! Geometry payloads and transforms of annotation objects.

use serde::{Deserialize, Serialize};

use super::ToolType;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A 3D point in point-cloud coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the box
    pub width: f32,
    /// Height of the box
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Tool-specific geometry. The variant determines the object's [`ToolType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    Rect(Rect),
    Polygon { points: Vec<Point2> },
    Polyline { points: Vec<Point2> },
    KeyPoint { point: Point2 },
    /// Instance segmentation contour
    Mask { points: Vec<Point2> },
    Cuboid {
        center: Point3,
        size: Point3,
        rotation: Point3,
    },
    Polygon3D { points: Vec<Point3> },
    Polyline3D { points: Vec<Point3> },
    Segmentation3D { points: Vec<Point3> },
    Comment { anchor: Point2 },
}

/// A single editable vertex, flat or spatial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Vertex {
    Flat(Point2),
    Spatial(Point3),
}

impl Geometry {
    /// Tool type implied by the geometry variant.
    pub fn tool_type(&self) -> ToolType {
        match self {
            Geometry::Rect(_) => ToolType::Rect,
            Geometry::Polygon { .. } => ToolType::Polygon,
            Geometry::Polyline { .. } => ToolType::Polyline,
            Geometry::KeyPoint { .. } => ToolType::KeyPoint,
            Geometry::Mask { .. } => ToolType::Iss,
            Geometry::Cuboid { .. } => ToolType::Cuboid,
            Geometry::Polygon3D { .. } => ToolType::Polygon3D,
            Geometry::Polyline3D { .. } => ToolType::Polyline3D,
            Geometry::Segmentation3D { .. } => ToolType::Segmentation3D,
            Geometry::Comment { .. } => ToolType::Comment,
        }
    }

    /// Number of editable vertices.
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Polygon { points }
            | Geometry::Polyline { points }
            | Geometry::Mask { points } => points.len(),
            Geometry::Polygon3D { points }
            | Geometry::Polyline3D { points }
            | Geometry::Segmentation3D { points } => points.len(),
            Geometry::KeyPoint { .. } | Geometry::Comment { .. } => 1,
            Geometry::Rect(_) | Geometry::Cuboid { .. } => 0,
        }
    }

    /// Read a vertex by index.
    pub fn vertex(&self, index: usize) -> Option<Vertex> {
        match self {
            Geometry::Polygon { points }
            | Geometry::Polyline { points }
            | Geometry::Mask { points } => points.get(index).copied().map(Vertex::Flat),
            Geometry::Polygon3D { points }
            | Geometry::Polyline3D { points }
            | Geometry::Segmentation3D { points } => {
                points.get(index).copied().map(Vertex::Spatial)
            }
            Geometry::KeyPoint { point } if index == 0 => Some(Vertex::Flat(*point)),
            Geometry::Comment { anchor } if index == 0 => Some(Vertex::Flat(*anchor)),
            _ => None,
        }
    }

    /// Overwrite a vertex. Returns `false` if the index is out of range or the
    /// vertex dimension does not match the geometry.
    pub fn set_vertex(&mut self, index: usize, vertex: Vertex) -> bool {
        let slot_2d = match self {
            Geometry::Polygon { points }
            | Geometry::Polyline { points }
            | Geometry::Mask { points } => points.get_mut(index),
            Geometry::KeyPoint { point } if index == 0 => Some(point),
            Geometry::Comment { anchor } if index == 0 => Some(anchor),
            Geometry::Polygon3D { points }
            | Geometry::Polyline3D { points }
            | Geometry::Segmentation3D { points } => {
                return match (points.get_mut(index), vertex) {
                    (Some(slot), Vertex::Spatial(p)) => {
                        *slot = p;
                        true
                    }
                    _ => false,
                };
            }
            _ => None,
        };
        match (slot_2d, vertex) {
            (Some(slot), Vertex::Flat(p)) => {
                *slot = p;
                true
            }
            _ => false,
        }
    }
}

/// Placement of a shape on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Rotation in degrees
    pub rotation: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }
}

/// Partial transform update. Only `Some` fields are written.
///
/// `width` / `height` resize rectangle geometry and are ignored for other
/// shapes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub rotation: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl TransformPatch {
    /// Patch that moves a shape to a position.
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that resizes a rectangle.
    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Overlay another patch on top of this one (later values win).
    pub fn merge(&mut self, later: &TransformPatch) {
        self.x = later.x.or(self.x);
        self.y = later.y.or(self.y);
        self.scale_x = later.scale_x.or(self.scale_x);
        self.scale_y = later.scale_y.or(self.scale_y);
        self.rotation = later.rotation.or(self.rotation);
        self.width = later.width.or(self.width);
        self.height = later.height.or(self.height);
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
