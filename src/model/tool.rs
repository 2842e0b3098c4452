//! Tool types and the instance/segmentation partition.

use serde::{Deserialize, Serialize};

/// Kind of annotation shape.
///
/// Every kind lives in exactly one [`AnnotateMode`]; use
/// [`ToolType::annotate_mode`] (or [`partition_by_mode`]) instead of comparing
/// tool types at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolType {
    /// Axis-aligned 2D rectangle
    Rect,
    /// Closed 2D polygon
    Polygon,
    /// Open 2D polyline
    Polyline,
    /// Single 2D key point
    KeyPoint,
    /// Instance segmentation mask (contour)
    Iss,
    /// 3D cuboid
    Cuboid,
    /// Closed 3D polygon
    Polygon3D,
    /// Open 3D polyline
    Polyline3D,
    /// 3D point-cloud segmentation
    Segmentation3D,
    /// Review comment bubble anchored on the frame
    Comment,
}

impl ToolType {
    /// All tool types.
    pub const ALL: [ToolType; 10] = [
        ToolType::Rect,
        ToolType::Polygon,
        ToolType::Polyline,
        ToolType::KeyPoint,
        ToolType::Iss,
        ToolType::Cuboid,
        ToolType::Polygon3D,
        ToolType::Polyline3D,
        ToolType::Segmentation3D,
        ToolType::Comment,
    ];

    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolType::Rect => "Rectangle",
            ToolType::Polygon => "Polygon",
            ToolType::Polyline => "Polyline",
            ToolType::KeyPoint => "Key Point",
            ToolType::Iss => "Instance Segmentation",
            ToolType::Cuboid => "Cuboid",
            ToolType::Polygon3D => "3D Polygon",
            ToolType::Polyline3D => "3D Polyline",
            ToolType::Segmentation3D => "3D Segmentation",
            ToolType::Comment => "Comment",
        }
    }

    /// Which shape root objects of this kind belong to.
    pub fn annotate_mode(&self) -> AnnotateMode {
        match self {
            ToolType::Iss | ToolType::Segmentation3D => AnnotateMode::Segmentation,
            ToolType::Rect
            | ToolType::Polygon
            | ToolType::Polyline
            | ToolType::KeyPoint
            | ToolType::Cuboid
            | ToolType::Polygon3D
            | ToolType::Polyline3D
            | ToolType::Comment => AnnotateMode::Instance,
        }
    }

    /// Whether this tool produces point-cloud (3D) geometry.
    pub fn is_3d(&self) -> bool {
        matches!(
            self,
            ToolType::Cuboid | ToolType::Polygon3D | ToolType::Polyline3D | ToolType::Segmentation3D
        )
    }

    /// Parse the backend's object type name.
    ///
    /// Several historical aliases map to the same tool.
    pub fn from_wire(name: &str) -> Option<Self> {
        let tool = match name.to_ascii_uppercase().as_str() {
            "RECTANGLE" | "RECT" | "BOUNDING_BOX" | "2D_RECT" | "2D_BOX" => ToolType::Rect,
            "POLYGON" => ToolType::Polygon,
            "POLYLINE" => ToolType::Polyline,
            "KEY_POINT" | "KEYPOINT" => ToolType::KeyPoint,
            "ISS" | "SEGMENTATION" => ToolType::Iss,
            "CUBOID" | "3D_BOX" => ToolType::Cuboid,
            "POLYGON_3D" | "3D_POLYGON" => ToolType::Polygon3D,
            "POLYLINE_3D" | "3D_POLYLINE" => ToolType::Polyline3D,
            "SEGMENTATION_3D" | "3D_SEGMENTATION" => ToolType::Segmentation3D,
            "COMMENT" => ToolType::Comment,
            _ => return None,
        };
        Some(tool)
    }

    /// Canonical backend name for this tool.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ToolType::Rect => "BOUNDING_BOX",
            ToolType::Polygon => "POLYGON",
            ToolType::Polyline => "POLYLINE",
            ToolType::KeyPoint => "KEY_POINT",
            ToolType::Iss => "ISS",
            ToolType::Cuboid => "CUBOID",
            ToolType::Polygon3D => "POLYGON_3D",
            ToolType::Polyline3D => "POLYLINE_3D",
            ToolType::Segmentation3D => "SEGMENTATION_3D",
            ToolType::Comment => "COMMENT",
        }
    }
}

/// Annotation mode; each loaded frame has one shape root per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnnotateMode {
    /// Discrete object instances (boxes, polygons, points, ...)
    #[default]
    Instance,
    /// Segmentation masks
    Segmentation,
}

impl AnnotateMode {
    /// Both modes, in root registration order.
    pub const ALL: [AnnotateMode; 2] = [AnnotateMode::Instance, AnnotateMode::Segmentation];
}

/// Items split by annotation mode, input order preserved inside each bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeBuckets<T> {
    /// Items routed to the instance root
    pub instance: Vec<T>,
    /// Items routed to the segmentation root
    pub segmentation: Vec<T>,
}

impl<T> Default for ModeBuckets<T> {
    fn default() -> Self {
        Self {
            instance: Vec::new(),
            segmentation: Vec::new(),
        }
    }
}

impl<T> ModeBuckets<T> {
    /// Non-empty buckets paired with their mode.
    pub fn into_non_empty(self) -> impl Iterator<Item = (AnnotateMode, Vec<T>)> {
        [
            (AnnotateMode::Instance, self.instance),
            (AnnotateMode::Segmentation, self.segmentation),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
    }

    /// Total number of items across both buckets.
    pub fn len(&self) -> usize {
        self.instance.len() + self.segmentation.len()
    }

    /// Whether both buckets are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split items into instance and segmentation buckets.
pub fn partition_by_mode<T>(
    items: impl IntoIterator<Item = T>,
    mode_of: impl Fn(&T) -> AnnotateMode,
) -> ModeBuckets<T> {
    let mut buckets = ModeBuckets::default();
    for item in items {
        match mode_of(&item) {
            AnnotateMode::Instance => buckets.instance.push(item),
            AnnotateMode::Segmentation => buckets.segmentation.push(item),
        }
    }
    buckets
}
