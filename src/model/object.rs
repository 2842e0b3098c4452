//! Annotation objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{
    AnnotateMode, FrameId, Geometry, ToolType, Transform, TransformPatch, UserData,
};

/// Process-local object identifier. Generated on creation, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectUuid(pub Uuid);

impl ObjectUuid {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render and interaction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAttrs {
    pub visible: bool,
    pub selectable: bool,
    pub draggable: bool,
}

impl Default for ObjectAttrs {
    fn default() -> Self {
        Self {
            visible: true,
            selectable: true,
            draggable: false,
        }
    }
}

/// One annotated shape instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateObject {
    pub uuid: ObjectUuid,
    pub frame_id: FrameId,
    pub geometry: Geometry,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub attrs: ObjectAttrs,
    #[serde(default)]
    pub user_data: UserData,
}

impl AnnotateObject {
    /// Create an object with a fresh uuid and no identity yet.
    pub fn new(frame_id: impl Into<FrameId>, geometry: Geometry) -> Self {
        Self {
            uuid: ObjectUuid::new(),
            frame_id: frame_id.into(),
            geometry,
            transform: Transform::default(),
            attrs: ObjectAttrs::default(),
            user_data: UserData::default(),
        }
    }

    /// Set the track name (builder style).
    pub fn with_track_name(mut self, name: impl Into<String>) -> Self {
        self.user_data.track_name = Some(name.into());
        self
    }

    /// Set the cross-frame track id (builder style).
    pub fn with_track_id(mut self, track_id: impl Into<String>) -> Self {
        self.user_data.track_id = Some(track_id.into());
        self
    }

    /// Set the class (builder style).
    pub fn with_class(mut self, class_id: impl Into<String>, class_type: impl Into<String>) -> Self {
        self.user_data.class_id = Some(class_id.into());
        self.user_data.class_type = Some(class_type.into());
        self
    }

    pub fn tool_type(&self) -> ToolType {
        self.geometry.tool_type()
    }

    /// Shape root this object belongs to.
    pub fn mode(&self) -> AnnotateMode {
        self.tool_type().annotate_mode()
    }

    pub fn track_name(&self) -> Option<&str> {
        self.user_data.track_name.as_deref()
    }

    pub fn track_id(&self) -> Option<&str> {
        self.user_data.track_id.as_deref()
    }

    /// Current values of the fields a patch would write.
    pub fn capture_transform(&self, patch: &TransformPatch) -> TransformPatch {
        let rect = match &self.geometry {
            Geometry::Rect(rect) => Some(rect),
            _ => None,
        };
        TransformPatch {
            x: patch.x.map(|_| self.transform.x),
            y: patch.y.map(|_| self.transform.y),
            scale_x: patch.scale_x.map(|_| self.transform.scale_x),
            scale_y: patch.scale_y.map(|_| self.transform.scale_y),
            rotation: patch.rotation.map(|_| self.transform.rotation),
            width: patch.width.and(rect.map(|r| r.width)),
            height: patch.height.and(rect.map(|r| r.height)),
        }
    }

    /// Write the `Some` fields of a patch.
    pub fn apply_transform(&mut self, patch: &TransformPatch) {
        if let Some(x) = patch.x {
            self.transform.x = x;
        }
        if let Some(y) = patch.y {
            self.transform.y = y;
        }
        if let Some(scale_x) = patch.scale_x {
            self.transform.scale_x = scale_x;
        }
        if let Some(scale_y) = patch.scale_y {
            self.transform.scale_y = scale_y;
        }
        if let Some(rotation) = patch.rotation {
            self.transform.rotation = rotation;
        }
        if let Geometry::Rect(rect) = &mut self.geometry {
            if let Some(width) = patch.width {
                rect.width = width;
            }
            if let Some(height) = patch.height {
                rect.height = height;
            }
        }
    }

    /// Copy of this object for another frame: fresh uuid, same track.
    pub fn continue_in(&self, frame_id: &FrameId) -> Self {
        let mut copy = self.clone();
        copy.uuid = ObjectUuid::new();
        copy.frame_id = frame_id.clone();
        copy.user_data.id = None;
        copy.user_data.back_id = None;
        copy.user_data.modified = true;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Point2, Rect};

    #[test]
    fn test_capture_then_apply_restores() {
        let mut object = AnnotateObject::new("f1", Geometry::Rect(Rect::new(0.0, 0.0, 10.0, 20.0)));
        let mut patch = TransformPatch::position(5.0, 6.0);
        patch.width = Some(30.0);

        let before = object.capture_transform(&patch);
        assert_eq!(before.x, Some(0.0));
        assert_eq!(before.width, Some(10.0));
        assert_eq!(before.height, None);

        object.apply_transform(&patch);
        assert_eq!(object.transform.x, 5.0);
        assert_eq!(object.geometry, Geometry::Rect(Rect::new(0.0, 0.0, 30.0, 20.0)));

        object.apply_transform(&before);
        assert_eq!(object.transform, Transform::default());
        assert_eq!(object.geometry, Geometry::Rect(Rect::new(0.0, 0.0, 10.0, 20.0)));
    }

    #[test]
    fn test_width_ignored_for_non_rect() {
        let object = AnnotateObject::new(
            "f1",
            Geometry::KeyPoint {
                point: Point2::new(1.0, 1.0),
            },
        );
        let captured = object.capture_transform(&TransformPatch::size(3.0, 3.0));
        assert!(captured.is_empty());
    }

    #[test]
    fn test_continue_in_keeps_track() {
        let mut object = AnnotateObject::new("f1", Geometry::Rect(Rect::new(0.0, 0.0, 1.0, 1.0)))
            .with_track_id("t-1")
            .with_track_name("7");
        object.user_data.back_id = Some("77".to_string());
        let next = object.continue_in(&"f2".to_string());
        assert_ne!(next.uuid, object.uuid);
        assert_eq!(next.frame_id, "f2");
        assert_eq!(next.track_id(), Some("t-1"));
        assert_eq!(next.track_name(), Some("7"));
        assert_eq!(next.user_data.id, None);
        assert_eq!(next.user_data.back_id, None);
    }
}
