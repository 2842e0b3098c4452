//! Per-frame, per-mode object containers.

use super::{AnnotateMode, AnnotateObject, FrameId, ObjectUuid};

/// Objects of one annotation mode for one frame, in insertion order.
///
/// Contents can only be changed from inside the crate; external code goes
/// through [`DataManager`](crate::DataManager) so changes stay observable.
#[derive(Debug, Clone)]
pub struct ShapeRoot {
    frame_id: FrameId,
    mode: AnnotateMode,
    objects: Vec<AnnotateObject>,
}

impl ShapeRoot {
    pub fn new(frame_id: impl Into<FrameId>, mode: AnnotateMode) -> Self {
        Self {
            frame_id: frame_id.into(),
            mode,
            objects: Vec::new(),
        }
    }

    /// The instance and segmentation roots of a frame.
    pub fn pair(frame_id: &FrameId) -> [ShapeRoot; 2] {
        AnnotateMode::ALL.map(|mode| ShapeRoot::new(frame_id.clone(), mode))
    }

    pub fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }

    pub fn mode(&self) -> AnnotateMode {
        self.mode
    }

    pub fn objects(&self) -> &[AnnotateObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, uuid: ObjectUuid) -> bool {
        self.objects.iter().any(|o| o.uuid == uuid)
    }

    pub fn get(&self, uuid: ObjectUuid) -> Option<&AnnotateObject> {
        self.objects.iter().find(|o| o.uuid == uuid)
    }

    pub(crate) fn get_mut(&mut self, uuid: ObjectUuid) -> Option<&mut AnnotateObject> {
        self.objects.iter_mut().find(|o| o.uuid == uuid)
    }

    pub(crate) fn add_objects(&mut self, objects: Vec<AnnotateObject>) {
        self.objects.extend(objects);
    }

    /// Remove objects by uuid, returning the removed ones in root order.
    pub(crate) fn remove_objects(&mut self, uuids: &[ObjectUuid]) -> Vec<AnnotateObject> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.objects.len());
        for object in self.objects.drain(..) {
            if uuids.contains(&object.uuid) {
                removed.push(object);
            } else {
                kept.push(object);
            }
        }
        self.objects = kept;
        removed
    }
}
