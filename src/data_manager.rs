//! Authoritative store for frames, scenes and annotation objects.
//!
//! All changes to shape-root contents go through [`DataManager`] so that it can
//! keep the per-frame invariants (distinct uuids, distinct track names) and
//! emit change notifications.

use std::collections::{HashMap, HashSet};

use crate::error::CmdError;
use crate::event::{ChangeKind, EditorEvent, EventBus, EventKind, SubscriptionId};
use crate::identity::TrackAssigner;
use crate::model::{
    AnnotateMode, AnnotateObject, Frame, FrameId, LoadState, ObjectSource, ObjectUuid, SceneId,
    ShapeRoot, TransformPatch, UserData, UserDataPatch, Vertex, partition_by_mode,
};

/// The two shape roots of one frame.
#[derive(Debug, Clone)]
struct FrameRoots {
    instance: ShapeRoot,
    segmentation: ShapeRoot,
}

impl FrameRoots {
    fn get(&self, mode: AnnotateMode) -> &ShapeRoot {
        match mode {
            AnnotateMode::Instance => &self.instance,
            AnnotateMode::Segmentation => &self.segmentation,
        }
    }

    fn get_mut(&mut self, mode: AnnotateMode) -> &mut ShapeRoot {
        match mode {
            AnnotateMode::Instance => &mut self.instance,
            AnnotateMode::Segmentation => &mut self.segmentation,
        }
    }

    fn objects(&self) -> impl Iterator<Item = &AnnotateObject> {
        self.instance
            .objects()
            .iter()
            .chain(self.segmentation.objects().iter())
    }

    fn find(&self, uuid: ObjectUuid) -> Option<&AnnotateObject> {
        self.instance.get(uuid).or_else(|| self.segmentation.get(uuid))
    }

    fn find_mut(&mut self, uuid: ObjectUuid) -> Option<&mut AnnotateObject> {
        if self.instance.contains(uuid) {
            self.instance.get_mut(uuid)
        } else {
            self.segmentation.get_mut(uuid)
        }
    }

    fn is_empty(&self) -> bool {
        self.instance.is_empty() && self.segmentation.is_empty()
    }
}

/// Frames, scenes, objects and per-frame metadata of one editor session.
#[derive(Debug, Default)]
pub struct DataManager {
    frames: HashMap<FrameId, Frame>,
    /// Scenes in registration order
    scene_map: Vec<(SceneId, Vec<FrameId>)>,
    roots: HashMap<FrameId, FrameRoots>,
    load_states: HashMap<FrameId, LoadState>,
    sources: HashMap<FrameId, Vec<ObjectSource>>,
    /// Bumped on every change that dirties the frame
    edit_generations: HashMap<FrameId, u64>,
    selection: Vec<ObjectUuid>,
    assigner: TrackAssigner,
    events: EventBus,
}

impl DataManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn emit(&mut self, event: EditorEvent) {
        self.events.emit(event);
    }

    pub fn assigner_mut(&mut self) -> &mut TrackAssigner {
        &mut self.assigner
    }

    // ------------------------------------------------------------------
    // Scenes and frames
    // ------------------------------------------------------------------

    /// Merge frames into the scene map.
    ///
    /// Scenes missing from `frames` are kept. Frame ids already known are
    /// ignored, so registering the same list twice is a no-op. Returns the
    /// number of newly registered frames.
    pub fn set_scene_data_by_frames(&mut self, frames: impl IntoIterator<Item = Frame>) -> usize {
        let mut added = 0;
        for frame in frames {
            if self.frames.contains_key(&frame.id) {
                continue;
            }
            let key = frame.scene_key();
            match self.scene_map.iter_mut().find(|(id, _)| *id == key) {
                Some((_, ids)) => ids.push(frame.id.clone()),
                None => self.scene_map.push((key, vec![frame.id.clone()])),
            }
            self.frames.insert(frame.id.clone(), frame);
            added += 1;
        }
        log::debug!(
            "Registered {} new frames ({} scenes known)",
            added,
            self.scene_map.len()
        );
        added
    }

    /// Frame ids of a scene in order; empty if the scene is unknown.
    pub fn scene_frame_ids(&self, scene_id: &str) -> &[FrameId] {
        self.scene_map
            .iter()
            .find(|(id, _)| id == scene_id)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Frames of a scene in order; empty means "not loaded yet".
    pub fn get_frames_by_scene_id(&self, scene_id: &str) -> Vec<&Frame> {
        self.scene_frame_ids(scene_id)
            .iter()
            .filter_map(|id| self.frames.get(id))
            .collect()
    }

    pub fn get_frames_by_scene_index(&self, index: usize) -> Vec<&Frame> {
        match self.scene_map.get(index) {
            Some((scene_id, _)) => self.get_frames_by_scene_id(scene_id),
            None => Vec::new(),
        }
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = &SceneId> {
        self.scene_map.iter().map(|(id, _)| id)
    }

    /// All registered frames, scene by scene.
    pub fn all_frames(&self) -> impl Iterator<Item = &Frame> {
        self.scene_map
            .iter()
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.frames.get(id))
    }

    pub fn frame(&self, frame_id: &str) -> Option<&Frame> {
        self.frames.get(frame_id)
    }

    pub fn frame_mut(&mut self, frame_id: &str) -> Option<&mut Frame> {
        self.frames.get_mut(frame_id)
    }

    pub fn clear_scene_map(&mut self) {
        self.scene_map.clear();
        self.frames.clear();
    }

    // ------------------------------------------------------------------
    // Shape roots
    // ------------------------------------------------------------------

    pub fn has_frame_root(&self, frame_id: &str) -> bool {
        self.roots.contains_key(frame_id)
    }

    /// Register the instance and segmentation roots of a frame.
    ///
    /// Returns `false` (and changes nothing) if the frame already has roots or
    /// the pair is not one root per mode for this frame.
    pub fn set_frame_root(&mut self, frame_id: &FrameId, roots: [ShapeRoot; 2]) -> bool {
        if self.roots.contains_key(frame_id) {
            log::warn!("Frame '{}' already has shape roots, ignoring", frame_id);
            return false;
        }
        if roots.iter().any(|r| r.frame_id() != frame_id) {
            log::warn!("Shape roots do not belong to frame '{}'", frame_id);
            return false;
        }
        let [a, b] = roots;
        let pair = match (a.mode(), b.mode()) {
            (AnnotateMode::Instance, AnnotateMode::Segmentation) => FrameRoots {
                instance: a,
                segmentation: b,
            },
            (AnnotateMode::Segmentation, AnnotateMode::Instance) => FrameRoots {
                instance: b,
                segmentation: a,
            },
            _ => {
                log::warn!("Frame '{}' needs one root per annotation mode", frame_id);
                return false;
            }
        };
        self.roots.insert(frame_id.clone(), pair);
        true
    }

    pub fn frame_root(&self, frame_id: &str, mode: AnnotateMode) -> Option<&ShapeRoot> {
        self.roots.get(frame_id).map(|r| r.get(mode))
    }

    /// Objects of one mode, `None` if the frame has no roots.
    pub fn get_frame_objects(&self, frame_id: &str, mode: AnnotateMode) -> Option<&[AnnotateObject]> {
        self.frame_root(frame_id, mode).map(|r| r.objects())
    }

    /// Objects of both modes for a frame (instance first).
    ///
    /// Anything that treats "all annotations" of a frame uniformly must use
    /// this rather than a single root.
    pub fn get_all_frame_objects(&self, frame_id: &str) -> Vec<&AnnotateObject> {
        self.roots
            .get(frame_id)
            .map(|r| r.objects().collect())
            .unwrap_or_default()
    }

    pub fn get_object(&self, frame_id: &str, uuid: ObjectUuid) -> Option<&AnnotateObject> {
        self.roots.get(frame_id).and_then(|r| r.find(uuid))
    }

    pub fn has_object(&self, frame_id: &str, uuid: ObjectUuid) -> bool {
        self.get_object(frame_id, uuid).is_some()
    }

    /// Look an object up in any loaded frame.
    pub fn find_object(&self, uuid: ObjectUuid) -> Option<&AnnotateObject> {
        self.roots.values().find_map(|r| r.find(uuid))
    }

    /// Track names currently used in a frame.
    pub fn track_names(&self, frame_id: &str) -> HashSet<String> {
        self.get_all_frame_objects(frame_id)
            .into_iter()
            .filter_map(|o| o.user_data.track_name.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Object membership
    // ------------------------------------------------------------------

    /// Route objects into the frame's roots, keeping uuids and track names
    /// unique. Returns the uuids actually inserted.
    fn insert_objects(&mut self, objects: Vec<AnnotateObject>, frame_id: &FrameId) -> Vec<ObjectUuid> {
        let mut used_names = self.track_names(frame_id);
        let Some(roots) = self.roots.get_mut(frame_id) else {
            log::warn!("No shape roots for frame '{}', dropping {} objects", frame_id, objects.len());
            return Vec::new();
        };

        let mut accepted = Vec::with_capacity(objects.len());
        for mut object in objects {
            if roots.find(object.uuid).is_some() || accepted.iter().any(|o: &AnnotateObject| o.uuid == object.uuid) {
                log::warn!("Object {} already in frame '{}', skipping", object.uuid, frame_id);
                continue;
            }
            object.frame_id = frame_id.clone();
            if let Some(name) = object.user_data.track_name.clone() {
                if used_names.contains(&name) {
                    let renamed = self.assigner.next_track_name(&used_names);
                    log::warn!(
                        "Track name '{}' already used in frame '{}', renamed to '{}'",
                        name,
                        frame_id,
                        renamed
                    );
                    object.user_data.track_name = Some(renamed);
                }
            }
            if let Some(name) = &object.user_data.track_name {
                used_names.insert(name.clone());
            }
            accepted.push(object);
        }

        let uuids: Vec<ObjectUuid> = accepted.iter().map(|o| o.uuid).collect();
        for (mode, bucket) in partition_by_mode(accepted, |o| o.mode()).into_non_empty() {
            roots.get_mut(mode).add_objects(bucket);
        }
        uuids
    }

    /// Add objects to a frame, mark it dirty and notify observers.
    pub fn add_annotates(&mut self, objects: Vec<AnnotateObject>, frame_id: &FrameId) -> Vec<ObjectUuid> {
        let uuids = self.insert_objects(objects, frame_id);
        if !uuids.is_empty() {
            self.mark_dirty(frame_id);
            self.events.emit(EditorEvent::AnnotateAdded {
                frame_id: frame_id.clone(),
                uuids: uuids.clone(),
            });
        }
        uuids
    }

    /// Add freshly loaded objects; the frame stays clean and no per-object
    /// event is emitted (loaders announce the whole batch instead).
    pub(crate) fn insert_loaded(&mut self, objects: Vec<AnnotateObject>, frame_id: &FrameId) -> usize {
        self.insert_objects(objects, frame_id).len()
    }

    /// Remove objects from a frame. Returns the removed objects.
    pub fn remove_annotates(&mut self, uuids: &[ObjectUuid], frame_id: &FrameId) -> Vec<AnnotateObject> {
        let Some(roots) = self.roots.get_mut(frame_id) else {
            log::warn!("No shape roots for frame '{}', nothing removed", frame_id);
            return Vec::new();
        };

        let present: Vec<(ObjectUuid, AnnotateMode)> = uuids
            .iter()
            .filter_map(|uuid| roots.find(*uuid).map(|o| (o.uuid, o.mode())))
            .collect();
        let mut removed = Vec::with_capacity(present.len());
        for (mode, bucket) in partition_by_mode(present, |(_, mode)| *mode).into_non_empty() {
            let ids: Vec<ObjectUuid> = bucket.into_iter().map(|(uuid, _)| uuid).collect();
            removed.extend(roots.get_mut(mode).remove_objects(&ids));
        }
        if removed.is_empty() {
            return removed;
        }

        let before = self.selection.len();
        self.selection.retain(|uuid| !uuids.contains(uuid));
        if self.selection.len() != before {
            self.events.emit(EditorEvent::SelectionChanged {
                selection: self.selection.clone(),
            });
        }

        self.mark_dirty(frame_id);
        self.events.emit(EditorEvent::AnnotateRemoved {
            frame_id: frame_id.clone(),
            uuids: removed.iter().map(|o| o.uuid).collect(),
        });
        removed
    }

    // ------------------------------------------------------------------
    // Object changes
    // ------------------------------------------------------------------

    fn require_objects(&self, frame_id: &FrameId, uuids: &[ObjectUuid]) -> Result<(), CmdError> {
        let roots = self
            .roots
            .get(frame_id)
            .ok_or_else(|| CmdError::FrameNotLoaded(frame_id.clone()))?;
        match uuids.iter().find(|uuid| roots.find(**uuid).is_none()) {
            Some(missing) => Err(CmdError::missing_object(*missing, frame_id)),
            None => Ok(()),
        }
    }

    fn object_mut(&mut self, frame_id: &str, uuid: ObjectUuid) -> Option<&mut AnnotateObject> {
        self.roots.get_mut(frame_id).and_then(|r| r.find_mut(uuid))
    }

    fn on_changed(&mut self, frame_id: &FrameId, uuids: Vec<ObjectUuid>, change: ChangeKind) {
        for uuid in &uuids {
            if let Some(object) = self.object_mut(frame_id, *uuid) {
                object.user_data.modified = true;
            }
        }
        self.mark_dirty(frame_id);
        self.events.emit(EditorEvent::AnnotateChanged {
            frame_id: frame_id.clone(),
            uuids,
            change,
        });
    }

    /// Apply transform patches (one per object). All objects must exist or
    /// nothing changes. Returns each object's previous values for the patched
    /// fields.
    pub fn set_annotates_transform(
        &mut self,
        frame_id: &FrameId,
        updates: &[(ObjectUuid, TransformPatch)],
    ) -> Result<Vec<TransformPatch>, CmdError> {
        let uuids: Vec<ObjectUuid> = updates.iter().map(|(uuid, _)| *uuid).collect();
        self.require_objects(frame_id, &uuids)?;

        let mut previous = Vec::with_capacity(updates.len());
        for (uuid, patch) in updates {
            if let Some(object) = self.object_mut(frame_id, *uuid) {
                previous.push(object.capture_transform(patch));
                object.apply_transform(patch);
            }
        }
        self.on_changed(frame_id, uuids, ChangeKind::Transform);
        Ok(previous)
    }

    /// Move a single vertex. Returns the previous vertex.
    pub fn set_annotate_vertex(
        &mut self,
        frame_id: &FrameId,
        uuid: ObjectUuid,
        index: usize,
        vertex: Vertex,
    ) -> Result<Vertex, CmdError> {
        self.require_objects(frame_id, &[uuid])?;
        let object = self
            .object_mut(frame_id, uuid)
            .ok_or_else(|| CmdError::missing_object(uuid, frame_id))?;
        let previous = object
            .geometry
            .vertex(index)
            .ok_or(CmdError::VertexOutOfRange { uuid, index })?;
        if !object.geometry.set_vertex(index, vertex) {
            return Err(CmdError::VertexOutOfRange { uuid, index });
        }
        self.on_changed(frame_id, vec![uuid], ChangeKind::Vertex);
        Ok(previous)
    }

    fn check_track_name(
        &self,
        frame_id: &FrameId,
        name: &str,
        owners: &[ObjectUuid],
    ) -> Result<(), CmdError> {
        let taken = self
            .get_all_frame_objects(frame_id)
            .into_iter()
            .any(|o| o.track_name() == Some(name) && !owners.contains(&o.uuid));
        if taken {
            Err(CmdError::TrackNameTaken(name.to_string()))
        } else {
            Ok(())
        }
    }

    /// Patch user data. Renaming a track to a name used by another object of
    /// the frame, or giving several objects the same name, is rejected.
    /// Returns the previous user data of each object.
    pub fn set_annotates_user_data(
        &mut self,
        frame_id: &FrameId,
        uuids: &[ObjectUuid],
        patch: &UserDataPatch,
    ) -> Result<Vec<UserData>, CmdError> {
        self.require_objects(frame_id, uuids)?;
        if let Some(name) = &patch.track_name {
            if uuids.len() > 1 {
                return Err(CmdError::TrackNameTaken(name.clone()));
            }
            self.check_track_name(frame_id, name, uuids)?;
        }

        let mut previous = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            if let Some(object) = self.object_mut(frame_id, *uuid) {
                previous.push(object.user_data.clone());
                patch.apply(&mut object.user_data);
            }
        }
        self.on_changed(frame_id, uuids.to_vec(), ChangeKind::UserData);
        Ok(previous)
    }

    /// Put back whole user-data snapshots.
    pub fn restore_user_data(
        &mut self,
        frame_id: &FrameId,
        snapshots: &[(ObjectUuid, UserData)],
    ) -> Result<(), CmdError> {
        let uuids: Vec<ObjectUuid> = snapshots.iter().map(|(uuid, _)| *uuid).collect();
        self.require_objects(frame_id, &uuids)?;
        for (_, data) in snapshots {
            if let Some(name) = &data.track_name {
                self.check_track_name(frame_id, name, &uuids)?;
            }
        }
        for (uuid, data) in snapshots {
            if let Some(object) = self.object_mut(frame_id, *uuid) {
                object.user_data = data.clone();
            }
        }
        self.mark_dirty(frame_id);
        self.events.emit(EditorEvent::AnnotateChanged {
            frame_id: frame_id.clone(),
            uuids,
            change: ChangeKind::UserData,
        });
        Ok(())
    }

    /// Show or hide objects. Returns how many objects were found.
    pub fn set_annotates_visible(&mut self, frame_id: &FrameId, uuids: &[ObjectUuid], visible: bool) -> usize {
        let mut found = Vec::new();
        for uuid in uuids {
            if let Some(object) = self.object_mut(frame_id, *uuid) {
                object.attrs.visible = visible;
                found.push(*uuid);
            }
        }
        let count = found.len();
        if count > 0 {
            self.events.emit(EditorEvent::AnnotateChanged {
                frame_id: frame_id.clone(),
                uuids: found,
                change: ChangeKind::Visibility,
            });
        }
        count
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select(&mut self, uuids: Vec<ObjectUuid>) {
        if self.selection == uuids {
            return;
        }
        self.selection = uuids;
        self.events.emit(EditorEvent::SelectionChanged {
            selection: self.selection.clone(),
        });
    }

    pub fn selection(&self) -> &[ObjectUuid] {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.select(Vec::new());
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    pub fn set_sources(&mut self, frame_id: &FrameId, sources: Vec<ObjectSource>) {
        self.sources.insert(frame_id.clone(), sources);
    }

    pub fn get_sources(&self, frame_id: &str) -> Option<&[ObjectSource]> {
        self.sources.get(frame_id).map(Vec::as_slice)
    }

    /// Forget sources of one frame, or of every frame.
    pub fn clear_sources(&mut self, frame_id: Option<&str>) {
        match frame_id {
            Some(id) => {
                self.sources.remove(id);
            }
            None => self.sources.clear(),
        }
    }

    // ------------------------------------------------------------------
    // Load state and persistence bookkeeping
    // ------------------------------------------------------------------

    pub fn load_state(&self, frame_id: &str) -> LoadState {
        self.load_states.get(frame_id).copied().unwrap_or_default()
    }

    pub fn set_load_state(&mut self, frame_id: &FrameId, state: LoadState) {
        self.load_states.insert(frame_id.clone(), state);
    }

    /// Whether the frame's roots hold at least one object.
    pub fn has_objects(&self, frame_id: &str) -> bool {
        self.roots.get(frame_id).is_some_and(|r| !r.is_empty())
    }

    fn mark_dirty(&mut self, frame_id: &str) {
        if let Some(frame) = self.frames.get_mut(frame_id) {
            frame.need_save = true;
            *self.edit_generations.entry(frame.id.clone()).or_default() += 1;
        }
    }

    /// Counter of changes made to a frame; compare two readings to tell
    /// whether the frame changed in between.
    pub fn edit_generation(&self, frame_id: &str) -> u64 {
        self.edit_generations.get(frame_id).copied().unwrap_or_default()
    }

    /// Frames with unsaved changes, in scene order.
    pub fn dirty_frames(&self) -> Vec<FrameId> {
        self.all_frames()
            .filter(|f| f.need_save)
            .map(|f| f.id.clone())
            .collect()
    }

    /// Clear the dirty flag of frames saved at the given edit generation.
    ///
    /// Frames edited after their generation was read stay dirty. Returns the
    /// frames that are clean now.
    pub fn mark_saved(&mut self, saved: &[(FrameId, u64)]) -> Vec<FrameId> {
        let mut clean = Vec::with_capacity(saved.len());
        for (id, generation) in saved {
            if self.edit_generation(id) != *generation {
                log::debug!("Frame '{}' changed while saving, keeping it dirty", id);
                continue;
            }
            if let Some(frame) = self.frames.get_mut(id) {
                frame.need_save = false;
                clean.push(id.clone());
            }
        }
        clean
    }

    /// Drop a frame's roots, sources and load state so it can be loaded
    /// again.
    pub fn clear_frame(&mut self, frame_id: &str) {
        if let Some(roots) = self.roots.remove(frame_id) {
            let gone: Vec<ObjectUuid> = roots.objects().map(|o| o.uuid).collect();
            let before = self.selection.len();
            self.selection.retain(|uuid| !gone.contains(uuid));
            if before != self.selection.len() {
                self.events.emit(EditorEvent::SelectionChanged {
                    selection: self.selection.clone(),
                });
            }
        }
        self.sources.remove(frame_id);
        self.load_states.remove(frame_id);
    }

    /// Drop every frame's objects and metadata; the scene map is kept.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.sources.clear();
        self.load_states.clear();
        self.clear_selection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Geometry, Point2, Rect};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rect(frame: &str, name: &str) -> AnnotateObject {
        AnnotateObject::new(frame, Geometry::Rect(Rect::new(0.0, 0.0, 10.0, 10.0))).with_track_name(name)
    }

    fn mask(frame: &str, name: &str) -> AnnotateObject {
        AnnotateObject::new(
            frame,
            Geometry::Mask {
                points: vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(4.0, 4.0)],
            },
        )
        .with_track_name(name)
    }

    fn loaded(frame_ids: &[&str]) -> DataManager {
        let mut data = DataManager::new();
        data.set_scene_data_by_frames(frame_ids.iter().map(|id| Frame::new(*id).in_scene("s1")));
        for id in frame_ids {
            let id = id.to_string();
            assert!(data.set_frame_root(&id, ShapeRoot::pair(&id)));
        }
        data
    }

    #[test]
    fn test_scene_registration_is_idempotent() {
        let frames = vec![
            Frame::new("1").in_scene("a"),
            Frame::new("2").in_scene("a"),
            Frame::new("3"),
        ];
        let mut data = DataManager::new();
        assert_eq!(data.set_scene_data_by_frames(frames.clone()), 3);
        assert_eq!(data.set_scene_data_by_frames(frames), 0);

        let ids: Vec<&str> = data.get_frames_by_scene_id("a").iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(data.get_frames_by_scene_id(crate::constants::UNSERIES_SCENE_ID).len(), 1);
        assert!(data.get_frames_by_scene_id("missing").is_empty());
    }

    #[test]
    fn test_merge_keeps_previous_scenes() {
        let mut data = DataManager::new();
        data.set_scene_data_by_frames(vec![Frame::new("1").in_scene("a")]);
        data.set_scene_data_by_frames(vec![Frame::new("9").in_scene("b")]);
        assert_eq!(data.get_frames_by_scene_index(0)[0].id, "1");
        assert_eq!(data.get_frames_by_scene_index(1)[0].id, "9");
        assert!(data.get_frames_by_scene_index(2).is_empty());
    }

    #[test]
    fn test_double_root_registration_is_rejected() {
        let mut data = loaded(&["f1"]);
        let id = "f1".to_string();
        data.add_annotates(vec![rect("f1", "1")], &id);
        assert!(!data.set_frame_root(&id, ShapeRoot::pair(&id)));
        assert_eq!(data.get_all_frame_objects("f1").len(), 1);
    }

    #[test]
    fn test_cross_mode_query() {
        let mut data = loaded(&["f2"]);
        let id = "f2".to_string();
        let r = rect("f2", "1");
        let m = mask("f2", "2");
        let (r_uuid, m_uuid) = (r.uuid, m.uuid);
        data.add_annotates(vec![r, m], &id);

        let all: Vec<ObjectUuid> = data.get_all_frame_objects("f2").iter().map(|o| o.uuid).collect();
        assert_eq!(all, vec![r_uuid, m_uuid]);

        let instance = data.get_frame_objects("f2", AnnotateMode::Instance).unwrap();
        assert_eq!(instance.len(), 1);
        assert_eq!(instance[0].uuid, r_uuid);
    }

    #[test]
    fn test_add_without_roots_is_noop() {
        let mut data = DataManager::new();
        data.set_scene_data_by_frames(vec![Frame::new("f1")]);
        let added = data.add_annotates(vec![rect("f1", "1")], &"f1".to_string());
        assert!(added.is_empty());
        assert!(!data.frame("f1").unwrap().need_save);
    }

    #[test]
    fn test_colliding_track_name_is_regenerated() {
        let mut data = loaded(&["f1"]);
        let id = "f1".to_string();
        data.add_annotates(vec![rect("f1", "1"), rect("f1", "1"), mask("f1", "1")], &id);
        assert_eq!(data.track_names("f1").len(), 3);
    }

    #[test]
    fn test_remove_updates_selection_and_events() {
        let mut data = loaded(&["f1"]);
        let id = "f1".to_string();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        data.events_mut().subscribe_all(move |e| sink.borrow_mut().push(e.kind()));

        let m = mask("f1", "1");
        let uuid = m.uuid;
        data.add_annotates(vec![m], &id);
        data.select(vec![uuid]);
        let removed = data.remove_annotates(&[uuid], &id);

        assert_eq!(removed.len(), 1);
        assert!(data.selection().is_empty());
        assert!(data.get_all_frame_objects("f1").is_empty());
        assert_eq!(
            *events.borrow(),
            vec![
                EventKind::AnnotateAdded,
                EventKind::SelectionChanged,
                EventKind::SelectionChanged,
                EventKind::AnnotateRemoved,
            ]
        );
    }

    #[test]
    fn test_transform_is_all_or_nothing() {
        let mut data = loaded(&["f1"]);
        let id = "f1".to_string();
        let r = rect("f1", "1");
        let uuid = r.uuid;
        data.add_annotates(vec![r], &id);
        data.mark_saved(&[(id.clone(), data.edit_generation(&id))]);

        let result = data.set_annotates_transform(
            &id,
            &[
                (uuid, TransformPatch::position(5.0, 5.0)),
                (ObjectUuid::new(), TransformPatch::position(1.0, 1.0)),
            ],
        );
        assert!(matches!(result, Err(CmdError::MissingObject { .. })));
        assert_eq!(data.get_object("f1", uuid).unwrap().transform.x, 0.0);
        assert!(!data.frame("f1").unwrap().need_save);
    }

    #[test]
    fn test_rename_to_taken_track_name_rejected() {
        let mut data = loaded(&["f1"]);
        let id = "f1".to_string();
        let a = rect("f1", "1");
        let b = rect("f1", "2");
        let b_uuid = b.uuid;
        data.add_annotates(vec![a, b], &id);

        let result = data.set_annotates_user_data(&id, &[b_uuid], &UserDataPatch::track_name("1"));
        assert_eq!(result, Err(CmdError::TrackNameTaken("1".into())));
        assert_eq!(data.get_object("f1", b_uuid).unwrap().track_name(), Some("2"));

        let previous = data
            .set_annotates_user_data(&id, &[b_uuid], &UserDataPatch::track_name("3"))
            .unwrap();
        assert_eq!(previous[0].track_name.as_deref(), Some("2"));
        assert!(data.get_object("f1", b_uuid).unwrap().user_data.modified);
    }

    #[test]
    fn test_clear_frame_resets_load_state() {
        let mut data = loaded(&["f1"]);
        let id = "f1".to_string();
        data.set_load_state(&id, LoadState::Loaded);
        data.set_sources(&id, vec![ObjectSource::without_task(&id)]);
        data.clear_frame("f1");
        assert!(!data.has_frame_root("f1"));
        assert_eq!(data.load_state("f1"), LoadState::NotLoaded);
        assert!(data.get_sources("f1").is_none());
        assert!(data.frame("f1").is_some());
    }

    #[test]
    fn test_mark_saved_skips_frames_edited_since() {
        let mut data = loaded(&["f1", "f2"]);
        let (f1, f2) = ("f1".to_string(), "f2".to_string());
        data.add_annotates(vec![rect("f1", "1")], &f1);
        data.add_annotates(vec![rect("f2", "1")], &f2);
        let saved = vec![(f1.clone(), data.edit_generation(&f1)), (f2.clone(), data.edit_generation(&f2))];

        // Edit lands between reading the payload and the save completing
        data.add_annotates(vec![rect("f2", "2")], &f2);
        let clean = data.mark_saved(&saved);

        assert_eq!(clean, vec![f1]);
        assert_eq!(data.dirty_frames(), vec![f2]);
    }
}
