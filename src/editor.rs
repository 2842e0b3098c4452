//! The per-session coordinator.
//!
//! An [`Editor`] owns the data store, the command history and the session
//! state (active record, scene and frame). It is created once per session and
//! shared with the loader as [`SharedEditor`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::cmd::{Affected, Cmd, CmdManager};
use crate::config::EditorConfig;
use crate::data_manager::DataManager;
use crate::event::{EditorEvent, EventKind, SubscriptionId};
use crate::model::{
    AnnotateObject, ClassConfig, Classification, Frame, FrameId, Geometry, ObjectUuid, SceneId,
    TrackRegistry,
};

/// Session shared between the editor's owner and the loader.
pub type SharedEditor = Rc<RefCell<Editor>>;

/// Called after undo/redo with the frame and objects whose drawing changed.
pub type RedrawHook = Box<dyn FnMut(&FrameId, &[ObjectUuid])>;

/// Where the session currently is.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub record_id: Option<String>,
    pub dataset_id: String,
    /// Record frames are grouped into scenes (video-like sequences)
    pub is_series_frame: bool,
    pub scene_ids: Vec<SceneId>,
    pub scene_index: usize,
    pub scene_id: Option<SceneId>,
    /// Frames of the active scene, in order
    pub frames: Vec<FrameId>,
    pub frame_index: usize,
    pub classes: Vec<ClassConfig>,
    pub classifications: Vec<Classification>,
    /// Tracks of the active scene
    pub tracks: TrackRegistry,
}

pub struct Editor {
    pub data: DataManager,
    pub cmd: CmdManager,
    pub state: SessionState,
    config: EditorConfig,
    redraw: Option<RedrawHook>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            data: DataManager::new(),
            cmd: CmdManager::with_config(config.undo.history_config()),
            state: SessionState::default(),
            config,
            redraw: None,
        }
    }

    /// Wrap into the shared handle used by the loader.
    pub fn into_shared(self) -> SharedEditor {
        Rc::new(RefCell::new(self))
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn set_redraw_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&FrameId, &[ObjectUuid]) + 'static,
    {
        self.redraw = Some(Box::new(hook));
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.data.subscribe(kind, listener)
    }

    /// Forget the loaded record: frames, objects, history and session state.
    /// Subscriptions and the redraw hook are kept.
    pub fn reset(&mut self) {
        self.data.clear();
        self.data.clear_scene_map();
        self.cmd.clear();
        self.state = SessionState::default();
    }

    // ------------------------------------------------------------------
    // Navigation state
    // ------------------------------------------------------------------

    pub fn current_frame_id(&self) -> Option<&FrameId> {
        self.state.frames.get(self.state.frame_index)
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame_id().and_then(|id| self.data.frame(id))
    }

    /// Frames of the active scene.
    pub fn active_frames(&self) -> Vec<&Frame> {
        self.state
            .frames
            .iter()
            .filter_map(|id| self.data.frame(id))
            .collect()
    }

    /// Whether any frame of the active scene has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        self.active_frames().iter().any(|f| f.need_save)
    }

    pub fn class_config(&self, class_id: &str) -> Option<&ClassConfig> {
        self.state.classes.iter().find(|c| c.id == class_id)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn execute(&mut self, cmd: Cmd) -> bool {
        self.cmd.execute(cmd, &mut self.data)
    }

    pub fn undo(&mut self) -> bool {
        match self.cmd.undo(&mut self.data) {
            Some(affected) => {
                self.request_redraw(&affected);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.cmd.redo(&mut self.data) {
            Some(affected) => {
                self.request_redraw(&affected);
                true
            }
            None => false,
        }
    }

    fn request_redraw(&mut self, affected: &[Affected]) {
        let Some(hook) = self.redraw.as_mut() else {
            return;
        };
        for item in affected.iter().filter(|a| a.geometry) {
            hook(&item.frame_id, &item.uuids);
        }
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Give objects destined for `frame_id` their id, track id and a track
    /// name that is free in that frame. Returns how many objects changed.
    pub fn init_id_info(&mut self, objects: &mut [AnnotateObject], frame_id: &str) -> usize {
        let mut used = self.data.track_names(frame_id);
        self.data.assigner_mut().assign_in_frame(objects, &mut used)
    }

    // ------------------------------------------------------------------
    // Interactive operations
    // ------------------------------------------------------------------

    /// Create an object in the current frame as an undoable step and select
    /// it.
    pub fn create_object(&mut self, geometry: Geometry, class: Option<&ClassConfig>) -> Option<ObjectUuid> {
        let frame_id = self.current_frame_id()?.clone();
        if !self.data.has_frame_root(&frame_id) {
            log::warn!("Frame '{}' is not loaded, cannot create object", frame_id);
            return None;
        }

        let mut object = AnnotateObject::new(frame_id.clone(), geometry);
        if let Some(class) = class {
            object = object.with_class(&class.id, &class.name);
        }
        object.user_data.source_id = Some(self.config.loading.default_source_id.clone());
        self.init_id_info(std::slice::from_mut(&mut object), &frame_id);

        let uuid = object.uuid;
        if !self.execute(Cmd::add_objects(frame_id, vec![object])) {
            return None;
        }
        self.data.select(vec![uuid]);
        Some(uuid)
    }

    /// Delete the selected objects of the current frame as one step.
    pub fn delete_selected(&mut self) -> usize {
        let Some(frame_id) = self.current_frame_id().cloned() else {
            return 0;
        };
        let uuids: Vec<ObjectUuid> = self
            .data
            .selection()
            .iter()
            .copied()
            .filter(|uuid| self.data.has_object(&frame_id, *uuid))
            .collect();
        if uuids.is_empty() {
            return 0;
        }
        let count = uuids.len();
        if self.execute(Cmd::delete_objects(frame_id, uuids)) {
            count
        } else {
            0
        }
    }

    /// Rebuild the track aggregate from every frame of the active scene.
    pub fn update_track(&mut self) {
        let mut tracks = TrackRegistry::new();
        tracks.rebuild(
            self.state
                .frames
                .iter()
                .flat_map(|id| self.data.get_all_frame_objects(id)),
        );
        let track_count = tracks.len();
        self.state.tracks = tracks;
        log::debug!("Track registry rebuilt: {} tracks", track_count);
        self.data.emit(EditorEvent::TrackUpdated { track_count });
    }

    /// Copy the selection (or every object when nothing is selected) of the
    /// current frame into the next frame. Returns the number of copies.
    pub fn copy_forward(&mut self) -> usize {
        self.copy_to_neighbour(1, "Copy to next frame")
    }

    /// Like [`Editor::copy_forward`], towards the previous frame.
    pub fn copy_backward(&mut self) -> usize {
        self.copy_to_neighbour(-1, "Copy to previous frame")
    }

    fn copy_to_neighbour(&mut self, step: isize, name: &str) -> usize {
        let Some(source_id) = self.current_frame_id().cloned() else {
            return 0;
        };
        let Some(target_id) = self
            .state
            .frame_index
            .checked_add_signed(step)
            .and_then(|i| self.state.frames.get(i))
            .cloned()
        else {
            log::warn!("No frame at offset {} from '{}'", step, source_id);
            return 0;
        };
        if !self.data.has_frame_root(&target_id) {
            log::warn!("Frame '{}' is not loaded, nothing copied", target_id);
            return 0;
        }

        let mut copies: Vec<AnnotateObject> = {
            let selection = self.data.selection();
            let existing: HashSet<&str> = self
                .data
                .get_all_frame_objects(&target_id)
                .into_iter()
                .filter_map(|o| o.track_id())
                .collect();
            self.data
                .get_all_frame_objects(&source_id)
                .into_iter()
                .filter(|o| selection.is_empty() || selection.contains(&o.uuid))
                .filter(|o| o.track_id().is_none_or(|t| !existing.contains(t)))
                .map(|o| o.continue_in(&target_id))
                .collect()
        };
        if copies.is_empty() {
            log::debug!("Nothing to copy from '{}' to '{}'", source_id, target_id);
            return 0;
        }

        self.init_id_info(&mut copies, &target_id);
        let count = copies.len();
        let commands = copies
            .into_iter()
            .map(|object| Cmd::add_objects(target_id.clone(), vec![object]))
            .collect();
        if self.execute(Cmd::group(name, commands)) {
            count
        } else {
            0
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("data", &self.data)
            .field("cmd", &self.cmd)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("redraw", &self.redraw.is_some())
            .finish()
    }
}
