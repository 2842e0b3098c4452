//! Lazy loading of records, scenes and frame annotations.
//!
//! The editor is borrowed only between awaits. After every API call the
//! loader re-checks frame load state, so a frame cleared or loaded by another
//! pass in the meantime is left alone.

use std::collections::HashMap;

use super::api::{AnnotationApi, FrameAnnotation};
use super::convert::{JsonShapeConverter, ShapeConverter};
use crate::constants::UNSERIES_SCENE_ID;
use crate::editor::{Editor, SharedEditor};
use crate::error::LoadError;
use crate::event::EditorEvent;
use crate::model::{FrameId, LoadState, ObjectSource, SceneId, ShapeRoot, assign_classifications};

pub struct LoadManager<A, C = JsonShapeConverter> {
    pub(super) editor: SharedEditor,
    pub(super) api: A,
    pub(super) converter: C,
}

impl<A: AnnotationApi> LoadManager<A> {
    pub fn new(editor: SharedEditor, api: A) -> Self {
        Self::with_converter(editor, api, JsonShapeConverter)
    }
}

impl<A: AnnotationApi, C: ShapeConverter> LoadManager<A, C> {
    pub fn with_converter(editor: SharedEditor, api: A, converter: C) -> Self {
        Self {
            editor,
            api,
            converter,
        }
    }

    pub fn editor(&self) -> &SharedEditor {
        &self.editor
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch a record and register its frames, replacing the current session.
    pub async fn load_record(&self, record_id: &str) -> Result<(), LoadError> {
        let info = self.api.get_info_by_record_id(record_id).await?;
        if info.frames.is_empty() {
            return Err(LoadError::EmptyRecord(record_id.to_string()));
        }

        let mut scene_ids = info.scene_ids.clone();
        if scene_ids.is_empty() {
            for frame in &info.frames {
                let key = frame.scene_key();
                if !scene_ids.contains(&key) {
                    scene_ids.push(key);
                }
            }
        }
        if info.is_series_frame {
            match self.api.get_all_scenes_from_dataset(&info.dataset_id).await {
                Ok(all) if !all.is_empty() => scene_ids = widen_scenes(all, scene_ids),
                Ok(_) => {}
                Err(e) => log::warn!(
                    "Could not list scenes of dataset '{}', using record scenes: {}",
                    info.dataset_id,
                    e
                ),
            }
        }

        let mut editor = self.editor.borrow_mut();
        editor.reset();
        editor.state.record_id = Some(record_id.to_string());
        editor.state.dataset_id = info.dataset_id;
        editor.state.is_series_frame = info.is_series_frame;
        editor.state.scene_ids = scene_ids;
        let count = editor.data.set_scene_data_by_frames(info.frames);
        log::info!(
            "Loaded record '{}': {} frames, {} scenes",
            record_id,
            count,
            editor.state.scene_ids.len()
        );
        Ok(())
    }

    /// Fetch object classes and frame classification definitions.
    pub async fn load_classes(&self) -> Result<(), LoadError> {
        let dataset_id = self.editor.borrow().state.dataset_id.clone();
        let classes = self.api.get_classes(&dataset_id).await?;
        let classifications = self.api.get_classifications(&dataset_id).await?;

        let mut editor = self.editor.borrow_mut();
        log::debug!(
            "Loaded {} classes and {} classifications",
            classes.len(),
            classifications.len()
        );
        editor.state.classes = classes;
        editor.state.classifications = classifications;
        Ok(())
    }

    /// Activate the scene at `scene_index` and show its first frame.
    ///
    /// Returns `Ok(false)` for an out-of-range index. A scene that has no
    /// frames even after fetching it fails with [`LoadError::EmptyScene`].
    /// On any error the active scene and frame stay as they were.
    pub async fn load_scene_data(&self, scene_index: usize) -> Result<bool, LoadError> {
        let (scene_id, dataset_id, mut frame_ids) = {
            let editor = self.editor.borrow();
            let Some(scene_id) = editor.state.scene_ids.get(scene_index).cloned() else {
                log::warn!("Scene index {} out of range", scene_index);
                return Ok(false);
            };
            let frame_ids = editor.data.scene_frame_ids(&scene_id).to_vec();
            (scene_id, editor.state.dataset_id.clone(), frame_ids)
        };

        if frame_ids.is_empty() && scene_id != UNSERIES_SCENE_ID {
            log::info!("Fetching frames of scene '{}'", scene_id);
            let frames = self.api.get_frame_series_data(&dataset_id, &scene_id).await?;
            let frames = frames.into_iter().map(|mut frame| {
                if frame.scene_id.is_none() {
                    frame.scene_id = Some(scene_id.clone());
                }
                frame
            });
            let mut editor = self.editor.borrow_mut();
            editor.data.set_scene_data_by_frames(frames);
            frame_ids = editor.data.scene_frame_ids(&scene_id).to_vec();
        }

        if frame_ids.is_empty() {
            log::warn!("Scene '{}' has no frames, staying on the current scene", scene_id);
            return Err(LoadError::EmptyScene { scene_id });
        }

        // Load everything before touching the session, so a failure leaves
        // the current scene displayed
        let is_series = self.editor.borrow().state.is_series_frame;
        if is_series {
            // Series scenes need every frame for track continuity
            self.load_frames_data(&frame_ids).await?;
        }
        let first = frame_ids[0].clone();
        self.load_frame_content(&first).await?;

        let mut editor = self.editor.borrow_mut();
        editor.state.scene_index = scene_index;
        editor.state.scene_id = Some(scene_id.clone());
        editor.state.frames = frame_ids.clone();
        if is_series {
            editor.update_track();
        }
        show_frame(&mut editor, first, 0);
        editor.data.emit(EditorEvent::SceneLoaded {
            scene_id: scene_id.clone(),
        });
        log::info!("Scene '{}' ready ({} frames)", scene_id, frame_ids.len());
        Ok(true)
    }

    /// Load annotation payloads of frames that are not loaded yet.
    ///
    /// Returns the frames that were materialized by this call. Per-frame
    /// conversion failures mark that frame [`LoadState::Failed`]; a failed
    /// batch request marks every requested frame failed and is returned.
    /// `AnnotationsLoaded` lists the loaded and the failed frames, never
    /// the ones cleared while the request was in flight.
    pub async fn load_frames_data(&self, frame_ids: &[FrameId]) -> Result<Vec<FrameId>, LoadError> {
        let pending: Vec<FrameId> = {
            let mut editor = self.editor.borrow_mut();
            let mut pending = Vec::new();
            for id in frame_ids {
                if editor.data.frame(id).is_none() {
                    log::warn!("Unknown frame '{}', not loading", id);
                    continue;
                }
                if editor.data.load_state(id).is_settled() || editor.data.has_objects(id) {
                    continue;
                }
                if !pending.contains(id) {
                    editor.data.set_load_state(id, LoadState::Loading);
                    pending.push(id.clone());
                }
            }
            pending
        };
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        log::debug!("Requesting annotations for {} frames", pending.len());
        let payloads = match self.api.get_annotation_by_data_ids(&pending).await {
            Ok(payloads) => payloads,
            Err(e) => {
                log::error!("Annotation request for {} frames failed: {}", pending.len(), e);
                let mut editor = self.editor.borrow_mut();
                for id in &pending {
                    if editor.data.load_state(id) == LoadState::Loading {
                        editor.data.set_load_state(id, LoadState::Failed);
                    }
                }
                return Err(e.into());
            }
        };
        let mut by_frame: HashMap<FrameId, FrameAnnotation> = payloads
            .into_iter()
            .map(|payload| (payload.data_id.clone(), payload))
            .collect();

        let mut guard = self.editor.borrow_mut();
        let editor = &mut *guard;
        let mut loaded = Vec::with_capacity(pending.len());
        // Loaded frames plus the ones whose payload failed to convert
        let mut processed = Vec::with_capacity(pending.len());
        for id in &pending {
            if editor.data.load_state(id) != LoadState::Loading {
                log::debug!("Frame '{}' changed while loading, skipping", id);
                continue;
            }
            if editor.data.has_frame_root(id) {
                // Leftovers of a failed attempt
                editor.data.clear_frame(id);
            }
            editor.data.set_frame_root(id, ShapeRoot::pair(id));

            let Some(payload) = by_frame.remove(id) else {
                editor.data.set_load_state(id, LoadState::Empty);
                loaded.push(id.clone());
                processed.push(id.clone());
                continue;
            };

            let mut objects = match self.converter.convert_raw_shapes(id, &payload.objects) {
                Ok(objects) => objects,
                Err(e) => {
                    log::warn!("Failed to convert annotations of frame '{}': {}", id, e);
                    editor.data.set_load_state(id, LoadState::Failed);
                    processed.push(id.clone());
                    continue;
                }
            };

            let mut used = editor.data.track_names(id);
            editor.data.assigner_mut().assign_in_frame(&mut objects, &mut used);
            for object in &mut objects {
                object.attrs.selectable = true;
            }
            let count = editor.data.insert_loaded(objects, id);

            let classifications =
                assign_classifications(&editor.state.classifications, payload.classification_values);
            if let Some(frame) = editor.data.frame_mut(id) {
                frame.classifications = classifications;
            }

            let state = if count == 0 { LoadState::Empty } else { LoadState::Loaded };
            editor.data.set_load_state(id, state);
            loaded.push(id.clone());
            processed.push(id.clone());
        }

        log::info!("Loaded annotations for {}/{} frames", loaded.len(), pending.len());
        editor.data.emit(EditorEvent::AnnotationsLoaded { frame_ids: processed });
        Ok(loaded)
    }

    /// Show the active scene's frame at `index`: fetch its resource, its
    /// annotations and, if enabled, its result sources.
    ///
    /// The frame index only moves once the frame has loaded.
    pub async fn load_frame(&self, index: usize) -> Result<bool, LoadError> {
        let Some(frame_id) = self.editor.borrow().state.frames.get(index).cloned() else {
            log::warn!("Frame index {} out of range", index);
            return Ok(false);
        };

        self.load_frame_content(&frame_id).await?;
        show_frame(&mut self.editor.borrow_mut(), frame_id, index);
        Ok(true)
    }

    async fn load_frame_content(&self, frame_id: &FrameId) -> Result<(), LoadError> {
        match self.api.get_data_file(frame_id).await {
            Ok(resource) => {
                let mut editor = self.editor.borrow_mut();
                if let Some(frame) = editor.data.frame_mut(frame_id) {
                    frame.annotation_status = resource.annotation_status;
                    frame.valid_status = resource.valid_status;
                }
            }
            Err(e) => log::warn!("No resource for frame '{}': {}", frame_id, e),
        }

        self.load_frames_data(std::slice::from_ref(frame_id)).await?;

        let load_sources = self.editor.borrow().config().loading.load_result_sources;
        if load_sources {
            self.load_result_sources(std::slice::from_ref(frame_id)).await;
        }
        Ok(())
    }

    /// Fetch result sources of each frame, with the manual-annotation source
    /// first. Returns how many frames got their sources.
    pub async fn load_result_sources(&self, frame_ids: &[FrameId]) -> usize {
        let default_id = self.editor.borrow().config().loading.default_source_id.clone();
        let mut count = 0;
        for frame_id in frame_ids {
            match self.api.get_result_sources(frame_id).await {
                Ok(sources) => {
                    let manual = ObjectSource {
                        source_id: default_id.clone(),
                        ..ObjectSource::without_task(frame_id)
                    };
                    let all = std::iter::once(manual).chain(sources).collect();
                    self.editor.borrow_mut().data.set_sources(frame_id, all);
                    count += 1;
                }
                Err(e) => log::warn!("Could not load sources of frame '{}': {}", frame_id, e),
            }
        }
        count
    }
}

fn show_frame(editor: &mut Editor, frame_id: FrameId, index: usize) {
    editor.state.frame_index = index;
    editor.data.clear_selection();
    editor.data.emit(EditorEvent::FrameChanged { frame_id, index });
}

/// Dataset scene order, followed by record scenes the dataset listing missed.
fn widen_scenes(all: Vec<SceneId>, record: Vec<SceneId>) -> Vec<SceneId> {
    let mut scenes = all;
    for id in record {
        if !scenes.contains(&id) {
            scenes.push(id);
        }
    }
    scenes
}
