//! Saving and guarded navigation.

use super::api::{AnnotationApi, SaveFrame};
use super::convert::ShapeConverter;
use super::manager::LoadManager;
use crate::error::{ApiError, LoadError};
use crate::event::EditorEvent;
use crate::model::FrameId;

impl<A: AnnotationApi, C: ShapeConverter> LoadManager<A, C> {
    /// Send every dirty frame to the API.
    ///
    /// Dirty flags are cleared only when the API accepts the save, and only
    /// on frames not edited while the request was in flight. Returns the
    /// frames that are clean afterwards.
    pub async fn save(&self) -> Result<Vec<FrameId>, ApiError> {
        let (saved, payload) = {
            let editor = self.editor.borrow();
            let frame_ids = editor.data.dirty_frames();
            let payload: Vec<SaveFrame> = frame_ids
                .iter()
                .map(|id| SaveFrame {
                    data_id: id.clone(),
                    objects: self.converter.to_raw_shapes(&editor.data.get_all_frame_objects(id)),
                    classification_values: editor
                        .data
                        .frame(id)
                        .map(|f| f.classifications.clone())
                        .unwrap_or_default(),
                })
                .collect();
            let saved: Vec<(FrameId, u64)> = frame_ids
                .into_iter()
                .map(|id| {
                    let generation = editor.data.edit_generation(&id);
                    (id, generation)
                })
                .collect();
            (saved, payload)
        };
        if saved.is_empty() {
            return Ok(Vec::new());
        }

        if let Err(e) = self.api.save(payload).await {
            log::error!("Saving {} frames failed: {}", saved.len(), e);
            return Err(e);
        }

        let mut editor = self.editor.borrow_mut();
        let clean = editor.data.mark_saved(&saved);
        if clean.len() < saved.len() {
            log::warn!(
                "{} frames changed during the save and stay unsaved",
                saved.len() - clean.len()
            );
        }
        editor.data.emit(EditorEvent::Saved {
            frame_ids: clean.clone(),
        });
        log::info!("Saved {} frames", clean.len());
        Ok(clean)
    }

    /// Save if the active scene has changes. A failed save blocks whatever
    /// navigation asked for it, and so do edits made while the save was in
    /// flight.
    async fn save_before_leaving(&self) -> Result<(), LoadError> {
        let dirty = self.editor.borrow().has_unsaved_changes();
        if !dirty {
            return Ok(());
        }
        self.save().await.map_err(|e| {
            log::warn!("Navigation blocked, unsaved changes could not be saved");
            LoadError::from(e)
        })?;
        if self.editor.borrow().has_unsaved_changes() {
            log::warn!("Navigation blocked, frames were edited during the save");
            return Err(LoadError::ChangedDuringSave);
        }
        Ok(())
    }

    /// Move `delta` frames within the active scene.
    ///
    /// Returns `Ok(false)` if the target is out of range.
    pub async fn change_frame(&self, delta: isize) -> Result<bool, LoadError> {
        let target = {
            let editor = self.editor.borrow();
            editor
                .state
                .frame_index
                .checked_add_signed(delta)
                .filter(|i| *i < editor.state.frames.len())
        };
        let Some(target) = target else {
            log::debug!("No frame at offset {}", delta);
            return Ok(false);
        };

        self.save_before_leaving().await?;
        self.load_frame(target).await
    }

    /// Activate another scene of the record.
    pub async fn switch_scene(&self, scene_index: usize) -> Result<bool, LoadError> {
        let in_range = scene_index < self.editor.borrow().state.scene_ids.len();
        if !in_range {
            log::warn!("Scene index {} out of range", scene_index);
            return Ok(false);
        }

        self.save_before_leaving().await?;
        self.load_scene_data(scene_index).await
    }
}
