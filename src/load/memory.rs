//! [`AnnotationApi`] backed by a JSON fixture.
//!
//! Used by the replay binary and by tests. Every request is served from
//! memory; saves are recorded instead of sent.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::api::{AnnotationApi, FrameAnnotation, RecordInfo, SaveFrame};
use crate::error::ApiError;
use crate::model::{
    ClassConfig, Classification, DataResource, Frame, FrameId, ObjectSource, SceneId,
};

/// Recorded backend state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub record_id: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default)]
    pub is_series_frame: bool,
    /// Frames listed in the record
    #[serde(default)]
    pub frames: Vec<Frame>,
    /// Every scene of the dataset, in dataset order
    #[serde(default)]
    pub dataset_scenes: Vec<SceneId>,
    /// Frames served on demand for scenes outside the record
    #[serde(default)]
    pub scene_frames: BTreeMap<SceneId, Vec<Frame>>,
    #[serde(default)]
    pub annotations: Vec<FrameAnnotation>,
    #[serde(default)]
    pub sources: BTreeMap<FrameId, Vec<ObjectSource>>,
    #[serde(default)]
    pub resources: BTreeMap<FrameId, DataResource>,
    #[serde(default)]
    pub classes: Vec<ClassConfig>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
}

#[derive(Debug, Default)]
pub struct InMemoryApi {
    fixture: Fixture,
    fail_save: Cell<bool>,
    saved: RefCell<Vec<SaveFrame>>,
    annotation_requests: RefCell<Vec<Vec<FrameId>>>,
}

impl InMemoryApi {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    /// Make subsequent saves fail with a network error.
    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.set(fail);
    }

    /// Frames received by successful saves, in order.
    pub fn saved(&self) -> Vec<SaveFrame> {
        self.saved.borrow().clone()
    }

    /// Frame ids of every annotation batch request, in order.
    pub fn annotation_requests(&self) -> Vec<Vec<FrameId>> {
        self.annotation_requests.borrow().clone()
    }

    fn check_dataset(&self, dataset_id: &str) -> Result<(), ApiError> {
        if dataset_id == self.fixture.dataset_id {
            Ok(())
        } else {
            Err(ApiError::not_found(format!("dataset {}", dataset_id)))
        }
    }
}

impl AnnotationApi for InMemoryApi {
    async fn get_info_by_record_id(&self, record_id: &str) -> Result<RecordInfo, ApiError> {
        if record_id != self.fixture.record_id {
            return Err(ApiError::not_found(format!("record {}", record_id)));
        }
        let mut scene_ids: Vec<SceneId> = Vec::new();
        for frame in &self.fixture.frames {
            let key = frame.scene_key();
            if !scene_ids.contains(&key) {
                scene_ids.push(key);
            }
        }
        Ok(RecordInfo {
            dataset_id: self.fixture.dataset_id.clone(),
            is_series_frame: self.fixture.is_series_frame,
            scene_ids,
            frames: self.fixture.frames.clone(),
        })
    }

    async fn get_all_scenes_from_dataset(&self, dataset_id: &str) -> Result<Vec<SceneId>, ApiError> {
        self.check_dataset(dataset_id)?;
        Ok(self.fixture.dataset_scenes.clone())
    }

    async fn get_frame_series_data(&self, dataset_id: &str, scene_id: &str) -> Result<Vec<Frame>, ApiError> {
        self.check_dataset(dataset_id)?;
        Ok(self.fixture.scene_frames.get(scene_id).cloned().unwrap_or_default())
    }

    async fn get_annotation_by_data_ids(&self, frame_ids: &[FrameId]) -> Result<Vec<FrameAnnotation>, ApiError> {
        self.annotation_requests.borrow_mut().push(frame_ids.to_vec());
        Ok(self
            .fixture
            .annotations
            .iter()
            .filter(|a| frame_ids.contains(&a.data_id))
            .cloned()
            .collect())
    }

    async fn get_result_sources(&self, frame_id: &str) -> Result<Vec<ObjectSource>, ApiError> {
        Ok(self.fixture.sources.get(frame_id).cloned().unwrap_or_default())
    }

    async fn get_data_file(&self, frame_id: &str) -> Result<DataResource, ApiError> {
        self.fixture
            .resources
            .get(frame_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("resource of frame {}", frame_id)))
    }

    async fn get_classes(&self, dataset_id: &str) -> Result<Vec<ClassConfig>, ApiError> {
        self.check_dataset(dataset_id)?;
        Ok(self.fixture.classes.clone())
    }

    async fn get_classifications(&self, dataset_id: &str) -> Result<Vec<Classification>, ApiError> {
        self.check_dataset(dataset_id)?;
        Ok(self.fixture.classifications.clone())
    }

    async fn save(&self, frames: Vec<SaveFrame>) -> Result<(), ApiError> {
        if self.fail_save.get() {
            return Err(ApiError::network("save rejected by test fixture"));
        }
        self.saved.borrow_mut().extend(frames);
        Ok(())
    }
}
