//! The data API collaborator and its wire records.

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::ApiError;
use crate::model::{
    ClassConfig, Classification, ClassificationValue, DataResource, Frame, FrameId, ObjectSource,
    SceneId,
};

/// Frames and grouping of an annotation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo {
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default)]
    pub is_series_frame: bool,
    /// Scene ids in record order
    #[serde(default)]
    pub scene_ids: Vec<SceneId>,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// Stored annotations of one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnnotation {
    pub data_id: FrameId,
    /// Raw object list, decoded by a [`ShapeConverter`](super::ShapeConverter)
    #[serde(default)]
    pub objects: serde_json::Value,
    #[serde(default)]
    pub classification_values: Vec<ClassificationValue>,
}

/// Save payload for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFrame {
    pub data_id: FrameId,
    pub objects: serde_json::Value,
    #[serde(default)]
    pub classification_values: Vec<ClassificationValue>,
}

/// Remote data access used by the loader.
///
/// Futures are not required to be `Send`; the engine runs on one thread.
pub trait AnnotationApi {
    fn get_info_by_record_id(
        &self,
        record_id: &str,
    ) -> impl Future<Output = Result<RecordInfo, ApiError>>;

    /// All scene ids of a dataset.
    fn get_all_scenes_from_dataset(
        &self,
        dataset_id: &str,
    ) -> impl Future<Output = Result<Vec<SceneId>, ApiError>>;

    /// Frames of one scene, for scenes not listed in the record.
    fn get_frame_series_data(
        &self,
        dataset_id: &str,
        scene_id: &str,
    ) -> impl Future<Output = Result<Vec<Frame>, ApiError>>;

    /// Stored annotations for a batch of frames. Frames without annotations
    /// may be missing from the response.
    fn get_annotation_by_data_ids(
        &self,
        frame_ids: &[FrameId],
    ) -> impl Future<Output = Result<Vec<FrameAnnotation>, ApiError>>;

    /// Model-run result sources of a frame.
    fn get_result_sources(
        &self,
        frame_id: &str,
    ) -> impl Future<Output = Result<Vec<ObjectSource>, ApiError>>;

    fn get_data_file(&self, frame_id: &str) -> impl Future<Output = Result<DataResource, ApiError>>;

    fn get_classes(&self, dataset_id: &str) -> impl Future<Output = Result<Vec<ClassConfig>, ApiError>>;

    fn get_classifications(
        &self,
        dataset_id: &str,
    ) -> impl Future<Output = Result<Vec<Classification>, ApiError>>;

    fn save(&self, frames: Vec<SaveFrame>) -> impl Future<Output = Result<(), ApiError>>;
}
