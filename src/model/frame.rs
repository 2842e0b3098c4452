//! Frames and frame-level metadata.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SOURCE_ID, DEFAULT_SOURCE_NAME, UNSERIES_SCENE_ID};

use super::{SourceType, ToolType};

/// Stable external frame identifier.
pub type FrameId = String;

/// Scene grouping key.
pub type SceneId = String;

/// One labelable unit: an image or a point-cloud capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: FrameId,
    #[serde(default)]
    pub dataset_id: String,
    /// Scene key; `None` for frames that are not part of a series
    #[serde(default)]
    pub scene_id: Option<SceneId>,
    #[serde(default)]
    pub name: String,
    /// Dirty flag, set by every mutation and cleared by a successful save
    #[serde(default)]
    pub need_save: bool,
    #[serde(default)]
    pub annotation_status: Option<String>,
    #[serde(default)]
    pub valid_status: Option<String>,
    #[serde(default)]
    pub classifications: Vec<ClassificationValue>,
}

impl Frame {
    pub fn new(id: impl Into<FrameId>) -> Self {
        Self {
            id: id.into(),
            dataset_id: String::new(),
            scene_id: None,
            name: String::new(),
            need_save: false,
            annotation_status: None,
            valid_status: None,
            classifications: Vec::new(),
        }
    }

    /// Set the scene (builder style).
    pub fn in_scene(mut self, scene_id: impl Into<SceneId>) -> Self {
        self.scene_id = Some(scene_id.into());
        self
    }

    /// Scene key, falling back to the ungrouped sentinel.
    pub fn scene_key(&self) -> SceneId {
        match self.scene_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => UNSERIES_SCENE_ID.to_string(),
        }
    }
}

/// How far a frame's annotation payload has been materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Never requested
    #[default]
    NotLoaded,
    /// Request in flight
    Loading,
    /// Roots registered and at least one object added
    Loaded,
    /// Roots registered, payload had no objects
    Empty,
    /// Request or conversion failed; may be retried
    Failed,
}

impl LoadState {
    /// Whether a load pass should skip this frame.
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadState::Loading | LoadState::Loaded | LoadState::Empty)
    }
}

/// Frame-level classification value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationValue {
    pub classification_id: String,
    #[serde(default)]
    pub values: serde_json::Value,
}

/// Dataset-level classification definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// Object class definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub tool_type: Option<ToolType>,
}

/// Where a frame's annotations came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSource {
    pub source_id: String,
    pub name: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub frame_id: FrameId,
}

impl ObjectSource {
    /// Source entry for manual annotations, listed first for every frame.
    pub fn without_task(frame_id: &FrameId) -> Self {
        Self {
            source_id: DEFAULT_SOURCE_ID.to_string(),
            name: DEFAULT_SOURCE_NAME.to_string(),
            source_type: SourceType::DataFlow,
            frame_id: frame_id.clone(),
        }
    }
}

/// Per-frame resource description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResource {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub annotation_status: Option<String>,
    #[serde(default)]
    pub valid_status: Option<String>,
}

/// Keep only classification values whose definition exists in the dataset.
pub fn assign_classifications(
    definitions: &[Classification],
    values: Vec<ClassificationValue>,
) -> Vec<ClassificationValue> {
    values
        .into_iter()
        .filter(|v| definitions.iter().any(|d| d.id == v.classification_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_key_fallback() {
        assert_eq!(Frame::new("a").scene_key(), UNSERIES_SCENE_ID);
        assert_eq!(Frame::new("a").in_scene("").scene_key(), UNSERIES_SCENE_ID);
        assert_eq!(Frame::new("a").in_scene("s1").scene_key(), "s1");
    }

    #[test]
    fn test_frame_deserializes_wire_names() {
        let frame: Frame =
            serde_json::from_str(r#"{"id":"10","datasetId":"3","sceneId":"s1","name":"img.jpg"}"#)
                .unwrap();
        assert_eq!(frame.dataset_id, "3");
        assert_eq!(frame.scene_key(), "s1");
        assert!(!frame.need_save);
    }

    #[test]
    fn test_assign_classifications_drops_unknown() {
        let defs = vec![Classification {
            id: "weather".into(),
            name: "Weather".into(),
            required: false,
        }];
        let values = vec![
            ClassificationValue {
                classification_id: "weather".into(),
                values: serde_json::json!(["sunny"]),
            },
            ClassificationValue {
                classification_id: "gone".into(),
                values: serde_json::Value::Null,
            },
        ];
        let kept = assign_classifications(&defs, values);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].classification_id, "weather");
    }
}
