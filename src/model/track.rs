//! Track identity carried in an object's user data, and scene-wide track
//! aggregation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{AnnotateObject, FrameId};

/// Provenance of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Drawn or edited by a person
    #[default]
    DataFlow,
    /// Produced by a model inference run
    Model,
    /// Imported from an external file
    External,
}

/// Per-object user data: identity triple, class and provenance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Globally unique object id, assigned once
    pub id: Option<String>,
    /// Record id given by the backend; unset until the object was stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_id: Option<String>,
    /// Cross-frame linking key
    pub track_id: Option<String>,
    /// Display name, unique inside one frame
    pub track_name: Option<String>,
    pub class_id: Option<String>,
    pub class_type: Option<String>,
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_type: SourceType,
    pub confidence: Option<f32>,
    /// Attribute values keyed by attribute id
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
    /// Set once the object was changed in this session
    #[serde(default)]
    pub modified: bool,
}

impl UserData {
    /// Whether all three identity fields are present.
    pub fn has_identity(&self) -> bool {
        self.id.is_some() && self.track_id.is_some() && self.track_name.is_some()
    }
}

/// Partial user-data update. Only `Some` fields are written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDataPatch {
    pub class_id: Option<String>,
    pub class_type: Option<String>,
    pub track_name: Option<String>,
    pub confidence: Option<f32>,
    /// Attribute values to insert or overwrite
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl UserDataPatch {
    /// Patch that reassigns the object's class.
    pub fn class(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class_id: Some(id.into()),
            class_type: Some(name.into()),
            ..Self::default()
        }
    }

    /// Patch that renames the track.
    pub fn track_name(name: impl Into<String>) -> Self {
        Self {
            track_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Apply to user data in place.
    pub fn apply(&self, data: &mut UserData) {
        if let Some(class_id) = &self.class_id {
            data.class_id = Some(class_id.clone());
        }
        if let Some(class_type) = &self.class_type {
            data.class_type = Some(class_type.clone());
        }
        if let Some(track_name) = &self.track_name {
            data.track_name = Some(track_name.clone());
        }
        if let Some(confidence) = self.confidence {
            data.confidence = Some(confidence);
        }
        for (key, value) in &self.attrs {
            data.attrs.insert(key.clone(), value.clone());
        }
    }
}

/// One track aggregated over the frames of a scene.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackSummary {
    pub track_id: String,
    /// Name of the first occurrence in frame order
    pub track_name: String,
    pub class_id: Option<String>,
    /// Frames in which the track has an object
    pub frames: BTreeSet<FrameId>,
}

/// Tracks of the active scene, keyed by track id.
#[derive(Debug, Clone, Default)]
pub struct TrackRegistry {
    tracks: HashMap<String, TrackSummary>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the objects of every frame of a scene.
    pub fn rebuild<'a>(&mut self, objects: impl IntoIterator<Item = &'a AnnotateObject>) {
        self.tracks.clear();
        for object in objects {
            let Some(track_id) = object.user_data.track_id.as_ref() else {
                continue;
            };
            let entry = self
                .tracks
                .entry(track_id.clone())
                .or_insert_with(|| TrackSummary {
                    track_id: track_id.clone(),
                    track_name: object.user_data.track_name.clone().unwrap_or_default(),
                    class_id: object.user_data.class_id.clone(),
                    frames: BTreeSet::new(),
                });
            entry.frames.insert(object.frame_id.clone());
        }
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackSummary> {
        self.tracks.get(track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackSummary> {
        self.tracks.values()
    }
}
