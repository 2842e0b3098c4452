//! Error types for the annotation state engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{FrameId, ObjectUuid};

/// Failures reported by the external data API collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Transport-level failure (connection refused, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered but refused the request
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// Status code reported by the server
        status: u16,
        /// Server-provided description
        message: String,
    },

    /// A referenced record, dataset or frame does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Create a network error with a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a not-found error for the given resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Errors raised while turning raw shapes into annotation objects.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload does not have the expected structure
    #[error("Invalid payload: {message}")]
    InvalidPayload {
        /// Description of the structural problem
        message: String,
    },

    /// The raw shape names a tool type this engine does not know
    #[error("Unsupported tool type '{0}'")]
    UnsupportedTool(String),

    /// Geometry is present but unusable for the tool type
    #[error("Invalid geometry for {tool}: {message}")]
    InvalidGeometry {
        /// Tool type being converted
        tool: String,
        /// Description of the geometry problem
        message: String,
    },
}

impl ConvertError {
    /// Create an invalid payload error with a message.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Create an invalid geometry error.
    pub fn invalid_geometry(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by scene and frame loading.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The API collaborator failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A scene resolved to zero frames even after the dynamic fetch
    #[error("Scene '{scene_id}' has no frames")]
    EmptyScene {
        /// The scene that could not be populated
        scene_id: String,
    },

    /// A record was fetched but contained no frames
    #[error("Record '{0}' has no frames")]
    EmptyRecord(String),

    /// Frames were edited while a save was in flight and are still unsaved
    #[error("Frames changed during save; save again before leaving")]
    ChangedDuringSave,
}

/// Reasons a command could not be applied or reverted.
///
/// These never escape the command manager; they turn the command into a
/// logged no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CmdError {
    /// The frame has no shape roots (unloaded or cleared)
    #[error("Frame '{0}' is not loaded")]
    FrameNotLoaded(FrameId),

    /// A referenced object no longer exists in the frame
    #[error("Object {uuid} not found in frame '{frame_id}'")]
    MissingObject {
        /// Object that was referenced
        uuid: ObjectUuid,
        /// Frame that was searched
        frame_id: FrameId,
    },

    /// The object is already present (re-adding a live object)
    #[error("Object {0} already exists")]
    AlreadyExists(ObjectUuid),

    /// A vertex index is outside the object's point list
    #[error("Vertex {index} out of range for object {uuid}")]
    VertexOutOfRange {
        /// Object that was edited
        uuid: ObjectUuid,
        /// Requested vertex index
        index: usize,
    },

    /// The change would violate the frame's track-name uniqueness
    #[error("Track name '{0}' is already used in this frame")]
    TrackNameTaken(String),

    /// The command has no undo snapshot (never applied)
    #[error("Command was never applied")]
    NotApplied,
}

impl CmdError {
    /// Create a missing object error.
    pub fn missing_object(uuid: ObjectUuid, frame_id: &FrameId) -> Self {
        Self::MissingObject {
            uuid,
            frame_id: frame_id.clone(),
        }
    }
}

/// Errors for configuration import/export.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error reading or writing the config file
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File that was accessed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Version mismatch between expected and found
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Highest version this build understands
        supported: u32,
        /// Version found in the file
        found: u32,
    },
}
