//! Entity model for frames, scenes and annotation objects.

mod frame;
mod geometry;
mod object;
mod shape_root;
mod tool;
mod track;

pub use frame::{
    Classification, ClassificationValue, ClassConfig, DataResource, Frame, FrameId, LoadState,
    ObjectSource, SceneId, assign_classifications,
};
pub use geometry::{Geometry, Point2, Point3, Rect, Transform, TransformPatch, Vertex};
pub use object::{AnnotateObject, ObjectAttrs, ObjectUuid};
pub use shape_root::ShapeRoot;
pub use tool::{AnnotateMode, ModeBuckets, ToolType, partition_by_mode};
pub use track::{SourceType, TrackRegistry, TrackSummary, UserData, UserDataPatch};
