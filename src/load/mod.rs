//! Loading from the data API: records, scenes, frame annotations, and
//! saving.

mod api;
mod convert;
mod manager;
mod memory;
mod navigation;

pub use api::{AnnotationApi, FrameAnnotation, RecordInfo, SaveFrame};
pub use convert::{
    JsonShapeConverter, RawClassValue, RawContour, RawObject, RawObjectEnvelope, RawPoint, ShapeConverter,
};
pub use manager::LoadManager;
pub use memory::{Fixture, InMemoryApi};
