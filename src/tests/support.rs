//! Fixtures and a scriptable API for scenario tests.

use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::EditorConfig;
use crate::editor::{Editor, SharedEditor};
use crate::error::ApiError;
use crate::event::{EditorEvent, EventKind};
use crate::load::{AnnotationApi, Fixture, FrameAnnotation, InMemoryApi, LoadManager, RecordInfo, SaveFrame};
use crate::model::{
    ClassConfig, Classification, ClassificationValue, DataResource, Frame, FrameId, ObjectSource,
    ObjectUuid, SceneId, SourceType,
};

pub fn rect_json(track_id: &str, track_name: &str) -> Value {
    json!({
        "type": "RECTANGLE",
        "trackId": track_id,
        "trackName": track_name,
        "classId": "c1",
        "contour": {"points": [{"x": 0, "y": 0}, {"x": 10, "y": 10}]}
    })
}

pub fn mask_json() -> Value {
    json!({
        "type": "ISS",
        "contour": {"points": [{"x": 0, "y": 0}, {"x": 5, "y": 0}, {"x": 5, "y": 5}]}
    })
}

fn frame(id: &str, scene: &str) -> Frame {
    let mut frame = Frame::new(id).in_scene(scene);
    frame.dataset_id = "d1".to_string();
    frame
}

pub fn annotation(frame_id: &str, objects: Value) -> FrameAnnotation {
    FrameAnnotation {
        data_id: frame_id.to_string(),
        objects,
        classification_values: Vec::new(),
    }
}

/// Series record: scene s1 = [f1, f2], scene s2 = [f3]. The dataset also
/// lists s3 (served on demand as [f4]) and s4 (no frames at all).
pub fn series_fixture() -> Fixture {
    let mut f1 = annotation("f1", json!([rect_json("t1", "1"), rect_json("t2", "2")]));
    f1.classification_values = vec![
        ClassificationValue {
            classification_id: "weather".into(),
            values: json!(["sunny"]),
        },
        ClassificationValue {
            classification_id: "retired".into(),
            values: json!(true),
        },
    ];

    let mut scene_frames = BTreeMap::new();
    scene_frames.insert("s3".to_string(), vec![frame("f4", "s3")]);

    let mut sources = BTreeMap::new();
    sources.insert(
        "f1".to_string(),
        vec![ObjectSource {
            source_id: "7".into(),
            name: "model-a".into(),
            source_type: SourceType::Model,
            frame_id: "f1".into(),
        }],
    );

    let mut resources = BTreeMap::new();
    resources.insert(
        "f1".to_string(),
        DataResource {
            url: "https://data.invalid/f1.jpg".into(),
            annotation_status: Some("ANNOTATED".into()),
            valid_status: Some("VALID".into()),
        },
    );

    Fixture {
        record_id: "r1".into(),
        dataset_id: "d1".into(),
        is_series_frame: true,
        frames: vec![frame("f1", "s1"), frame("f2", "s1"), frame("f3", "s2")],
        dataset_scenes: vec!["s1".into(), "s2".into(), "s3".into(), "s4".into()],
        scene_frames,
        annotations: vec![
            f1,
            annotation("f2", json!([rect_json("t1", "1"), mask_json()])),
            annotation("f3", json!([])),
            annotation("f4", json!([{"type": "KEY_POINT", "contour": {"points": [{"x": 1, "y": 1}]}}])),
        ],
        sources,
        resources,
        classes: vec![ClassConfig {
            id: "c1".into(),
            name: "car".into(),
            color: "#00ff00".into(),
            tool_type: None,
        }],
        classifications: vec![Classification {
            id: "weather".into(),
            name: "Weather".into(),
            required: false,
        }],
    }
}

/// Plain (non-series) record of two ungrouped frames.
pub fn single_fixture() -> Fixture {
    Fixture {
        record_id: "r2".into(),
        dataset_id: "d1".into(),
        is_series_frame: false,
        frames: vec![Frame::new("a"), Frame::new("b")],
        annotations: vec![
            annotation("a", json!([rect_json("ta", "1")])),
            annotation("b", json!([rect_json("tb", "1")])),
        ],
        ..Default::default()
    }
}

type Hook = RefCell<Option<Box<dyn FnOnce()>>>;

/// [`InMemoryApi`] with injectable failures and hooks that run while an
/// annotation or save request is in flight.
#[derive(Default)]
pub struct ScriptedApi {
    pub inner: InMemoryApi,
    pub fail_annotations: Cell<bool>,
    pub fail_dataset_scenes: Cell<bool>,
    pub during_annotations: Hook,
    pub during_save: Hook,
}

impl ScriptedApi {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            inner: InMemoryApi::new(fixture),
            ..Default::default()
        }
    }

    pub fn on_next_annotation_request<F: FnOnce() + 'static>(&self, hook: F) {
        *self.during_annotations.borrow_mut() = Some(Box::new(hook));
    }

    pub fn on_next_save<F: FnOnce() + 'static>(&self, hook: F) {
        *self.during_save.borrow_mut() = Some(Box::new(hook));
    }
}

impl AnnotationApi for ScriptedApi {
    async fn get_info_by_record_id(&self, record_id: &str) -> Result<RecordInfo, ApiError> {
        self.inner.get_info_by_record_id(record_id).await
    }

    async fn get_all_scenes_from_dataset(&self, dataset_id: &str) -> Result<Vec<SceneId>, ApiError> {
        if self.fail_dataset_scenes.get() {
            return Err(ApiError::network("scene listing unavailable"));
        }
        self.inner.get_all_scenes_from_dataset(dataset_id).await
    }

    async fn get_frame_series_data(&self, dataset_id: &str, scene_id: &str) -> Result<Vec<Frame>, ApiError> {
        self.inner.get_frame_series_data(dataset_id, scene_id).await
    }

    async fn get_annotation_by_data_ids(&self, frame_ids: &[FrameId]) -> Result<Vec<FrameAnnotation>, ApiError> {
        let hook = self.during_annotations.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail_annotations.get() {
            return Err(ApiError::Rejected {
                status: 503,
                message: "busy".into(),
            });
        }
        self.inner.get_annotation_by_data_ids(frame_ids).await
    }

    async fn get_result_sources(&self, frame_id: &str) -> Result<Vec<ObjectSource>, ApiError> {
        self.inner.get_result_sources(frame_id).await
    }

    async fn get_data_file(&self, frame_id: &str) -> Result<DataResource, ApiError> {
        self.inner.get_data_file(frame_id).await
    }

    async fn get_classes(&self, dataset_id: &str) -> Result<Vec<ClassConfig>, ApiError> {
        self.inner.get_classes(dataset_id).await
    }

    async fn get_classifications(&self, dataset_id: &str) -> Result<Vec<Classification>, ApiError> {
        self.inner.get_classifications(dataset_id).await
    }

    async fn save(&self, frames: Vec<SaveFrame>) -> Result<(), ApiError> {
        let hook = self.during_save.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.save(frames).await
    }
}

/// Fresh shared editor with default configuration.
pub fn shared_editor() -> SharedEditor {
    Editor::new(EditorConfig::default()).into_shared()
}

/// Record every event emitted by the editor.
pub fn record_events(editor: &SharedEditor) -> Rc<RefCell<Vec<EditorEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    editor
        .borrow_mut()
        .data
        .events_mut()
        .subscribe_all(move |event| sink.borrow_mut().push(event.clone()));
    events
}

pub fn count_kind(events: &RefCell<Vec<EditorEvent>>, kind: EventKind) -> usize {
    events.borrow().iter().filter(|e| e.kind() == kind).count()
}

/// Loader over `fixture` with its record and classes loaded.
pub fn loaded(fixture: Fixture) -> (SharedEditor, LoadManager<ScriptedApi>) {
    let record_id = fixture.record_id.clone();
    let editor = shared_editor();
    let loader = LoadManager::new(Rc::clone(&editor), ScriptedApi::new(fixture));
    pollster::block_on(async {
        loader.load_record(&record_id).await?;
        loader.load_classes().await
    })
    .unwrap();
    (editor, loader)
}

/// [`series_fixture`] loaded, with scene s1 active on frame f1.
pub fn series_in_scene() -> (SharedEditor, LoadManager<ScriptedApi>) {
    let (editor, loader) = loaded(series_fixture());
    assert!(pollster::block_on(loader.load_scene_data(0)).unwrap());
    (editor, loader)
}

pub fn ids(ids: &[&str]) -> Vec<FrameId> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// Uuid of the object carrying `track_id` in a frame.
pub fn uuid_of(editor: &SharedEditor, frame_id: &str, track_id: &str) -> ObjectUuid {
    editor
        .borrow()
        .data
        .get_all_frame_objects(frame_id)
        .into_iter()
        .find(|o| o.track_id() == Some(track_id))
        .map(|o| o.uuid)
        .unwrap()
}
