//! Saving and save-guarded navigation.

use pollster::block_on;
use serde_json::json;

use super::support::*;
use crate::cmd::Cmd;
use crate::error::LoadError;
use crate::event::EventKind;
use crate::load::ShapeConverter;
use crate::model::TransformPatch;

fn move_object(editor: &crate::SharedEditor, frame_id: &str, track_id: &str) {
    let uuid = uuid_of(editor, frame_id, track_id);
    let cmd = Cmd::update_transform(frame_id, vec![(uuid, TransformPatch::position(8.0, 8.0))]);
    assert!(editor.borrow_mut().execute(cmd));
}

#[test]
fn test_save_without_changes_sends_nothing() {
    let (_editor, loader) = series_in_scene();

    let saved = block_on(loader.save()).unwrap();

    assert!(saved.is_empty());
    assert!(loader.api().inner.saved().is_empty());
}

#[test]
fn test_save_sends_dirty_frames_and_clears_flags() {
    let (editor, loader) = series_in_scene();
    let events = record_events(&editor);
    move_object(&editor, "f1", "t1");

    let saved = block_on(loader.save()).unwrap();

    assert_eq!(saved, ids(&["f1"]));
    let sent = loader.api().inner.saved();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data_id, "f1");
    assert_eq!(sent[0].objects.as_array().map(Vec::len), Some(2));
    assert_eq!(sent[0].classification_values.len(), 1);
    assert!(!editor.borrow().has_unsaved_changes());
    assert_eq!(count_kind(&events, EventKind::Saved), 1);
}

#[test]
fn test_saved_objects_decode_to_the_edited_state() {
    let (editor, loader) = series_in_scene();
    move_object(&editor, "f1", "t1");

    block_on(loader.save()).unwrap();

    let sent = loader.api().inner.saved();
    let decoded = crate::load::JsonShapeConverter
        .convert_raw_shapes(&"f1".to_string(), &sent[0].objects)
        .unwrap();
    let moved = decoded.iter().find(|o| o.track_id() == Some("t1")).unwrap();
    assert_eq!(moved.transform.x, 8.0);
    assert_eq!(moved.track_name(), Some("1"));
}

#[test]
fn test_save_keeps_stored_object_ids() {
    let mut fixture = series_fixture();
    let mut bare = rect_json("t1", "1");
    bare["id"] = json!("12345");
    fixture.annotations[0].objects = json!([
        bare,
        {"id": 678, "frontId": "front-2", "classAttributes": rect_json("t2", "2")}
    ]);
    let (editor, loader) = loaded(fixture);
    assert!(block_on(loader.load_scene_data(0)).unwrap());
    move_object(&editor, "f1", "t1");

    block_on(loader.save()).unwrap();

    let sent = loader.api().inner.saved();
    let items = sent[0].objects.as_array().unwrap();
    let by_track = |track: &str| {
        items
            .iter()
            .find(|item| item["classAttributes"]["trackId"] == track)
            .unwrap()
    };
    let moved = by_track("t1");
    assert_eq!(moved["frontId"], "12345");
    assert_eq!(moved["classAttributes"]["id"], "12345");
    assert!(moved["id"].is_null());
    let stored = by_track("t2");
    assert_eq!(stored["id"], "678");
    assert_eq!(stored["frontId"], "front-2");
}

#[test]
fn test_change_frame_saves_first() {
    let (editor, loader) = series_in_scene();
    move_object(&editor, "f1", "t1");

    assert!(block_on(loader.change_frame(1)).unwrap());

    assert_eq!(loader.api().inner.saved().len(), 1);
    let editor = editor.borrow();
    assert_eq!(editor.state.frame_index, 1);
    assert_eq!(editor.current_frame_id().map(String::as_str), Some("f2"));
    assert!(!editor.data.frame("f1").unwrap().need_save);
}

#[test]
fn test_failed_save_blocks_navigation() {
    let (editor, loader) = series_in_scene();
    let events = record_events(&editor);
    move_object(&editor, "f1", "t1");
    loader.api().inner.set_fail_save(true);

    let result = block_on(loader.change_frame(1));

    assert!(matches!(result, Err(LoadError::Api(_))));
    assert_eq!(editor.borrow().state.frame_index, 0);
    assert!(editor.borrow().data.frame("f1").unwrap().need_save);
    assert_eq!(count_kind(&events, EventKind::FrameChanged), 0);
    assert_eq!(count_kind(&events, EventKind::Saved), 0);

    loader.api().inner.set_fail_save(false);
    assert!(block_on(loader.change_frame(1)).unwrap());
    assert_eq!(editor.borrow().state.frame_index, 1);
    assert!(!editor.borrow().has_unsaved_changes());
}

#[test]
fn test_change_frame_out_of_range() {
    let (editor, loader) = series_in_scene();

    assert!(!block_on(loader.change_frame(-1)).unwrap());
    assert!(!block_on(loader.change_frame(2)).unwrap());
    assert_eq!(editor.borrow().state.frame_index, 0);
}

#[test]
fn test_switch_scene_saves_then_loads() {
    let (editor, loader) = series_in_scene();
    move_object(&editor, "f2", "t1");

    assert!(block_on(loader.switch_scene(1)).unwrap());

    assert_eq!(loader.api().inner.saved()[0].data_id, "f2");
    let editor = editor.borrow();
    assert_eq!(editor.state.scene_id.as_deref(), Some("s2"));
    assert_eq!(editor.state.frames, ids(&["f3"]));
    // Objects of the previous scene stay loaded
    assert_eq!(editor.data.get_all_frame_objects("f2").len(), 2);
}

#[test]
fn test_failed_save_blocks_scene_switch() {
    let (editor, loader) = series_in_scene();
    move_object(&editor, "f1", "t2");
    loader.api().inner.set_fail_save(true);

    assert!(block_on(loader.switch_scene(1)).is_err());

    assert_eq!(editor.borrow().state.scene_id.as_deref(), Some("s1"));
    assert!(editor.borrow().has_unsaved_changes());
}

#[test]
fn test_edit_during_save_keeps_frame_dirty() {
    let (editor, loader) = series_in_scene();
    move_object(&editor, "f1", "t1");
    let handle = std::rc::Rc::clone(&editor);
    loader.api().on_next_save(move || move_object(&handle, "f1", "t2"));

    let clean = block_on(loader.save()).unwrap();

    // The request went out but did not carry the second move
    assert!(clean.is_empty());
    assert_eq!(loader.api().inner.saved().len(), 1);
    assert!(editor.borrow().data.frame("f1").unwrap().need_save);
    assert_eq!(editor.borrow().data.dirty_frames(), ids(&["f1"]));

    // The next save sends it and cleans the frame
    assert_eq!(block_on(loader.save()).unwrap(), ids(&["f1"]));
    let sent = loader.api().inner.saved();
    let decoded = crate::load::JsonShapeConverter
        .convert_raw_shapes(&"f1".to_string(), &sent[1].objects)
        .unwrap();
    let moved = decoded.iter().find(|o| o.track_id() == Some("t2")).unwrap();
    assert_eq!(moved.transform.x, 8.0);
    assert!(!editor.borrow().has_unsaved_changes());
}

#[test]
fn test_edit_during_save_blocks_navigation() {
    let (editor, loader) = series_in_scene();
    move_object(&editor, "f1", "t1");
    let handle = std::rc::Rc::clone(&editor);
    loader.api().on_next_save(move || move_object(&handle, "f1", "t2"));

    let result = block_on(loader.change_frame(1));

    assert!(matches!(result, Err(LoadError::ChangedDuringSave)));
    assert_eq!(editor.borrow().state.frame_index, 0);
    assert!(editor.borrow().has_unsaved_changes());

    assert!(block_on(loader.change_frame(1)).unwrap());
    assert_eq!(loader.api().inner.saved().len(), 2);
}
