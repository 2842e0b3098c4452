//! Typed change notifications.
//!
//! Observers (list panels, renderers) subscribe to an [`EventKind`] and receive
//! the matching [`EditorEvent`] synchronously when the engine emits it.
//! Listeners must not call back into the editor that is emitting; queue the
//! follow-up work instead.

use std::fmt;

use crate::model::{FrameId, ObjectUuid, SceneId};

/// What changed on existing objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Transform,
    Vertex,
    UserData,
    Visibility,
}

/// Closed set of notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SceneLoaded,
    FrameChanged,
    AnnotationsLoaded,
    AnnotateAdded,
    AnnotateRemoved,
    AnnotateChanged,
    SelectionChanged,
    TrackUpdated,
    Saved,
}

/// A notification with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SceneLoaded {
        scene_id: SceneId,
    },
    FrameChanged {
        frame_id: FrameId,
        index: usize,
    },
    /// Frames whose payloads were processed by one load pass
    AnnotationsLoaded {
        frame_ids: Vec<FrameId>,
    },
    AnnotateAdded {
        frame_id: FrameId,
        uuids: Vec<ObjectUuid>,
    },
    AnnotateRemoved {
        frame_id: FrameId,
        uuids: Vec<ObjectUuid>,
    },
    AnnotateChanged {
        frame_id: FrameId,
        uuids: Vec<ObjectUuid>,
        change: ChangeKind,
    },
    SelectionChanged {
        selection: Vec<ObjectUuid>,
    },
    TrackUpdated {
        track_count: usize,
    },
    Saved {
        frame_ids: Vec<FrameId>,
    },
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::SceneLoaded { .. } => EventKind::SceneLoaded,
            EditorEvent::FrameChanged { .. } => EventKind::FrameChanged,
            EditorEvent::AnnotationsLoaded { .. } => EventKind::AnnotationsLoaded,
            EditorEvent::AnnotateAdded { .. } => EventKind::AnnotateAdded,
            EditorEvent::AnnotateRemoved { .. } => EventKind::AnnotateRemoved,
            EditorEvent::AnnotateChanged { .. } => EventKind::AnnotateChanged,
            EditorEvent::SelectionChanged { .. } => EventKind::SelectionChanged,
            EditorEvent::TrackUpdated { .. } => EventKind::TrackUpdated,
            EditorEvent::Saved { .. } => EventKind::Saved,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&EditorEvent)>;

/// Publish/subscribe channel keyed by [`EventKind`].
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SubscriptionId, Option<EventKind>, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to one kind of event.
    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.insert(Some(kind), Box::new(listener))
    }

    /// Listen to every event.
    pub fn subscribe_all<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.insert(None, Box::new(listener))
    }

    fn insert(&mut self, kind: Option<EventKind>, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: EditorEvent) {
        let kind = event.kind();
        log::trace!("event: {:?}", kind);
        for (_, filter, listener) in &mut self.listeners {
            if filter.is_none_or(|k| k == kind) {
                listener(&event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_filters_by_kind() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(EventKind::SceneLoaded, move |e| sink.borrow_mut().push(e.kind()));

        bus.emit(EditorEvent::TrackUpdated { track_count: 1 });
        bus.emit(EditorEvent::SceneLoaded {
            scene_id: "s1".into(),
        });

        assert_eq!(*seen.borrow(), vec![EventKind::SceneLoaded]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = bus.subscribe_all(move |_| *sink.borrow_mut() += 1);

        bus.emit(EditorEvent::Saved { frame_ids: vec![] });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(EditorEvent::Saved { frame_ids: vec![] });

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
