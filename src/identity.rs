//! Object identity and track-name assignment.
//!
//! Every object carries `{id, track_id, track_name}` in its user data. Ids are
//! globally unique, track ids link one entity across the frames of a scene,
//! and track names must be unique among the objects of one frame.

use std::collections::HashSet;
use uuid::Uuid;

use crate::constants::MAX_TRACK_NAME_ATTEMPTS;
use crate::model::AnnotateObject;

/// Hands out ids and frame-unique track names for one editor session.
#[derive(Debug, Clone)]
pub struct TrackAssigner {
    /// Next numeric track-name candidate
    next_index: u64,
}

impl Default for TrackAssigner {
    fn default() -> Self {
        Self { next_index: 1 }
    }
}

impl TrackAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh globally unique object id.
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Fresh cross-frame track id.
    pub fn new_track_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a track name that is not in `used`.
    pub fn next_track_name(&mut self, used: &HashSet<String>) -> String {
        for _ in 0..MAX_TRACK_NAME_ATTEMPTS {
            let candidate = self.next_index.to_string();
            self.next_index += 1;
            if !used.contains(&candidate) {
                return candidate;
            }
        }
        // Pathological frame: fall back to a random name
        let fallback = Uuid::new_v4().simple().to_string();
        log::warn!("Track name space exhausted, using '{}'", fallback);
        fallback
    }

    /// Remember numeric names already in use so new names continue after them.
    fn note_existing(&mut self, name: &str) {
        if let Ok(index) = name.parse::<u64>() {
            if index >= self.next_index {
                self.next_index = index.saturating_add(1);
            }
        }
    }

    /// Stamp identity on a batch of objects that will live in one frame.
    ///
    /// `used` holds the track names already present in that frame and is
    /// updated with every name handed out, so names are unique across the
    /// batch and against the frame. Supplied track ids and free track names
    /// are kept. Returns how many objects had a field assigned or replaced.
    pub fn assign_in_frame(
        &mut self,
        objects: &mut [AnnotateObject],
        used: &mut HashSet<String>,
    ) -> usize {
        for name in used.iter() {
            self.note_existing(name);
        }

        let mut changed = 0;
        for object in objects.iter_mut() {
            let data = &mut object.user_data;
            let mut touched = false;

            if data.id.is_none() {
                data.id = Some(Self::new_id());
                touched = true;
            }
            if data.track_id.is_none() {
                data.track_id = Some(Self::new_track_id());
                touched = true;
            }

            let keep = match data.track_name.as_deref() {
                Some(name) if !name.is_empty() && !used.contains(name) => true,
                Some(name) if !name.is_empty() => {
                    log::debug!(
                        "Track name '{}' collides in frame '{}', regenerating",
                        name,
                        object.frame_id
                    );
                    false
                }
                _ => false,
            };
            if keep {
                if let Some(name) = data.track_name.as_deref() {
                    self.note_existing(name);
                }
            } else {
                data.track_name = Some(self.next_track_name(used));
                touched = true;
            }
            if let Some(name) = &data.track_name {
                used.insert(name.clone());
            }

            if touched {
                changed += 1;
            }
        }
        changed
    }
}
