//! Engine-wide constants.

use std::time::Duration;

/// Scene id used for frames that are not grouped into a series.
pub const UNSERIES_SCENE_ID: &str = "__UNSERIES__";

/// Default number of commands kept in the undo history.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Two same-kind commands on the same object closer than this collapse into
/// one undo step (a drag gesture, for example).
pub const DEFAULT_MERGE_WINDOW: Duration = Duration::from_millis(500);

/// Source id of annotations that were not produced by any model run.
pub const DEFAULT_SOURCE_ID: &str = "-1";

/// Display name of the default source.
pub const DEFAULT_SOURCE_NAME: &str = "Without Task";

/// Upper bound for track-name regeneration attempts in one frame.
pub const MAX_TRACK_NAME_ATTEMPTS: usize = 100_000;
