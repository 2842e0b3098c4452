//! scenelabel - annotation session state engine
//!
//! Keeps the frames, scenes and annotation objects of one labeling session,
//! applies edits as undoable commands and loads annotation payloads lazily
//! from a data API.
//!
//! ```no_run
//! use scenelabel::{Editor, EditorConfig, InMemoryApi, LoadManager};
//!
//! # fn run(fixture_json: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let editor = Editor::new(EditorConfig::default()).into_shared();
//! let loader = LoadManager::new(editor.clone(), InMemoryApi::from_json(fixture_json)?);
//! pollster::block_on(async {
//!     loader.load_record("record-1").await?;
//!     loader.load_scene_data(0).await
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod cmd;
pub mod config;
pub mod constants;
pub mod data_manager;
pub mod editor;
pub mod error;
pub mod event;
pub mod identity;
pub mod load;
pub mod model;

pub use cmd::{Cmd, CmdManager, Command};
pub use config::{EditorConfig, LogLevel};
pub use data_manager::DataManager;
pub use editor::{Editor, SharedEditor};
pub use error::{ApiError, CmdError, ConfigError, ConvertError, LoadError};
pub use event::{EditorEvent, EventBus, EventKind};
pub use identity::TrackAssigner;
pub use load::{AnnotationApi, InMemoryApi, JsonShapeConverter, LoadManager, ShapeConverter};

#[cfg(test)]
mod tests;
