//! Command engine: reversible edits, undo/redo history and step merging.

mod commands;
mod manager;

pub use commands::{
    AddObject, AddObjectData, Affected, Cmd, CmdBase, Command, DeleteObject, DeleteObjectData,
    Group, GroupData, UpdatePoint, UpdatePointData, UpdateTransform, UpdateTransformData,
    UpdateUserData, UpdateUserDataData,
};
pub use manager::{CmdManager, HistoryConfig};
