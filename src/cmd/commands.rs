//! Reversible edit commands.
//!
//! Each kind is a [`CmdBase`] over its forward data and its undo snapshot.
//! The snapshot is taken the first time the command is applied, from the
//! state the command is about to overwrite.

use std::time::Duration;
use web_time::Instant;

use crate::data_manager::DataManager;
use crate::error::CmdError;
use crate::model::{AnnotateObject, FrameId, ObjectUuid, TransformPatch, UserData, UserDataPatch, Vertex};

/// Objects touched by a command, reported to the renderer after undo/redo.
#[derive(Debug, Clone, PartialEq)]
pub struct Affected {
    pub frame_id: FrameId,
    pub uuids: Vec<ObjectUuid>,
    /// Whether drawn geometry changed (as opposed to metadata only)
    pub geometry: bool,
}

/// Forward data, lazily captured undo data and the last-update time.
#[derive(Debug, Clone)]
pub struct CmdBase<D, U> {
    pub data: D,
    undo_data: Option<U>,
    updated_at: Instant,
}

impl<D, U> CmdBase<D, U> {
    pub fn new(data: D) -> Self {
        Self {
            data,
            undo_data: None,
            updated_at: Instant::now(),
        }
    }

    /// Override the creation time (replays and tests).
    pub fn with_timestamp(mut self, at: Instant) -> Self {
        self.updated_at = at;
        self
    }

    /// Snapshot taken on first application, `None` before that.
    pub fn undo_data(&self) -> Option<&U> {
        self.undo_data.as_ref()
    }

    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    fn within(&self, next: &CmdBase<D, U>, window: Duration) -> bool {
        next.updated_at.duration_since(self.updated_at) < window
    }
}

/// Behaviour shared by every command kind.
pub trait Command {
    /// Apply (or re-apply) the forward effect.
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError>;

    /// Restore the state captured before the first application.
    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError>;

    fn description(&self) -> String;

    fn affected(&self) -> Vec<Affected>;
}

// ----------------------------------------------------------------------------
// Add / delete
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AddObjectData {
    pub frame_id: FrameId,
    pub objects: Vec<AnnotateObject>,
}

pub type AddObject = CmdBase<AddObjectData, Vec<ObjectUuid>>;

impl Command for AddObject {
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let frame_id = &self.data.frame_id;
        if !data.has_frame_root(frame_id) {
            return Err(CmdError::FrameNotLoaded(frame_id.clone()));
        }
        if let Some(live) = self.data.objects.iter().find(|o| data.has_object(frame_id, o.uuid)) {
            return Err(CmdError::AlreadyExists(live.uuid));
        }
        let uuids = data.add_annotates(self.data.objects.clone(), frame_id);
        self.undo_data = Some(uuids);
        Ok(())
    }

    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let uuids = self.undo_data.as_ref().ok_or(CmdError::NotApplied)?;
        let frame_id = &self.data.frame_id;
        if let Some(missing) = uuids.iter().find(|uuid| !data.has_object(frame_id, **uuid)) {
            return Err(CmdError::missing_object(*missing, frame_id));
        }
        // Keep what was actually stored (regenerated names, later edits) for redo
        self.data.objects = data.remove_annotates(uuids, frame_id);
        Ok(())
    }

    fn description(&self) -> String {
        plural("Add", self.data.objects.len())
    }

    fn affected(&self) -> Vec<Affected> {
        vec![Affected {
            frame_id: self.data.frame_id.clone(),
            uuids: self.data.objects.iter().map(|o| o.uuid).collect(),
            geometry: true,
        }]
    }
}

#[derive(Debug, Clone)]
pub struct DeleteObjectData {
    pub frame_id: FrameId,
    pub uuids: Vec<ObjectUuid>,
}

pub type DeleteObject = CmdBase<DeleteObjectData, Vec<AnnotateObject>>;

impl Command for DeleteObject {
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let frame_id = &self.data.frame_id;
        if !data.has_frame_root(frame_id) {
            return Err(CmdError::FrameNotLoaded(frame_id.clone()));
        }
        if let Some(missing) = self.data.uuids.iter().find(|uuid| !data.has_object(frame_id, **uuid)) {
            return Err(CmdError::missing_object(*missing, frame_id));
        }
        self.undo_data = Some(data.remove_annotates(&self.data.uuids, frame_id));
        Ok(())
    }

    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let removed = self.undo_data.as_ref().ok_or(CmdError::NotApplied)?;
        let frame_id = &self.data.frame_id;
        if !data.has_frame_root(frame_id) {
            return Err(CmdError::FrameNotLoaded(frame_id.clone()));
        }
        if let Some(live) = removed.iter().find(|o| data.has_object(frame_id, o.uuid)) {
            return Err(CmdError::AlreadyExists(live.uuid));
        }
        data.add_annotates(removed.clone(), frame_id);
        Ok(())
    }

    fn description(&self) -> String {
        plural("Delete", self.data.uuids.len())
    }

    fn affected(&self) -> Vec<Affected> {
        vec![Affected {
            frame_id: self.data.frame_id.clone(),
            uuids: self.data.uuids.clone(),
            geometry: true,
        }]
    }
}

fn plural(verb: &str, count: usize) -> String {
    if count == 1 {
        format!("{} object", verb)
    } else {
        format!("{} {} objects", verb, count)
    }
}

// ----------------------------------------------------------------------------
// Geometry edits
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UpdateTransformData {
    pub frame_id: FrameId,
    pub updates: Vec<(ObjectUuid, TransformPatch)>,
}

pub type UpdateTransform = CmdBase<UpdateTransformData, Vec<(ObjectUuid, TransformPatch)>>;

impl UpdateTransform {
    fn targets_same(&self, next: &UpdateTransform) -> bool {
        self.data.frame_id == next.data.frame_id
            && self.data.updates.len() == next.data.updates.len()
            && self
                .data
                .updates
                .iter()
                .zip(&next.data.updates)
                .all(|((a, _), (b, _))| a == b)
    }

    pub fn can_merge(&self, next: &UpdateTransform, window: Duration) -> bool {
        self.targets_same(next) && self.within(next, window)
    }

    /// Fold an already applied follow-up into this command.
    ///
    /// Fields first touched by `next` get their undo values from `next`'s
    /// snapshot; everything else keeps this command's original snapshot.
    pub fn merge(&mut self, next: UpdateTransform) {
        for ((_, patch), (_, later)) in self.data.updates.iter_mut().zip(&next.data.updates) {
            patch.merge(later);
        }
        if let (Some(ours), Some(theirs)) = (self.undo_data.as_mut(), next.undo_data) {
            for ((_, original), (_, intermediate)) in ours.iter_mut().zip(theirs) {
                let mut combined = intermediate;
                combined.merge(original);
                *original = combined;
            }
        }
        self.updated_at = next.updated_at;
    }
}

impl Command for UpdateTransform {
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let previous = data.set_annotates_transform(&self.data.frame_id, &self.data.updates)?;
        if self.undo_data.is_none() {
            let uuids = self.data.updates.iter().map(|(uuid, _)| *uuid);
            self.undo_data = Some(uuids.zip(previous).collect());
        }
        Ok(())
    }

    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let previous = self.undo_data.as_ref().ok_or(CmdError::NotApplied)?;
        data.set_annotates_transform(&self.data.frame_id, previous)?;
        Ok(())
    }

    fn description(&self) -> String {
        "Move/resize".to_string()
    }

    fn affected(&self) -> Vec<Affected> {
        vec![Affected {
            frame_id: self.data.frame_id.clone(),
            uuids: self.data.updates.iter().map(|(uuid, _)| *uuid).collect(),
            geometry: true,
        }]
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePointData {
    pub frame_id: FrameId,
    pub uuid: ObjectUuid,
    pub index: usize,
    pub vertex: Vertex,
}

pub type UpdatePoint = CmdBase<UpdatePointData, Vertex>;

impl UpdatePoint {
    pub fn can_merge(&self, next: &UpdatePoint, window: Duration) -> bool {
        self.data.frame_id == next.data.frame_id
            && self.data.uuid == next.data.uuid
            && self.data.index == next.data.index
            && self.within(next, window)
    }

    pub fn merge(&mut self, next: UpdatePoint) {
        self.data.vertex = next.data.vertex;
        self.updated_at = next.updated_at;
    }
}

impl Command for UpdatePoint {
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let d = &self.data;
        let previous = data.set_annotate_vertex(&d.frame_id, d.uuid, d.index, d.vertex)?;
        if self.undo_data.is_none() {
            self.undo_data = Some(previous);
        }
        Ok(())
    }

    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let previous = self.undo_data.ok_or(CmdError::NotApplied)?;
        let d = &self.data;
        data.set_annotate_vertex(&d.frame_id, d.uuid, d.index, previous)?;
        Ok(())
    }

    fn description(&self) -> String {
        "Edit vertex".to_string()
    }

    fn affected(&self) -> Vec<Affected> {
        vec![Affected {
            frame_id: self.data.frame_id.clone(),
            uuids: vec![self.data.uuid],
            geometry: true,
        }]
    }
}

// ----------------------------------------------------------------------------
// Metadata edits
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UpdateUserDataData {
    pub frame_id: FrameId,
    pub uuids: Vec<ObjectUuid>,
    pub patch: UserDataPatch,
}

pub type UpdateUserData = CmdBase<UpdateUserDataData, Vec<(ObjectUuid, UserData)>>;

impl Command for UpdateUserData {
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let d = &self.data;
        let previous = data.set_annotates_user_data(&d.frame_id, &d.uuids, &d.patch)?;
        if self.undo_data.is_none() {
            self.undo_data = Some(d.uuids.iter().copied().zip(previous).collect());
        }
        Ok(())
    }

    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let previous = self.undo_data.as_ref().ok_or(CmdError::NotApplied)?;
        data.restore_user_data(&self.data.frame_id, previous)
    }

    fn description(&self) -> String {
        if self.data.patch.class_id.is_some() {
            "Change class".to_string()
        } else if self.data.patch.track_name.is_some() {
            "Rename track".to_string()
        } else {
            "Edit attributes".to_string()
        }
    }

    fn affected(&self) -> Vec<Affected> {
        vec![Affected {
            frame_id: self.data.frame_id.clone(),
            uuids: self.data.uuids.clone(),
            geometry: false,
        }]
    }
}

// ----------------------------------------------------------------------------
// Groups
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GroupData {
    pub name: String,
    pub commands: Vec<Cmd>,
}

/// Several commands applied and reverted as one step.
pub type Group = CmdBase<GroupData, ()>;

impl Command for Group {
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        let commands = &mut self.data.commands;
        for i in 0..commands.len() {
            if let Err(e) = commands[i].redo(data) {
                for done in commands[..i].iter_mut().rev() {
                    if let Err(rollback) = done.undo(data) {
                        log::warn!("Group '{}' rollback failed: {}", self.data.name, rollback);
                    }
                }
                return Err(e);
            }
        }
        self.undo_data = Some(());
        Ok(())
    }

    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        self.undo_data.ok_or(CmdError::NotApplied)?;
        let commands = &mut self.data.commands;
        let len = commands.len();
        for i in (0..len).rev() {
            if let Err(e) = commands[i].undo(data) {
                for undone in commands[i + 1..].iter_mut() {
                    if let Err(rollback) = undone.redo(data) {
                        log::warn!("Group '{}' rollback failed: {}", self.data.name, rollback);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        self.data.name.clone()
    }

    fn affected(&self) -> Vec<Affected> {
        self.data.commands.iter().flat_map(|c| c.affected()).collect()
    }
}

// ----------------------------------------------------------------------------
// Dispatch
// ----------------------------------------------------------------------------

/// Closed set of command kinds.
#[derive(Debug, Clone)]
pub enum Cmd {
    AddObject(AddObject),
    DeleteObject(DeleteObject),
    UpdateTransform(UpdateTransform),
    UpdatePoint(UpdatePoint),
    UpdateUserData(UpdateUserData),
    Group(Group),
}

impl Cmd {
    pub fn add_objects(frame_id: impl Into<FrameId>, objects: Vec<AnnotateObject>) -> Self {
        Cmd::AddObject(CmdBase::new(AddObjectData {
            frame_id: frame_id.into(),
            objects,
        }))
    }

    pub fn delete_objects(frame_id: impl Into<FrameId>, uuids: Vec<ObjectUuid>) -> Self {
        Cmd::DeleteObject(CmdBase::new(DeleteObjectData {
            frame_id: frame_id.into(),
            uuids,
        }))
    }

    pub fn update_transform(frame_id: impl Into<FrameId>, updates: Vec<(ObjectUuid, TransformPatch)>) -> Self {
        Cmd::UpdateTransform(CmdBase::new(UpdateTransformData {
            frame_id: frame_id.into(),
            updates,
        }))
    }

    pub fn update_point(frame_id: impl Into<FrameId>, uuid: ObjectUuid, index: usize, vertex: Vertex) -> Self {
        Cmd::UpdatePoint(CmdBase::new(UpdatePointData {
            frame_id: frame_id.into(),
            uuid,
            index,
            vertex,
        }))
    }

    pub fn update_user_data(frame_id: impl Into<FrameId>, uuids: Vec<ObjectUuid>, patch: UserDataPatch) -> Self {
        Cmd::UpdateUserData(CmdBase::new(UpdateUserDataData {
            frame_id: frame_id.into(),
            uuids,
            patch,
        }))
    }

    pub fn group(name: impl Into<String>, commands: Vec<Cmd>) -> Self {
        Cmd::Group(CmdBase::new(GroupData {
            name: name.into(),
            commands,
        }))
    }

    /// Override the timestamp of the wrapped command.
    pub fn at(self, instant: Instant) -> Self {
        match self {
            Cmd::AddObject(c) => Cmd::AddObject(c.with_timestamp(instant)),
            Cmd::DeleteObject(c) => Cmd::DeleteObject(c.with_timestamp(instant)),
            Cmd::UpdateTransform(c) => Cmd::UpdateTransform(c.with_timestamp(instant)),
            Cmd::UpdatePoint(c) => Cmd::UpdatePoint(c.with_timestamp(instant)),
            Cmd::UpdateUserData(c) => Cmd::UpdateUserData(c.with_timestamp(instant)),
            Cmd::Group(c) => Cmd::Group(c.with_timestamp(instant)),
        }
    }

    /// Whether `next` can be folded into this command instead of being
    /// pushed as its own step.
    pub fn can_merge(&self, next: &Cmd, window: Duration) -> bool {
        match (self, next) {
            (Cmd::UpdateTransform(a), Cmd::UpdateTransform(b)) => a.can_merge(b, window),
            (Cmd::UpdatePoint(a), Cmd::UpdatePoint(b)) => a.can_merge(b, window),
            _ => false,
        }
    }

    /// Fold `next` into this command. Callers check [`Cmd::can_merge`] first.
    pub fn merge(&mut self, next: Cmd) {
        match (self, next) {
            (Cmd::UpdateTransform(a), Cmd::UpdateTransform(b)) => a.merge(b),
            (Cmd::UpdatePoint(a), Cmd::UpdatePoint(b)) => a.merge(b),
            (this, other) => {
                log::warn!(
                    "Cannot merge '{}' into '{}'",
                    other.description(),
                    this.description()
                );
            }
        }
    }
}

impl Command for Cmd {
    fn redo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        match self {
            Cmd::AddObject(c) => c.redo(data),
            Cmd::DeleteObject(c) => c.redo(data),
            Cmd::UpdateTransform(c) => c.redo(data),
            Cmd::UpdatePoint(c) => c.redo(data),
            Cmd::UpdateUserData(c) => c.redo(data),
            Cmd::Group(c) => c.redo(data),
        }
    }

    fn undo(&mut self, data: &mut DataManager) -> Result<(), CmdError> {
        match self {
            Cmd::AddObject(c) => c.undo(data),
            Cmd::DeleteObject(c) => c.undo(data),
            Cmd::UpdateTransform(c) => c.undo(data),
            Cmd::UpdatePoint(c) => c.undo(data),
            Cmd::UpdateUserData(c) => c.undo(data),
            Cmd::Group(c) => c.undo(data),
        }
    }

    fn description(&self) -> String {
        match self {
            Cmd::AddObject(c) => c.description(),
            Cmd::DeleteObject(c) => c.description(),
            Cmd::UpdateTransform(c) => c.description(),
            Cmd::UpdatePoint(c) => c.description(),
            Cmd::UpdateUserData(c) => c.description(),
            Cmd::Group(c) => c.description(),
        }
    }

    fn affected(&self) -> Vec<Affected> {
        match self {
            Cmd::AddObject(c) => c.affected(),
            Cmd::DeleteObject(c) => c.affected(),
            Cmd::UpdateTransform(c) => c.affected(),
            Cmd::UpdatePoint(c) => c.affected(),
            Cmd::UpdateUserData(c) => c.affected(),
            Cmd::Group(c) => c.affected(),
        }
    }
}
