//! Undo/redo history.

use std::time::Duration;

use super::{Affected, Cmd, Command};
use crate::constants::{DEFAULT_MAX_HISTORY, DEFAULT_MERGE_WINDOW};
use crate::data_manager::DataManager;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the command history
#[derive(Debug, Clone, Copy)]
pub struct HistoryConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
    /// Follow-up edits closer than this are folded into the previous step
    pub merge_window: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            merge_window: DEFAULT_MERGE_WINDOW,
        }
    }
}

// ============================================================================
// Command manager
// ============================================================================

/// Executes commands against a [`DataManager`] and keeps the undo/redo
/// history.
///
/// Maintains two stacks:
/// - `undo_stack`: applied commands (most recent at the end)
/// - `redo_stack`: undone commands (most recent at the end)
///
/// Executing a new command clears the redo stack. A command whose redo or
/// undo fails is dropped from history with a warning; the rest of the history
/// stays usable.
#[derive(Debug, Default)]
pub struct CmdManager {
    undo_stack: Vec<Cmd>,
    redo_stack: Vec<Cmd>,
    config: HistoryConfig,
}

impl CmdManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Apply a command and record it.
    ///
    /// Returns `false` if the command could not be applied; nothing is
    /// recorded in that case.
    pub fn execute(&mut self, mut cmd: Cmd, data: &mut DataManager) -> bool {
        if let Some(top) = self.undo_stack.last_mut() {
            if top.can_merge(&cmd, self.config.merge_window) {
                if let Err(e) = cmd.redo(data) {
                    log::warn!("⚠️ Command '{}' not applied: {}", cmd.description(), e);
                    return false;
                }
                log::debug!("🔗 Merged '{}' into previous step", cmd.description());
                top.merge(cmd);
                self.redo_stack.clear();
                return true;
            }
        }

        if let Err(e) = cmd.redo(data) {
            log::warn!("⚠️ Command '{}' not applied: {}", cmd.description(), e);
            return false;
        }
        log::debug!("📝 Executed '{}'", cmd.description());
        self.undo_stack.push(cmd);
        self.redo_stack.clear();

        // Limit history size
        if self.undo_stack.len() > self.config.max_history {
            let excess = self.undo_stack.len() - self.config.max_history;
            self.undo_stack.drain(..excess);
        }
        true
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Revert the most recent command.
    ///
    /// Returns the objects it touched, or `None` if there was nothing to undo
    /// or the undo failed (the command is then discarded).
    pub fn undo(&mut self, data: &mut DataManager) -> Option<Vec<Affected>> {
        let mut cmd = self.undo_stack.pop()?;
        match cmd.undo(data) {
            Ok(()) => {
                log::debug!("⏪ Undo: '{}'", cmd.description());
                let affected = cmd.affected();
                self.redo_stack.push(cmd);
                Some(affected)
            }
            Err(e) => {
                log::warn!("⚠️ Undo of '{}' failed, dropping it: {}", cmd.description(), e);
                None
            }
        }
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, data: &mut DataManager) -> Option<Vec<Affected>> {
        let mut cmd = self.redo_stack.pop()?;
        match cmd.redo(data) {
            Ok(()) => {
                log::debug!("⏩ Redo: '{}'", cmd.description());
                let affected = cmd.affected();
                self.undo_stack.push(cmd);
                Some(affected)
            }
            Err(e) => {
                log::warn!("⚠️ Redo of '{}' failed, dropping it: {}", cmd.description(), e);
                None
            }
        }
    }

    /// Get the description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    /// Get the description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("🗑️ Command history cleared");
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_history(&self) -> usize {
        self.config.max_history
    }

    pub fn merge_window(&self) -> Duration {
        self.config.merge_window
    }
}

// ============================================================================
// Tests
// ============================================================================
