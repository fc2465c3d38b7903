//! Undo/redo history with coalescing.
//!
//! The undo stack holds *inverse* commands: executing the top entry takes the
//! document one step back. Consecutive attribute edits belonging to the same
//! gesture are folded into one entry by [`Command::attempt_coalesce`].

use crate::commands::{Coalesce, Command};
use crate::config::HistoryConfig;
use crate::error::{EditorError, EditorResult};
use gd_core::SceneGraph;
use std::collections::VecDeque;

/// One undo step. A sealed entry never absorbs later commands and stops the
/// coalescing scan.
#[derive(Debug, Clone)]
struct Entry {
    command: Command,
    sealed: bool,
}

/// What [`HistoryEngine::push`] did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Merged into an existing entry; the undo stack did not grow.
    Coalesced,
    /// Recorded as a new entry.
    Appended,
}

/// Linear undo/redo history for one document.
#[derive(Debug)]
pub struct HistoryEngine {
    undo_stack: VecDeque<Entry>,
    redo_stack: Vec<Command>,
    config: HistoryConfig,
}

impl HistoryEngine {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Record an undo-direction command.
    ///
    /// Any new edit invalidates the redo branch. Attribute commands are first
    /// offered to existing entries, newest first: `Replace` absorbs it,
    /// `Continue` moves on to the next older entry, and `Stop` (or a sealed
    /// entry) ends the scan. Structural commands are always appended.
    ///
    /// # Errors
    /// `UseAfterExecute` if the command has already been executed.
    pub fn push(&mut self, command: Command) -> EditorResult<PushOutcome> {
        if command.is_spent() {
            return Err(EditorError::UseAfterExecute(command.description()));
        }
        self.redo_stack.clear();

        if !command.is_structural() {
            for entry in self.undo_stack.iter_mut().rev() {
                if entry.sealed {
                    break;
                }
                match entry
                    .command
                    .attempt_coalesce(&command, &self.config.coalesce_groups)
                {
                    Coalesce::Replace => {
                        log::trace!("coalesced {}", command.description());
                        return Ok(PushOutcome::Coalesced);
                    }
                    Coalesce::Continue => continue,
                    Coalesce::Stop => break,
                }
            }
        }

        log::trace!("recorded {}", command.description());
        self.undo_stack.push_back(Entry {
            command,
            sealed: false,
        });
        self.evict();
        Ok(PushOutcome::Appended)
    }

    /// Execute a forward command against `graph` and record its inverse.
    pub fn execute(&mut self, graph: &mut SceneGraph, mut command: Command) -> EditorResult<PushOutcome> {
        let inverse = command.execute(graph)?;
        self.push(inverse)
    }

    /// Undo the most recent entry. Returns `false` when there is nothing to undo.
    /// On error the entry stays on the undo stack.
    pub fn undo(&mut self, graph: &mut SceneGraph) -> EditorResult<bool> {
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        let description = entry.command.description();
        let redo = match entry.command.execute(graph) {
            Ok(redo) => redo,
            Err(err) => {
                log::warn!("undo of {description} failed: {err}");
                self.undo_stack.push_back(entry);
                return Err(err);
            }
        };
        log::debug!("undo: {description}");
        self.redo_stack.push(redo);
        // An edit after undo must not fold into the entry below.
        self.seal();
        Ok(true)
    }

    /// Redo the most recently undone entry. Returns `false` when there is
    /// nothing to redo.
    /// On error the command stays on the redo stack.
    pub fn redo(&mut self, graph: &mut SceneGraph) -> EditorResult<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let description = command.description();
        let undo = match command.execute(graph) {
            Ok(undo) => undo,
            Err(err) => {
                log::warn!("redo of {description} failed: {err}");
                self.redo_stack.push(command);
                return Err(err);
            }
        };
        log::debug!("redo: {description}");
        self.undo_stack.push_back(Entry {
            command: undo,
            sealed: true,
        });
        self.evict();
        Ok(true)
    }

    /// Close the current gesture: the next edit starts a new entry even if it
    /// would otherwise coalesce.
    pub fn seal(&mut self) {
        if let Some(top) = self.undo_stack.back_mut() {
            top.sealed = true;
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Labels of the undo entries, most recent first.
    pub fn undo_descriptions(&self) -> Vec<String> {
        self.undo_stack
            .iter()
            .rev()
            .map(|e| e.command.description())
            .collect()
    }

    fn evict(&mut self) {
        let Some(max) = self.config.max_depth else {
            return;
        };
        while self.undo_stack.len() > max {
            if let Some(dropped) = self.undo_stack.pop_front() {
                log::debug!("history full, dropping {}", dropped.command.description());
            }
        }
    }
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}
