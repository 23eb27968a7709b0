//! Closed status sets with explicit transition tables.
//!
//! A status field holds one of a fixed set of states. Moving between states
//! is only allowed along the edges declared in the machine; staying in the
//! current state is always allowed so that forms can resubmit unchanged
//! records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// States and allowed transitions for one status field.
///
/// Every state appears as a key in `transitions`, including terminal states
/// (with an empty list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusMachine {
    pub initial: String,
    pub transitions: IndexMap<String, Vec<String>>,
}

impl StatusMachine {
    /// Start a machine whose initial state is `initial`.
    pub fn new(initial: &str) -> Self {
        let mut transitions = IndexMap::new();
        transitions.insert(initial.to_string(), Vec::new());
        Self {
            initial: initial.to_string(),
            transitions,
        }
    }

    /// Declare `from -> to` for each target, registering unseen states.
    pub fn allow(mut self, from: &str, to: &[&str]) -> Self {
        for state in to {
            self.transitions.entry((*state).to_string()).or_default();
        }
        let edges = self.transitions.entry(from.to_string()).or_default();
        for state in to {
            if !edges.iter().any(|s| s == state) {
                edges.push((*state).to_string());
            }
        }
        self
    }

    /// All states in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.transitions.keys().map(String::as_str)
    }

    pub fn is_state(&self, state: &str) -> bool {
        self.transitions.contains_key(state)
    }

    /// States directly reachable from `from`.
    pub fn valid_transitions(&self, from: &str) -> &[String] {
        self.transitions
            .get(from)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn can_transition(&self, from: &str, to: &str) -> bool {
        self.is_state(to)
            && (from == to || self.valid_transitions(from).iter().any(|s| s == to))
    }

    /// States from which `to` may be entered (including `to` itself).
    pub fn predecessors_of(&self, to: &str) -> Vec<&str> {
        self.transitions
            .iter()
            .filter(|(from, nexts)| *from == to || nexts.iter().any(|s| s == to))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// Validate that `state` belongs to this machine.
    pub fn validate_state(&self, field: &str, state: &str) -> Result<(), CoreError> {
        if self.is_state(state) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Invalid {field} '{state}'. Must be one of: {:?}",
                self.states().collect::<Vec<_>>()
            )))
        }
    }

    /// Validate that a transition from `current` to `next` is allowed.
    pub fn validate_transition(
        &self,
        field: &str,
        current: &str,
        next: &str,
    ) -> Result<(), CoreError> {
        self.validate_state(field, next)?;
        if self.can_transition(current, next) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Cannot transition {field} from '{current}' to '{next}'. Allowed transitions: {:?}",
                self.valid_transitions(current)
            )))
        }
    }

    /// Check that the machine is closed: the initial state exists and every
    /// target is itself a declared state.
    pub fn check(&self, field: &str) -> Result<(), CoreError> {
        if !self.is_state(&self.initial) {
            return Err(CoreError::Validation(format!(
                "Status field '{field}' has undeclared initial state '{}'",
                self.initial
            )));
        }
        for (from, nexts) in &self.transitions {
            if let Some(missing) = nexts.iter().find(|s| !self.is_state(s)) {
                return Err(CoreError::Validation(format!(
                    "Status field '{field}' allows '{from}' -> '{missing}', but '{missing}' is not a state"
                )));
            }
        }
        Ok(())
    }
}
