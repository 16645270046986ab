// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Lifecycle State Machine
//!
//! Every stage carries a [`StateMachine`] tracking where it is in the
//! lifecycle and which transitions it accepts. The default table is:
//!
//! ```text
//! UNLOADED → LOADED     construction succeeded and schema is set
//! LOADED   → READY      children (if any) reached READY; config validated
//! READY    → RUNNING    on execute
//! RUNNING  → COMPLETE   successful end
//! any      → FAILED     failure from any state
//! FAILED   → UNLOADED   reset path
//! ```
//!
//! A transition request to the current state is a no-op success. Any unlisted
//! transition is rejected, logged at error level with the caller's identity
//! and source location, and leaves the state unchanged. Stages may widen the
//! table with [`StateMachine::add_transition`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::EngineError;

/// The lifecycle states a stage moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageState {
    Unloaded,
    Loaded,
    Ready,
    Running,
    Complete,
    Failed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageState::Unloaded => "UNLOADED",
            StageState::Loaded => "LOADED",
            StageState::Ready => "READY",
            StageState::Running => "RUNNING",
            StageState::Complete => "COMPLETE",
            StageState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for StageState {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNLOADED" => Ok(StageState::Unloaded),
            "LOADED" => Ok(StageState::Loaded),
            "READY" => Ok(StageState::Ready),
            "RUNNING" => Ok(StageState::Running),
            "COMPLETE" => Ok(StageState::Complete),
            "FAILED" => Ok(StageState::Failed),
            other => Err(EngineError::Internal(format!("unknown stage state: {}", other))),
        }
    }
}

struct StateTable {
    current: StageState,
    states: BTreeSet<StageState>,
    transitions: HashMap<StageState, HashSet<StageState>>,
}

/// Tracks the current lifecycle state and the allowed-transition table.
///
/// Interior mutability keeps transition requests usable from shared stage
/// references; the parallel executor drives children from several threads.
pub struct StateMachine {
    table: Mutex<StateTable>,
}

impl StateMachine {
    /// Creates a state machine in `UNLOADED`.
    ///
    /// With `with_defaults` the full default lifecycle is installed;
    /// otherwise only the `UNLOADED ↔ FAILED` pair is available and the
    /// owner is expected to add its own transitions.
    pub fn new(with_defaults: bool) -> Self {
        let machine = StateMachine {
            table: Mutex::new(StateTable {
                current: StageState::Unloaded,
                states: BTreeSet::new(),
                transitions: HashMap::new(),
            }),
        };
        // Only viable transitions at the start.
        machine.add_transition(StageState::Unloaded, StageState::Failed);
        machine.add_transition(StageState::Failed, StageState::Unloaded);
        if with_defaults {
            machine.add_transition(StageState::Unloaded, StageState::Loaded);
            machine.add_transition(StageState::Loaded, StageState::Ready);
            machine.add_transition(StageState::Ready, StageState::Running);
            machine.add_transition(StageState::Running, StageState::Complete);
        }
        machine
    }

    /// Allows an additional transition. Both endpoints also gain an edge to
    /// `FAILED`, which is reachable from every tracked state.
    pub fn add_transition(&self, from: StageState, to: StageState) {
        let mut table = self.table.lock();
        table.states.insert(from);
        table.states.insert(to);
        table.transitions.entry(from).or_default().insert(StageState::Failed);
        table.transitions.entry(to).or_default().insert(StageState::Failed);
        table.transitions.entry(from).or_default().insert(to);
    }

    /// Removes a transition; states left without edges are dropped from the
    /// tracked set.
    pub fn remove_transition(&self, from: StageState, to: StageState) -> bool {
        let mut table = self.table.lock();
        let Some(outgoing) = table.transitions.get_mut(&from) else {
            return false;
        };
        outgoing.remove(&to);
        if outgoing.is_empty() {
            table.transitions.remove(&from);
            table.states.remove(&from);
        }
        let to_reachable = table.transitions.values().any(|targets| targets.contains(&to));
        if !to_reachable {
            table.states.remove(&to);
        }
        true
    }

    /// Requests a transition on behalf of `owner`.
    ///
    /// Same-state requests succeed without effect. Unlisted transitions are
    /// rejected, logged at error level with the caller's source location,
    /// and leave the state unchanged.
    #[track_caller]
    pub fn transition_to(&self, new_state: StageState, owner: &str) -> bool {
        let caller = std::panic::Location::caller();
        let mut table = self.table.lock();
        if table.current == new_state {
            return true;
        }
        let allowed = table
            .transitions
            .get(&table.current)
            .is_some_and(|targets| targets.contains(&new_state));
        if allowed {
            debug!(
                "state machine for {} at {}:{} transitioning from {} to {}",
                owner,
                caller.file(),
                caller.line(),
                table.current,
                new_state
            );
            table.current = new_state;
            true
        } else {
            error!(
                "state machine for {} at {}:{} rejected invalid transition from {} to {}",
                owner,
                caller.file(),
                caller.line(),
                table.current,
                new_state
            );
            false
        }
    }

    pub fn current(&self) -> StageState {
        self.table.lock().current
    }

    /// All states tracked by the table.
    pub fn states(&self) -> BTreeSet<StageState> {
        self.table.lock().states.clone()
    }

    /// Viable transitions out of the given state.
    pub fn transitions_from(&self, state: StageState) -> BTreeSet<StageState> {
        self.table
            .lock()
            .transitions
            .get(&state)
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifecycle_happy_path() {
        let machine = StateMachine::default();
        assert_eq!(machine.current(), StageState::Unloaded);
        assert!(machine.transition_to(StageState::Loaded, "test"));
        assert!(machine.transition_to(StageState::Ready, "test"));
        assert!(machine.transition_to(StageState::Running, "test"));
        assert!(machine.transition_to(StageState::Complete, "test"));
        assert_eq!(machine.current(), StageState::Complete);
    }

    #[test]
    fn test_unlisted_transition_rejected_and_state_unchanged() {
        let machine = StateMachine::default();
        assert!(!machine.transition_to(StageState::Running, "test"));
        assert_eq!(machine.current(), StageState::Unloaded);
        assert!(!machine.transition_to(StageState::Complete, "test"));
        assert_eq!(machine.current(), StageState::Unloaded);
    }

    #[test]
    fn test_same_state_is_noop_success() {
        let machine = StateMachine::default();
        assert!(machine.transition_to(StageState::Unloaded, "test"));
        assert_eq!(machine.current(), StageState::Unloaded);
    }

    #[test]
    fn test_failed_reachable_from_every_state() {
        for target in [StageState::Unloaded, StageState::Loaded, StageState::Ready, StageState::Running] {
            let machine = StateMachine::default();
            let mut walk = vec![StageState::Loaded, StageState::Ready, StageState::Running];
            walk.truncate(match target {
                StageState::Unloaded => 0,
                StageState::Loaded => 1,
                StageState::Ready => 2,
                _ => 3,
            });
            for state in walk {
                assert!(machine.transition_to(state, "test"));
            }
            assert!(machine.transition_to(StageState::Failed, "test"));
            assert_eq!(machine.current(), StageState::Failed);
        }
    }

    #[test]
    fn test_reset_path_failed_unloaded_loaded() {
        let machine = StateMachine::default();
        assert!(machine.transition_to(StageState::Failed, "test"));
        assert!(machine.transition_to(StageState::Unloaded, "test"));
        assert!(machine.transition_to(StageState::Loaded, "test"));
    }

    #[test]
    fn test_custom_transition_can_be_added() {
        let machine = StateMachine::default();
        assert!(machine.transition_to(StageState::Loaded, "test"));
        assert!(machine.transition_to(StageState::Ready, "test"));
        assert!(machine.transition_to(StageState::Running, "test"));
        assert!(machine.transition_to(StageState::Complete, "test"));
        // Re-arm a completed stage.
        machine.add_transition(StageState::Complete, StageState::Ready);
        assert!(machine.transition_to(StageState::Ready, "test"));
    }

    #[test]
    fn test_remove_transition() {
        let machine = StateMachine::default();
        assert!(machine.remove_transition(StageState::Unloaded, StageState::Loaded));
        assert!(!machine.transition_to(StageState::Loaded, "test"));
    }
}
