//! Round State Machine.
//!
//! Tracks one reconstruction round and strictly enforces its transitions.
//!
//! # States
//! - **Idle**: Engine created, roster not frozen yet.
//! - **CollectingShares**: Roster frozen with enough live clients; shares are pulled.
//! - **Reconstructing**: Shares gathered; dropped clients' noise is being derived.
//! - **Done**: Noise delivered. Terminal.
//! - **Aborted**: Unrecoverable failure. Terminal; a retry needs a new engine.

use super::ReconstructError;

/// Possible states of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    CollectingShares,
    Reconstructing,
    Done,
    Aborted,
}

impl RoundState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoundState::Done | RoundState::Aborted)
    }
}

/// Observer trait for state changes.
pub trait RoundObserver: Send + Sync {
    fn on_state_change(&self, from: RoundState, to: RoundState);
}

/// RAII guard for state transitions.
/// If dropped without `commit()`, it rolls back the state.
pub struct StateTransition<'a> {
    sm: &'a mut RoundStateMachine,
    original_state: RoundState,
    committed: bool,
}

impl<'a> StateTransition<'a> {
    /// Commits the state transition.
    pub fn commit(mut self) {
        self.committed = true;
        self.sm.notify_observers(self.original_state, self.sm.current_state);
    }
}

impl<'a> Drop for StateTransition<'a> {
    fn drop(&mut self) {
        if !self.committed {
            log::warn!("Rolling back round state: {:?} -> {:?}", self.sm.current_state, self.original_state);
            self.sm.current_state = self.original_state;
        }
    }
}

/// The round state machine.
pub struct RoundStateMachine {
    current_state: RoundState,
    observers: Vec<Box<dyn RoundObserver>>,
}

impl Default for RoundStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundStateMachine {
    /// Creates a new state machine in the Idle state.
    pub fn new() -> Self {
        Self {
            current_state: RoundState::Idle,
            observers: Vec::new(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> RoundState {
        self.current_state
    }

    /// Adds a state observer.
    pub fn add_observer(&mut self, observer: Box<dyn RoundObserver>) {
        self.observers.push(observer);
    }

    fn notify_observers(&self, from: RoundState, to: RoundState) {
        for obs in &self.observers {
            obs.on_state_change(from, to);
        }
    }

    /// Begins a transactional state update.
    /// Returns a guard that must be committed.
    fn begin_transition(&mut self, new_state: RoundState) -> StateTransition<'_> {
        let original_state = self.current_state;
        log::info!("Round state transition: {:?} -> {:?}", original_state, new_state);
        self.current_state = new_state;
        StateTransition {
            sm: self,
            original_state,
            committed: false,
        }
    }

    fn expect(&self, expected: RoundState) -> Result<(), ReconstructError> {
        if self.current_state != expected {
            return Err(ReconstructError::InvalidState {
                expected,
                found: self.current_state,
            });
        }
        Ok(())
    }

    /// Idle -> CollectingShares (roster frozen).
    pub fn start_collecting(&mut self) -> Result<(), ReconstructError> {
        self.expect(RoundState::Idle)?;
        self.begin_transition(RoundState::CollectingShares).commit();
        Ok(())
    }

    /// CollectingShares -> Reconstructing.
    ///
    /// Fails for every caller but the first; the engine relies on this to run
    /// reconstruction at most once per round.
    pub fn start_reconstructing(&mut self) -> Result<(), ReconstructError> {
        self.expect(RoundState::CollectingShares)?;
        self.begin_transition(RoundState::Reconstructing).commit();
        Ok(())
    }

    /// Reconstructing -> Done.
    pub fn finish(&mut self) -> Result<(), ReconstructError> {
        self.expect(RoundState::Reconstructing)?;
        self.begin_transition(RoundState::Done).commit();
        Ok(())
    }

    /// Any non-terminal state -> Aborted. Idempotent once aborted.
    pub fn abort(&mut self) -> Result<(), ReconstructError> {
        match self.current_state {
            RoundState::Aborted => Ok(()),
            RoundState::Done => Err(ReconstructError::InvalidState {
                expected: RoundState::Reconstructing,
                found: RoundState::Done,
            }),
            _ => {
                self.begin_transition(RoundState::Aborted).commit();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<(RoundState, RoundState)>>>);

    impl RoundObserver for Recorder {
        fn on_state_change(&self, from: RoundState, to: RoundState) {
            self.0.lock().unwrap().push((from, to));
        }
    }

    #[test]
    fn test_initial_state() {
        let sm = RoundStateMachine::new();
        assert_eq!(sm.state(), RoundState::Idle);
    }

    #[test]
    fn test_valid_flow() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sm = RoundStateMachine::new();
        sm.add_observer(Box::new(Recorder(Arc::clone(&log))));

        sm.start_collecting().unwrap();
        sm.start_reconstructing().unwrap();
        sm.finish().unwrap();
        assert_eq!(sm.state(), RoundState::Done);
        assert!(sm.state().is_terminal());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (RoundState::Idle, RoundState::CollectingShares),
                (RoundState::CollectingShares, RoundState::Reconstructing),
                (RoundState::Reconstructing, RoundState::Done),
            ]
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let mut sm = RoundStateMachine::new();

        // Idle -> Reconstructing (direct jump not allowed)
        assert_eq!(
            sm.start_reconstructing(),
            Err(ReconstructError::InvalidState {
                expected: RoundState::CollectingShares,
                found: RoundState::Idle
            })
        );

        sm.start_collecting().unwrap();
        sm.start_reconstructing().unwrap();
        // Second trigger loses.
        assert!(sm.start_reconstructing().is_err());
    }

    #[test]
    fn test_abort_is_terminal() {
        let mut sm = RoundStateMachine::new();
        sm.start_collecting().unwrap();
        sm.abort().unwrap();
        assert_eq!(sm.state(), RoundState::Aborted);
        sm.abort().unwrap();

        assert!(sm.start_collecting().is_err());
        assert!(sm.start_reconstructing().is_err());
        assert!(sm.finish().is_err());
    }

    #[test]
    fn test_done_cannot_abort() {
        let mut sm = RoundStateMachine::new();
        sm.start_collecting().unwrap();
        sm.start_reconstructing().unwrap();
        sm.finish().unwrap();
        assert!(sm.abort().is_err());
        assert_eq!(sm.state(), RoundState::Done);
    }

    #[test]
    fn test_transaction_rollback() {
        let mut sm = RoundStateMachine::new();
        {
            let _trans = sm.begin_transition(RoundState::CollectingShares);
            // Drop without commit
        }
        assert_eq!(sm.state(), RoundState::Idle);
    }
}
