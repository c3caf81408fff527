//! Request lifecycle state shared by every store

use serde::Serialize;

/// Phase of the most recent operation: `Idle -> Pending -> Fulfilled | Rejected -> Idle`.
///
/// Returning to `Idle` from a terminal phase is an explicit `reset`, never automatic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationPhase {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

/// Result of a store operation as seen by its caller
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome<T> {
    Fulfilled(T),
    /// Carries the message that was also written into the store
    Rejected(String),
    /// The cancel token fired; the store was left without a result
    Cancelled,
}

impl<T> OperationOutcome<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, OperationOutcome::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, OperationOutcome::Rejected(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationOutcome::Cancelled)
    }

    pub fn value(self) -> Option<T> {
        match self {
            OperationOutcome::Fulfilled(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationOutcome<U> {
        match self {
            OperationOutcome::Fulfilled(value) => OperationOutcome::Fulfilled(f(value)),
            OperationOutcome::Rejected(message) => OperationOutcome::Rejected(message),
            OperationOutcome::Cancelled => OperationOutcome::Cancelled,
        }
    }
}

/// Lifecycle flags every store carries
pub trait Lifecycle {
    fn begin(&mut self);
    fn fulfil(&mut self);
    fn reject(&mut self, message: String);
    /// Cancelled before completion: stop loading, record nothing
    fn abandon(&mut self);
    fn reset(&mut self);
}

/// Lifecycle flags plus the cached entity list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreState<E> {
    pub items: Vec<E>,
    pub loading: bool,
    pub error: bool,
    pub success: bool,
    pub message: String,
    pub phase: OperationPhase,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: false,
            success: false,
            message: String::new(),
            phase: OperationPhase::Idle,
        }
    }
}

/// Implement [`Lifecycle`] for a state struct with the flat
/// `loading/error/success/message/phase` fields
macro_rules! impl_lifecycle {
    ($(impl<$($generic:ident),*>)? for $state:ty) => {
        impl$(<$($generic),*>)? $crate::state::Lifecycle for $state {
            fn begin(&mut self) {
                self.loading = true;
                self.phase = $crate::state::OperationPhase::Pending;
            }

            fn fulfil(&mut self) {
                self.loading = false;
                self.error = false;
                self.success = true;
                self.phase = $crate::state::OperationPhase::Fulfilled;
            }

            fn reject(&mut self, message: String) {
                self.loading = false;
                self.error = true;
                self.success = false;
                self.message = message;
                self.phase = $crate::state::OperationPhase::Rejected;
            }

            fn abandon(&mut self) {
                self.loading = false;
                self.phase = $crate::state::OperationPhase::Idle;
            }

            /// Clears the flags; cached data is kept
            fn reset(&mut self) {
                self.loading = false;
                self.error = false;
                self.success = false;
                self.message.clear();
                self.phase = $crate::state::OperationPhase::Idle;
            }
        }
    };
}

pub(crate) use impl_lifecycle;

impl_lifecycle!(impl<E> for StoreState<E>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_walks_the_phases() {
        let mut state: StoreState<u32> = StoreState::default();
        state.items = vec![1, 2];

        state.begin();
        assert!(state.loading);
        assert_eq!(state.phase, OperationPhase::Pending);

        state.reject("Request failed with status code 500".to_string());
        assert!(!state.loading && state.error && !state.success);
        assert_eq!(state.phase, OperationPhase::Rejected);

        // Terminal phases stay until an explicit reset
        state.begin();
        state.fulfil();
        assert_eq!(state.phase, OperationPhase::Fulfilled);
        assert!(state.success && !state.error);

        state.reset();
        assert_eq!(state.phase, OperationPhase::Idle);
        assert!(state.message.is_empty());
        assert_eq!(state.items, vec![1, 2]);
    }

    #[test]
    fn abandon_leaves_no_result() {
        let mut state: StoreState<u32> = StoreState::default();
        state.begin();
        state.abandon();
        assert!(!state.loading && !state.error && !state.success);
        assert_eq!(state.phase, OperationPhase::Idle);
    }

    #[derive(Default)]
    struct Flags {
        loading: bool,
        error: bool,
        success: bool,
        message: String,
        phase: OperationPhase,
    }

    impl_lifecycle!(for Flags);

    #[test]
    fn plain_state_structs_get_the_same_lifecycle() {
        let mut flags = Flags::default();
        flags.begin();
        flags.reject("Network Error".to_string());
        assert!(flags.error && !flags.loading);
        assert_eq!(flags.message, "Network Error");

        flags.reset();
        assert!(!flags.error && !flags.success);
        assert_eq!(flags.phase, OperationPhase::Idle);
    }
}
