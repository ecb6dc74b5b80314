//! Single-decision outcome arbiter.
//!
//! # Responsibilities
//! - Decide, once per request, whether the handler or the deadline won
//! - Guard the buffered response under the same lock as the decision
//! - Discard every later attempt to decide or mutate
//!
//! # Design Decisions
//! - One `Mutex` holds both the outcome and the guarded value, so a late
//!   buffer write can never land after the outcome flipped to `TimedOut`
//! - Critical sections are short and never span an `.await`
//! - A poisoned lock is recovered instead of propagated; the state it guards
//!   is only ever replaced whole

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Resolution state of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Neither producer has been observed yet.
    Pending,
    /// The handler finished first; its buffered response is committed.
    Completed,
    /// The deadline elapsed first; the fixed timeout response is committed.
    TimedOut,
}

impl Outcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Completed => "completed",
            Outcome::TimedOut => "timed_out",
        }
    }

    /// Whether this is a terminal state.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Slot<T> {
    outcome: Outcome,
    value: T,
}

/// Compare-and-set arbiter over a guarded value.
pub struct Arbiter<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Arbiter<T> {
    /// Create a pending arbiter guarding `value`.
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Slot {
                outcome: Outcome::Pending,
                value,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current outcome.
    pub fn outcome(&self) -> Outcome {
        self.lock().outcome
    }

    /// Transition `Pending -> outcome`.
    ///
    /// Returns true for exactly one caller. `Pending` is not a valid target.
    pub fn try_resolve(&self, outcome: Outcome) -> bool {
        self.resolve_with(outcome, |_| ()).is_some()
    }

    /// Transition `Pending -> outcome` and, if this call won, run `f` on the
    /// guarded value inside the same critical section.
    pub fn resolve_with<R>(&self, outcome: Outcome, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if !outcome.is_resolved() {
            return None;
        }
        let mut slot = self.lock();
        if slot.outcome.is_resolved() {
            return None;
        }
        slot.outcome = outcome;
        Some(f(&mut slot.value))
    }

    /// Run `f` on the guarded value only while still pending.
    pub fn while_pending<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut slot = self.lock();
        if slot.outcome.is_resolved() {
            return None;
        }
        Some(f(&mut slot.value))
    }

    /// Read the guarded value regardless of outcome.
    pub fn inspect<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().value)
    }
}

impl<T: Default> Default for Arbiter<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Arbiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arbiter")
            .field("outcome", &self.outcome())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_first_resolution_wins() {
        let arbiter: Arbiter<()> = Arbiter::default();
        assert_eq!(arbiter.outcome(), Outcome::Pending);

        assert!(arbiter.try_resolve(Outcome::TimedOut));
        assert!(!arbiter.try_resolve(Outcome::Completed));
        assert!(!arbiter.try_resolve(Outcome::TimedOut));
        assert_eq!(arbiter.outcome(), Outcome::TimedOut);
    }

    #[test]
    fn test_pending_is_not_a_target() {
        let arbiter: Arbiter<()> = Arbiter::default();
        assert!(!arbiter.try_resolve(Outcome::Pending));
        assert_eq!(arbiter.outcome(), Outcome::Pending);
        assert!(arbiter.try_resolve(Outcome::Completed));
    }

    #[test]
    fn test_concurrent_callers_single_winner() {
        let arbiter = Arc::new(Arbiter::new(0u32));
        let barrier = Arc::new(Barrier::new(16));
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|i| {
                let arbiter = arbiter.clone();
                let barrier = barrier.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    let outcome = if i % 2 == 0 { Outcome::Completed } else { Outcome::TimedOut };
                    barrier.wait();
                    if arbiter.resolve_with(outcome, |v| *v += 1).is_some() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(arbiter.inspect(|v| *v), 1);
        assert!(arbiter.outcome().is_resolved());
    }

    #[test]
    fn test_mutations_stop_after_resolution() {
        let arbiter = Arbiter::new(Vec::new());
        assert_eq!(arbiter.while_pending(|v| v.push(1)), Some(()));

        let taken = arbiter.resolve_with(Outcome::Completed, std::mem::take);
        assert_eq!(taken, Some(vec![1]));

        assert_eq!(arbiter.while_pending(|v| v.push(2)), None);
        assert!(arbiter.inspect(|v| v.is_empty()));
    }
}
