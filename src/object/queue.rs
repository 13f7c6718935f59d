//! FIFO buffer of calls made against an object under construction.
//!
//! # States
//!
//! ```text
//! Open ──trigger──▶ Draining ──(queue empty)──▶ Triggered
//! ```
//!
//! - **Open**: pushes append.
//! - **Draining**: entries run in order against the target; pushes made by
//!   the running entries (or anything else) append and are drained too.
//! - **Triggered**: pushes run immediately against the target.
//!
//! The queue reaches `Triggered` even if an entry panics during the drain.
//! The panic propagates; the entries still waiting behind it are dropped
//! with a warning.
//!
//! # Interface entries
//!
//! A call to an interface method is pushed together with an
//! [`QueueEntry::Interface`] right behind it. When a call is taken off the
//! queue and the entry following it is an interface entry, the call runs in
//! deferred mode and its result is handed to the interface entry's
//! continuation instead of to a callback.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::deferred::{Arguments, Callback};

use super::factory::Instance;

/// A buffered method call.
pub(crate) struct CallEntry {
    pub(crate) method: String,
    pub(crate) arguments: Arguments,
    /// Receives the result. Calls followed by an interface entry carry none.
    pub(crate) callback: Option<Callback>,
}

/// An element of a [`CallQueue`].
pub(crate) enum QueueEntry {
    /// A method call.
    Call(CallEntry),
    /// Receives the result of the call queued right before it.
    Interface(Callback),
}

impl QueueEntry {
    fn into_link(self) -> Option<Callback> {
        match self {
            Self::Call(_) => None,
            Self::Interface(link) => Some(link),
        }
    }
}

enum QueueState {
    Open(VecDeque<QueueEntry>),
    Draining {
        target: Rc<Instance>,
        entries: VecDeque<QueueEntry>,
    },
    Triggered(Rc<Instance>),
}

/// A call queue. See the module documentation for its states.
pub(crate) struct CallQueue {
    state: RefCell<QueueState>,
}

impl CallQueue {
    /// Creates an open queue.
    pub(crate) const fn new() -> Self {
        Self {
            state: RefCell::new(QueueState::Open(VecDeque::new())),
        }
    }

    /// Creates a queue already triggered against `target`.
    pub(crate) const fn triggered(target: Rc<Instance>) -> Self {
        Self {
            state: RefCell::new(QueueState::Triggered(target)),
        }
    }

    /// Returns `true` until the queue has been triggered.
    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        matches!(&*self.state.borrow(), QueueState::Open(_))
    }

    /// Returns the number of entries waiting to run.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        match &*self.state.borrow() {
            QueueState::Open(entries) | QueueState::Draining { entries, .. } => entries.len(),
            QueueState::Triggered(_) => 0,
        }
    }

    /// Appends `batch` as one contiguous run of entries, or runs it at once
    /// if the queue is triggered.
    pub(crate) fn push(&self, batch: Vec<QueueEntry>) {
        let target = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                QueueState::Open(entries) | QueueState::Draining { entries, .. } => {
                    entries.extend(batch);
                    return;
                }
                QueueState::Triggered(target) => Rc::clone(target),
            }
        };

        let mut batch = VecDeque::from(batch);
        while let Some((call, link)) = next_call(&mut batch) {
            execute(&target, call, link);
        }
    }

    /// Drains every entry against `target`, including entries pushed while
    /// draining, then switches to immediate execution.
    ///
    /// Returns `false`, leaving the queue untouched, if it was already triggered.
    pub(crate) fn trigger(&self, target: Rc<Instance>) -> bool {
        {
            let mut state = self.state.borrow_mut();
            let QueueState::Open(entries) = &mut *state else {
                tracing::warn!(kind = target.kind_name(), "call queue triggered twice; ignored");
                return false;
            };
            let entries = std::mem::take(entries);
            tracing::debug!(
                kind = target.kind_name(),
                entries = entries.len(),
                "draining call queue"
            );
            *state = QueueState::Draining {
                target: Rc::clone(&target),
                entries,
            };
        }

        let _finish = FinishDrain {
            queue: self,
            target: Rc::clone(&target),
        };
        loop {
            let next = match &mut *self.state.borrow_mut() {
                QueueState::Draining { entries, .. } => next_call(entries),
                _ => None,
            };
            let Some((call, link)) = next else {
                break;
            };
            execute(&target, call, link);
        }
        true
    }
}

/// Switches a draining queue to `Triggered` when the drain ends, normally
/// or by unwinding.
struct FinishDrain<'a> {
    queue: &'a CallQueue,
    target: Rc<Instance>,
}

impl Drop for FinishDrain<'_> {
    fn drop(&mut self) {
        let Ok(mut state) = self.queue.state.try_borrow_mut() else {
            return;
        };
        let previous = std::mem::replace(
            &mut *state,
            QueueState::Triggered(Rc::clone(&self.target)),
        );
        drop(state);

        if let QueueState::Draining { entries, .. } = previous
            && !entries.is_empty()
        {
            tracing::warn!(
                kind = self.target.kind_name(),
                dropped = entries.len(),
                "queued call panicked during drain; remaining entries dropped"
            );
        }
    }
}

/// Takes the next call off `entries`, together with the interface entry
/// directly behind it, if any.
fn next_call(entries: &mut VecDeque<QueueEntry>) -> Option<(CallEntry, Option<Callback>)> {
    loop {
        match entries.pop_front()? {
            QueueEntry::Call(call) => {
                let link = if matches!(entries.front(), Some(QueueEntry::Interface(_))) {
                    entries.pop_front().and_then(QueueEntry::into_link)
                } else {
                    None
                };
                return Some((call, link));
            }
            QueueEntry::Interface(_) => {
                tracing::warn!("interface entry without a preceding call; dropped");
            }
        }
    }
}

fn execute(target: &Rc<Instance>, call: CallEntry, link: Option<Callback>) {
    let CallEntry {
        method,
        arguments,
        callback,
    } = call;

    let Some(callable) = target.method(&method) else {
        tracing::warn!(
            kind = target.kind_name(),
            method = %method,
            "queued call names a method the target does not have; dropped"
        );
        return;
    };

    match (link, callback) {
        (Some(link), _) => callable.call(arguments).resolve_with(link),
        (None, Some(callback)) => callable.call_with(arguments, callback),
        (None, None) => callable.call(arguments).resolve_with(drop),
    }
}
