//! Resolution of argument lists containing deferred values.
//!
//! [`join`] waits for every [`Deferred`] position of an argument list and
//! then hands the fully resolved list, in the input order, to
//! a continuation.
//!
//! # Invariants
//!
//! - **Positional order**: the output order is the input order, whatever
//!   order the dependencies actually resolve in.
//! - **Single fire**: the continuation runs exactly once, whether the
//!   dependencies resolve during registration, later, or a mix of both.
//!
//! [`Deferred`]: super::Deferred

use std::cell::RefCell;
use std::rc::Rc;

use super::pending::{Argument, Arguments};
use super::value::Value;

type JoinContinuation = Box<dyn FnOnce(Vec<Value>)>;

/// The bookkeeping of one in-progress join.
struct PendingArguments {
    slots: Vec<Option<Value>>,
    waiting: usize,
    continuation: Option<JoinContinuation>,
}

impl PendingArguments {
    /// Fires the continuation if nothing is outstanding and it has not fired yet.
    fn finish(state: &Rc<RefCell<Self>>) {
        let ready = {
            let mut pending = state.borrow_mut();
            if pending.waiting > 0 {
                return;
            }
            let slots = std::mem::take(&mut pending.slots);
            pending.continuation.take().map(|continuation| (continuation, slots))
        };
        if let Some((continuation, slots)) = ready {
            debug_assert!(slots.iter().all(Option::is_some));
            continuation(slots.into_iter().flatten().collect());
        }
    }
}

/// Resolves `arguments` and passes the resulting values to `continuation`.
///
/// Each deferred position is consumed once. If no position is pending, or all
/// of them resolve synchronously, `continuation` runs before `join` returns.
///
/// # Examples
///
/// ```rust
/// use sinch::args;
/// use sinch::deferred::{Deferred, Value, join};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let received = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&received);
///
/// join(args![1, Deferred::resolved(2), 3], move |values| *sink.borrow_mut() = values);
///
/// assert_eq!(*received.borrow(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
/// ```
pub fn join<K>(arguments: Arguments, continuation: K)
where
    K: FnOnce(Vec<Value>) + 'static,
{
    let mut slots = Vec::with_capacity(arguments.len());
    let mut dependencies = Vec::new();

    for (position, argument) in arguments.into_iter().enumerate() {
        match argument {
            Argument::Value(value) => slots.push(Some(value)),
            Argument::Deferred(deferred) => {
                slots.push(None);
                dependencies.push((position, deferred));
            }
        }
    }

    let state = Rc::new(RefCell::new(PendingArguments {
        slots,
        waiting: dependencies.len(),
        continuation: Some(Box::new(continuation)),
    }));

    for (position, deferred) in dependencies {
        let state = Rc::clone(&state);
        deferred.resolve_with(move |value| {
            {
                let mut pending = state.borrow_mut();
                if let Some(slot) = pending.slots.get_mut(position) {
                    *slot = Some(value);
                }
                pending.waiting -= 1;
            }
            PendingArguments::finish(&state);
        });
    }

    PendingArguments::finish(&state);
}
