//! Binding-event sink.
//!
//! Resolution misses are not errors: a member that cannot be bound degrades
//! the render instead of aborting it. They are still worth reporting, so
//! every miss and ambiguity is recorded as a [`BindingEvent`]. The embedding
//! host drains the collector after a render and forwards events to whatever
//! logging it uses.
//!
//! The collector is shared by all rendering threads of a compiled template,
//! so recording goes through a mutex. Event volume is bounded by the number
//! of *misses*, not accesses - a bound call site stops emitting.

use std::fmt;
use std::sync::Mutex;

/// One recorded resolution miss or dropped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingEvent {
    /// A member read found no property, field, or indexer fallback.
    GetMemberFailure { member: String, target_type: String },
    /// A member read matched more than one member.
    GetMemberAmbiguous { member: String, target_type: String },
    /// A method invocation found no applicable overload.
    InvokeMemberFailure {
        member: String,
        target_type: String,
        arg_types: String,
    },
    /// More than one overload survived better-function-member elimination.
    InvokeMemberAmbiguous {
        member: String,
        target_type: String,
        arg_types: String,
    },
    /// A member write found no writable target; the write was dropped.
    SetMemberFailure {
        member: String,
        target_type: String,
        value_type: String,
    },
    /// An assignment compiled to a no-op (unassignable left-hand side).
    AssignmentDropped { target: String },
}

impl fmt::Display for BindingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingEvent::GetMemberFailure { member, target_type } => {
                write!(f, "unable to resolve property '{member}' on type '{target_type}'")
            }
            BindingEvent::GetMemberAmbiguous { member, target_type } => {
                write!(f, "ambiguous match for property '{member}' on type '{target_type}'")
            }
            BindingEvent::InvokeMemberFailure {
                member,
                target_type,
                arg_types,
            } => write!(
                f,
                "unable to resolve method '{member}({arg_types})' on type '{target_type}'"
            ),
            BindingEvent::InvokeMemberAmbiguous {
                member,
                target_type,
                arg_types,
            } => write!(
                f,
                "ambiguous overloads for method '{member}({arg_types})' on type '{target_type}'"
            ),
            BindingEvent::SetMemberFailure {
                member,
                target_type,
                value_type,
            } => write!(
                f,
                "unable to resolve writable member '{member}' on type '{target_type}' for value of type '{value_type}'"
            ),
            BindingEvent::AssignmentDropped { target } => {
                write!(f, "assignment to unassignable target '{target}' was dropped")
            }
        }
    }
}

/// Thread-shared collector of binding events.
#[derive(Default)]
pub struct BindingEvents {
    events: Mutex<Vec<BindingEvent>>,
}

impl BindingEvents {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event.
    pub fn record(&self, event: BindingEvent) {
        let mut events = match self.events.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return all recorded events.
    pub fn drain(&self) -> Vec<BindingEvent> {
        let mut events = match self.events.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *events)
    }

    /// Snapshot the recorded events without clearing them.
    pub fn snapshot(&self) -> Vec<BindingEvent> {
        let events = match self.events.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.clone()
    }
}

impl fmt::Debug for BindingEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingEvents").field("len", &self.len()).finish()
    }
}
