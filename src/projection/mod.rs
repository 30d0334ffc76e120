//! Projections - folding a message sequence into entity state.
//!
//! A projection is an initial-state constructor plus a table from message
//! type to a pure transition function. Messages whose type has no entry are
//! ignored, so old projections keep working when new message types appear.
//!
//! ## Example
//!
//! ```
//! use message_store::{project, Message, Projection};
//!
//! #[derive(Default)]
//! struct Counter {
//!     seen: u32,
//! }
//!
//! fn incremented(mut counter: Counter, _: &Message) -> Counter {
//!     counter.seen += 1;
//!     counter
//! }
//!
//! let projection = Projection::new(Counter::default).on("Incremented", incremented);
//! let counter = project(&[], &projection);
//! assert_eq!(counter.seen, 0);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::message::Message;

/// Transition from one state to the next for a single message.
pub type Transition<S> = fn(S, &Message) -> S;

/// A fold specification: initial state plus per-type transitions.
pub struct Projection<S> {
    init: fn() -> S,
    handlers: HashMap<&'static str, Transition<S>>,
}

impl<S> Projection<S> {
    pub fn new(init: fn() -> S) -> Self {
        Self {
            init,
            handlers: HashMap::new(),
        }
    }

    /// Register the transition for `message_type`, replacing any previous one.
    pub fn on(mut self, message_type: &'static str, handler: Transition<S>) -> Self {
        self.handlers.insert(message_type, handler);
        self
    }

    /// A fresh initial state.
    pub fn init(&self) -> S {
        (self.init)()
    }

    pub fn handles(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    /// Apply one message. Unknown types return the state unchanged.
    pub fn apply(&self, state: S, message: &Message) -> S {
        match self.handlers.get(message.message_type.as_str()) {
            Some(handler) => handler(state, message),
            None => state,
        }
    }

    /// Fold `messages`, in the order given, starting from [`init`](Self::init).
    pub fn project<'a, I>(&self, messages: I) -> S
    where
        I: IntoIterator<Item = &'a Message>,
    {
        messages
            .into_iter()
            .fold(self.init(), |state, message| self.apply(state, message))
    }
}

impl<S> fmt::Debug for Projection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&&str> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("Projection").field("handles", &types).finish()
    }
}

/// Fold `messages` through `projection`.
pub fn project<S>(messages: &[Message], projection: &Projection<S>) -> S {
    projection.project(messages)
}
