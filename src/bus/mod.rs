//! Event propagation: the owner-scoped event queue, the producer/consumer
//! bus, the topic-keyed publisher/subscriber bus, and the named-action
//! service dispatcher.

mod consumer;
mod events;
mod publisher;
mod service;

pub use consumer::{Consumer, Producer, TypeSet};
pub use events::EventQueue;
pub use publisher::{Delivery, Publisher, Subscriber};
pub use service::Service;

use crate::depends::ResolveError;
use crate::signal::{Interrupt, Signal};
use thiserror::Error;

/// Error surfaced by a dispatch operation to its immediate caller.
#[derive(Debug, Error)]
pub enum BusError {
    /// A control signal unwound out of a handler or drained queue.
    #[error(transparent)]
    Interrupted(#[from] Interrupt),
    /// A dependency marker could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A typed handler received a payload of the wrong runtime type.
    #[error("topic `{topic}` expected a `{expected}` payload")]
    MessageType {
        topic: String,
        expected: &'static str,
    },
    /// A handler attempted to re-route into itself while executing.
    #[error("re-entrant delivery into an active handler on topic `{topic}`")]
    Reentrant { topic: String },
    /// An application bug inside a registered callable.
    #[error("handler failed: {0}")]
    Handler(anyhow::Error),
}

impl BusError {
    /// Raises `signal` out of the current dispatch.
    pub fn interrupted<S: Signal>(signal: S) -> Self {
        BusError::Interrupted(Interrupt::new(signal))
    }

    /// The carried interrupt, if this error is a control signal.
    pub fn interrupt(&self) -> Option<&Interrupt> {
        match self {
            BusError::Interrupted(interrupt) => Some(interrupt),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for BusError {
    fn from(source: anyhow::Error) -> Self {
        BusError::Handler(source)
    }
}
