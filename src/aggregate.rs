use crate::bus::{BusError, Consumer, EventQueue, Producer, Publisher, Subscriber};
use crate::messages::Message;
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::fmt::Debug;
use thiserror::Error;

/// A caller-defined stateful unit with a stable identity, the unit of
/// transactional persistence.
pub trait Aggregate {
    type Id: Clone + Ord + Debug;

    fn id(&self) -> Self::Id;
}

/// Operating phase of a trainable aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Train,
    Evaluation,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase and epoch counter embedded by concrete aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainState {
    pub phase: Phase,
    pub epoch: u32,
}

/// Training lifecycle on top of [`Aggregate`].
///
/// Setters perform the mutation and then synchronously invoke the matching
/// hook; `set_phase` fires its hook only when the phase actually changes.
pub trait Trainable: Aggregate {
    fn state(&self) -> &TrainState;
    fn state_mut(&mut self) -> &mut TrainState;

    fn phase(&self) -> Phase {
        self.state().phase
    }

    fn epoch(&self) -> u32 {
        self.state().epoch
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state().phase != phase {
            self.state_mut().phase = phase;
            self.on_phase();
        }
    }

    fn set_epoch(&mut self, epoch: u32) {
        self.state_mut().epoch = epoch;
        self.on_epoch();
    }

    /// Hook invoked after the phase changed.
    fn on_phase(&mut self) {}

    /// Hook invoked after the epoch counter was set.
    fn on_epoch(&mut self) {}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("aggregate identity has not been initialized")]
    Uninitialized,
    #[error("aggregate identity is already initialized")]
    AlreadyInitialized,
}

/// Deferred aggregate-root identity.
///
/// Creation of an aggregate may depend on external factors (hashes of its
/// components, backend-generated ids); the identity is assigned once and is
/// immutable afterwards.
#[derive(Debug, Default)]
pub struct Identity<Id> {
    id: Option<Id>,
}

impl<Id> Identity<Id> {
    pub fn new() -> Self {
        Self { id: None }
    }

    pub fn initialize(&mut self, id: Id) -> Result<(), IdentityError> {
        if self.id.is_some() {
            return Err(IdentityError::AlreadyInitialized);
        }
        self.id = Some(id);
        Ok(())
    }

    pub fn get(&self) -> Result<&Id, IdentityError> {
        self.id.as_ref().ok_or(IdentityError::Uninitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.id.is_some()
    }
}

/// Communication bundle an aggregate embeds: topic broadcast, event fan-out
/// and the owner-scoped domain-event queue.
#[derive(Default)]
pub struct Outbox {
    publisher: Publisher,
    producer: Producer,
    events: EventQueue,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an observer receiving topic broadcasts.
    pub fn bind_subscriber(&mut self, subscriber: Subscriber) {
        self.publisher.register(subscriber);
    }

    /// Attaches an observer consuming discrete events.
    pub fn bind_consumer(&mut self, consumer: Consumer) {
        self.producer.register(consumer);
    }

    /// Broadcasts a message to all subscribers of `topic`.
    pub fn publish<M: Any>(&self, topic: &str, message: &M) -> Result<(), BusError> {
        self.publisher.publish(topic, message)
    }

    /// Wraps `payload` in a timestamped [`Message`] envelope with the
    /// aggregate as sender, then broadcasts it.
    pub fn deliver<P: Any>(&self, topic: &str, sender: &str, payload: P) -> Result<(), BusError> {
        let message = Message::new(topic, sender, payload);
        self.publisher.publish(topic, &message)
    }

    /// Fans a discrete event out to all bound consumers.
    pub fn emit<E: Any>(&self, event: &E) -> Result<(), BusError> {
        self.producer.dispatch(event)
    }

    /// Queues a domain event for the next [`commit_events`](Self::commit_events).
    pub fn enqueue<E: Any>(&mut self, event: E) {
        self.events.enqueue(event);
    }

    /// Queues an exceptional control signal.
    pub fn enqueue_signal<S: Signal>(&mut self, signal: S) {
        self.events.enqueue_signal(signal);
    }

    /// Registers a handler on the domain-event queue.
    pub fn on_event<E: Any>(
        &mut self,
        handler: impl FnMut(&E) -> Result<(), BusError> + 'static,
    ) {
        self.events.on(handler);
    }

    /// Drains the domain-event queue.
    pub fn commit_events(&mut self) -> Result<(), BusError> {
        self.events.commit()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}
