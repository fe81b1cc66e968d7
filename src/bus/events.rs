use super::BusError;
use crate::signal::{Interrupt, Signal};
use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};

type Handler = Box<dyn FnMut(&dyn Any) -> Result<(), BusError>>;

enum Pending {
    Event(Box<dyn Any>),
    Signal(Interrupt),
}

impl Pending {
    fn tag(&self) -> TypeId {
        match self {
            Pending::Event(event) => event.as_ref().type_id(),
            Pending::Signal(interrupt) => interrupt.tag(),
        }
    }
}

/// Owner-scoped FIFO queue of pending domain events.
///
/// Events accumulate through [`enqueue`](EventQueue::enqueue) with no
/// immediate dispatch and are drained in insertion order by
/// [`commit`](EventQueue::commit). Handlers are keyed by the event's exact
/// type; several handlers may share one type and run in registration order.
#[derive(Default)]
pub struct EventQueue {
    queue: VecDeque<Pending>,
    handlers: HashMap<TypeId, Vec<Handler>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event. A unit struct serves as a bare tag; a struct with
    /// fields carries its payload to the handler.
    pub fn enqueue<E: Any>(&mut self, event: E) {
        self.queue.push_back(Pending::Event(Box::new(event)));
    }

    /// Appends an exceptional control signal. If no handler absorbs it during
    /// commit, the drain completes and the signal is then raised.
    pub fn enqueue_signal<S: Signal>(&mut self, signal: S) {
        self.queue.push_back(Pending::Signal(Interrupt::new(signal)));
    }

    /// Appends a handler for events of type `E`.
    pub fn on<E: Any>(
        &mut self,
        mut handler: impl FnMut(&E) -> Result<(), BusError> + 'static,
    ) {
        let wrapped: Handler = Box::new(move |event| match event.downcast_ref::<E>() {
            Some(event) => handler(event),
            None => Ok(()),
        });
        self.handlers.entry(TypeId::of::<E>()).or_default().push(wrapped);
    }

    /// Number of events not yet started.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drains the queue strictly in FIFO order. Each entry is removed before
    /// its handlers run. Plain events with no handler are dropped. A handler
    /// error aborts the remaining handlers of that entry; an unhandled signal
    /// becomes [`BusError::Interrupted`]. Either way the drain continues to
    /// the end of the queue and the first deferred error is then returned.
    /// The queue is empty when this returns, failed or not.
    pub fn commit(&mut self) -> Result<(), BusError> {
        let mut deferred: Option<BusError> = None;
        while let Some(pending) = self.queue.pop_front() {
            let tag = pending.tag();
            match self.handlers.get_mut(&tag) {
                Some(handlers) => {
                    let payload: &dyn Any = match &pending {
                        Pending::Event(event) => event.as_ref(),
                        Pending::Signal(interrupt) => interrupt.payload(),
                    };
                    for handler in handlers.iter_mut() {
                        if let Err(error) = handler(payload) {
                            if deferred.is_none() {
                                deferred = Some(error);
                            }
                            break;
                        }
                    }
                }
                None => {
                    if let Pending::Signal(interrupt) = pending {
                        if deferred.is_none() {
                            deferred = Some(BusError::Interrupted(interrupt));
                        }
                    }
                }
            }
        }
        match deferred {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
