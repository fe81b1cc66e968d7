use super::BusError;
use crate::depends::{Dependency, Provider, ResolveError, Scope};
use std::any::{self, Any};
use std::cell::RefCell;
use std::collections::HashMap;

type Handler = Box<dyn FnMut(&dyn Any, &mut Delivery<'_>) -> Result<(), BusError>>;

/// Topic-keyed collection of message callbacks.
///
/// One callback may listen on several topics; several callbacks may share a
/// topic and run in registration order. Callbacks resolve dependency markers
/// against the subscriber's own override table.
#[derive(Default)]
pub struct Subscriber {
    handlers: Vec<RefCell<Handler>>,
    topics: HashMap<String, Vec<usize>>,
    provider: Provider,
}

impl Subscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override table scoped to this subscriber.
    pub fn provider_mut(&mut self) -> &mut Provider {
        &mut self.provider
    }

    /// Registers `handler` for every topic in `topics`.
    pub fn subscribe<M: Any>(
        &mut self,
        topics: &[&str],
        mut handler: impl FnMut(&M, &mut Delivery<'_>) -> Result<(), BusError> + 'static,
    ) {
        let wrapped: Handler = Box::new(move |message, delivery| {
            let message = message.downcast_ref::<M>().ok_or_else(|| BusError::MessageType {
                topic: delivery.topic().to_string(),
                expected: any::type_name::<M>(),
            })?;
            handler(message, delivery)
        });
        let index = self.handlers.len();
        self.handlers.push(RefCell::new(wrapped));
        for topic in topics {
            self.topics.entry((*topic).to_string()).or_default().push(index);
        }
    }

    /// Routes a payload to this subscriber's handlers for `topic`, the same
    /// synchronous dispatch a publisher performs. Usable re-entrantly from
    /// inside a handler via [`Delivery::receive`].
    pub fn receive<M: Any>(&self, message: &M, topic: &str) -> Result<(), BusError> {
        self.deliver(message, topic)
    }

    pub(crate) fn deliver(&self, message: &dyn Any, topic: &str) -> Result<(), BusError> {
        let Some(indices) = self.topics.get(topic) else {
            return Ok(());
        };
        for &index in indices {
            let mut handler =
                self.handlers[index]
                    .try_borrow_mut()
                    .map_err(|_| BusError::Reentrant {
                        topic: topic.to_string(),
                    })?;
            let mut delivery = Delivery {
                subscriber: self,
                topic,
                scope: self.provider.scope(),
            };
            (&mut *handler)(message, &mut delivery)?;
        }
        Ok(())
    }
}

/// Context handed to a topic callback for the duration of one delivery.
pub struct Delivery<'a> {
    subscriber: &'a Subscriber,
    topic: &'a str,
    scope: Scope<'a>,
}

impl Delivery<'_> {
    /// Topic the current message was published under.
    pub fn topic(&self) -> &str {
        self.topic
    }

    /// Resolves a dependency marker against the subscriber's provider.
    pub fn resolve<T: 'static>(&mut self, dependency: Dependency<T>) -> Result<T, ResolveError> {
        self.scope.resolve(dependency)
    }

    /// Re-routes a nested payload to another topic's handlers on the same
    /// call stack. This is not a new queue entry; interrupts raised inside
    /// propagate to the original publish call.
    pub fn receive<M: Any>(&self, message: &M, topic: &str) -> Result<(), BusError> {
        self.subscriber.deliver(message, topic)
    }
}

/// Topic-keyed broadcast dispatcher.
#[derive(Default)]
pub struct Publisher {
    subscribers: Vec<Subscriber>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a subscriber; its callbacks receive every matching publish.
    pub fn register(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    /// Registers a direct callback as an anonymous single-handler subscriber,
    /// preserving overall registration order.
    pub fn subscribe<M: Any>(
        &mut self,
        topics: &[&str],
        handler: impl FnMut(&M, &mut Delivery<'_>) -> Result<(), BusError> + 'static,
    ) {
        let mut subscriber = Subscriber::new();
        subscriber.subscribe(topics, handler);
        self.subscribers.push(subscriber);
    }

    /// Invokes every callback registered for `topic` in registration order.
    /// No subscribers is a no-op. An error, including a raised control
    /// signal, aborts delivery to the remaining subscribers of this call.
    pub fn publish<M: Any>(&self, topic: &str, message: &M) -> Result<(), BusError> {
        for subscriber in &self.subscribers {
            subscriber.deliver(message, topic)?;
        }
        Ok(())
    }
}
