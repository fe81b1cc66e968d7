use super::BusError;
use crate::depends::{Provider, Scope};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Set of event types one handler is registered against.
///
/// This is the type-union pattern: a single handler may serve several
/// concrete event types and downcast to whichever member arrived.
#[derive(Debug, Clone, Default)]
pub struct TypeSet(Vec<TypeId>);

impl TypeSet {
    pub fn of<E: Any>() -> Self {
        Self(vec![TypeId::of::<E>()])
    }

    pub fn or<E: Any>(mut self) -> Self {
        let tag = TypeId::of::<E>();
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
        self
    }

    pub fn contains(&self, tag: TypeId) -> bool {
        self.0.contains(&tag)
    }

    fn tags(&self) -> &[TypeId] {
        &self.0
    }
}

type Handler = Box<dyn Fn(&dyn Any, &mut Scope<'_>) -> Result<(), BusError>>;

/// Type-routed sink for discrete events.
///
/// Handlers are keyed by the runtime type of the event; their remaining
/// collaborators are dependency markers resolved against the consumer's own
/// override table at dispatch time.
#[derive(Default)]
pub struct Consumer {
    handlers: Vec<Handler>,
    routes: HashMap<TypeId, Vec<usize>>,
    provider: Provider,
}

impl Consumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override table scoped to this consumer.
    pub fn provider_mut(&mut self) -> &mut Provider {
        &mut self.provider
    }

    /// Registers a handler for events of type `E`.
    pub fn on<E: Any>(
        &mut self,
        handler: impl Fn(&E, &mut Scope<'_>) -> Result<(), BusError> + 'static,
    ) {
        let wrapped: Handler = Box::new(move |event, scope| match event.downcast_ref::<E>() {
            Some(event) => handler(event, scope),
            None => Ok(()),
        });
        let index = self.push(wrapped);
        self.routes.entry(TypeId::of::<E>()).or_default().push(index);
    }

    /// Registers one handler for a set of event types. The handler receives
    /// the event as `&dyn Any` and downcasts to the member that arrived.
    pub fn on_union(
        &mut self,
        types: TypeSet,
        handler: impl Fn(&dyn Any, &mut Scope<'_>) -> Result<(), BusError> + 'static,
    ) {
        let index = self.push(Box::new(handler));
        for &tag in types.tags() {
            self.routes.entry(tag).or_default().push(index);
        }
    }

    fn push(&mut self, handler: Handler) -> usize {
        self.handlers.push(handler);
        self.handlers.len() - 1
    }

    /// Delivers an event to every matching handler in registration order.
    /// No match is a silent drop. An error from a handler propagates
    /// immediately; scoped dependencies of the failing invocation are still
    /// released.
    pub fn consume(&self, event: &dyn Any) -> Result<(), BusError> {
        let Some(indices) = self.routes.get(&event.type_id()) else {
            return Ok(());
        };
        for &index in indices {
            self.provider.inject(|scope| (self.handlers[index])(event, scope))?;
        }
        Ok(())
    }
}

/// Fan-out dispatcher delivering each event to every registered consumer.
#[derive(Default)]
pub struct Producer {
    consumers: Vec<Consumer>,
}

impl Producer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, consumer: Consumer) {
        self.consumers.push(consumer);
    }

    /// Delivers `event` to all consumers in registration order. A failing
    /// consumer does not block delivery to the rest; once every consumer has
    /// been attempted, the first error is returned.
    pub fn dispatch<E: Any>(&self, event: &E) -> Result<(), BusError> {
        let mut first_error = None;
        for consumer in &self.consumers {
            if let Err(error) = consumer.consume(event) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
