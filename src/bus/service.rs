use super::BusError;
use crate::depends::{Provider, Scope};
use std::any::{self, Any};
use std::collections::HashMap;

type Handler = Box<dyn Fn(&dyn Any, &mut Scope<'_>) -> Result<(), BusError>>;

/// Named-action dispatcher.
///
/// Handlers register under a string action name rather than an event type;
/// otherwise dispatch follows the consumer conventions: registration order,
/// per-invocation dependency scopes, unknown action is a no-op.
#[derive(Default)]
pub struct Service {
    handlers: Vec<Handler>,
    routes: HashMap<String, Vec<usize>>,
    provider: Provider,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override table scoped to this service.
    pub fn provider_mut(&mut self) -> &mut Provider {
        &mut self.provider
    }

    /// Registers a handler for `action` taking a payload of type `P`.
    pub fn on<P: Any>(
        &mut self,
        action: &str,
        handler: impl Fn(&P, &mut Scope<'_>) -> Result<(), BusError> + 'static,
    ) {
        let action_name = action.to_string();
        let wrapped: Handler = Box::new(move |payload, scope| {
            let payload = payload.downcast_ref::<P>().ok_or_else(|| BusError::MessageType {
                topic: action_name.clone(),
                expected: any::type_name::<P>(),
            })?;
            handler(payload, scope)
        });
        self.handlers.push(wrapped);
        let index = self.handlers.len() - 1;
        self.routes.entry(action.to_string()).or_default().push(index);
    }

    /// Invokes every handler registered for `action` in registration order.
    pub fn handle<P: Any>(&self, action: &str, payload: &P) -> Result<(), BusError> {
        let Some(indices) = self.routes.get(action) else {
            return Ok(());
        };
        for &index in indices {
            self.provider.inject(|scope| (self.handlers[index])(payload, scope))?;
        }
        Ok(())
    }
}
