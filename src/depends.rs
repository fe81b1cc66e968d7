use std::any::Any;
use std::collections::HashMap;
use thiserror::Error;

/// Release action retained by a [`Scope`] for a scoped resolution.
pub type Closer = Box<dyn FnOnce()>;

/// Outcome of invoking a provider.
pub enum Resolution<T> {
    /// A plain value, used directly.
    Value(T),
    /// A value plus the action that releases it when the scope ends.
    Scoped(T, Closer),
}

/// What a provider returns: a resolution, or a configuration error.
pub type Provide<T> = Result<Resolution<T>, ResolveError>;

/// A deferred dependency: a zero-argument provider resolved at call time.
///
/// Providers are named functions so the override table can key on their
/// identity; replacements installed through [`Provider::override_with`] may
/// capture state. Identity is the function's address: optimized builds may
/// fold byte-identical function bodies into one address, so providers that
/// must be overridable independently need distinct bodies. `missing` with a
/// distinct name per provider is enough.
pub type Dependency<T> = fn() -> Provide<T>;

/// Builds a plain resolution.
pub fn supply<T>(value: T) -> Provide<T> {
    Ok(Resolution::Value(value))
}

/// Builds a scoped resolution whose `closer` runs when the call's scope ends.
pub fn scoped<T>(value: T, closer: impl FnOnce() + 'static) -> Provide<T> {
    Ok(Resolution::Scoped(value, Box::new(closer)))
}

/// A provider with no default implementation; it must be overridden before
/// anything that depends on it is dispatched.
pub fn missing<T>(provider: &'static str) -> Provide<T> {
    Err(ResolveError::Unimplemented(provider))
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no provider implementation for `{0}`; register an override before dispatch")]
    Unimplemented(&'static str),
    #[error("provider `{provider}` failed: {source}")]
    Provider {
        provider: &'static str,
        source: anyhow::Error,
    },
}

impl ResolveError {
    /// Wraps a failure raised from inside a provider body.
    pub fn provider(provider: &'static str, source: anyhow::Error) -> Self {
        ResolveError::Provider { provider, source }
    }
}

type Replacement<T> = Box<dyn Fn() -> Provide<T>>;

/// Override table mapping a provider's identity to its replacement.
///
/// Empty by default; consulted on every resolution. One provider instance is
/// expected per consumer/compiler/subscriber, configured before dispatch is
/// in flight.
#[derive(Default)]
pub struct Provider {
    overrides: HashMap<usize, Box<dyn Any>>,
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a replacement consulted instead of `original` until removed.
    pub fn override_with<T: 'static>(
        &mut self,
        original: Dependency<T>,
        replacement: impl Fn() -> Provide<T> + 'static,
    ) {
        let replacement: Replacement<T> = Box::new(replacement);
        self.overrides.insert(original as usize, Box::new(replacement));
    }

    /// Removes an override, falling back to the original provider.
    pub fn remove_override<T: 'static>(&mut self, original: Dependency<T>) {
        self.overrides.remove(&(original as usize));
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Opens a resolution scope borrowing this override table.
    pub fn scope(&self) -> Scope<'_> {
        Scope {
            provider: self,
            closers: Vec::new(),
        }
    }

    /// Runs `call` inside a fresh scope; scoped resources are released after
    /// it returns, in reverse acquisition order, on every exit path.
    pub fn inject<R>(&self, call: impl FnOnce(&mut Scope<'_>) -> R) -> R {
        let mut scope = self.scope();
        call(&mut scope)
    }

    fn replacement<T: 'static>(&self, original: Dependency<T>) -> Option<&Replacement<T>> {
        self.overrides
            .get(&(original as usize))
            .and_then(|entry| entry.downcast_ref::<Replacement<T>>())
    }
}

/// Tracks the scoped resources resolved for a single wrapped call.
pub struct Scope<'p> {
    provider: &'p Provider,
    closers: Vec<Closer>,
}

impl Scope<'_> {
    /// Resolves a dependency through the effective provider. Each call
    /// re-resolves; nothing is cached across scopes.
    pub fn resolve<T: 'static>(&mut self, dependency: Dependency<T>) -> Result<T, ResolveError> {
        let resolution = match self.provider.replacement(dependency) {
            Some(replacement) => replacement()?,
            None => dependency()?,
        };
        Ok(match resolution {
            Resolution::Value(value) => value,
            Resolution::Scoped(value, closer) => {
                self.closers.push(closer);
                value
            }
        })
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        // Reverse acquisition order.
        while let Some(closer) = self.closers.pop() {
            closer();
        }
    }
}
