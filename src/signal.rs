use std::any::{self, Any, TypeId};
use std::error::Error as StdError;
use std::fmt;

/// Marker for exceptional control signals.
///
/// A signal is a designed early exit, not a failure: raising one unwinds the
/// dispatch in progress, but the taxonomy treats it as a non-error exit. The
/// event queue defers unhandled signals until the queue drains; the
/// publisher/subscriber bus propagates them immediately.
pub trait Signal: Any {}

/// Built-in early-termination signal, conventionally raised by telemetry
/// handlers once a target metric is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyStop;

impl Signal for EarlyStop {}

/// A raised control signal unwinding out of a dispatch operation.
pub struct Interrupt {
    name: &'static str,
    payload: Box<dyn Any>,
}

impl Interrupt {
    pub fn new<S: Signal>(signal: S) -> Self {
        Self {
            name: any::type_name::<S>(),
            payload: Box::new(signal),
        }
    }

    /// Type name of the signal that was raised.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<S: Signal>(&self) -> bool {
        self.payload.is::<S>()
    }

    /// Recovers the concrete signal, or returns the interrupt unchanged.
    pub fn downcast<S: Signal>(self) -> Result<S, Interrupt> {
        match self.payload.downcast::<S>() {
            Ok(signal) => Ok(*signal),
            Err(payload) => Err(Interrupt {
                name: self.name,
                payload,
            }),
        }
    }

    pub(crate) fn tag(&self) -> TypeId {
        self.payload.as_ref().type_id()
    }

    pub(crate) fn payload(&self) -> &dyn Any {
        self.payload.as_ref()
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt").field("signal", &self.name).finish()
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interrupted by signal `{}`", self.name)
    }
}

impl StdError for Interrupt {}
