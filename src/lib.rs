//! In-process runtime for assembling and operating training aggregates under
//! a transactional, event-driven discipline.
//!
//! Four generic services make up the core: the dependency resolver
//! ([`depends`]), the event/message buses ([`bus`]), the sequential build
//! pipeline ([`compiler`]) and the identity-map unit of work ([`repository`],
//! [`session`]). Everything runs single-threaded and synchronous; early
//! termination is expressed through control signals ([`signal`]) rather than
//! cancellation tokens.

pub mod aggregate;
pub mod bus;
pub mod compiler;
pub mod depends;
pub mod messages;
pub mod repository;
pub mod session;
pub mod signal;

pub use aggregate::{Aggregate, Identity, IdentityError, Outbox, Phase, TrainState, Trainable};
pub use bus::{
    BusError, Consumer, Delivery, EventQueue, Producer, Publisher, Service, Subscriber, TypeSet,
};
pub use compiler::{CompileError, Compiler};
pub use depends::{
    missing, scoped, supply, Closer, Dependency, Provide, Provider, Resolution, ResolveError, Scope,
};
pub use messages::{Message, Metric};
pub use repository::{shared, Repository, RepositoryError, Shared, Store};
pub use session::Session;
pub use signal::{EarlyStop, Interrupt, Signal};
