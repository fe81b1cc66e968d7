use crate::depends::{Provider, Scope};
use thiserror::Error;

/// A build step aborted the pipeline. Step 0 is the initial factory.
#[derive(Debug, Error)]
#[error("pipeline step {index} failed: {source}")]
pub struct CompileError {
    pub index: usize,
    pub source: anyhow::Error,
}

type Init<I, T> = Box<dyn Fn(I, &mut Scope<'_>) -> anyhow::Result<T>>;
type Step<T> = Box<dyn Fn(T, &mut Scope<'_>) -> anyhow::Result<T>>;

/// Sequential build pipeline for composite aggregates.
///
/// The initial factory builds the carried value from raw input; each
/// appended step receives the previous step's output plus whatever
/// collaborators it resolves through the compiler's provider. Exactly one
/// value threads through the whole pipeline.
pub struct Compiler<I, T> {
    init: Init<I, T>,
    steps: Vec<Step<T>>,
    provider: Provider,
}

impl<I, T> Compiler<I, T> {
    /// Creates a pipeline whose first step builds `T` from the raw input.
    pub fn new(init: impl Fn(I, &mut Scope<'_>) -> anyhow::Result<T> + 'static) -> Self {
        Self {
            init: Box::new(init),
            steps: Vec::new(),
            provider: Provider::new(),
        }
    }

    /// Appends a transformation step. Free functions passed here remain
    /// independently callable and testable.
    pub fn step(&mut self, step: impl Fn(T, &mut Scope<'_>) -> anyhow::Result<T> + 'static) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Override table consulted by every step's dependency markers.
    pub fn provider_mut(&mut self) -> &mut Provider {
        &mut self.provider
    }

    /// Runs the pipeline. Each step executes inside its own dependency
    /// scope; scoped resources are released when the step returns. A failing
    /// step aborts the remainder.
    pub fn compile(&self, input: I) -> Result<T, CompileError> {
        let mut value = self
            .provider
            .inject(|scope| (self.init)(input, scope))
            .map_err(|source| CompileError { index: 0, source })?;
        for (index, step) in self.steps.iter().enumerate() {
            value = self
                .provider
                .inject(|scope| step(value, scope))
                .map_err(|source| CompileError {
                    index: index + 1,
                    source,
                })?;
        }
        Ok(value)
    }
}
