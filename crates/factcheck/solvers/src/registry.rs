//! Name to constructor registry for solvers.

use std::collections::BTreeMap;
use std::sync::Arc;

use factcheck_config::PipelineEntry;
use factcheck_types::{CapabilityKind, ConfigError, Parameters};
use tracing::{debug, info, warn};

use crate::builtin;
use crate::solver::Solver;

/// Builds a solver from its flat parameters.
pub type SolverFactory =
    Arc<dyn Fn(&Parameters) -> Result<Arc<dyn Solver>, ConfigError> + Send + Sync>;

struct Registration {
    kind: CapabilityKind,
    factory: SolverFactory,
}

/// Explicit table of solver constructors.
///
/// There is no global registry: build one with [`SolverRegistry::with_builtins`]
/// (or [`SolverRegistry::new`] for an empty table), register extra solvers,
/// then pass it to whatever assembles pipelines.
pub struct SolverRegistry {
    entries: BTreeMap<String, Registration>,
}

impl SolverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create a registry holding every built-in solver.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, kind, factory) in builtin::registrations() {
            if let Err(e) = registry.register(name, kind, factory) {
                warn!(solver = name, error = %e, "Skipping built-in solver");
            }
        }
        debug!(count = registry.len(), "Registered built-in solvers");
        registry
    }

    /// Register a constructor under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: CapabilityKind,
        factory: SolverFactory,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ConfigError::DuplicateSolver(name));
        }
        info!(solver = %name, kind = %kind, "Solver registered");
        self.entries.insert(name, Registration { kind, factory });
        Ok(())
    }

    /// Register a constructor given as a plain function.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        kind: CapabilityKind,
        factory: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&Parameters) -> Result<Arc<dyn Solver>, ConfigError> + Send + Sync + 'static,
    {
        self.register(name, kind, Arc::new(factory))
    }

    /// Sorted names of solvers of one kind.
    pub fn list(&self, kind: CapabilityKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| r.kind == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Every registered solver with its kind, sorted by name.
    pub fn list_all(&self) -> Vec<(&str, CapabilityKind)> {
        self.entries
            .iter()
            .map(|(name, r)| (name.as_str(), r.kind))
            .collect()
    }

    pub fn kind_of(&self, name: &str) -> Option<CapabilityKind> {
        self.entries.get(name).map(|r| r.kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct the solver registered under `name`.
    pub fn instantiate(
        &self,
        name: &str,
        parameters: &Parameters,
    ) -> Result<Arc<dyn Solver>, ConfigError> {
        let registration = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSolver(name.to_string()))?;
        debug!(solver = name, parameters = parameters.len(), "Instantiating solver");
        (registration.factory)(parameters)
    }

    /// Construct the solver for a pipeline entry, checking its declared kind.
    pub fn instantiate_entry(&self, entry: &PipelineEntry) -> Result<Arc<dyn Solver>, ConfigError> {
        let registered = self
            .kind_of(&entry.name)
            .ok_or_else(|| ConfigError::UnknownSolver(entry.name.clone()))?;
        if registered != entry.capability_kind {
            return Err(ConfigError::KindMismatch {
                name: entry.name.clone(),
                registered,
                declared: entry.capability_kind,
            });
        }
        self.instantiate(&entry.name, &entry.parameters)
    }
}

impl Default for SolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
