//! Ahead-of-time validation of type bindings.
//!
//! Resolution already detects cycles as they happen. Validation finds
//! the same problems, plus missing dependencies, before the first
//! request by walking what each component declares in
//! [`Component::dependencies`](crate::component::Component::dependencies).

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};
use trellis_support::rendering::did_you_mean;

use crate::error::{CircularDependencyError, TrellisError, UnresolvedServiceError};
use crate::key::ServiceKey;

/// Validates the declared dependency graph.
///
/// Every registered key is a node. Type bindings have edges to their
/// declared dependencies; instances and factories have none. The walk
/// is a DFS keeping the current path, so a revisited key on the path is
/// a cycle and the path slice from it is the chain.
pub(crate) struct GraphValidator {
    nodes: HashMap<ServiceKey, Vec<ServiceKey>>,
    visiting: HashSet<ServiceKey>,
    validated: HashSet<ServiceKey>,
    path: Vec<ServiceKey>,
    suggestion_limit: usize,
}

impl GraphValidator {
    pub fn new(nodes: HashMap<ServiceKey, Vec<ServiceKey>>, suggestion_limit: usize) -> Self {
        Self {
            nodes,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
            suggestion_limit,
        }
    }

    /// # Errors
    /// - [`TrellisError::CircularDependency`]: cycle detected
    /// - [`TrellisError::UnresolvedService`]: declared dependency not bound
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), TrellisError> {
        let mut keys: Vec<ServiceKey> = self.nodes.keys().cloned().collect();
        keys.sort_by(|a, b| (a.type_name(), a.key()).cmp(&(b.type_name(), b.key())));

        debug!(services = keys.len(), "Validating dependency graph");

        for key in keys {
            self.visit(&key)?;
        }

        debug!("Dependency graph is valid");
        Ok(())
    }

    fn visit(&mut self, key: &ServiceKey) -> Result<(), TrellisError> {
        if self.validated.contains(key) {
            return Ok(());
        }

        if self.visiting.contains(key) {
            let start = self.path.iter().position(|k| k == key).unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(key.clone());

            warn!(cycle = ?chain, "Circular dependency in declared graph");
            return Err(TrellisError::CircularDependency(CircularDependencyError { chain }));
        }

        let dependencies = self.nodes.get(key).cloned().ok_or_else(|| {
            TrellisError::UnresolvedService(UnresolvedServiceError {
                requested: key.clone(),
                required_by: self.path.last().cloned(),
                suggestions: self.suggestions(key),
            })
        })?;

        self.visiting.insert(key.clone());
        self.path.push(key.clone());

        for dependency in &dependencies {
            self.visit(dependency)?;
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(key.clone());
        Ok(())
    }

    fn suggestions(&self, key: &ServiceKey) -> Vec<&'static str> {
        let registered: Vec<&'static str> = self.nodes.keys().map(ServiceKey::type_name).collect();
        did_you_mean(key.type_name(), &registered, self.suggestion_limit)
    }
}
