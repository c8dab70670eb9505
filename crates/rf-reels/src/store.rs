//! Machine store - where sessions get published machines from

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::document::{DocumentError, DocumentParser};
use crate::error::ConfigurationError;
use crate::machine::{Machine, PublishedMachine};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown machine: {0}")]
    UnknownMachine(String),

    #[error("Machine document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Machine rejected with {} configuration error(s)", .0.len())]
    Rejected(Vec<ConfigurationError>),
}

/// Source of published machines
pub trait MachineStore: Send + Sync {
    fn load_machine(&self, id: &str) -> Result<Arc<PublishedMachine>, StoreError>;
}

impl<S: MachineStore + ?Sized> MachineStore for Arc<S> {
    fn load_machine(&self, id: &str) -> Result<Arc<PublishedMachine>, StoreError> {
        (**self).load_machine(id)
    }
}

/// In-process machine store
///
/// Publishing validates; only machines that pass are ever handed out.
pub struct MemoryMachineStore {
    config: EngineConfig,
    machines: RwLock<HashMap<String, Arc<PublishedMachine>>>,
}

impl MemoryMachineStore {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            machines: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and publish a machine, replacing any machine with the same id
    pub fn publish(&self, machine: Machine) -> Result<Arc<PublishedMachine>, StoreError> {
        let id = machine.id.clone();
        let published = PublishedMachine::publish(machine, &self.config).map_err(|errors| {
            log::warn!(
                "Machine '{}' rejected: {}",
                id,
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            );
            StoreError::Rejected(errors)
        })?;

        let published = Arc::new(published);
        if self
            .machines
            .write()
            .insert(id.clone(), Arc::clone(&published))
            .is_some()
        {
            log::info!("Replaced machine '{}'", id);
        }
        Ok(published)
    }

    /// Parse a JSON/YAML machine document from disk and publish it
    pub fn publish_document(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<PublishedMachine>, StoreError> {
        let machine = DocumentParser::with_limits(self.config.limits.clone()).load(path)?;
        self.publish(machine)
    }

    /// Ids of published machines, sorted
    pub fn machine_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.machines.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl MachineStore for MemoryMachineStore {
    fn load_machine(&self, id: &str) -> Result<Arc<PublishedMachine>, StoreError> {
        self.machines
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownMachine(id.to_string()))
    }
}
