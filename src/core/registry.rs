//! Centralized controller registry
//!
//! Maps controller names to their descriptors. Shared by every request and
//! safe to update while requests are running.

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info};

use crate::handler::ControllerDescriptor;

/// Registry of named controllers
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: DashMap<String, Arc<ControllerDescriptor>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a controller under its own name
    pub fn register(&self, descriptor: ControllerDescriptor) {
        debug!("Registering controller: {}", descriptor.name());
        self.controllers
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
    }

    pub fn get(&self, name: &str) -> Option<Arc<ControllerDescriptor>> {
        self.controllers.get(name).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, name: &str) -> Option<Arc<ControllerDescriptor>> {
        debug!("Removing controller: {}", name);
        self.controllers.remove(name).map(|(_, descriptor)| descriptor)
    }

    /// Replace the whole set of controllers
    pub fn reload(&self, descriptors: Vec<ControllerDescriptor>) {
        info!("Reloading {} controllers", descriptors.len());
        self.controllers.clear();
        for descriptor in descriptors {
            self.register(descriptor);
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .controllers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}
