// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Registry
//!
//! Process-wide singleton mapping plugin names to stage factories, with a
//! table of live instances per plugin. Executors mint children exclusively
//! through [`StageRegistry::create_instance`]; the returned [`StageHandle`]
//! owns the instance and removes its registry entry when dropped, so the
//! instance table only ever holds weak back-references to live stages and no
//! reference cycles can form.
//!
//! Instance ids are minted as `{plugin_name}_{monotonic-counter}` and are
//! unique within the process.
//!
//! ## Static linking
//!
//! This build links all shipped stages and registers them at program start
//! via [`register_builtin_stages`]; [`StageRegistry::load_all`] records the
//! `plugins/` scan without dynamically loading anything.

use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once, Weak};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use mailsift_domain::services::{Stage, IFACE_EXECUTOR, IFACE_STAGE};
use mailsift_domain::EngineError;

use crate::infrastructure::executors::parallel::ParallelExecutor;
use crate::infrastructure::executors::root::RootExecutor;
use crate::infrastructure::executors::serial::SerialExecutor;
use crate::infrastructure::stages::add_attr::AddAttrStage;
use crate::infrastructure::stages::attr_logger::AttrLoggerStage;
use crate::infrastructure::stages::email_filter::EmailFilterStage;
use crate::infrastructure::stages::email_loader::EmailLoaderStage;
use crate::infrastructure::stages::ensure_attr::EnsureAttrStage;

/// Constructs a fresh stage in `UNLOADED` or `LOADED` under the given
/// instance id.
pub type StageFactory = fn(&str) -> Arc<dyn Stage>;

struct StageRecord {
    factory: StageFactory,
    instances: HashMap<String, Weak<dyn Stage>>,
    interfaces: Vec<String>,
}

/// Process-wide plugin-name → factory registry with instance tracking.
pub struct StageRegistry {
    records: RwLock<HashMap<String, StageRecord>>,
}

static REGISTRY: Lazy<StageRegistry> = Lazy::new(|| StageRegistry {
    records: RwLock::new(HashMap::new()),
});

static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns the process-wide stage registry.
pub fn registry() -> &'static StageRegistry {
    &REGISTRY
}

/// An owning handle to a registry-minted stage instance.
///
/// Dropping the handle removes the instance's registry entry; the registry
/// itself only keeps a weak back-reference.
pub struct StageHandle {
    plugin_name: String,
    instance_id: String,
    stage: Arc<dyn Stage>,
}

impl StageHandle {
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn stage(&self) -> &Arc<dyn Stage> {
        &self.stage
    }

    pub fn clone_stage(&self) -> Arc<dyn Stage> {
        Arc::clone(&self.stage)
    }
}

impl Deref for StageHandle {
    type Target = dyn Stage;

    fn deref(&self) -> &Self::Target {
        &*self.stage
    }
}

impl Drop for StageHandle {
    fn drop(&mut self) {
        debug!("destroying instance {} of {}", self.instance_id, self.plugin_name);
        registry().forget_instance(&self.plugin_name, &self.instance_id);
    }
}

impl StageRegistry {
    /// Binds a plugin name to a factory. The first registration wins; a
    /// second registration under the same name is ignored.
    pub fn register(&self, plugin_name: &str, factory: StageFactory) -> bool {
        let mut records = self.records.write();
        if records.contains_key(plugin_name) {
            debug!("factory for {} already registered", plugin_name);
            return false;
        }
        records.insert(
            plugin_name.to_string(),
            StageRecord {
                factory,
                instances: HashMap::new(),
                interfaces: Vec::new(),
            },
        );
        true
    }

    /// Appends interface tags to a plugin's declared set. Idempotent.
    pub fn declare_interfaces(&self, plugin_name: &str, interfaces: &[&str]) -> bool {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(plugin_name) else {
            warn!("plugin {} is seemingly not registered", plugin_name);
            return false;
        };
        for interface in interfaces {
            if !record.interfaces.iter().any(|existing| existing == interface) {
                record.interfaces.push(interface.to_string());
            }
        }
        true
    }

    /// Mints a new instance of a registered plugin, stores its config
    /// verbatim, and publishes a weak back-reference in the instance table.
    pub fn create_instance(
        &self,
        plugin_name: &str,
        options: &Value,
    ) -> Result<StageHandle, EngineError> {
        let factory = {
            let records = self.records.read();
            records
                .get(plugin_name)
                .map(|record| record.factory)
                .ok_or_else(|| EngineError::UnknownPlugin(plugin_name.to_string()))?
        };

        let instance_id = format!(
            "{}_{}",
            plugin_name,
            INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let stage = factory(&instance_id);
        stage.core().set_config(options.clone());

        let mut records = self.records.write();
        if let Some(record) = records.get_mut(plugin_name) {
            record
                .instances
                .insert(instance_id.clone(), Arc::downgrade(&stage));
        }
        Ok(StageHandle {
            plugin_name: plugin_name.to_string(),
            instance_id,
            stage,
        })
    }

    /// Scans the `plugins/` directory tree.
    ///
    /// All shipped stages are statically linked and registered at program
    /// start, so the scan only records what it finds; a missing or
    /// unloadable entry is logged and does not abort the scan.
    pub fn load_all(&self) -> Result<(), EngineError> {
        register_builtin_stages();
        let plugins_dir = Path::new("plugins");
        if !plugins_dir.is_dir() {
            debug!("plugins directory not found, all stages statically registered");
            return Ok(());
        }
        match std::fs::read_dir(plugins_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if self.records.read().contains_key(&name) {
                        debug!("plugin {} already registered", name);
                    } else {
                        error!("failed to load plugin: {} (dynamic loading unsupported)", name);
                    }
                }
            }
            Err(error) => error!("failed to scan plugins directory: {}", error),
        }
        Ok(())
    }

    /// Names of every registered plugin.
    pub fn list_available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Interface tags declared by a plugin.
    pub fn interfaces_of(&self, plugin_name: &str) -> Vec<String> {
        self.records
            .read()
            .get(plugin_name)
            .map(|record| record.interfaces.clone())
            .unwrap_or_default()
    }

    /// Every live instance as `{id: {state, pluginName}}`.
    pub fn list_instances(&self) -> Value {
        let records = self.records.read();
        let mut instances = serde_json::Map::new();
        for record in records.values() {
            for (instance_id, stage) in &record.instances {
                if let Some(stage) = stage.upgrade() {
                    instances.insert(
                        instance_id.clone(),
                        json!({
                            "state": stage.core().state().to_string(),
                            "pluginName": stage.core().plugin_name(),
                        }),
                    );
                }
            }
        }
        Value::Object(instances)
    }

    /// Live instance ids of one plugin.
    pub fn instances_of(&self, plugin_name: &str) -> Vec<String> {
        let records = self.records.read();
        let mut ids: Vec<String> = records
            .get(plugin_name)
            .map(|record| record.instances.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// The plugin an instance id was minted from. Instance ids are unique,
    /// so at most one plugin matches.
    pub fn plugin_for_instance(&self, instance_id: &str) -> Option<String> {
        let records = self.records.read();
        records
            .iter()
            .find(|(_, record)| record.instances.contains_key(instance_id))
            .map(|(name, _)| name.clone())
    }

    fn forget_instance(&self, plugin_name: &str, instance_id: &str) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(plugin_name) {
            record.instances.remove(instance_id);
        }
    }
}

static BUILTIN_STAGES: Once = Once::new();

/// Registers every statically linked stage and its interface tags. Runs
/// once per process; later calls are no-ops.
pub fn register_builtin_stages() {
    BUILTIN_STAGES.call_once(|| {
        let registry = registry();
        let executors: [(&str, StageFactory); 3] = [
            (RootExecutor::PLUGIN_NAME, RootExecutor::create),
            (SerialExecutor::PLUGIN_NAME, SerialExecutor::create),
            (ParallelExecutor::PLUGIN_NAME, ParallelExecutor::create),
        ];
        for (name, factory) in executors {
            debug!("registering plugin {}", name);
            registry.register(name, factory);
            registry.declare_interfaces(name, &[IFACE_STAGE, IFACE_EXECUTOR]);
        }
        let leaves: [(&str, StageFactory); 5] = [
            (EmailLoaderStage::PLUGIN_NAME, EmailLoaderStage::create),
            (AddAttrStage::PLUGIN_NAME, AddAttrStage::create),
            (EnsureAttrStage::PLUGIN_NAME, EnsureAttrStage::create),
            (EmailFilterStage::PLUGIN_NAME, EmailFilterStage::create),
            (AttrLoggerStage::PLUGIN_NAME, AttrLoggerStage::create),
        ];
        for (name, factory) in leaves {
            debug!("registering plugin {}", name);
            registry.register(name, factory);
            registry.declare_interfaces(name, &[IFACE_STAGE]);
        }
    });
}
