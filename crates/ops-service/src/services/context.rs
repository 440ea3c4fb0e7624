//! Service context - dependency container for services
//!
//! Holds the backend ports, engine settings and the apply run lock.
//! Backends other than the environment source are optional; a missing
//! backend turns into a scope-level audit warning or a degraded apply
//! strategy rather than a startup failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ops_common::OpsConfig;
use ops_core::traits::{
    DatabaseInspector, EnvironmentSource, MigrationRunner, PlanStore, StorageBackend, VcsHost,
};
use tokio::sync::{Mutex, MutexGuard};

use super::error::{ServiceError, ServiceResult};

/// Engine settings taken from configuration
#[derive(Debug, Clone)]
pub struct OpsSettings {
    pub config_dir: PathBuf,
    pub migrations_dir: PathBuf,
    /// Global direct-apply capability flag
    pub allow_direct_apply: bool,
    pub persist_plans: bool,
}

impl Default for OpsSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("./ops"),
            migrations_dir: PathBuf::from("./migrations"),
            allow_direct_apply: false,
            persist_plans: false,
        }
    }
}

impl From<&OpsConfig> for OpsSettings {
    fn from(config: &OpsConfig) -> Self {
        Self {
            config_dir: config.config_dir.clone(),
            migrations_dir: config.migrations_dir.clone(),
            allow_direct_apply: config.allow_direct_apply,
            persist_plans: config.persist_plans,
        }
    }
}

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Backends
    inspector: Option<Arc<dyn DatabaseInspector>>,
    migration_runner: Option<Arc<dyn MigrationRunner>>,
    storage: Option<Arc<dyn StorageBackend>>,
    environment: Arc<dyn EnvironmentSource>,
    vcs: Option<Arc<dyn VcsHost>>,
    plan_store: Option<Arc<dyn PlanStore>>,

    settings: OpsSettings,

    // Single-writer lock around apply
    run_lock: Arc<Mutex<()>>,
}

impl ServiceContext {
    // === Backends ===

    /// Get the schema inspector, if a database is configured
    pub fn inspector(&self) -> Option<&dyn DatabaseInspector> {
        self.inspector.as_deref()
    }

    /// Get the migration runner, if a database is configured
    pub fn migration_runner(&self) -> Option<&dyn MigrationRunner> {
        self.migration_runner.as_deref()
    }

    /// Get the storage backend, if configured
    pub fn storage(&self) -> Option<&dyn StorageBackend> {
        self.storage.as_deref()
    }

    pub fn environment(&self) -> &dyn EnvironmentSource {
        self.environment.as_ref()
    }

    /// Get the version-control host, present only when a token is configured
    pub fn vcs(&self) -> Option<&dyn VcsHost> {
        self.vcs.as_deref()
    }

    pub fn plan_store(&self) -> Option<&dyn PlanStore> {
        self.plan_store.as_deref()
    }

    // === Settings ===

    pub fn settings(&self) -> &OpsSettings {
        &self.settings
    }

    pub fn config_dir(&self) -> &Path {
        &self.settings.config_dir
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.settings.migrations_dir
    }

    pub fn direct_apply_enabled(&self) -> bool {
        self.settings.allow_direct_apply
    }

    // === Run lock ===

    /// Acquire the apply lock without waiting
    ///
    /// # Errors
    /// Returns `ServiceError::Conflict` when another apply holds the lock
    pub fn try_lock_apply(&self) -> ServiceResult<MutexGuard<'_, ()>> {
        self.run_lock
            .try_lock()
            .map_err(|_| ServiceError::conflict("an apply is already in progress"))
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("database", &self.inspector.is_some())
            .field("storage", &self.storage.is_some())
            .field("vcs", &self.vcs.is_some())
            .field("plan_store", &self.plan_store.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    inspector: Option<Arc<dyn DatabaseInspector>>,
    migration_runner: Option<Arc<dyn MigrationRunner>>,
    storage: Option<Arc<dyn StorageBackend>>,
    environment: Option<Arc<dyn EnvironmentSource>>,
    vcs: Option<Arc<dyn VcsHost>>,
    plan_store: Option<Arc<dyn PlanStore>>,
    settings: OpsSettings,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inspector(mut self, inspector: Arc<dyn DatabaseInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn migration_runner(mut self, runner: Arc<dyn MigrationRunner>) -> Self {
        self.migration_runner = Some(runner);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn environment(mut self, environment: Arc<dyn EnvironmentSource>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn vcs(mut self, vcs: Arc<dyn VcsHost>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn plan_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.plan_store = Some(store);
        self
    }

    pub fn settings(mut self, settings: OpsSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if the environment source is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            inspector: self.inspector,
            migration_runner: self.migration_runner,
            storage: self.storage,
            environment: self
                .environment
                .ok_or_else(|| ServiceError::validation("environment source is required"))?,
            vcs: self.vcs,
            plan_store: self.plan_store,
            settings: self.settings,
            run_lock: Arc::new(Mutex::new(())),
        })
    }
}
