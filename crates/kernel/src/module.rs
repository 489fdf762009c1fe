use async_trait::async_trait;
use axum::Router;

use bookshelf_db::{Database, Migration};

use crate::settings::Settings;

/// Context provided to modules during initialization and routing
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
    pub db: &'a Database,
}

/// Core module trait that all bookshelf modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Path prefix the module's router is nested under.
    /// Defaults to `/{name}`.
    fn mount_path(&self) -> String {
        format!("/{}", self.name())
    }

    /// Initialize the module with the provided context
    /// Called during application startup before migrations
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    fn routes(&self, _ctx: &InitCtx<'_>) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON.
    /// Paths are relative to [`Module::mount_path`]; limits documented in the
    /// fragment come from the active settings.
    fn openapi(&self, _settings: &Settings) -> Option<serde_json::Value> {
        None
    }

    /// Return migrations contributed by this module
    /// Migrations are executed in the order returned
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called after migrations are complete
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
