//! Application bootstrap: storage selection, module lifecycle and serving.

use anyhow::Context;
use axum::Router;

use bookshelf_db::DbConfig;
use bookshelf_kernel::{settings::Settings, Database, InitCtx, ModuleRegistry};

use crate::modules;

/// A fully initialized application, ready to serve.
pub struct App {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

impl App {
    /// Open the store, initialize modules, apply pending migrations and start modules.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        tracing::info!(
            env = ?settings.environment,
            db = %settings.database.describe(),
            "bookshelf bootstrap starting"
        );

        let db = Database::connect(&DbConfig::from(&settings.database))
            .await
            .context("failed to open the book store")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry);

        let app = Self {
            settings,
            db,
            registry,
        };

        let ctx = app.ctx();
        app.registry.init_modules(&ctx).await?;

        let applied = app
            .db
            .migrate(&app.registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "schema ready");

        app.registry.start_modules(&ctx).await?;

        tracing::info!("bookshelf bootstrap complete");
        Ok(app)
    }

    fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.db,
        }
    }

    /// The complete HTTP router, middleware included.
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.ctx())
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Serve until a shutdown signal arrives.
    pub async fn serve(&self) -> anyhow::Result<()> {
        bookshelf_http::start_server(&self.registry, &self.ctx()).await
    }

    /// Stop modules in reverse order and release the store.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let stopped = self.registry.stop_modules().await;
        self.db.close().await;
        stopped
    }
}

/// Bootstrap, serve until terminated, then shut down cleanly.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let app = App::bootstrap(settings).await?;
    let served = app.serve().await;
    let stopped = app.shutdown().await;
    served.and(stopped)
}
