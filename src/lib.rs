//! Bookshelf application library
//!
//! Hosts the application modules (the book catalog) and the bootstrap that
//! wires them into the kernel registry and the HTTP server.

use anyhow::Context;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

pub use modules::books::{BooksModule, Library, LibraryError};

/// Build a registry with every application module registered.
pub fn build_registry() -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry).context("failed to register modules")?;
    Ok(registry)
}

/// Initialize and start all modules, serve HTTP until shutdown, then stop them.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry()?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings).await;

    // Stop modules even when the server failed, then report the first error.
    let stopped = registry.stop_modules().await;
    served?;
    stopped?;

    tracing::info!("bookshelf shutdown complete");
    Ok(())
}
