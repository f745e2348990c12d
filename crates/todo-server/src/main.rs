//! Todo gRPC Server
//!
//! Serves the `todo.v1` auth, todo and user services over gRPC. Documents are
//! kept in SQLite (embedded) and read through a Redis cache-aside layer.

mod config;
mod deadline;
mod extractors;
mod handlers;
mod repository;
mod services;
mod storage;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use todo_core::{CacheStore, DocumentStore};
use todo_proto::proto::auth_service_server::AuthServiceServer;
use todo_proto::proto::todo_service_server::TodoServiceServer;
use todo_proto::proto::user_service_server::UserServiceServer;
use tonic::transport::Server;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{CacheBackend, LogFormat, ServerConfig, StoreBackend};
use extractors::AuthInterceptor;
use handlers::{AuthHandler, TodoHandler, UserHandler};
use services::{AccountManager, AuthService, TodoManager};
use storage::{MemoryCache, MemoryDocumentStore, RedisCache, SqliteDocumentStore};

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[FATAL] Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Todo gRPC Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server(config).await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(config: &ServerConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .context("Invalid log level")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true))
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
    }
    .context("Failed to install tracing subscriber")
}

async fn run_server(config: ServerConfig) -> Result<()> {
    info!(
        "Config loaded: bind={}, store={:?}, cache={:?}",
        config.bind_address, config.store.backend, config.cache.backend
    );
    if config.uses_default_secret() {
        warn!("auth.jwt_secret not set, using default (insecure for production)");
    }

    let store = open_store(&config).await?;
    let cache = open_cache(&config).await;
    let ttl = config.cache.ttl();

    // Initialize repositories and services
    info!("Initializing services...");
    let users = Arc::new(repository::user_repository(store.clone(), cache.clone(), ttl));
    let todos = Arc::new(repository::todo_repository(store, cache, ttl));
    let auth_service = Arc::new(
        AuthService::new(
            users.clone(),
            config.auth.jwt_secret.clone(),
            config.auth.token_ttl_hours,
        )
        .with_admins(config.auth.admin_usernames.iter().cloned()),
    );
    if !config.auth.admin_usernames.is_empty() {
        info!(admins = ?config.auth.admin_usernames, "Admin usernames configured");
    }
    let todo_manager = Arc::new(TodoManager::new(todos));
    let account_manager = Arc::new(AccountManager::new(
        users,
        auth_service.clone(),
        todo_manager.clone(),
    ));
    info!("Services initialized");

    let request_timeout = config.request_timeout();
    let interceptor = AuthInterceptor::new(auth_service.clone());

    let reflection_service = if config.reflection {
        Some(
            tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(todo_proto::FILE_DESCRIPTOR_SET)
                .build_v1()
                .context("Failed to build reflection service")?,
        )
    } else {
        None
    };

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    Server::builder()
        .add_service(AuthServiceServer::new(AuthHandler::new(
            auth_service,
            request_timeout,
        )))
        .add_service(TodoServiceServer::with_interceptor(
            TodoHandler::new(todo_manager, request_timeout),
            interceptor.clone(),
        ))
        .add_service(UserServiceServer::with_interceptor(
            UserHandler::new(account_manager, request_timeout),
            interceptor,
        ))
        .add_optional_service(reflection_service)
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn open_store(config: &ServerConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            info!("Initializing SQLite document store...");
            let store = SqliteDocumentStore::new(&config.store.path)
                .await
                .context("Failed to initialize database")?;
            info!("SQLite document store initialized at: {}", config.store.path);
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory document store, data is lost on restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

/// The service keeps working without a cache, so a Redis outage at startup
/// degrades to the in-process cache instead of failing.
async fn open_cache(config: &ServerConfig) -> Arc<dyn CacheStore> {
    match config.cache.backend {
        CacheBackend::Redis => match RedisCache::connect(&config.cache.url).await {
            Ok(cache) => {
                info!("Connected to Redis cache at {}", config.cache.url);
                Arc::new(cache)
            }
            Err(e) => {
                warn!(error = %e, url = %config.cache.url, "Redis unavailable, falling back to in-memory cache");
                Arc::new(MemoryCache::new())
            }
        },
        CacheBackend::Memory => {
            info!("Using in-memory cache");
            Arc::new(MemoryCache::new())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping gRPC server");
}
