//! # Pool Frontend
//!
//! The HTTP API frontend of a cryptocurrency mining pool, featuring:
//! - Incremental HTTP request parsing tolerant of arbitrary TCP fragmentation
//! - Chunked transfer-encoded responses with a streaming JSON builder
//! - A static route table dispatching to user and per-coin backend operations
//! - Deterministic fan-out/join across all configured coin backends
//!
//! ## Architecture
//!
//! The frontend is built with a modular architecture:
//! - **Protocol Layer**: HTTP parsing, route dispatch, chunked response encoding
//! - **Network Layer**: TCP listener and per-connection request/response cycle
//! - **Collaborators**: user/session manager and per-coin backends behind traits
//! - **Configuration**: TOML-based configuration with validation
//! - **Error Handling**: typed errors separating transport faults from API statuses
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pool_frontend::{Config, Listener, Manager};
//! use pool_frontend::mock::{MockBackend, MockUserManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::default());
//!     let users = Arc::new(MockUserManager::new());
//!     let backends = config
//!         .coins
//!         .iter()
//!         .map(|coin| MockBackend::from_config(coin).into_arc())
//!         .collect();
//!
//!     let manager = Arc::new(Manager::new(config, users, backends));
//!     let listener = Listener::new(manager).await?;
//!     listener.accept().await?;
//!
//!     Ok(())
//! }
//! ```

/// Core configuration management
pub mod config;

/// Typed error handling for transport and startup failures
pub mod error;

/// HTTP protocol implementation: parser, routes, chunked writer, JSON builder
pub mod protocol;

/// TCP listener and per-connection lifecycle
pub mod network;

/// Route handlers and the API status vocabulary
pub mod api;

/// Per-coin backend collaborator contracts and the fan-out coordinator
pub mod backend;

/// User/session manager collaborator contract
pub mod users;

/// In-memory collaborator implementations for tests and development
pub mod mock;

/// Command-line interface for the frontend
pub mod cli;

/// Central coordinator tying configuration, collaborators and routes together
pub mod manager;

// === PUBLIC API EXPORTS ===

pub use config::Config;
pub use error::{ApiError, ConfigError, Result};
pub use manager::Manager;
pub use network::listener::Listener;
