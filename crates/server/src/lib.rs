//! Triage Server - HTTP API for specialty matching
//!
//! Exposes the specialty predictor over HTTP. The model loads in the
//! background at startup; requests that arrive earlier wait for the same
//! initialization instead of starting their own.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe, 503 until the model is loaded
//! - `POST /api/ai/search` - `{"problem": "..."}` to `{"specialization", "score", "fallback"}`
//!
//! # Configuration
//!
//! `server.toml` (optional) and `TRIAGE_SERVER__*` environment variables, e.g.
//! `TRIAGE_SERVER__PORT=8080`, `TRIAGE_SERVER__SEMANTIC__MODE=api`,
//! `TRIAGE_SERVER__LIFECYCLE__INIT_TIMEOUT=60000`. A `.env` file is read first.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorDetail, ErrorResponse, ServerError, ServerResult};
pub use server::{build_router, spawn_warmup, start_server};
pub use state::ServerState;
