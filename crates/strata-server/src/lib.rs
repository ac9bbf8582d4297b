//! HTTP server for Strata.
//!
//! Serves one repository read-only in the layout the HTTP transport of
//! `strata-pull` consumes:
//!
//! ```text
//! GET /summary                        {"refs": {"<branch>": "<hex>"}}
//! GET /objects/<hh>/<rest>.<ext>      loose object bytes as stored on disk
//! GET /health
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::{build_router, AppState};
pub use server::StrataServer;
