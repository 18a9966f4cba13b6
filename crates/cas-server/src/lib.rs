//! HTTP front end for the content-addressed blob store.
//!
//! Exposes upload, download and delete over a sharded [`cas_store::LocalFsStore`]
//! (or any other [`cas_store::ObjectStore`]). Uploads may declare their expected
//! address and a callback URL that receives the resulting metadata.

pub mod config;
pub mod content;
pub mod error;
pub mod handler;
pub mod notify;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use notify::{CallbackNotifier, NotifyError};
pub use server::CasServer;
pub use state::AppState;
