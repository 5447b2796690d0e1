//! HTTP surface for stake math game workspaces
//!
//! Wires the workspace store, the template materializer and the pipeline
//! adapter behind an axum router.
//!
//! # Example
//!
//! ```rust,ignore
//! use sms_server::{build_router, AppState, Settings};
//!
//! let settings = Settings::parse().anchored(&std::env::current_dir()?);
//! let app = build_router(AppState::from_settings(&settings)).layer(settings.cors_layer());
//! axum::serve(listener, app).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod api;
mod config;
mod error;
mod state;
mod telemetry;

pub use api::build_router;
pub use config::{Settings, SDK_RELATIVE, TEMPLATE_RELATIVE};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use telemetry::init_tracing;
