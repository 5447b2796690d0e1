//! Service settings from flags and `STAKE_MATH_*` environment variables

use axum::http::HeaderValue;
use clap::Parser;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// SDK location relative to the repository root
pub const SDK_RELATIVE: &str = "packages/math-sdk";

/// Template project location relative to the SDK
pub const TEMPLATE_RELATIVE: &str = "games/template";

/// Runtime settings
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "stake-math-server", version, about = "Stake math workspace service")]
pub struct Settings {
    /// Allowed CORS origins, comma separated (`*` allows any)
    #[arg(long, env = "STAKE_MATH_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Directory holding all workspaces
    #[arg(long, env = "STAKE_MATH_WORKSPACES_DIR", default_value = ".stake-math-workspaces")]
    pub workspaces_dir: PathBuf,

    /// Time limit for one validate or run invocation, in seconds
    #[arg(long, env = "STAKE_MATH_MAX_RUN_SECONDS", default_value_t = 120)]
    pub max_run_seconds: u64,

    /// Repository root containing `packages/math-sdk` (defaults to the working directory)
    #[arg(long, env = "STAKE_MATH_REPO_ROOT")]
    pub repo_root: Option<PathBuf>,

    /// Interpreter used to run the pipeline driver
    #[arg(long, env = "STAKE_MATH_PYTHON", default_value = "python3")]
    pub python: String,

    /// Listen address
    #[arg(long, env = "STAKE_MATH_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Emit logs as JSON lines
    #[arg(long, env = "STAKE_MATH_LOG_JSON")]
    pub log_json: bool,
}

impl Settings {
    /// Turn relative directories into absolute ones against `cwd`
    #[must_use]
    pub fn anchored(mut self, cwd: &Path) -> Self {
        if self.workspaces_dir.is_relative() {
            self.workspaces_dir = cwd.join(&self.workspaces_dir);
        }
        let repo = self.repo_root.take().unwrap_or_else(|| cwd.to_path_buf());
        self.repo_root = Some(if repo.is_relative() { cwd.join(repo) } else { repo });
        self
    }

    /// Root of the math SDK checkout
    #[must_use]
    pub fn sdk_dir(&self) -> PathBuf {
        self.repo_root
            .clone()
            .unwrap_or_default()
            .join(SDK_RELATIVE)
    }

    /// Template project copied into new games
    #[must_use]
    pub fn template_dir(&self) -> PathBuf {
        self.sdk_dir().join(TEMPLATE_RELATIVE)
    }

    /// Per-invocation time limit
    #[inline]
    #[must_use]
    pub fn max_run(&self) -> Duration {
        Duration::from_secs(self.max_run_seconds)
    }

    /// Explicit origin list, or `None` when any origin is allowed
    #[must_use]
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }

    /// CORS policy for the router
    #[must_use]
    pub fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        match self.cors_origin_list() {
            None => layer.allow_origin(Any),
            Some(origins) => {
                let values = origins.iter().filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring malformed CORS origin");
                        None
                    }
                });
                layer.allow_origin(AllowOrigin::list(values))
            }
        }
    }
}
