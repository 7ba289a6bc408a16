//! Environment-driven configuration, read once at startup. Every field has
//! a workable default so the CLI runs against the in-memory graph store and
//! a bare `NullResolver` with no environment set at all.

use std::env;

/// The graph-store connection and corpus locations the CLI reads from the
/// environment. The in-memory reference store never opens the URI/user/
/// password fields; they exist so the trait seam and config plumbing are
/// ready for a production backend to be substituted without touching the
/// command surface.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub graph_uri: Option<String>,
    pub graph_user: Option<String>,
    pub graph_password: Option<String>,
    pub dict_path: Option<String>,
    pub checkpoint_dir: Option<String>,
    pub helper_endpoint: Option<String>,
    pub helper_model: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables. Never fails: an
    /// absent variable just leaves the corresponding field `None`.
    pub fn load() -> Self {
        Self {
            graph_uri: env_var("CITELAW_GRAPH_URI"),
            graph_user: env_var("CITELAW_GRAPH_USER"),
            graph_password: env_var("CITELAW_GRAPH_PASSWORD"),
            dict_path: env_var("CITELAW_DICT_PATH"),
            checkpoint_dir: env_var("CITELAW_CHECKPOINT_DIR"),
            helper_endpoint: env_var("CITELAW_HELPER_ENDPOINT"),
            helper_model: env_var("CITELAW_HELPER_MODEL"),
        }
    }

    /// The checkpoint directory to use when `--checkpoint-dir` was not
    /// passed on the command line: the configured value, or `.citelaw/checkpoints`
    /// under the current directory.
    pub fn checkpoint_dir_or_default(&self) -> String {
        self.checkpoint_dir
            .clone()
            .unwrap_or_else(|| ".citelaw/checkpoints".to_string())
    }

    /// Whether an external enrichment helper was configured. No network
    /// client ships in this workspace, so a configured helper is reported
    /// to the operator and then ignored in favor of `NullResolver` — the
    /// detector behaves identically either way, per its own contract.
    pub fn helper_configured(&self) -> bool {
        self.helper_endpoint.is_some()
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_none_fields() {
        let config = Config::default();
        assert!(config.graph_uri.is_none());
        assert!(!config.helper_configured());
    }

    #[test]
    fn checkpoint_dir_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(config.checkpoint_dir_or_default(), ".citelaw/checkpoints");
    }
}
