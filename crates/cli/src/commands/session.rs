//! Wiring shared by the commands: config → provider → tools → orchestrator.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use codewright_agent::{Orchestrator, ToolSurface};
use codewright_config::AppConfig;
use codewright_core::error::ProviderError;
use codewright_core::remote::RemoteToolBackend;
use codewright_mcp::McpBackend;
use tracing::info;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// A ready orchestrator plus the connections it depends on.
pub struct Session {
    pub config: AppConfig,
    pub orchestrator: Orchestrator,
    mcp: Option<Arc<McpBackend>>,
}

impl Session {
    pub async fn open(config_path: Option<&Path>) -> CliResult<Self> {
        let config = load_config(config_path)?;

        let provider = match codewright_providers::build_from_config(&config) {
            Ok(provider) => provider,
            Err(ProviderError::NotConfigured(reason)) => {
                print_key_help(&reason);
                return Err("no model provider configured".into());
            }
            Err(e) => return Err(e.into()),
        };

        let (surface, mcp) = open_surface(&config).await?;
        let built = Orchestrator::builder(provider, surface)
            .configure(&config)
            .build()
            .await;
        let orchestrator = match built {
            Ok(orchestrator) => orchestrator,
            Err(e) => {
                if let Some(mcp) = &mcp {
                    mcp.disconnect_all().await;
                }
                return Err(e.into());
            }
        };

        Ok(Self {
            config,
            orchestrator,
            mcp,
        })
    }

    /// Close remote tool connections.
    pub async fn close(self) {
        if let Some(mcp) = self.mcp {
            mcp.disconnect_all().await;
        }
    }
}

pub fn load_config(config_path: Option<&Path>) -> CliResult<AppConfig> {
    AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Build the tool surface: local registry plus any configured MCP servers.
pub async fn open_surface(config: &AppConfig) -> CliResult<(ToolSurface, Option<Arc<McpBackend>>)> {
    let registry = Arc::new(codewright_tools::default_registry(config)?);

    let mcp = if config.mcp_servers.is_empty() {
        None
    } else {
        let backend = Arc::new(McpBackend::new());
        let connected = backend.connect_all(&config.mcp_servers).await;
        info!(
            connected,
            configured = config.mcp_servers.len(),
            "MCP servers connected"
        );
        Some(backend)
    };

    let remote = mcp
        .clone()
        .map(|backend| backend as Arc<dyn RemoteToolBackend>);
    let surface = ToolSurface::new(registry, remote)
        .with_list_timeout(Duration::from_secs(config.agent.catalog_timeout_secs));
    Ok((surface, mcp))
}

fn print_key_help(reason: &str) {
    eprintln!();
    eprintln!("  ERROR: {reason}");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    CODEWRIGHT_API_KEY = 'sk-...'");
    eprintln!("    OPENAI_API_KEY     = 'sk-...'");
    eprintln!("    OPENROUTER_API_KEY = 'sk-or-v1-...'");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::default_path().display());
    eprintln!();
}
