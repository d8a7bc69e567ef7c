//! ghte-gateway binary — serves the HTTP surface (§6) over a document
//! loaded once at startup.

use clap::Parser;
use ghte_core::{EngineConfig, GatewayConfig};
use ghte_gateway::AppState;
use ghte_llm::AnthropicProvider;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ghte-gateway", version = env!("CARGO_PKG_VERSION"), about = "GHTE HTTP gateway")]
struct Cli {
    /// Path to the raw document JSON served by every traversal
    document: PathBuf,

    /// Path to an EngineConfig JSON/YAML file; falls back to defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8787)]
    port: u16,

    /// Where to persist the single-slot latest result
    #[arg(long, default_value = "ghte-latest-result.json")]
    store_path: PathBuf,

    /// Require `Authorization: Bearer <token>` on /traversal* requests. Falls back to
    /// the GHTE_GATEWAY_AUTH_TOKEN environment variable; unset means no enforcement.
    #[arg(long)]
    auth_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghte_gateway=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let document: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&cli.document)?)?;

    let config: EngineConfig = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY must be set");
    let provider: Arc<dyn ghte_llm::provider::LlmProvider> = Arc::new(AnthropicProvider::new(api_key));

    let auth_token = cli.auth_token.or_else(|| std::env::var("GHTE_GATEWAY_AUTH_TOKEN").ok());
    let gateway_config = GatewayConfig { port: cli.port, auth_token, ..GatewayConfig::default() };

    let state = Arc::new(AppState {
        document,
        provider,
        config,
        store: Arc::new(ghte_engine::store::ResultStore::new(&cli.store_path)),
        auth_token: gateway_config.auth_token.clone(),
    });
    ghte_gateway::serve(gateway_config, state).await
}
