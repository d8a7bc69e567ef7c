//! ghte — run one Guided Hierarchical Traversal Engine pass against a
//! document and case-info file, or inspect a document's normalised shape
//! without spending any oracle calls.

use clap::Parser;
use ghte_core::EngineConfig;
use ghte_llm::AnthropicProvider;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "ghte",
    version = env!("CARGO_PKG_VERSION"),
    about = "Guided Hierarchical Traversal Engine — finds the statute sections relevant to a case"
)]
struct Cli {
    /// Path to the raw document JSON (any of the shapes in §4.1 are accepted)
    document: PathBuf,

    /// Path to the case-information JSON payload
    case_info: PathBuf,

    /// Path to an EngineConfig JSON/YAML file; falls back to defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured max traversal depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Override the configured relevance threshold
    #[arg(long)]
    relevance_threshold: Option<f64>,

    /// Normalise and validate the document, print its shape, and exit
    /// without spending any oracle calls
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Print the human-readable run report instead of the JSON result
    #[arg(long, default_value_t = false)]
    report: bool,

    /// Where to persist the single-slot latest result
    #[arg(long, default_value = "ghte-latest-result.json")]
    store_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "ghte=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let raw_document: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&cli.document)?)?;

    if cli.dry_run {
        let tree = ghte_engine::dry_run(&raw_document)?;
        println!("Document normalised and validated: {} nodes, {} roots", tree.len(), tree.root_nodes.len());
        for root in &tree.root_nodes {
            print_node(&tree, root, 0);
        }
        return Ok(());
    }

    let case_info: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&cli.case_info)?)?;

    let mut config = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(threshold) = cli.relevance_threshold {
        config.relevance_threshold = threshold;
    }

    let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY must be set");
    let provider: Arc<dyn ghte_llm::provider::LlmProvider> = Arc::new(AnthropicProvider::new(api_key));

    let result = ghte_engine::run(&raw_document, case_info, config, provider).await?;

    let store = ghte_engine::store::ResultStore::new(&cli.store_path);
    if let Err(e) = store.commit(&result) {
        tracing::warn!(error = %e, "failed to persist latest result");
    }

    if cli.report {
        let label = cli.case_info.file_stem().and_then(|s| s.to_str()).unwrap_or("case");
        println!("{}", ghte_engine::report::build_report(label, &result));
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}

fn print_node(tree: &ghte_core::LegalDocumentTree, id: &str, depth: usize) {
    let Some(node) = tree.get(id) else { return };
    println!("{}{} {}", "  ".repeat(depth), node.id, node.title);
    for child in &node.children {
        print_node(tree, child, depth + 1);
    }
}
