use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, RendererProtocol};
use crate::interpreter::{ElementKind, ElementOps, Finished, HeadlessRenderer, Outcome, Runtime, Scheduler};
use crate::variant::Val;
use crate::vdom::Document;

#[derive(Parser)]
#[command(name = "hvml")]
#[command(about = "HVML - run vDOM documents as cooperative programs", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run documents as coroutines and print their outcomes as JSON
    Run {
        /// vDOM documents (JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Document-global variable, repeatable (e.g. --var user='"ada"')
        #[arg(long = "var", value_name = "NAME=JSON")]
        vars: Vec<String>,
    },

    /// Load a document and summarize its elements
    Check {
        /// vDOM document (JSON)
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder()
        .config_path(cli.config)
        .build()
        .context("Failed to load configuration")?;
    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Run { files, vars } => {
            let vars = vars
                .iter()
                .map(|v| parse_var(v))
                .collect::<Result<Vec<_>>>()?;
            let docs = files
                .iter()
                .map(|path| load_document(path))
                .collect::<Result<Vec<_>>>()?;

            let finished = run_documents(&config, docs, &vars).await?;
            let reports: Vec<JsonValue> = finished.iter().map(report).collect();
            println!("{}", serde_json::to_string_pretty(&reports)?);

            let failed = finished
                .iter()
                .filter(|f| !matches!(f.outcome, Outcome::Return(_)))
                .count();
            if failed > 0 {
                bail!("{} of {} coroutine(s) did not complete", failed, finished.len());
            }
        }

        Commands::Check { file } => {
            let doc = load_document(&file)?;
            let summary = summarize(&doc);
            println!("Document: {}", file.display());
            println!("Elements: {}", summary.elements);
            for (tag, count) in &summary.tags {
                let kind = ElementKind::for_tag(tag);
                println!("  <{}> x{} ({})", tag, count, kind.name());
            }
        }

        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` wins over the configured filter
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/* ===================== Commands ===================== */

/// Spawn one coroutine per document and drive them all to completion
pub async fn run_documents(
    config: &Config,
    docs: Vec<Arc<Document>>,
    vars: &[(String, Val)],
) -> Result<Vec<Finished>> {
    let mut scheduler = Scheduler::new(&config.interpreter);
    for doc in docs {
        for (name, value) in vars {
            scheduler.bind_builtin_variable(&doc, name.clone(), value.clone());
        }
        let id = scheduler
            .spawn(Arc::clone(&doc))
            .with_context(|| format!("Failed to start document {}", doc.id()))?;
        info!(coroutine = %id, document = %doc.id(), "document scheduled");
    }

    let renderer = match config.renderer.protocol {
        RendererProtocol::Headless => HeadlessRenderer::new(),
    };
    let mut runtime = Runtime::new(scheduler, renderer, &config.renderer);
    Ok(runtime.run().await)
}

pub fn load_document(path: &Path) -> Result<Arc<Document>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = Document::from_json(&source)
        .with_context(|| format!("Failed to load document {}", path.display()))?;
    Ok(Arc::new(doc))
}

/// JSON report for one finished coroutine
pub fn report(finished: &Finished) -> JsonValue {
    let (status, result) = match &finished.outcome {
        Outcome::Return(value) => ("return", JsonValue::from(value)),
        Outcome::Throw(exception) => ("throw", JsonValue::from(&exception.to_val())),
        Outcome::Fatal(message) => ("fatal", json!(message)),
        Outcome::Cancelled => ("cancelled", JsonValue::Null),
    };
    json!({
        "coroutine": finished.id.to_string(),
        "document": finished.document,
        "status": status,
        "result": result,
        "stats": finished.stats,
    })
}

/// Parse `name=json`; a value that is not valid JSON is taken as a string
pub fn parse_var(spec: &str) -> Result<(String, Val)> {
    let Some((name, raw)) = spec.split_once('=') else {
        bail!("Invalid variable '{}': expected NAME=JSON", spec);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid variable '{}': empty name", spec);
    }

    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Val::from(&json),
        Err(_) => Val::from(raw),
    };
    Ok((name.to_string(), value))
}

#[derive(Debug, Default, Serialize)]
pub struct DocumentSummary {
    pub elements: usize,
    pub tags: BTreeMap<String, usize>,
}

pub fn summarize(doc: &Document) -> DocumentSummary {
    let mut summary = DocumentSummary::default();
    for (_, element) in doc.elements() {
        summary.elements += 1;
        *summary.tags.entry(element.tag.clone()).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::{Expr, NodeSpec};
    use maplit::btreemap;

    #[test]
    fn test_parse_var_json_and_fallback() {
        let (name, value) = parse_var("count=3").unwrap();
        assert_eq!(name, "count");
        assert_eq!(value, Val::Num(3.0));

        let (_, value) = parse_var(r#"user={"name":"ada"}"#).unwrap();
        assert_eq!(value.get("name"), Some(&Val::from("ada")));

        let (_, value) = parse_var("greeting=hello world").unwrap();
        assert_eq!(value, Val::from("hello world"));

        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=1").is_err());
    }

    #[test]
    fn test_summarize_counts_tags() {
        let doc = Document::from_tree(
            NodeSpec::element("hvml")
                .child(NodeSpec::element("catch"))
                .child(NodeSpec::content("text"))
                .child(NodeSpec::element("catch")),
        )
        .unwrap();

        let summary = summarize(&doc);
        assert_eq!(summary.elements, 3);
        assert_eq!(
            summary.tags,
            btreemap! { "catch".to_string() => 2, "hvml".to_string() => 1 }
        );
    }

    #[test]
    fn test_run_documents_binds_globals() {
        let doc = Arc::new(
            Document::from_tree(
                NodeSpec::element("hvml").child(
                    NodeSpec::element("request")
                        .attr("to", Expr::lit("update"))
                        .attr("with", Expr::var("payload")),
                ),
            )
            .unwrap(),
        );
        let vars = vec![("payload".to_string(), Val::from("hi"))];

        let finished =
            tokio_test::block_on(run_documents(&Config::default(), vec![doc], &vars)).unwrap();

        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].outcome, Outcome::Return(Val::from("hi")));

        let report = report(&finished[0]);
        assert_eq!(report["status"], "return");
        assert_eq!(report["result"], "hi");
        assert_eq!(report["stats"]["frames_pushed"], 2);
    }
}
