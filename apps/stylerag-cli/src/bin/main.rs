use std::env;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use stylerag_cli::args::{parse_args, AskArgs, Command, ProvisionTarget, USAGE};
use stylerag_cli::{build_pipeline, build_provisioner, init_tracing};
use stylerag_core::config::{layered_figment, AppConfig};
use stylerag_core::error::Error;
use stylerag_core::style::resolve;
use stylerag_core::types::StyleKey;
use stylerag_embed::build_embedder;
use stylerag_index::artifact::{METADATA_EXT, VECTOR_EXT};
use stylerag_pipeline::{AskRequest, PipelineError};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        eprintln!("Error: {}", e);
        if let Some(hint) = remediation(&e) { eprintln!("Hint: {}", hint); }
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> anyhow::Result<()> {
    match parse_args(args)? {
        Command::Ask(ask) => run_ask(ask).await,
        Command::Provision(target) => run_provision(target).await,
        Command::Styles => run_styles(),
        Command::Help => { println!("{}", USAGE); Ok(()) }
    }
}

async fn run_ask(ask: AskArgs) -> anyhow::Result<()> {
    // parameter errors should not wait on config or model loading
    let request = AskRequest::new(ask.question, ask.style, ask.temperature, ask.knowledge, ask.words)?;
    let config = AppConfig::load()?;
    let pipeline = build_pipeline(&config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Writing in {}...", ask.style.label()));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = pipeline.ask(&request).await;
    spinner.finish_and_clear();

    let answer = result?;
    tracing::info!(fragments = answer.fragments.len(), "answer ready");
    println!("{}", answer.text);
    Ok(())
}

async fn run_provision(target: ProvisionTarget) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let embedder = build_embedder(&config.embedding).map_err(Error::config)?;
    let provisioner = build_provisioner(&config, embedder)?;
    for style in target.styles() {
        let binding = resolve(style);
        let handle = provisioner.open(&binding.index_id).await?;
        println!(
            "{:<9} {:<9} {} fragments (model {}, dim {}) in {}",
            style.name(),
            binding.index_id,
            handle.len(),
            handle.model(),
            handle.dim(),
            provisioner.cache_dir().display()
        );
    }
    Ok(())
}

/// Needs no bucket, so the config is read without validation.
fn run_styles() -> anyhow::Result<()> {
    let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let config: AppConfig = layered_figment(Path::new("."), &env_name).extract().map_err(Error::config)?;
    let prefix = &config.storage.index_prefix;
    for style in StyleKey::ALL {
        let binding = resolve(style);
        println!(
            "{:<9} {:<15} index={:<9} {} + {}",
            style.name(),
            style.label(),
            binding.index_id,
            binding.index_id.artifact_name(prefix, VECTOR_EXT),
            binding.index_id.artifact_name(prefix, METADATA_EXT)
        );
    }
    Ok(())
}

fn remediation(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<PipelineError>() { return Some(e.remediation()); }
    err.downcast_ref::<Error>().map(|e| e.remediation())
}
