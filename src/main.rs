use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loom_capability::{Dispatcher, InMemoryMemory, Offline, Services, SkillActionHandler, SkillProvider};
use loom_config::{LoomDef, Settings};
use loom_index::{IndexOptions, LoomIndex};
use loom_weave::{HandlerSet, Weaver};

/// Loom - a capability-oriented workflow platform
#[derive(Parser)]
#[command(name = "loom")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.loom)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Settings file (default: <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Loom definition files to load at startup
  #[arg(long = "loom", global = true)]
  looms: Vec<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Serve the capability protocol on stdin/stdout
  Serve,

  /// Print every capability descriptor
  Tools,

  /// Invoke one capability and print its envelope
  Call {
    /// Capability name, e.g. loom.weave
    capability: String,

    /// Arguments as a JSON object (default: read from stdin)
    arguments: Option<String>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".loom"),
  };
  let config_path = cli.config.unwrap_or_else(|| data_dir.join("config.json"));
  let settings = Settings::load(&config_path)?;

  let Some(command) = cli.command else {
    println!("loom - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let dispatcher = build_dispatcher(&settings, &data_dir, &cli.looms)?;

    match command {
      Commands::Serve => serve(dispatcher).await,
      Commands::Tools => {
        println!("{}", serde_json::to_string_pretty(&dispatcher.list())?);
        Ok(())
      }
      Commands::Call {
        capability,
        arguments,
      } => call(&dispatcher, &capability, arguments).await,
    }
  })
}

/// Construct the loom index and the dispatcher around it.
fn build_dispatcher(settings: &Settings, data_dir: &Path, extra_looms: &[PathBuf]) -> Result<Dispatcher> {
  let skills: Arc<dyn SkillProvider> = Arc::new(Offline);

  let mut handlers = HandlerSet::default();
  handlers.action = Arc::new(SkillActionHandler::new(skills.clone()));

  let index = LoomIndex::new(IndexOptions::from(settings), Weaver::new(handlers));
  index
    .ensure(&settings.default_loom)
    .with_context(|| format!("failed to create default loom '{}'", settings.default_loom))?;

  for path in settings.looms.iter().map(|p| data_dir.join(p)).chain(extra_looms.iter().cloned()) {
    let def = LoomDef::from_file(&path)?;
    let name = index
      .import(def)
      .with_context(|| format!("failed to load loom from {}", path.display()))?;
    info!(loom = %name, path = %path.display(), "loom loaded");
  }

  Ok(Dispatcher::new(Services {
    index: Arc::new(index),
    agent: Arc::new(Offline),
    memory: Arc::new(InMemoryMemory::new()),
    skills,
    default_loom: settings.default_loom.clone(),
    shutdown: CancellationToken::new(),
  }))
}

async fn serve(dispatcher: Dispatcher) -> Result<()> {
  let shutdown = dispatcher.services().shutdown.clone();
  tokio::spawn({
    let shutdown = shutdown.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupt received, shutting down");
        shutdown.cancel();
      }
    }
  });

  info!(capabilities = dispatcher.list().len(), "serving on stdio");
  let stdin = tokio::io::BufReader::new(tokio::io::stdin());
  loom_protocol::serve(stdin, tokio::io::stdout(), &dispatcher, shutdown)
    .await
    .context("protocol server failed")
}

async fn call(dispatcher: &Dispatcher, capability: &str, arguments: Option<String>) -> Result<()> {
  let arguments = match arguments {
    Some(text) => serde_json::from_str(&text).context("failed to parse arguments JSON")?,
    None => read_arguments_from_stdin()?,
  };

  let envelope = dispatcher.invoke(capability, arguments).await;
  println!("{}", serde_json::to_string_pretty(&envelope)?);

  if let Some(kind) = envelope.error_kind() {
    anyhow::bail!("capability '{capability}' failed with {kind}");
  }
  Ok(())
}

fn read_arguments_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read arguments from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse arguments JSON from stdin")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dispatcher() -> Dispatcher {
    build_dispatcher(&Settings::default(), Path::new("."), &[]).unwrap()
  }

  #[tokio::test]
  async fn test_call_succeeds_on_ok_envelope() {
    let dispatcher = dispatcher();
    call(&dispatcher, "loom.list", Some("{}".to_string())).await.unwrap();
  }

  #[tokio::test]
  async fn test_call_returns_error_on_error_envelope() {
    let dispatcher = dispatcher();
    let err = call(
      &dispatcher,
      "loom.getTopology",
      Some(r#"{"loom_name": "missing"}"#.to_string()),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("loom.getTopology"));
  }
}
