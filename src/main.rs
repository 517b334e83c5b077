use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gpt_compiler::{scaffold, CompilerConfig, Pipeline, WatchLoop, WatchOptions};

#[derive(Parser, Debug)]
#[command(name = "gpt-compiler")]
#[command(about = "Compile English to code using AI")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile one or more .gpt files to code
    Compile {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Model identifier (overrides AI_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// Language for documents without @language (overrides DEFAULT_OUTPUT_LANG)
        #[arg(short, long)]
        lang: Option<String>,

        /// Print one JSON outcome per file on stdout
        #[arg(long)]
        json: bool,
    },
    /// Watch for changes in .gpt files and compile them
    Watch {
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        #[arg(long)]
        model: Option<String>,

        #[arg(short, long)]
        lang: Option<String>,

        /// Skip compiling documents that already exist at startup
        #[arg(long)]
        no_initial: bool,
    },
    /// Create a new .gpt file with template
    New {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target language
        #[arg(short, long, default_value = "python")]
        lang: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(model: Option<String>, lang: Option<String>) -> Result<CompilerConfig> {
    let mut config = CompilerConfig::from_env().context("Error loading configuration")?;
    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Some(lang) = lang {
        config = config.with_default_language(lang);
    }
    Ok(config)
}

fn validate_document(config: &CompilerConfig, file: &Path) -> Result<PathBuf> {
    let path = std::env::current_dir()?.join(file);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    if !config.is_document(&path) {
        return Err(anyhow!("Only .{} files can be compiled", config.document_extension));
    }
    Ok(path)
}

async fn compile(config: CompilerConfig, files: Vec<PathBuf>, json: bool) -> Result<bool> {
    let paths = files
        .iter()
        .map(|file| validate_document(&config, file))
        .collect::<Result<Vec<_>>>()?;

    let pipeline = Arc::new(Pipeline::new(&config)?);
    let outcomes = pipeline.process_many(&paths).await;

    if json {
        for outcome in &outcomes {
            println!("{}", outcome.to_json());
        }
    }
    Ok(outcomes.iter().all(|o| o.is_success()))
}

async fn watch(config: CompilerConfig, dir: PathBuf, no_initial: bool) -> Result<()> {
    let root = std::env::current_dir()?.join(dir);
    if !root.is_dir() {
        return Err(anyhow!("Directory not found: {}", root.display()));
    }

    let pipeline = Arc::new(Pipeline::new(&config)?);
    let mut options = WatchOptions::from(&config);
    options.initial_scan = !no_initial;

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    ctrlc::set_handler(move || signal.notify_one()).context("Failed to install signal handler")?;

    let mut watch_loop = WatchLoop::new(pipeline, options);
    watch_loop.start(&root)?;

    shutdown.notified().await;
    watch_loop.stop();
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Compile { files, model, lang, json } => match load_config(model, lang) {
            Ok(config) => compile(config, files, json).await,
            Err(e) => Err(e),
        },
        Command::Watch { dir, model, lang, no_initial } => match load_config(model, lang) {
            Ok(config) => watch(config, dir, no_initial).await.map(|_| true),
            Err(e) => Err(e),
        },
        Command::New { file, lang } => scaffold::create_document(&file, &lang)
            .map(|path| {
                info!("Created new file: {}", path.display());
                true
            })
            .map_err(|e| anyhow!("Failed to create new file: {}", e)),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}
