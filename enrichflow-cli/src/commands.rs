//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use enrichflow::commands::Command as _;
use enrichflow::config::{
    encrypt, generate_salt, Configuration, Settings, DEFAULT_SALT_LENGTH,
};
use enrichflow::context::{Context, ImageHandle};
use enrichflow::enrichment::models::Product;
use enrichflow::enrichment::{language_key, product_enrichment_from_image, seed_context, PRODUCT_JSON};
use enrichflow::events::LoggingEventSink;
use enrichflow::observability::{self, LogFormat as LibLogFormat};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Enrichflow: generative product enrichment from images.
#[derive(Parser)]
#[command(
    name = "enrichflow",
    version,
    about = "Enrich retail product data from images with generative models.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// The TOML configuration file.
    #[arg(short, long, default_value = "env.toml", global = true, env = "ENRICHFLOW_CONFIG")]
    pub config: PathBuf,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

impl From<LogFormat> for LibLogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Text => Self::Text,
            LogFormat::Json => Self::Json,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a random salt.
    GenerateSalt {
        /// Salt length.
        #[arg(short, long, default_value_t = DEFAULT_SALT_LENGTH)]
        length: usize,
    },

    /// Obfuscate a password read from stdin with a salt.
    ///
    /// Not good enough for production unless the salt and the encrypted
    /// password are stored apart.
    EncryptPassword {
        /// The salt for the password (random when omitted).
        #[arg(short, long)]
        salt: Option<String>,
    },

    /// Run the product enrichment chain on an image.
    Enrich {
        /// Product image (jpeg, png, webp or gif).
        #[arg(short, long)]
        image: PathBuf,

        /// Language to translate the product into (repeatable).
        #[arg(short, long = "language")]
        languages: Vec<String>,

        /// Give up after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show the resolved configuration with secrets redacted.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    if let Err(err) = observability::init_logging(cli.log_format.into(), cli.verbose) {
        eprintln!("warning: logging not initialised: {err}");
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::GenerateSalt { length } => {
            println!("Salt: {}", generate_salt(length));
            Ok(())
        }
        Command::EncryptPassword { salt } => {
            let salt = salt.unwrap_or_else(|| generate_salt(DEFAULT_SALT_LENGTH));
            let password = read_password()?;
            println!("Salt: {salt}");
            println!("Encrypted Password: {}", encrypt(&password, &salt));
            Ok(())
        }
        Command::Enrich {
            image,
            languages,
            timeout,
        } => cmd_enrich(&cli.config, &image, &languages, timeout),
        Command::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&cli.config),
        },
    }
}

/// Reads the password without echo on a terminal, or one line from piped
/// stdin otherwise.
fn read_password() -> Result<String> {
    let stdin = std::io::stdin();
    let password = if stdin.is_terminal() {
        rpassword::prompt_password("Enter password: ").context("failed to read password")?
    } else {
        read_piped_password(stdin.lock())?
    };
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

fn read_piped_password(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn cmd_config_show(path: &Path) -> Result<()> {
    println!("{}", render_config(path)?);
    Ok(())
}

/// Renders the resolved settings as TOML with secrets redacted.
fn render_config(path: &Path) -> Result<String> {
    let settings = Settings::load(path)?;
    toml::to_string_pretty(&settings.redacted()).context("failed to render configuration")
}

fn cmd_enrich(
    config_path: &Path,
    image: &Path,
    languages: &[String],
    timeout: Option<u64>,
) -> Result<()> {
    let settings = Settings::load(config_path)?;
    let worker_threads = settings.application.thread_pool_size.max(1);
    let configuration = Arc::new(Configuration::from_settings(settings)?);

    let image = ImageHandle::from_path(image)
        .with_context(|| format!("failed to read image {}", image.display()))?;
    info!(mime_type = image.mime_type(), bytes = image.len(), "Loaded product image");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let ctx = runtime.block_on(async {
        let chain = product_enrichment_from_image();
        let mut ctx =
            Context::new(configuration).with_event_sink(Arc::new(LoggingEventSink::debug()));
        seed_context(&mut ctx, image, languages);

        let run = chain.execute(&mut ctx);
        match timeout {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
                .await
                .with_context(|| format!("enrichment timed out after {secs}s"))??,
            None => run.await?,
        }
        Ok::<_, anyhow::Error>(ctx)
    })?;

    println!("{}", serde_json::to_string_pretty(&render_report(&ctx, languages))?);
    if ctx.has_errors() {
        warn!(errors = ctx.errors().len(), "Enrichment finished with errors");
    }
    Ok(())
}

/// Builds the JSON report printed after an enrichment run.
fn render_report(ctx: &Context, languages: &[String]) -> serde_json::Value {
    let product = ctx.get_text(PRODUCT_JSON).map(|text| {
        Product::from_model_output(text)
            .map(|p| serde_json::to_value(p).unwrap_or_default())
            .unwrap_or_else(|err| {
                warn!(error = %err, "Product output does not match the product model");
                serde_json::Value::String(text.to_string())
            })
    });

    let translations: BTreeMap<&str, serde_json::Value> = languages
        .iter()
        .filter_map(|language| {
            ctx.get(&language_key(language))
                .map(|value| (language.as_str(), value.to_json()))
        })
        .collect();

    serde_json::json!({
        "run_id": ctx.run_id().to_string(),
        "product": product,
        "translations": translations,
        "errors": ctx.errors(),
    })
}
