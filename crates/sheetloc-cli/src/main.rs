use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use sheetloc_config::{apply_env, load_config, Settings};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod ui;

#[derive(Parser)]
#[command(
    name = "sheetloc",
    version,
    about = "Dialogue-tree localization through a shared spreadsheet"
)]
struct Cli {
    /// Explicit sheetloc.toml; otherwise the working and config directories are searched
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a local workbook instead of the remote spreadsheet
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the status of every setting the pipeline depends on
    CheckEnv,

    /// Walk the dialogue trees and push every text table into the store
    Extract {
        #[arg(long)]
        res_dir: Option<PathBuf>,
        /// Plan the writes without touching the store
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Machine-translate dialogue rows whose key matches FILTER (`*` or a `prefix*`)
    Translate {
        filter: String,
        /// Also retranslate rows that already have a translation
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Extra context passed to the translator
        #[arg(long)]
        context: Option<String>,
        /// Echo the source text instead of calling the translator; nothing is written
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Run the resumable quality checks over staged dialogue
    Check {
        /// Forget the checkpoint and the report first
        #[arg(long, default_value_t = false)]
        restart: bool,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Skip the language review; only the rule checks run
        #[arg(long, default_value_t = false)]
        no_review: bool,
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Write translated `-mod.json` siblings of every tree
    Reinject {
        #[arg(long)]
        res_dir: Option<PathBuf>,
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Dump JSON Schemas of the summary types
    Schema {
        #[arg(long, default_value = "./docs/assets/schemas")]
        out_dir: PathBuf,
    },
}

trait Runnable {
    fn run(self, settings: Settings, use_color: bool) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, mut settings: Settings, use_color: bool) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!("▶ Starting command: {}", cmd_name);

        let result = match self {
            Commands::CheckEnv => commands::check_env::run_check_env(&settings, use_color),

            Commands::Extract {
                res_dir,
                dry_run,
                format,
            } => {
                if let Some(dir) = res_dir {
                    settings.res_dir = dir;
                }
                commands::extract::run_extract(&settings, dry_run, &format, use_color)
            }

            Commands::Translate {
                filter,
                force,
                context,
                dry_run,
                format,
            } => commands::translate::run_translate(
                &settings,
                &filter,
                force,
                context.as_deref(),
                dry_run,
                &format,
                use_color,
            ),

            Commands::Check {
                restart,
                batch_size,
                no_review,
                format,
            } => commands::check::run_check(&settings, restart, batch_size, no_review, &format, use_color),

            Commands::Reinject { res_dir, format } => {
                if let Some(dir) = res_dir {
                    settings.res_dir = dir;
                }
                commands::reinject::run_reinject(&settings, &format, use_color)
            }

            Commands::Schema { out_dir } => commands::schema::run_schema(out_dir),
        };

        match &result {
            Ok(_) => info!("✔ Finished command: {}", cmd_name),
            Err(e) => error!("✖ Command {} failed: {:?}", cmd_name, e),
        }

        result
    }
}

/// Console layer on stderr (keeps `--format json` output clean), daily file layer at debug.
/// The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let file_appender = rolling::daily(log_dir, "sheetloc.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let cfg = load_config(cli.config.as_deref()).wrap_err("loading configuration")?;
    let cfg = apply_env(cfg)?;
    let mut settings = Settings::resolve(cfg)?;
    if let Some(path) = cli.storage.clone() {
        settings.store.storage = Some(path);
    }
    Ok(settings)
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    let _guard = init_tracing(&settings.log_dir);

    let use_color =
        !cli.no_color && std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();

    cli.cmd.run(settings, use_color)
}
