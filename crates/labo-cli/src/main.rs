use std::collections::BTreeSet;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use labo_core::backend::HttpBackend;
use labo_core::config_file::{self, ApiConfig, Config, ConfigFile, DisplayConfig, UserConfig};
use labo_core::{DetailController, ListController, ListPhase, ReportBackend, ReportId};

mod output;

use output::ColorMode;

/// Labo video reports - browse and delete generated video analysis reports
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Report service base URL (overrides config and LABO_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// User number to list reports for (overrides config and LABO_USER_NO)
    #[arg(long, global = true)]
    user_no: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List reports, newest first
    List {
        /// Only show reports whose title contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Page to show (clamped to the available pages)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Print the list view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single report
    Show {
        id: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete several reports at once
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete the report shown by `show`
    Rm { id: String },

    /// Print the resolved configuration and where it is read from
    Config {
        /// Write the resolved settings to the platform config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli);
    tracing::debug!(base_url = %config.base_url, user_no = config.user_no, "resolved config");
    let color = ColorMode(config.color && !cli.no_color);
    let backend: Arc<dyn ReportBackend> =
        Arc::new(HttpBackend::new(config.base_url.clone(), config.timeout));
    let mut out = std::io::stdout();

    match cli.command {
        Command::List { search, page, json } => {
            list(&mut out, backend, &config, search, page, json, color).await?
        }
        Command::Show { id, json } => show(&mut out, backend, id, json, color).await?,
        Command::Delete { ids } => return delete(&mut out, backend, &config, ids, color).await,
        Command::Rm { id } => remove(&mut out, backend, id).await?,
        Command::Config { init } => print_config(&mut out, &config, init)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolve configuration: CLI flags > env vars > config files > defaults.
fn resolve_config(cli: &Cli) -> Config {
    let mut config = config_file::load_config().resolve();
    if let Some(url) = cli
        .api_url
        .clone()
        .or_else(|| std::env::var("LABO_API_URL").ok())
    {
        config.base_url = url;
    }
    if let Some(user_no) = cli.user_no.or_else(|| {
        std::env::var("LABO_USER_NO")
            .ok()
            .and_then(|v| v.parse().ok())
    }) {
        config.user_no = user_no;
    }
    config
}

async fn list(
    w: &mut dyn Write,
    backend: Arc<dyn ReportBackend>,
    config: &Config,
    search: Option<String>,
    page: usize,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let mut controller = ListController::new(backend, config.user_no);
    let mut vm = controller.load().await;
    if let ListPhase::Error { message } = &vm.phase {
        anyhow::bail!("{}", message);
    }
    if let Some(term) = search {
        vm = controller.search(&term);
    }
    if page != 1 {
        vm = controller.set_page(page);
    }

    if json {
        writeln!(w, "{}", serde_json::to_string_pretty(&vm)?)?;
    } else {
        output::print_list(w, &vm, color)?;
    }
    Ok(())
}

async fn show(
    w: &mut dyn Write,
    backend: Arc<dyn ReportBackend>,
    id: String,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let mut controller = DetailController::new(backend, ReportId::from(id.as_str()));
    let vm = controller
        .load_one()
        .await
        .map_err(|e| anyhow::anyhow!("Could not load report {}: {}", id, e))?;

    if json {
        writeln!(w, "{}", serde_json::to_string_pretty(&vm)?)?;
    } else {
        output::print_detail(w, &vm, color)?;
    }
    Ok(())
}

/// Select every listed id present in the loaded collection, once each.
/// Returns the ids that are not in the collection.
fn select_ids(controller: &mut ListController, ids: Vec<String>) -> Vec<ReportId> {
    let ids: BTreeSet<ReportId> = ids.into_iter().map(ReportId::from).collect();
    let mut unknown = Vec::new();
    for id in ids {
        if !controller.store().contains(&id) {
            unknown.push(id);
        } else if !controller.selection().is_selected(&id) {
            controller.toggle_select(&id);
        }
    }
    unknown
}

/// Exits with status 2 when only some of the reports could be deleted.
async fn delete(
    w: &mut dyn Write,
    backend: Arc<dyn ReportBackend>,
    config: &Config,
    ids: Vec<String>,
    color: ColorMode,
) -> anyhow::Result<ExitCode> {
    let mut controller = ListController::new(backend, config.user_no);
    let vm = controller.load().await;
    if let ListPhase::Error { message } = &vm.phase {
        anyhow::bail!("{}", message);
    }

    for id in select_ids(&mut controller, ids) {
        output::print_warning(w, &format!("No report with id {}", id), color)?;
    }

    match controller.delete_selected().await {
        Ok(report) => {
            output::print_bulk_delete(w, &report, color)?;
            if report.failed.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(2))
            }
        }
        Err(e) => {
            let message = controller.view_model().notice.unwrap_or_else(|| e.to_string());
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

async fn remove(
    w: &mut dyn Write,
    backend: Arc<dyn ReportBackend>,
    id: String,
) -> anyhow::Result<()> {
    let mut controller = DetailController::new(backend, ReportId::from(id.as_str()));
    let loaded = controller.load_one().await;
    if let Err(e) = loaded {
        anyhow::bail!("Could not load report {}: {}", id, e);
    }

    let deleted = controller.delete_one().await;
    if let Err(e) = deleted {
        let message = controller
            .view_model()
            .notice
            .unwrap_or_else(|| e.to_string());
        return Err(anyhow::Error::new(e).context(message));
    }
    writeln!(w, "Deleted report {}.", id)?;
    Ok(())
}

fn print_config(w: &mut dyn Write, config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        let file = ConfigFile {
            api: Some(ApiConfig {
                base_url: Some(config.base_url.clone()),
                timeout_secs: Some(config.timeout.as_secs()),
            }),
            user: Some(UserConfig {
                user_no: Some(config.user_no),
            }),
            display: Some(DisplayConfig {
                color: Some(config.color),
            }),
        };
        let path = config_file::save_config(&file)?;
        writeln!(w, "Wrote {}", path.display())?;
    }
    match config_file::config_path() {
        Some(path) => writeln!(w, "config file: {}", path.display())?,
        None => writeln!(w, "config file: (no config directory)")?,
    }
    writeln!(w, "base_url:    {}", config.base_url)?;
    writeln!(w, "timeout:     {}s", config.timeout.as_secs())?;
    writeln!(w, "user_no:     {}", config.user_no)?;
    writeln!(w, "color:       {}", config.color)?;
    Ok(())
}
