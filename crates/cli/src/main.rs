use anyhow::{bail, Context, Result};
use catalog::{CatalogRecord, FileKey, Filter, RecordKind, SortKey};
use clap::{Parser, Subcommand, ValueEnum};
use exporters::{ExportFormat, Exporter};
use session::{Role, Session, UserStore};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod config;

use config::{StockConfig, ENV_PASSWORD};

#[derive(Parser)]
#[command(name = "stock-cli")]
#[command(about = "Stock content composer - browse motifs, compose footer sequences, export them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./stock.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User to log in as when a users file is configured; the password is
    /// read from STOCK_PASSWORD
    #[arg(short, long, global = true)]
    user: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    PlanesAsc,
    PlanesDesc,
    DateAsc,
    DateDesc,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::PlanesAsc => SortKey::PlanesAsc,
            SortArg::PlanesDesc => SortKey::PlanesDesc,
            SortArg::DateAsc => SortKey::DateAsc,
            SortArg::DateDesc => SortKey::DateDesc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pdf,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    User,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog records as the picker grid shows them
    Catalog {
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Only motifs with exactly this many planes
        #[arg(long, group = "filter")]
        planes: Option<u32>,

        #[arg(long, group = "filter")]
        season: Option<String>,

        #[arg(long, group = "filter")]
        category: Option<String>,

        #[arg(long, group = "filter")]
        popularity: Option<String>,

        /// List transitions instead of motifs
        #[arg(long)]
        transitions: bool,

        /// Print JSON instead of one line per record
        #[arg(long)]
        json: bool,
    },

    /// Show details and media locations for one record
    Info {
        file_key: String,

        #[arg(long)]
        transition: bool,
    },

    /// Replay a JSON command script and print the resulting footer
    Compose {
        script: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replay a script and export the footer
    Export {
        script: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        #[arg(long)]
        title: Option<String>,

        /// TrueType font for PDF labels; needed for non-Latin names
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Manage users in the configured users file
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Add a user; the password is read from STOCK_NEW_PASSWORD
    Add {
        username: String,

        #[arg(long, value_enum, default_value = "user")]
        role: RoleArg,
    },
    /// List usernames and roles
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = StockConfig::load(cli.config.as_deref())?;
    let password = std::env::var(ENV_PASSWORD).ok();

    match cli.command {
        Commands::Users { action } => {
            users_command(&config, cli.user.as_deref(), password.as_deref(), action).await
        }
        command => {
            let session = app::authenticate(&config, cli.user.as_deref(), password.as_deref())?;
            if session.logged_in() {
                info!(user = ?session.username, role = ?session.role, "logged in");
            }
            run_command(command, config).await
        }
    }
}

async fn run_command(command: Commands, config: StockConfig) -> Result<()> {
    match command {
        Commands::Catalog {
            sort,
            planes,
            season,
            category,
            popularity,
            transitions,
            json,
        } => {
            let filter = match (planes, season, category, popularity) {
                (Some(n), _, _, _) => Filter::Planes(n),
                (_, Some(s), _, _) => Filter::Season(s),
                (_, _, Some(c), _) => Filter::Category(c),
                (_, _, _, Some(p)) => Filter::Popularity(p),
                _ => Filter::All,
            };
            catalog_command(config, sort.map(Into::into), filter, transitions, json).await
        }
        Commands::Info {
            file_key,
            transition,
        } => info_command(config, file_key, transition).await,
        Commands::Compose { script, output } => compose_command(config, script, output).await,
        Commands::Export {
            script,
            output,
            format,
            title,
            font,
        } => export_command(config, script, output, format, title, font).await,
        Commands::Users { .. } => bail!("users commands are handled before login"),
    }
}

async fn catalog_command(
    config: StockConfig,
    sort: Option<SortKey>,
    filter: Filter,
    transitions: bool,
    json: bool,
) -> Result<()> {
    let (mut composer, _) =
        tokio::task::spawn_blocking(move || app::build_composer(&config)).await??;
    let state = composer.catalog_mut();
    if let Some(key) = sort {
        state.request_sort(key);
    }
    state.set_filter(filter);

    let records: Vec<&CatalogRecord> = if transitions {
        state.transitions().iter().collect()
    } else {
        state.visible()
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!("{}\t{}", record.file_key, record.caption());
        }
    }
    info!(count = records.len(), "catalog listed");
    Ok(())
}

async fn info_command(config: StockConfig, file_key: String, transition: bool) -> Result<()> {
    let (composer, resolver) =
        tokio::task::spawn_blocking(move || app::build_composer(&config)).await??;
    let kind = if transition {
        RecordKind::Transition
    } else {
        RecordKind::Motif
    };
    let key = FileKey::new(file_key);
    let Some(record) = composer.catalog().lookup(kind, &key) else {
        bail!("no {kind:?} record with file key {key}");
    };
    println!("{}", record.caption());
    println!("{}", record.info_text());
    println!("icon:  {}", resolver.icon(kind, &key));
    println!("video: {}", resolver.video(kind, &key));
    Ok(())
}

async fn compose_command(
    config: StockConfig,
    script: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let commands = app::read_script(&script)?;
    let (mut composer, resolver) =
        tokio::task::spawn_blocking(move || app::build_composer(&config)).await??;
    let result = app::run_script(&mut composer, &resolver, commands);
    for rejected in &result.rejected {
        warn!(index = rejected.index, error = %rejected.error, "command rejected");
    }

    let json = serde_json::to_string_pretty(&result)?;
    if let Some(output_path) = output {
        std::fs::write(&output_path, json)?;
        info!("Footer written to: {:?}", output_path);
    } else {
        println!("{}", json);
    }
    Ok(())
}

async fn export_command(
    mut config: StockConfig,
    script: PathBuf,
    output: Option<PathBuf>,
    format: Option<FormatArg>,
    title: Option<String>,
    font: Option<PathBuf>,
) -> Result<()> {
    if let Some(format) = format {
        config.export.format = match format {
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Json => ExportFormat::Json,
        };
    }
    if let Some(output) = output {
        config.export.output_path = output;
    }
    if let Some(title) = title {
        config.export.title = title;
    }
    if font.is_some() {
        config.export.font_path = font;
    }
    let commands = app::read_script(&script)?;

    let path = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let (mut composer, resolver) = app::build_composer(&config)?;
        let result = app::run_script(&mut composer, &resolver, commands);
        for rejected in &result.rejected {
            warn!(index = rejected.index, error = %rejected.error, "command rejected");
        }
        let exporter = Exporter::new(config.export.clone(), resolver);
        let path = exporter.export(&mut composer).context("export footer")?;
        Ok(path)
    })
    .await??;

    info!("Export completed: {:?}", path);
    Ok(())
}

async fn users_command(
    config: &StockConfig,
    user: Option<&str>,
    password: Option<&str>,
    action: UserAction,
) -> Result<()> {
    let Some(users_file) = &config.users_file else {
        bail!("no users_file configured");
    };
    let mut store = UserStore::load(users_file)?;

    // The first user can be created without logging in.
    let session = if store.users().is_empty() {
        Session::anonymous()
    } else {
        let session = app::authenticate(config, user, password)?;
        session.require_admin()?;
        session
    };

    match action {
        UserAction::Add { username, role } => {
            let role = match role {
                RoleArg::Admin => Role::Admin,
                RoleArg::User => Role::User,
            };
            let new_password = std::env::var("STOCK_NEW_PASSWORD")
                .context("set STOCK_NEW_PASSWORD to the new user's password")?;
            store.add_user(&username, &new_password, role)?;
            store.save()?;
            info!(by = ?session.username, "user {} added as {}", username, role);
        }
        UserAction::List => {
            for record in store.users() {
                println!("{}\t{}", record.username, record.role);
            }
        }
    }
    Ok(())
}
