//! # forum-compose
//!
//! Command-line front end for the content core: render markup, upload an
//! image to the local object store, publish a draft into an in-memory row
//! store, or browse the mod catalog.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use configs::{LogSettings, Settings};
use domains::error::{AppError, Notice};
use domains::models::{Category, ComposeTarget, User};
use domains::traits::AuthProvider;
use services::{
    AttachmentManager, FileUpload, FlatDraft, PublishCoordinator, RowStoreSink, UploadLimits,
    UploadPurpose,
};
use storage_adapters::{LocalObjectStore, MemoryRowStore, SessionAuthProvider};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = configs::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Username to act as
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a markup body (file or stdin) to HTML plus gallery images
    Render { path: Option<PathBuf> },
    /// Upload an image to the local object store
    Upload {
        path: PathBuf,
        #[arg(long)]
        avatar: bool,
    },
    /// Publish a body (file or stdin) and print the stored row
    Publish {
        #[arg(long, value_enum, default_value_t = Mode::Thread)]
        mode: Mode,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        path: Option<PathBuf>,
    },
    /// Search the mod catalog, falling back to popular items
    #[cfg(feature = "catalog-http")]
    Browse {
        #[arg(default_value = "")]
        query: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Thread,
    Reply,
    Forum,
}

impl Mode {
    fn target(self) -> ComposeTarget {
        match self {
            Mode::Thread => ComposeTarget::thread(Uuid::new_v4()),
            Mode::Reply => ComposeTarget::reply(Uuid::new_v4()),
            Mode::Forum => ComposeTarget::forum(),
        }
    }
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            Ok(body)
        }
    }
}

/// Turns a content-core error into what the user should see.
fn surface(err: AppError) -> anyhow::Error {
    match err.notice() {
        Notice::Inline(message) => anyhow::anyhow!(message),
        Notice::RedirectToSignIn => anyhow::anyhow!("sign in first: pass --user <name>"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Settings::load_from(&args.config)?;
    init_tracing(&settings.log);

    let auth = match &args.user {
        Some(username) => SessionAuthProvider::signed_in(User {
            id: Uuid::new_v4(),
            username: username.clone(),
        }),
        None => SessionAuthProvider::anonymous(),
    };
    let user = auth.current_user().await;

    match args.command {
        Command::Render { path } => {
            let body = read_input(path.as_deref())?;
            let processed = services::process(&body);
            println!("{}", serde_json::to_string_pretty(&processed)?);
        }
        Command::Upload { path, avatar } => {
            let store = LocalObjectStore::new(&settings.uploads.root_dir, &settings.uploads.public_url_prefix);
            let limits = UploadLimits {
                avatar_max_bytes: settings.uploads.avatar_max_bytes,
                content_max_bytes: settings.uploads.content_max_bytes,
            };
            let manager = AttachmentManager::new(Arc::new(store), limits);

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let content_type = mime_guess::from_path(&path).first_or_octet_stream().to_string();
            let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let file = FileUpload::new(name, content_type, bytes::Bytes::from(data));
            let purpose = if avatar { UploadPurpose::Avatar } else { UploadPurpose::Content };

            let image = manager
                .upload(user.as_ref(), &file, purpose)
                .await
                .map_err(surface)?;
            println!("{}", serde_json::to_string_pretty(&image)?);
        }
        Command::Publish { mode, title, category, tags, path } => {
            let mut draft = FlatDraft::new();
            draft.set_title(title.unwrap_or_default());
            draft.set_body(read_input(path.as_deref())?);
            if let Some(category) = category {
                draft.set_category(Some(category.parse::<Category>()?));
            }
            for tag in &tags {
                draft.add_tag(tag)?;
            }

            let rows = Arc::new(MemoryRowStore::new());
            let target = mode.target();
            let mut coordinator = PublishCoordinator::new(Arc::new(RowStoreSink::new(rows.clone())), target);
            let record = coordinator
                .publish(user.as_ref(), &draft.into())
                .await
                .map_err(surface)?;

            info!(record = %record.id, "draft published");
            println!("{}", serde_json::to_string_pretty(&rows.rows(target.mode.table()))?);
        }
        #[cfg(feature = "catalog-http")]
        Command::Browse { query } => {
            use secrecy::ExposeSecret;
            use services::ResourceBrowser;
            use storage_adapters::HttpModCatalog;

            let api_key = settings
                .catalog
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().to_string());
            let catalog = HttpModCatalog::new(&settings.catalog.base_url, api_key)?;
            let browser = ResourceBrowser::new(Arc::new(catalog), settings.catalog.page_size);

            let result = browser.browse(&query).await?;
            info!(source = ?result.source, hits = result.items.len(), "catalog browsed");
            for item in result.items {
                println!("{:<24} {:>12}  {}", item.slug, item.downloads, item.title);
            }
        }
    }

    Ok(())
}
