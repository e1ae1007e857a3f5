//! Atrium CLI: operate the managed file store and the visual page store.
//!
//! Configuration comes from the environment (see `atrium_core::Config`). Page
//! commands use Postgres when DATABASE_URL is set.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use atrium_cli::{init_tracing, upload_name};
use atrium_core::models::UploadedFile;
use atrium_core::Config;
use atrium_db::{create_site_content_store, setup_database};
use atrium_pages::{VisualPageInput, VisualPageKey, VisualPageService};
use atrium_storage::{create_file_store, parse_scope, EntityKey, FileScope, FileStore};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "atrium", about = "Site file and visual page store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Managed file store operations
    Files {
        #[command(subcommand)]
        sub: FileCommands,
    },
    /// Visual page operations
    Pages {
        #[command(subcommand)]
        sub: PageCommands,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    /// List files of an entity, newest first
    List {
        /// Scope: articles or pages
        scope: String,
        /// Owning entity key
        entity: String,
    },
    /// Upload a local file
    Upload {
        scope: String,
        entity: String,
        /// Path to the file to upload
        file: PathBuf,
        /// Name to store under instead of the local file name
        #[arg(long)]
        name: Option<String>,
        /// MIME type reported for the upload
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },
    /// Read a stored file
    Read {
        scope: String,
        entity: String,
        name: String,
        /// Write to this path instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a stored file by name
    Delete {
        scope: String,
        entity: String,
        name: String,
    },
    /// Delete a file by its public URL (legacy records)
    DeleteUrl {
        /// Root-relative URL, e.g. /articles/2019/photo.jpg
        url: String,
    },
    /// Rename a stored file
    Rename {
        scope: String,
        entity: String,
        old_name: String,
        new_name: String,
    },
    /// Delete every file of an entity
    RemoveEntity { scope: String, entity: String },
}

#[derive(Subcommand)]
enum PageCommands {
    /// Editor view of a page (default template when nothing is saved)
    Show {
        /// Page key: home or connect
        key: String,
    },
    /// Published payload of a page, or null
    Published { key: String },
    /// Save new page content
    Save {
        key: String,
        /// File with the page html (a full document is accepted)
        #[arg(long)]
        html_file: PathBuf,
        /// File with the page css or <style> blocks
        #[arg(long)]
        css_file: Option<PathBuf>,
        /// External stylesheet URL (repeatable)
        #[arg(long = "style-href")]
        style_hrefs: Vec<String>,
        /// Make the page publicly visible
        #[arg(long)]
        publish: bool,
    },
    /// Swap the previous version back in
    Restore { key: String },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn file_target(scope: &str, entity: &str) -> anyhow::Result<(FileScope, EntityKey)> {
    let scope = parse_scope(scope)?;
    let entity = EntityKey::parse(entity)?;
    Ok((scope, entity))
}

fn page_key(raw: &str) -> anyhow::Result<VisualPageKey> {
    raw.parse::<VisualPageKey>()
}

async fn run_files(store: Arc<dyn FileStore>, command: FileCommands) -> anyhow::Result<()> {
    match command {
        FileCommands::List { scope, entity } => {
            let (scope, entity) = file_target(&scope, &entity)?;
            let files = store.list_files(scope, &entity).await?;
            print_json(&files)?;
        }
        FileCommands::Upload {
            scope,
            entity,
            file,
            name,
            content_type,
        } => {
            let (scope, entity) = file_target(&scope, &entity)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let upload = UploadedFile::new(upload_name(&file, name.as_deref()), content_type, bytes);
            let stored = store.upload_file(scope, &entity, upload).await?;
            print_json(&stored)?;
        }
        FileCommands::Read {
            scope,
            entity,
            name,
            output,
        } => {
            let (scope, entity) = file_target(&scope, &entity)?;
            let bytes = store.read_file(scope, &entity, &name).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    print_json(&serde_json::json!({ "path": path, "size": bytes.len() }))?;
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes).context("Write to stdout")?;
                    stdout.flush().context("Flush stdout")?;
                }
            }
        }
        FileCommands::Delete {
            scope,
            entity,
            name,
        } => {
            let (scope, entity) = file_target(&scope, &entity)?;
            store.delete_file(scope, &entity, &name).await?;
            print_json(&serde_json::json!({ "success": true, "deleted": name }))?;
        }
        FileCommands::DeleteUrl { url } => {
            store.delete_file_by_url(&url).await?;
            print_json(&serde_json::json!({ "success": true, "deleted": url }))?;
        }
        FileCommands::Rename {
            scope,
            entity,
            old_name,
            new_name,
        } => {
            let (scope, entity) = file_target(&scope, &entity)?;
            let renamed = store.rename_file(scope, &entity, &old_name, &new_name).await?;
            print_json(&renamed)?;
        }
        FileCommands::RemoveEntity { scope, entity } => {
            let (scope, entity) = file_target(&scope, &entity)?;
            let removed = store.remove_entity(scope, &entity).await?;
            print_json(&serde_json::json!({ "success": true, "removed": removed }))?;
        }
    }
    Ok(())
}

async fn run_pages(service: VisualPageService, command: PageCommands) -> anyhow::Result<()> {
    match command {
        PageCommands::Show { key } => {
            let page = service.get_visual_page(page_key(&key)?).await?;
            print_json(&page)?;
        }
        PageCommands::Published { key } => {
            let page = service.get_published_visual_page(page_key(&key)?).await?;
            print_json(&page)?;
        }
        PageCommands::Save {
            key,
            html_file,
            css_file,
            style_hrefs,
            publish,
        } => {
            let key = page_key(&key)?;
            let html = tokio::fs::read_to_string(&html_file)
                .await
                .with_context(|| format!("Failed to read {}", html_file.display()))?;
            let css = match css_file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => String::new(),
            };
            service
                .upsert_visual_page(
                    key,
                    VisualPageInput {
                        html,
                        css,
                        style_hrefs,
                        is_published: publish,
                    },
                )
                .await?;
            print_json(&service.get_visual_page(key).await?)?;
        }
        PageCommands::Restore { key } => {
            let restored = service.restore_previous_visual_page(page_key(&key)?).await?;
            print_json(&serde_json::json!({ "restored": restored }))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Files { sub } => {
            let store = create_file_store(&config)
                .await
                .context("Failed to initialize file store")?;
            run_files(store, sub).await?;
        }
        Commands::Pages { sub } => {
            let pool = setup_database(&config).await?;
            let service = VisualPageService::new(create_site_content_store(pool));
            run_pages(service, sub).await?;
        }
    }

    Ok(())
}
