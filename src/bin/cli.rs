// PageTurn - Cross-Device Reading Client
// Copyright (C) 2026 PageTurn contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::Context;
use clap::{Parser, Subcommand};
use pageturn_core::api::{ApiClient, HttpBookService};
use pageturn_core::device::DeviceManager;
use pageturn_core::library::{LibraryManager, ProgressUpdate, SaveLocation};
use pageturn_core::models::BookId;
use pageturn_core::storage::{CacheStore, Database};
use std::sync::Arc;
use url::Url;

#[derive(Parser)]
#[command(name = "pageturn-cli")]
#[command(about = "PageTurn CLI - Desktop testing tool", long_about = None)]
struct Cli {
    /// Library service root
    #[arg(long, default_value = "http://localhost:8000/api")]
    server: Url,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the library
    List,
    /// Import a local EPUB or TXT file
    Import {
        /// Path to the file
        path: std::path::PathBuf,
    },
    /// Record a reading position
    Progress {
        /// Book id
        id: String,
        /// Absolute page
        page: u32,
        /// Chapter index
        #[arg(default_value_t = 0)]
        chapter: u32,
    },
    /// Delete a book
    Delete {
        /// Book id
        id: String,
    },
    /// Show this device's identity
    Device,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pageturn_core=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let db = Database::new(Database::get_default_path())
        .await
        .context("opening local database")?;
    let client = ApiClient::new(cli.server).context("building HTTP client")?;
    let device = Arc::new(DeviceManager::new(db.clone()));
    let library = LibraryManager::new(
        Arc::new(HttpBookService::new(client)),
        CacheStore::new(db),
        Arc::clone(&device),
    );

    match cli.command {
        Commands::List => {
            library.load_books().await.context("loading book list")?;
            let books = library.books().await;
            if books.is_empty() {
                println!("Library is empty.");
            }
            for book in books {
                println!(
                    "{:>16}  {:<40}  {:>5.1}%  page {}/{}",
                    book.id, book.title, book.progress, book.current_page, book.total_pages
                );
            }
        }
        Commands::Import { path } => {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("path has no usable filename")?
                .to_string();
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;

            match library.import_book(&filename, bytes).await {
                Ok(book) => println!("Imported '{}' ({} chapters)", book.title, book.total_pages),
                Err(e) => anyhow::bail!("{}", e.user_message()),
            }
        }
        Commands::Progress { id, page, chapter } => {
            let id = parse_id(&id)?;
            library.load_books().await.context("loading book list")?;

            let outcome = library
                .update_progress(id, ProgressUpdate::at_page(page, chapter))
                .await;
            match outcome.location {
                SaveLocation::Cloud => println!("Saved to cloud."),
                SaveLocation::Local => println!(
                    "Saved locally; sync failed ({}).",
                    outcome.error.unwrap_or_default()
                ),
                SaveLocation::None => anyhow::bail!("no book with id {}", id),
            }
        }
        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            library.load_books().await.context("loading book list")?;

            match library.delete_book(id).await {
                Ok(()) => println!("Deleted {}.", id),
                Err(e) => anyhow::bail!("{}", e.user_message()),
            }
        }
        Commands::Device => {
            let identity = device.identity().await;
            println!("id:    {}", identity.id);
            println!("label: {}", identity.label);
        }
    }

    Ok(())
}

fn parse_id(text: &str) -> anyhow::Result<BookId> {
    BookId::parse(text).with_context(|| format!("'{}' is not a numeric book id", text))
}
