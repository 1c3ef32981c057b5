mod api_client;

use anyhow::{Context, Result};
use api_client::HttpUploadApi;
use bannershare_core::{
    build_catalog, constants::{DEFAULT_PUBLIC_URL, REVIEW_PAGE_NAME}, extract, format_bytes,
    normalize_upload_path, review_page, ExtractedArchive, ReviewId, UploadLimits,
    UploadOrchestrator, UploadPhase,
};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bannershare")]
#[command(about = "BannerShare banner review CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a banner ZIP and print the review link
    Upload {
        /// Path to the ZIP archive
        archive: PathBuf,
        /// Base URL of the BannerShare server
        #[arg(long, default_value = DEFAULT_PUBLIC_URL)]
        server: String,
    },
    /// List the files and banners a ZIP would produce, without uploading
    Inspect {
        /// Path to the ZIP archive
        archive: PathBuf,
    },
    /// Extract a ZIP into a directory and write a review page beside the files
    Render {
        /// Path to the ZIP archive
        archive: PathBuf,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
    /// Show how an upload path is normalized
    CheckPath {
        /// Path as it appears in the archive
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Upload { archive, server }) => upload(&archive, &server).await,
        Some(Commands::Inspect { archive }) => {
            let extracted = read_archive(&archive).await?;
            for file in &extracted.files {
                println!("{:>10}  {:<28} {}", format_bytes(file.byte_size()), file.content_type, file.path);
            }
            println!(
                "{} files, {}",
                extracted.files.len(),
                format_bytes(extracted.total_bytes)
            );
            let catalog = build_catalog(&extracted.manifest());
            if catalog.is_empty() {
                println!("No banner HTML files found.");
            }
            for banner in catalog {
                println!("banner {}  {}", banner.label, banner.display_path);
            }
            Ok(())
        }
        Some(Commands::Render { archive, out }) => render(&archive, &out).await,
        Some(Commands::CheckPath { path }) => match normalize_upload_path(&path) {
            Ok(normalized) => {
                println!("{normalized}");
                Ok(())
            }
            Err(e) => anyhow::bail!("Invalid path: {e}"),
        },
        None => {
            println!("Use 'bannershare --help' for commands");
            Ok(())
        }
    }
}

fn display_name(archive: &Path) -> String {
    archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn read_archive(archive: &Path) -> Result<ExtractedArchive> {
    let data = tokio::fs::read(archive)
        .await
        .with_context(|| format!("failed to read {}", archive.display()))?;
    let limits = UploadLimits::default();
    bannershare_core::archive::precheck(&display_name(archive), data.len() as u64, &limits)?;
    Ok(extract(&data, &limits)?)
}

async fn upload(archive: &Path, server: &str) -> Result<()> {
    let data = tokio::fs::read(archive)
        .await
        .with_context(|| format!("failed to read {}", archive.display()))?;

    let orchestrator = UploadOrchestrator::new(HttpUploadApi::new(server)?, UploadLimits::default());
    let mut progress = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let (line, terminal) = {
                let snapshot = progress.borrow_and_update();
                let p = &snapshot.progress;
                let line = match (p.label.is_empty(), p.detail.is_empty()) {
                    (true, _) => None,
                    (false, true) => Some(format!("[{:>3}%] {}", p.percent, p.label)),
                    (false, false) => {
                        Some(format!("[{:>3}%] {} ({})", p.percent, p.label, p.detail))
                    }
                };
                (line, snapshot.phase.is_terminal())
            };
            if let Some(line) = line {
                eprintln!("{line}");
            }
            if terminal {
                break;
            }
        }
    });

    let snapshot = orchestrator
        .select_file(&display_name(archive), Bytes::from(data))
        .await;
    drop(orchestrator);
    let _ = printer.await;

    match (snapshot.phase, snapshot.review_location, snapshot.error) {
        (UploadPhase::Success, Some(location), _) => {
            println!("{location}");
            Ok(())
        }
        (_, _, Some(error)) => anyhow::bail!(error),
        _ => anyhow::bail!("Upload did not complete"),
    }
}

async fn render(archive: &Path, out: &Path) -> Result<()> {
    let extracted = read_archive(archive).await?;

    for file in &extracted.files {
        let target = out.join(file.path.as_str());
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&target, &file.data)
            .await
            .with_context(|| format!("failed to write {}", target.display()))?;
    }

    let catalog = build_catalog(&extracted.manifest());
    let page = review_page::render(&catalog, &ReviewId::new())?;
    let page_path = out.join(REVIEW_PAGE_NAME);
    tokio::fs::write(&page_path, page)
        .await
        .with_context(|| format!("failed to write {}", page_path.display()))?;

    tracing::info!(files = extracted.files.len(), banners = catalog.len(), "review page rendered");
    println!("{}", page_path.display());
    Ok(())
}
