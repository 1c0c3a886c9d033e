//! CLI command implementations

use std::path::PathBuf;

use clap::Subcommand;
use qrshare_core::content::MAX_EXPIRATION_DAYS;
use qrshare_core::reader::ReadProgress;
use qrshare_core::share::ShareOutcome;
use qrshare_core::{
    Expiration, FileStore, KeyValueStore, MemoryStore, QrShareConfig, Result, ShareService,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Share a piece of text
    Text {
        /// Text to share
        content: String,
        /// Days until the cached copy expires (0 = never)
        #[arg(long, value_parser = expiration_days_parser())]
        expires_days: Option<u32>,
    },
    /// Share a link to a hosted video
    VideoUrl {
        /// Video address, e.g. a YouTube or Vimeo page
        url: String,
        /// Days until the cached copy expires (0 = never)
        #[arg(long, value_parser = expiration_days_parser())]
        expires_days: Option<u32>,
    },
    /// Share a local video file
    VideoFile {
        /// Path to the video
        path: PathBuf,
        /// Media type, guessed from the extension when omitted
        #[arg(long)]
        media_type: Option<String>,
        /// Days until the cached copy expires (0 = never)
        #[arg(long, value_parser = expiration_days_parser())]
        expires_days: Option<u32>,
    },
    /// Open a share link, query string or id
    Open {
        /// Link to open
        link: String,
    },
    /// Print the link for an existing share id
    Link {
        /// Content id
        id: String,
    },
}

type CliService = ShareService<Box<dyn KeyValueStore>>;

fn expiration_days_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(0..=i64::from(MAX_EXPIRATION_DAYS))
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(
    command: Commands,
    config: &QrShareConfig,
    ephemeral: bool,
) -> Result<()> {
    let mut service = open_service(config, ephemeral)?;
    let default_days = config.share.default_expiration_days;

    match command {
        Commands::Text {
            content,
            expires_days,
        } => {
            let expiration = Expiration::from_days(expires_days.unwrap_or(default_days));
            let outcome = service.share_text(&content, expiration)?;
            print_outcome(&outcome);
        }
        Commands::VideoUrl { url, expires_days } => {
            let expiration = Expiration::from_days(expires_days.unwrap_or(default_days));
            let outcome = service.share_video_url(&url, expiration)?;
            print_outcome(&outcome);
        }
        Commands::VideoFile {
            path,
            media_type,
            expires_days,
        } => {
            let expiration = Expiration::from_days(expires_days.unwrap_or(default_days));
            share_video_file(&mut service, path, media_type, expiration).await?;
        }
        Commands::Open { link } => {
            println!("{}", service.open(&link));
        }
        Commands::Link { id } => {
            let link = service.link_for_id(&id)?;
            println!("{}", link.url);
        }
    }

    Ok(())
}

fn open_service(config: &QrShareConfig, ephemeral: bool) -> Result<CliService> {
    let store: Box<dyn KeyValueStore> = if ephemeral {
        tracing::debug!("Using in-memory session store");
        Box::new(match config.storage.quota_bytes {
            Some(quota) => MemoryStore::with_quota(quota),
            None => MemoryStore::new(),
        })
    } else {
        let path = config.storage.store_path();
        tracing::debug!("Using store file {}", path.display());
        let store = FileStore::open(path, config.storage.quota_bytes)
            .map_err(qrshare_core::CacheError::from)?;
        Box::new(store)
    };

    ShareService::from_config(config, store)
}

async fn share_video_file(
    service: &mut CliService,
    path: PathBuf,
    media_type: Option<String>,
    expiration: Expiration,
) -> Result<()> {
    let pending = service.begin_video_file(&path, media_type.as_deref())?;
    let mut progress = pending.progress();

    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let current: ReadProgress = *progress.borrow_and_update();
            eprint!("\rReading {}... {:.0}%", path.display(), current.percent());
        }
        eprintln!();
    });

    let outcome = service.complete_video_file(pending, expiration).await;
    // The sender is dropped with the read task, which ends the reporter
    let _ = reporter.await;

    match outcome? {
        Some(outcome) => print_outcome(&outcome),
        None => println!("Read was superseded by a newer upload"),
    }

    Ok(())
}

fn print_outcome(outcome: &ShareOutcome) {
    println!("{}", outcome.link.url);
    println!("Content ID: {}", outcome.item.id());

    match outcome.item.expires_at() {
        Some(expires_at) => println!(
            "Cached copy expires {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("Cached copy never expires"),
    }

    if outcome.requires_cache() {
        println!("This link only works on this device while the content is cached.");
    }

    if let Some(warning) = &outcome.storage_warning {
        eprintln!("Warning: {warning}");
    }
    if let Some(evicted) = outcome.cache_report.map(|r| r.evicted).filter(|n| *n > 0) {
        println!("Removed {evicted} expired item(s) from the local store");
    }
}
