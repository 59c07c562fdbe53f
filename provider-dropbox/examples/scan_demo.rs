//! Connect a Dropbox account and list its playable tracks.
//!
//! Run with:
//! ```bash
//! DROPBOX_APP_KEY=... DROPBOX_APP_SECRET=... cargo run -p provider-dropbox --example scan_demo
//!
//! # Scan a sub-folder with verbose provider logs
//! cargo run -p provider-dropbox --example scan_demo -- /Music "provider_dropbox=debug"
//! ```
//!
//! On first run the demo prints an authorization URL. Approve access in the
//! browser, then press Enter; the tokens are kept in `dropbox_demo.db`.

use bridge_desktop::{InMemoryUrlHandlerRegistry, ReqwestHttpClient};
use bridge_traits::time::LogLevel;
use core_metadata::RemoteTagReader;
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use provider_dropbox::{ConnectOutcome, DropboxAuthenticator, DropboxConfig, DropboxService};
use std::env;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let root = args.get(1).cloned().unwrap_or_default();

    let mut logging = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Info);
    if let Some(filter) = args.get(2) {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging)?;

    let app_key = env::var("DROPBOX_APP_KEY")?;
    let app_secret = env::var("DROPBOX_APP_SECRET")?;
    let config = DropboxConfig::new(app_key, app_secret);

    let http_client = Arc::new(ReqwestHttpClient::new()?);
    let core = CoreConfig::builder()
        .settings_path("dropbox_demo.db")
        .http_client(http_client.clone())
        .tag_reader(Arc::new(RemoteTagReader::new(http_client.clone())))
        .url_registry(Arc::new(InMemoryUrlHandlerRegistry::new()))
        .build()?;

    let service = DropboxService::from_core_config(config.clone(), &core).await?;

    let report = match service.connect().await? {
        ConnectOutcome::Scanned(report) if root.is_empty() => report,
        ConnectOutcome::Scanned(_) => service.scan(&root).await?,
        ConnectOutcome::AuthenticationRequired => {
            let authenticator = DropboxAuthenticator::new(config, http_client);
            let pending = authenticator.start_authorization().await?;

            println!("Open this URL and approve access, then press Enter:");
            println!("  {}", pending.authorize_url());
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;

            let result = authenticator.finish_authorization(pending).await?;
            let report = service.complete_authentication(result).await?;
            if root.is_empty() {
                report
            } else {
                service.scan(&root).await?
            }
        }
    };

    info!(
        directories = report.directories,
        tracks = report.tracks.len(),
        skipped = report.skipped,
        "Scan finished"
    );

    for track in &report.tracks {
        let title = track
            .tags
            .as_ref()
            .and_then(|tags| tags.title.clone())
            .unwrap_or_else(|| track.descriptor.filename.clone());
        println!("{:<60} {}", track.song_url, title);
    }

    for failure in &report.failures {
        println!("! {:?} {}: {}", failure.stage, failure.path, failure.message);
    }

    Ok(())
}
