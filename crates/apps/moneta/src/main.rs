//! Moneta - A personal finance record keeper
//!
//! Command-line entry point for the cloud sync operations.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use finance::{
    FirebaseAuth, FirebaseCredentials, FirestoreClient, SqliteLocalStore, SyncService,
};
use log::{error, info, warn};

const USAGE: &str = "Usage: moneta login | moneta <push|pull|status> <account-id>";

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, account_id) = match args.as_slice() {
        [command] if command == "login" => (command.as_str(), ""),
        [command, account_id] => (command.as_str(), account_id.as_str()),
        _ => bail!("{}", USAGE),
    };

    let credentials = match FirebaseCredentials::load() {
        Ok(creds) => creds,
        Err(e) => {
            warn!("Firebase credentials not found: {}", e);
            if let Some(path) = FirebaseCredentials::default_credentials_path() {
                warn!(
                    "To configure cloud sync, either:\n\
                     1. Place your Firebase OAuth credentials at: {}\n\
                     2. Or set environment variables: FIREBASE_PROJECT_ID, \
                     FIREBASE_CLIENT_ID and FIREBASE_CLIENT_SECRET",
                    path.display()
                );
            }
            return Err(e);
        }
    };

    let auth = FirebaseAuth::new(credentials.client_id, credentials.client_secret)?;

    if command == "login" {
        auth.login()?;
        info!("Signed in; tokens stored for future sync runs");
        return Ok(());
    }

    let remote = Arc::new(FirestoreClient::new(auth, credentials.project_id));
    let service = SyncService::connect(remote);

    let db_path = config::ensure_data_dir()
        .context("Failed to prepare data directory")?
        .join("moneta.db");
    let store = SqliteLocalStore::new(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let output = match command {
        "push" => {
            info!("Pushing account {} to the cloud", account_id);
            serde_json::to_value(service.push(account_id, &store))?
        }
        "pull" => {
            info!("Pulling account {} from the cloud", account_id);
            serde_json::to_value(service.pull(account_id, &store))?
        }
        "status" => serde_json::to_value(service.status(account_id))?,
        other => bail!("Unknown command '{}'. {}", other, USAGE),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
