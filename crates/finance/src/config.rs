//! Configuration loading for cloud sync
//!
//! Supports loading OAuth credentials from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Credentials filename in the Moneta config directory
const CREDENTIALS_FILE: &str = "firebase-credentials.json";

/// OAuth credentials plus project identity for Firestore access
#[derive(Debug, Clone)]
pub struct FirebaseCredentials {
    pub project_id: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    project_id: String,
    client_id: String,
    client_secret: String,
}

impl FirebaseCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials (for production builds)
    /// 2. JSON file (~/.config/moneta/firebase-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        // Try compile-time embedded credentials first (production builds)
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        // Try default config file
        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        // Fall back to runtime environment variables
        Self::from_env()
    }

    /// Load credentials embedded at compile time via environment variables.
    /// Build with: FIREBASE_PROJECT_ID=p FIREBASE_CLIENT_ID=x FIREBASE_CLIENT_SECRET=y cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let project_id = option_env!("FIREBASE_PROJECT_ID")?;
        let client_id = option_env!("FIREBASE_CLIENT_ID")?;
        let client_secret = option_env!("FIREBASE_CLIENT_SECRET")?;

        // Only return if all are non-empty
        if project_id.is_empty() || client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            project_id: project_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Parse credentials from a GoogleCredentialFile
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            project_id: installed.project_id,
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .context("FIREBASE_PROJECT_ID environment variable not set")?;
        let client_id = std::env::var("FIREBASE_CLIENT_ID")
            .context("FIREBASE_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("FIREBASE_CLIENT_SECRET")
            .context("FIREBASE_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            project_id,
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path (~/.config/moneta/firebase-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_credentials() {
        let json = r#"{
            "installed": {
                "project_id": "moneta-demo",
                "client_id": "test-client-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;

        let creds = FirebaseCredentials::from_json(json).unwrap();
        assert_eq!(creds.project_id, "moneta-demo");
        assert_eq!(creds.client_id, "test-client-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn test_parse_web_credentials() {
        let json = r#"{
            "web": {
                "project_id": "moneta-demo",
                "client_id": "web-client-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = FirebaseCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-client-id.apps.googleusercontent.com");
    }

    #[test]
    fn test_invalid_json() {
        let json = r#"{ "other": {} }"#;
        assert!(FirebaseCredentials::from_json(json).is_err());
    }
}
