//! OAuth2 authentication for the Firestore REST API
//!
//! Implements OAuth2 authorization code flow for Firestore access.
//! Uses a local HTTP server to receive the OAuth callback.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;

/// Token storage filename in the Moneta config directory
const TOKEN_FILE: &str = "firebase-tokens.json";

/// OAuth2 configuration and token management for Firestore
pub struct FirebaseAuth {
    client_id: String,
    client_secret: String,
    token_path: PathBuf,
}

/// Stored token data
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    #[allow(dead_code)]
    token_type: String,
}

impl FirebaseAuth {
    /// Google OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Scope covering Firestore document access
    const DATASTORE_SCOPE: &'static str = "https://www.googleapis.com/auth/datastore";

    /// Port range to try for local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Create a new FirebaseAuth instance
    ///
    /// # Arguments
    /// * `client_id` - OAuth2 client ID from Google Cloud Console
    /// * `client_secret` - OAuth2 client secret from Google Cloud Console
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        let token_path = Self::default_token_path()?;

        Ok(Self {
            client_id,
            client_secret,
            token_path,
        })
    }

    /// Get the default token storage path (~/.config/moneta/firebase-tokens.json)
    fn default_token_path() -> Result<PathBuf> {
        config::config_path(TOKEN_FILE).context("Could not determine config directory")
    }

    /// Get a valid access token, refreshing if needed
    ///
    /// Never opens a browser; sync operations must not block on user
    /// interaction. A fresh install signs in once through [`Self::login`].
    pub fn get_access_token(&self) -> Result<String> {
        let token = self.load_token().with_context(|| {
            format!(
                "No stored Firebase token at {}; run 'moneta login' first",
                self.token_path.display()
            )
        })?;

        // Check if token is still valid (with 5 minute buffer)
        if let Some(expires_at) = token.expires_at {
            let now = chrono::Utc::now().timestamp();
            if expires_at > now + 300 {
                return Ok(token.access_token);
            }
        }

        // Expired or of unknown age; refresh if we can
        if let Some(refresh_token) = token.refresh_token {
            let new_token = self.refresh_access_token(&refresh_token)?;
            self.save_token_response(&new_token)?;
            return Ok(new_token.access_token);
        }

        anyhow::bail!("Stored Firebase token expired and no refresh token is available")
    }

    /// Perform authorization code flow authentication and persist the tokens
    pub fn login(&self) -> Result<()> {
        // Step 1: Start local server to receive callback
        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);

        // Step 2: Build authorization URL
        let auth_url = self.authorize_url(&redirect_uri);

        println!("\n=== Firebase Authentication Required ===");
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit: {}", auth_url);

        // Open browser
        if let Err(e) = open::that(&auth_url) {
            eprintln!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        // Step 3: Wait for callback with authorization code
        println!("Waiting for authorization...");
        let code = self.wait_for_callback(listener)?;

        // Step 4: Exchange code for tokens
        println!("Exchanging authorization code for tokens...");
        self.exchange_code(&code, &redirect_uri)?;

        println!("Authentication successful!\n");
        Ok(())
    }

    /// Build the consent URL for a given callback address
    fn authorize_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(Self::DATASTORE_SCOPE),
        )
    }

    /// Start a local TCP server on an available port
    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Wait for OAuth callback and extract authorization code
    fn wait_for_callback(&self, listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        // Parse the request to get the code
        // Format: GET /?code=AUTH_CODE&scope=... HTTP/1.1
        let code = query_param(&request_line, "code");
        let error = query_param(&request_line, "error");

        // Send response to browser
        let (status, body) = if code.is_some() {
            ("200 OK", "Authentication successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authentication failed. Please try again.")
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        if let Some(err) = error {
            anyhow::bail!("OAuth error: {}", err);
        }

        code.context("No authorization code received")
    }

    /// Exchange an authorization code for tokens and persist them
    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<()> {
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        self.save_token_response(&token)
    }

    /// Refresh an access token using a refresh token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Preserve the refresh token if not returned
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }

    /// Load stored token from disk
    fn load_token(&self) -> Result<StoredToken> {
        let content = fs::read_to_string(&self.token_path)?;
        let token: StoredToken = serde_json::from_str(&content)?;
        Ok(token)
    }

    /// Save token response to disk
    fn save_token_response(&self, token: &TokenResponse) -> Result<()> {
        let expires_at = token
            .expires_in
            .map(|secs| chrono::Utc::now().timestamp() + secs as i64);

        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at,
        };

        if let Some(parent) = self.token_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.token_path, content)
            .with_context(|| format!("Failed to write {}", self.token_path.display()))?;
        Ok(())
    }
}

/// Extract one query parameter from an HTTP request line
fn query_param(request_line: &str, name: &str) -> Option<String> {
    request_line
        .split_whitespace()
        .nth(1) // Get the path
        .and_then(|path| {
            path.split('?').nth(1).and_then(|query| {
                query.split('&').find_map(|param| {
                    let mut parts = param.split('=');
                    if parts.next() == Some(name) {
                        parts.next().map(|s| s.to_string())
                    } else {
                        None
                    }
                })
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpStream;

    fn auth(token_path: PathBuf) -> FirebaseAuth {
        FirebaseAuth {
            client_id: "client id".to_string(),
            client_secret: "secret".to_string(),
            token_path,
        }
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let auth = auth(PathBuf::from("/tmp/tokens.json"));
        let url = auth.authorize_url("http://localhost:8080");
        assert!(url.starts_with(FirebaseAuth::AUTH_URL));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fdatastore"));
    }

    #[test]
    fn test_query_param() {
        let line = "GET /?code=abc123&scope=datastore HTTP/1.1";
        assert_eq!(query_param(line, "code").as_deref(), Some("abc123"));
        assert_eq!(query_param(line, "error"), None);
        assert_eq!(query_param("GET / HTTP/1.1", "code"), None);
    }

    #[test]
    fn test_callback_extracts_code() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(dir.path().join("tokens.json"));
        let (listener, port) = auth.start_local_server().unwrap();

        let browser = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream
                .write_all(b"GET /?code=auth-code-42&scope=x HTTP/1.1\r\n\r\n")
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        });

        let code = auth.wait_for_callback(listener).unwrap();
        assert_eq!(code, "auth-code-42");
        assert!(browser.join().unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn test_callback_reports_denied_consent() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(dir.path().join("tokens.json"));
        let (listener, port) = auth.start_local_server().unwrap();

        let browser = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream
                .write_all(b"GET /?error=access_denied HTTP/1.1\r\n\r\n")
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
        });

        let result = auth.wait_for_callback(listener);
        browser.join().unwrap();
        assert!(result.unwrap_err().to_string().contains("access_denied"));
    }

    #[test]
    fn test_saved_token_feeds_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(dir.path().join("tokens.json"));

        let response = TokenResponse {
            access_token: "fresh-token".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(3600),
            token_type: "Bearer".to_string(),
        };
        auth.save_token_response(&response).unwrap();

        // An unexpired stored token is returned without any network traffic
        assert_eq!(auth.get_access_token().unwrap(), "fresh-token");

        let stored = auth.load_token().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh"));
        assert!(stored.expires_at.is_some());
    }

    #[test]
    fn test_missing_token_names_login_remediation() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(dir.path().join("tokens.json"));
        let err = auth.get_access_token().unwrap_err();
        assert!(format!("{:#}", err).contains("moneta login"));
    }
}
