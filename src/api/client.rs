//! API client for the library analytics platform.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests: login/registration, data-file management, report generation
//! and the per-file analysis metrics.
//!
//! Every call goes through two stages. The authenticator reads the current
//! access token from the [`TokenStore`] and attaches it as a bearer
//! credential. The expiry interceptor watches the response: a 401 on a
//! first attempt triggers a single token refresh followed by a single
//! replay of the request; any further 401, or a failed refresh, clears the
//! stored session and surfaces the authorization failure to the caller.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{SessionTokens, TokenStore};
use crate::models::{Analyst, CurrentUser, DataFile, MetricsBundle, Report, ReportDetail};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow analysis responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    analyst_id: i64,
    email: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SecureEndpointResponse {
    user: CurrentUser,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    analyst_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    report_name: &'a str,
}

/// Download format for report export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(anyhow!("Unknown export format '{other}' (expected pdf or csv)")),
        }
    }
}

/// API client for the analytics platform.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Authenticator / expiry interceptor =====

    /// Attach the current access token, if any. Runs synchronously before
    /// transmission; an absent token sends the request unauthenticated and
    /// the server answers 401 on protected endpoints.
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.tokens.read()? {
            Some(session) => Ok(request.bearer_auth(session.access_token)),
            None => Ok(request),
        }
    }

    /// Send a request through the authenticator and the expiry interceptor.
    ///
    /// `build` constructs a fresh request for every attempt, so the replay
    /// after a refresh picks up the new token naturally (and multipart
    /// bodies can be rebuilt). The attempt structure is the retry marker:
    /// the first 401 triggers at most one refresh and one replay, a 401 on
    /// the replay terminates the session instead of refreshing again.
    async fn execute<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self
            .authorize(build(&self.client))?
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if let Err(error) = self.refresh_access_token().await {
            debug!(%error, "Token refresh failed");
            self.terminate_session();
            // The caller sees the original authorization failure; the
            // refresh failure only triggers the logout.
            return Err(ApiError::Unauthorized.into());
        }

        let replay = self
            .authorize(build(&self.client))?
            .send()
            .await
            .context("Failed to resend request after token refresh")?;

        if replay.status() == StatusCode::UNAUTHORIZED {
            // A second 401 is terminal for this request chain.
            self.terminate_session();
            return Err(ApiError::Unauthorized.into());
        }
        Ok(replay)
    }

    /// Mint a new access token from the stored refresh token.
    ///
    /// The refresh call bypasses the authenticator; it carries the refresh
    /// token itself. Without a stored refresh token this fails before any
    /// network traffic. The refresh token is kept unchanged on success.
    async fn refresh_access_token(&self) -> Result<()> {
        let session = self
            .tokens
            .read()?
            .ok_or_else(|| anyhow!("No session tokens stored"))?;
        let refresh_token = session
            .refresh_token
            .ok_or_else(|| anyhow!("No refresh token stored"))?;

        let response = self
            .client
            .post(self.endpoint("/refresh"))
            .bearer_auth(&refresh_token)
            .send()
            .await
            .context("Failed to send refresh request")?;

        let response = Self::check_response(response).await?;
        let refreshed: RefreshResponse = response
            .json()
            .await
            .context("Failed to parse refresh response")?;

        self.tokens
            .save(&SessionTokens::new(refreshed.access_token, Some(refresh_token)))?;
        debug!("Access token refreshed");
        Ok(())
    }

    /// Clear the stored session. Safe to call repeatedly; after this every
    /// protected request goes out unauthenticated until the next login.
    pub fn terminate_session(&self) {
        if let Err(error) = self.tokens.clear() {
            warn!(%error, "Failed to clear stored session tokens");
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let response = self.execute(|client| client.get(&url)).await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {url}"))
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path);
        let response = self.execute(|client| client.post(&url).json(body)).await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {url}"))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path);
        let response = self.execute(|client| client.delete(&url)).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Authentication =====

    /// Log in and persist the issued session tokens
    pub async fn login(&self, email: &str, password: &str) -> Result<Analyst> {
        let response = self
            .client
            .post(self.endpoint("/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .context("Failed to send login request")?;

        let response = Self::check_response(response).await?;
        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        self.tokens
            .save(&SessionTokens::new(login.token, login.refresh_token))?;
        debug!(analyst_id = login.analyst_id, "Logged in");

        Ok(Analyst {
            id: login.analyst_id,
            email: login.email,
        })
    }

    /// Register a new analyst account. Does not log in by itself; callers
    /// follow up with [`login`](Self::login).
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Analyst> {
        let response = self
            .client
            .post(self.endpoint("/register"))
            .json(&RegisterRequest {
                analyst_name: name,
                email,
                password,
            })
            .send()
            .await
            .context("Failed to send registration request")?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .context("Failed to parse registration response")
    }

    /// Fetch the currently authenticated user
    pub async fn current_user(&self) -> Result<CurrentUser> {
        let response: SecureEndpointResponse = self.get_json("/secure-endpoint").await?;
        Ok(response.user)
    }

    // ===== Data files =====

    /// Upload a library-usage data file.
    /// The server only accepts JSON data, so reject other extensions before
    /// transferring anything.
    pub async fn upload_data_file(&self, path: &Path) -> Result<DataFile> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid file path: {}", path.display()))?
            .to_string();

        if !filename.ends_with(".json") {
            return Err(ApiError::Validation("Only JSON files are accepted".to_string()).into());
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let url = self.endpoint("/analysis/upload-data");
        // The form is rebuilt per attempt so that a replay after a token
        // refresh re-sends the full body.
        let response = self
            .execute(|client| {
                let part = multipart::Part::bytes(bytes.clone()).file_name(filename.clone());
                client
                    .post(&url)
                    .multipart(multipart::Form::new().part("file", part))
            })
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .context("Failed to parse upload response")
    }

    /// List the data files uploaded by the current analyst
    pub async fn data_files(&self) -> Result<Vec<DataFile>> {
        self.get_json("/analysis/data-files").await
    }

    /// Delete an uploaded data file
    pub async fn delete_data_file(&self, file_id: i64) -> Result<()> {
        self.delete(&format!("/analysis/data-files/{file_id}")).await
    }

    // ===== Reports =====

    /// Run the server-side analysis over a data file and save it as a report
    pub async fn analyze(&self, file_id: i64, report_name: &str) -> Result<Report> {
        self.post_json(
            &format!("/analysis/analyze?file_id={file_id}"),
            &AnalyzeRequest { report_name },
        )
        .await
    }

    /// List the current analyst's reports
    pub async fn reports(&self) -> Result<Vec<Report>> {
        self.get_json("/analysis/reports").await
    }

    /// Fetch a report including its metric payload
    pub async fn report(&self, report_id: i64) -> Result<ReportDetail> {
        self.get_json(&format!("/analysis/reports/{report_id}")).await
    }

    /// Download a report export as a binary blob
    pub async fn export_report(&self, report_id: i64, format: ExportFormat) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!(
            "/analysis/reports/{report_id}/export?format={}",
            format.as_str()
        ));
        let response = self.execute(|client| client.get(&url)).await?;
        let response = Self::check_response(response).await?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to download report export")?;
        Ok(bytes.to_vec())
    }

    /// Delete a report
    pub async fn delete_report(&self, report_id: i64) -> Result<()> {
        self.delete(&format!("/analysis/reports/{report_id}")).await
    }

    // ===== Analysis metrics =====

    async fn metric(&self, kind: &str, file_id: i64) -> Result<Value> {
        self.get_json(&format!("/analysis/analysis/{kind}?file_id={file_id}"))
            .await
    }

    /// Usage patterns for a data file (daily activity, devices, durations)
    pub async fn usage_patterns(&self, file_id: i64) -> Result<Value> {
        self.metric("usage-patterns", file_id).await
    }

    /// Content performance for a data file (genres, ratings, completion)
    pub async fn content_performance(&self, file_id: i64) -> Result<Value> {
        self.metric("content-performance", file_id).await
    }

    /// User segments for a data file (demographics, account types)
    pub async fn user_segments(&self, file_id: i64) -> Result<Value> {
        self.metric("user-segments", file_id).await
    }

    /// Search patterns for a data file (query frequency and timing)
    pub async fn search_patterns(&self, file_id: i64) -> Result<Value> {
        self.metric("search-patterns", file_id).await
    }

    /// Retention metrics for a data file
    pub async fn retention(&self, file_id: i64) -> Result<Value> {
        self.metric("retention", file_id).await
    }

    /// Fetch all five metric sections concurrently
    pub async fn all_metrics(&self, file_id: i64) -> Result<MetricsBundle> {
        let (usage_patterns, content_performance, user_segments, search_patterns, retention) =
            futures::try_join!(
                self.usage_patterns(file_id),
                self.content_performance(file_id),
                self.user_segments(file_id),
                self.search_patterns(file_id),
                self.retention(file_id),
            )?;

        Ok(MetricsBundle {
            usage_patterns,
            content_performance,
            user_segments,
            search_patterns,
            retention,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FileTokenStore;

    fn test_client(base_url: &str) -> ApiClient {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileTokenStore::new(dir.path().to_path_buf()));
        ApiClient::new(base_url, store).unwrap()
    }

    #[test]
    fn endpoint_normalizes_trailing_slash() {
        let client = test_client("http://localhost:8000/api/");
        assert_eq!(client.endpoint("/login"), "http://localhost:8000/api/login");
    }

    #[test]
    fn parses_login_response_with_refresh_token() {
        let json = r#"{
            "message": "Login successful",
            "token": "A1",
            "refresh_token": "R1",
            "analyst_id": 42,
            "email": "ada@example.com"
        }"#;
        let login: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(login.token, "A1");
        assert_eq!(login.refresh_token.as_deref(), Some("R1"));
        assert_eq!(login.analyst_id, 42);
    }

    #[test]
    fn parses_login_response_without_refresh_token() {
        let json = r#"{"message": "ok", "token": "A1", "analyst_id": 1, "email": "a@b.c"}"#;
        let login: LoginResponse = serde_json::from_str(json).unwrap();
        assert!(login.refresh_token.is_none());
    }

    #[test]
    fn parses_secure_endpoint_response() {
        let json = r#"{
            "message": "You are authenticated",
            "user": {"id": 42, "email": "ada@example.com", "name": "Ada"}
        }"#;
        let response: SecureEndpointResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.user.name, "Ada");
    }

    #[test]
    fn export_format_parses_case_insensitively() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("docx".parse::<ExportFormat>().is_err());
    }
}
