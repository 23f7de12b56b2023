//! Gmail OAuth2 authentication
//!
//! Implements the server side of the OAuth2 authorization code flow: the
//! user is sent to Google, comes back to our return URL with a code, and
//! we keep the refresh token to re-authenticate on every edition.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use serde::Deserialize;
use std::time::Duration;

/// Upper bound for any single request to Google
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures talking to the identity provider
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The user revoked our access (Google answers `invalid_grant`)
    #[error("Access to the account has been revoked")]
    Revoked,

    #[error("Google rejected the request ({status}): {code} {description}")]
    Provider {
        status: u16,
        code: String,
        description: String,
    },

    #[error("No refresh token was returned by Google")]
    MissingRefreshToken,

    #[error("HTTP error talking to Google: {0}")]
    Http(#[from] ureq::Error),

    #[error("IMAP login failed: {0:#}")]
    Mailbox(anyhow::Error),
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[allow(dead_code)]
    expires_in: Option<u64>,
}

/// Error body Google sends with 4xx token responses
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// The subset of the userinfo response we need
#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
}

/// Tokens obtained when the user first authorizes us
#[derive(Debug, Clone)]
pub struct Grant {
    pub access_token: String,
    pub refresh_token: String,
}

/// OAuth2 client for Google accounts
pub struct GmailAuth {
    client_id: String,
    client_secret: String,
    agent: ureq::Agent,
}

impl GmailAuth {
    /// Google OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    const USERINFO_URL: &'static str = "https://www.googleapis.com/oauth2/v1/userinfo";

    /// Full IMAP access, plus the address to log in to IMAP with
    const SCOPES: &'static str =
        "https://mail.google.com/ https://www.googleapis.com/auth/userinfo.email";

    /// Create a new GmailAuth instance
    ///
    /// # Arguments
    /// * `client_id` - OAuth2 client ID from Google Cloud Console
    /// * `client_secret` - OAuth2 client secret from Google Cloud Console
    pub fn new(client_id: String, client_secret: String) -> Self {
        // Non-2xx responses come back as responses so we can read
        // Google's error body and spot `invalid_grant`.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            client_id,
            client_secret,
            agent,
        }
    }

    /// URL to send the user to so they can approve access
    ///
    /// Asks for offline access and forces the consent screen so Google
    /// always returns a refresh token.
    pub fn authorize_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(Self::SCOPES),
        )
    }

    /// Exchange the code from the return URL for tokens
    pub fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Grant, AuthError> {
        let token = self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])?;

        let refresh_token = token.refresh_token.ok_or(AuthError::MissingRefreshToken)?;
        Ok(Grant {
            access_token: token.access_token,
            refresh_token,
        })
    }

    /// Get a fresh access token from a stored refresh token
    pub fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let result = self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ]);

        match result {
            Ok(token) => Ok(token.access_token),
            Err(AuthError::Provider { code, .. }) if code == "invalid_grant" => {
                Err(AuthError::Revoked)
            }
            Err(e) => Err(e),
        }
    }

    /// The Gmail address the access token belongs to
    pub fn user_email(&self, access_token: &str) -> Result<String, AuthError> {
        let mut response = self
            .agent
            .get(Self::USERINFO_URL)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body: ErrorResponse = response.body_mut().read_json().unwrap_or_default();
            return Err(provider_error(status, body));
        }

        let info: UserInfo = response.body_mut().read_json()?;
        Ok(info.email)
    }

    fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let mut response = self
            .agent
            .post(Self::TOKEN_URL)
            .send_form(form.iter().copied())?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body: ErrorResponse = response.body_mut().read_json().unwrap_or_default();
            return Err(provider_error(status, body));
        }

        Ok(response.body_mut().read_json()?)
    }
}

fn provider_error(status: u16, body: ErrorResponse) -> AuthError {
    AuthError::Provider {
        status,
        code: body.error,
        description: body.error_description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> GmailAuth {
        GmailAuth::new("client id".to_string(), "secret".to_string())
    }

    #[test]
    fn test_authorize_url() {
        let url = auth().authorize_url("https://example.com/return/");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Freturn%2F"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("https%3A%2F%2Fmail.google.com%2F"));
    }

    #[test]
    fn test_parse_error_response() {
        let body: ErrorResponse = serde_json::from_str(
            r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#,
        )
        .unwrap();

        match provider_error(400, body) {
            AuthError::Provider { status, code, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code, "invalid_grant");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_token_response_without_refresh() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc", "expires_in": 3599, "token_type": "Bearer"}"#)
                .unwrap();
        assert_eq!(token.access_token, "abc");
        assert!(token.refresh_token.is_none());
    }
}
