//! Session credentials for the platform's web API.

use reqwest::RequestBuilder;

/// Credentials copied from a logged-in browser session.
#[derive(Clone)]
pub struct Session {
    /// Public web-client bearer token.
    pub bearer_token: String,
    /// The long-lived auth token cookie.
    pub auth_token: String,
    /// The CSRF token, sent both as a cookie and as a header.
    pub ct0: String,
}

impl Session {
    /// Create a session from its three credentials.
    #[must_use]
    pub fn new(
        bearer_token: impl Into<String>,
        auth_token: impl Into<String>,
        ct0: impl Into<String>,
    ) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            auth_token: auth_token.into(),
            ct0: ct0.into(),
        }
    }

    /// Get cookie string for HTTP requests.
    #[must_use]
    pub fn cookie_string(&self) -> String {
        format!("auth_token={}; ct0={}", self.auth_token, self.ct0)
    }

    /// Attach authorization, CSRF and cookie headers to a request.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .header("X-Csrf-Token", &self.ct0)
            .header("Cookie", self.cookie_string())
    }
}

// Credentials must never reach the logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("bearer_token", &"<redacted>")
            .field("auth_token", &"<redacted>")
            .field("ct0", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_string() {
        let session = Session::new("bearer", "abc", "xyz");
        assert_eq!(session.cookie_string(), "auth_token=abc; ct0=xyz");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let session = Session::new("bearer-secret", "auth-secret", "csrf-secret");
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_authorize_sets_headers() {
        let session = Session::new("bearer", "abc", "xyz");
        let request = session
            .authorize(reqwest::Client::new().get("http://localhost/"))
            .build()
            .unwrap();
        let headers = request.headers();
        assert_eq!(headers["authorization"], "Bearer bearer");
        assert_eq!(headers["x-csrf-token"], "xyz");
        assert_eq!(headers["cookie"], "auth_token=abc; ct0=xyz");
    }
}
