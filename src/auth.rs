//! Bearer authentication for the Segment Public API

use crate::error::{Error, Result};
use reqwest::RequestBuilder;
use std::fmt;

/// Attaches `Authorization: Bearer <token>` to each request
#[derive(Clone, PartialEq, Eq)]
pub struct Authenticator {
    token: String,
}

impl Authenticator {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// A blank token fails here, before anything is sent
    pub fn apply(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        if self.token.trim().is_empty() {
            return Err(Error::auth("API token is empty"));
        }
        Ok(request.bearer_auth(&self.token))
    }
}

// Keeps the token out of logs.
impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("token", &"<redacted>")
            .finish()
    }
}
