/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt;

use reqwest::RequestBuilder;

mod windows_live;
pub use windows_live::{SecurityToken, WindowsLiveCredentials, DEFAULT_STS_URL};

/// WS-Addressing.
pub const WSA_NS_URI: &str = "http://www.w3.org/2005/08/addressing";

/// WS-Security extensions.
pub const WSSE_NS_URI: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

/// WS-Security utilities (timestamps and ids).
pub const WSU_NS_URI: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

/// How requests to the service are authenticated.
#[derive(Clone)]
pub enum Credentials {
    /// HTTP Basic authentication.
    Basic { username: String, password: String },

    /// An OAuth access token obtained by the caller.
    Bearer(String),

    /// A Windows Live ID authenticated through the WS-Trust security token
    /// service. The token is sent in the SOAP header of every request.
    WindowsLive(WindowsLiveCredentials),
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer(token.into())
    }

    pub fn windows_live(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::WindowsLive(WindowsLiveCredentials::new(username, password))
    }

    /// Adds the HTTP authorization header, if the credentials use one.
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::WindowsLive(_) => request,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Bearer(_) => f.write_str("Bearer(..)"),
            Credentials::WindowsLive(credentials) => {
                f.debug_tuple("WindowsLive").field(credentials).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let basic = format!("{:?}", Credentials::basic("user@example.com", "hunter2"));
        assert!(basic.contains("user@example.com"));
        assert!(!basic.contains("hunter2"));

        let bearer = format!("{:?}", Credentials::bearer("eyJ0eXAi"));
        assert!(!bearer.contains("eyJ0eXAi"));

        let live = format!("{:?}", Credentials::windows_live("user@live.com", "hunter2"));
        assert!(!live.contains("hunter2"));
    }

    #[test]
    fn http_authorization_headers() {
        let client = reqwest::Client::new();

        let request = Credentials::basic("user", "pass")
            .apply(client.post("https://mail.example.com/EWS/Exchange.asmx"))
            .build()
            .unwrap();
        assert_eq!(
            request.headers()["authorization"],
            "Basic dXNlcjpwYXNz"
        );

        let request = Credentials::bearer("token")
            .apply(client.post("https://mail.example.com/EWS/Exchange.asmx"))
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer token");

        let request = Credentials::windows_live("user", "pass")
            .apply(client.post("https://mail.example.com/EWS/Exchange.asmx"))
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }
}
