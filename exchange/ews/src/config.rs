/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{fmt, fs, path::Path};

use serde::Deserialize;

use crate::{
    credentials::{Credentials, WindowsLiveCredentials},
    types::ExchangeVersion,
    Error,
};

/// Settings for an [`ExchangeService`](crate::ExchangeService).
///
/// ```toml
/// url = "https://outlook.office365.com/EWS/Exchange.asmx"
/// version = "Exchange2013_SP1"
/// timeout_secs = 100
///
/// [credentials]
/// type = "basic"
/// username = "user@example.com"
/// password = "hunter2"
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// The EWS endpoint.
    pub url: String,

    #[serde(default)]
    pub version: ExchangeVersion,

    pub credentials: CredentialsConfig,

    /// The SMTP address of a mailbox to act as.
    pub impersonate: Option<String>,

    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,

    /// Logs complete request and response documents at trace level.
    #[serde(default)]
    pub trace_payloads: bool,
}

impl ServiceConfig {
    pub fn from_toml_str(config: &str) -> Result<Self, Error> {
        Ok(toml::from_str(config)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsConfig {
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    WindowsLive {
        username: String,
        password: String,
        sts_url: Option<String>,
    },
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Credentials::from(self.clone()), f)
    }
}

impl From<CredentialsConfig> for Credentials {
    fn from(config: CredentialsConfig) -> Self {
        match config {
            CredentialsConfig::Basic { username, password } => {
                Credentials::basic(username, password)
            }
            CredentialsConfig::Bearer { token } => Credentials::bearer(token),
            CredentialsConfig::WindowsLive {
                username,
                password,
                sts_url,
            } => {
                let credentials = WindowsLiveCredentials::new(username, password);
                Credentials::WindowsLive(match sts_url {
                    Some(sts_url) => credentials.with_sts_url(sts_url),
                    None => credentials,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_config() {
        let config = ServiceConfig::from_toml_str(
            r#"
            url = "https://mail.example.com/EWS/Exchange.asmx"
            version = "Exchange2010_SP1"
            timeout_secs = 30

            [credentials]
            type = "basic"
            username = "user@example.com"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.version, ExchangeVersion::Exchange2010_SP1);
        assert_eq!(config.timeout_secs, Some(30));
        assert!(!config.trace_payloads);
        assert_eq!(
            config.credentials,
            CredentialsConfig::Basic {
                username: "user@example.com".to_string(),
                password: "hunter2".to_string(),
            }
        );
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn windows_live_config_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            url = "https://mail.example.com/EWS/Exchange.asmx"

            [credentials]
            type = "windows_live"
            username = "user@live.com"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.version, ExchangeVersion::default());
        match Credentials::from(config.credentials) {
            Credentials::WindowsLive(credentials) => {
                assert_eq!(credentials.sts_url(), crate::credentials::DEFAULT_STS_URL)
            }
            other => panic!("unexpected credentials {other:?}"),
        }
    }

    #[test]
    fn unknown_credential_types_are_rejected() {
        let result = ServiceConfig::from_toml_str(
            r#"
            url = "https://mail.example.com/EWS/Exchange.asmx"

            [credentials]
            type = "ntlm"
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
