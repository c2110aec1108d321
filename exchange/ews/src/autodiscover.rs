/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! POX autodiscover.
//!
//! See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/pox-autodiscover-web-service-reference-for-exchange>.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{
    credentials::Credentials,
    net::{self, SOAP_CONTENT_TYPE},
    xml::{document_writer, write_element, write_text_element},
    Error,
};

const REQUEST_NS_URI: &str =
    "http://schemas.microsoft.com/exchange/autodiscover/outlook/requestschema/2006";
const RESPONSE_SCHEMA: &str =
    "http://schemas.microsoft.com/exchange/autodiscover/outlook/responseschema/2006a";

/// The most redirections followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// The server settings found for an address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutodiscoverSettings {
    pub display_name: Option<String>,

    /// The protocol type the URL was read from, e.g. `EXPR` for external
    /// access.
    pub protocol: String,
    pub ews_url: Url,
}

/// The outcome of one autodiscover request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AutodiscoverResult {
    Settings(AutodiscoverSettings),

    /// Autodiscover must be restarted for another address.
    RedirectAddress(String),

    /// The request must be sent again to another endpoint.
    RedirectUrl(Url),
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AutodiscoverDocument {
    response: ResponseElement,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseElement {
    user: Option<UserElement>,
    account: Option<AccountElement>,
    error: Option<ErrorElement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserElement {
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccountElement {
    action: Option<String>,
    redirect_addr: Option<String>,
    redirect_url: Option<String>,

    #[serde(rename = "Protocol", default)]
    protocols: Vec<ProtocolElement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProtocolElement {
    r#type: String,
    ews_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorElement {
    error_code: Option<String>,
    message: Option<String>,
}

/// Writes the request for the settings of `email_address`.
pub fn request_body(email_address: &str) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    let mut writer = document_writer(&mut buf);

    write_element(
        &mut writer,
        "Autodiscover",
        &[(None, REQUEST_NS_URI)],
        &[],
        |writer| {
            write_element(writer, "Request", &[], &[], |writer| {
                write_text_element(writer, "EMailAddress", email_address)?;
                write_text_element(writer, "AcceptableResponseSchema", RESPONSE_SCHEMA)
            })
        },
    )?;

    Ok(buf)
}

/// The endpoints tried for an address, in order.
pub fn candidate_urls(email_address: &str) -> Result<Vec<Url>, Error> {
    let domain = email_address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
        .ok_or_else(|| Error::Autodiscover(format!("`{email_address}` is not an email address")))?;

    Ok(vec![
        Url::parse(&format!(
            "https://autodiscover.{domain}/autodiscover/autodiscover.xml"
        ))?,
        Url::parse(&format!("https://{domain}/autodiscover/autodiscover.xml"))?,
    ])
}

/// Reads an autodiscover response document.
pub fn parse_response(body: &str) -> Result<AutodiscoverResult, Error> {
    let document: AutodiscoverDocument = serde_xml_rs::from_str(body)?;
    let response = document.response;

    if let Some(error) = response.error {
        return Err(Error::Autodiscover(format!(
            "server returned error {}: {}",
            error.error_code.as_deref().unwrap_or("(no code)"),
            error.message.as_deref().unwrap_or("(no message)")
        )));
    }

    let account = response
        .account
        .ok_or_else(|| Error::Autodiscover("response contains no account".to_string()))?;

    match account.action.as_deref() {
        Some("redirectAddr") => account
            .redirect_addr
            .map(AutodiscoverResult::RedirectAddress)
            .ok_or_else(|| Error::Autodiscover("redirect without an address".to_string())),

        Some("redirectUrl") => {
            let url = account
                .redirect_url
                .ok_or_else(|| Error::Autodiscover("redirect without a URL".to_string()))?;

            Ok(AutodiscoverResult::RedirectUrl(Url::parse(&url)?))
        }

        _ => {
            // External access URLs are preferred over internal ones.
            let protocol = ["EXPR", "EXCH", "WEB"]
                .iter()
                .find_map(|wanted| {
                    account
                        .protocols
                        .iter()
                        .find(|protocol| protocol.r#type == *wanted && protocol.ews_url.is_some())
                })
                .ok_or_else(|| {
                    Error::Autodiscover("response contains no EWS URL".to_string())
                })?;

            let ews_url = protocol.ews_url.as_deref().unwrap_or_default();

            Ok(AutodiscoverResult::Settings(AutodiscoverSettings {
                display_name: response.user.and_then(|user| user.display_name),
                protocol: protocol.r#type.clone(),
                ews_url: Url::parse(ews_url)?,
            }))
        }
    }
}

/// Resolves EWS endpoints through POX autodiscover.
#[derive(Clone, Debug, Default)]
pub struct AutodiscoverClient {
    client: Client,
    password: Option<String>,
}

impl AutodiscoverClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            password: None,
        }
    }

    /// Authenticates requests with Basic authentication for the address
    /// being resolved.
    pub fn with_password(self, password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..self
        }
    }

    /// Finds the settings of `email_address`, trying the usual endpoints for
    /// its domain.
    ///
    /// Fails with [`Error::Unauthorized`] when an endpoint asks for
    /// credentials which were not given or were rejected.
    pub async fn discover(&self, email_address: &str) -> Result<AutodiscoverSettings, Error> {
        self.discover_from(email_address, candidate_urls(email_address)?)
            .await
    }

    /// Like [`discover`](Self::discover), starting with `urls`.
    pub async fn discover_from(
        &self,
        email_address: &str,
        urls: Vec<Url>,
    ) -> Result<AutodiscoverSettings, Error> {
        let mut address = email_address.to_string();
        let mut urls = urls;

        for _ in 0..=MAX_REDIRECTS {
            match self.try_urls(&address, &urls).await? {
                AutodiscoverResult::Settings(settings) => return Ok(settings),
                AutodiscoverResult::RedirectAddress(redirect) => {
                    log::debug!("autodiscover for {address} redirected to {redirect}");
                    urls = candidate_urls(&redirect)?;
                    address = redirect;
                }
                AutodiscoverResult::RedirectUrl(redirect) => {
                    log::debug!("autodiscover for {address} redirected to {redirect}");
                    urls = vec![redirect];
                }
            }
        }

        Err(Error::Autodiscover(format!(
            "more than {MAX_REDIRECTS} redirects for {email_address}"
        )))
    }

    async fn try_urls(&self, address: &str, urls: &[Url]) -> Result<AutodiscoverResult, Error> {
        let credentials = self
            .password
            .as_ref()
            .map(|password| Credentials::basic(address, password));
        let body = request_body(address)?;

        for url in urls {
            let response = match net::post(
                &self.client,
                url,
                SOAP_CONTENT_TYPE,
                credentials.as_ref(),
                body.clone(),
                false,
            )
            .await
            {
                Ok(response) if response.status.is_success() => response,
                Err(Error::Unauthorized) => return Err(Error::Unauthorized),
                Ok(response) => {
                    log::debug!("autodiscover at {url} failed with {}", response.status);
                    continue;
                }
                Err(err) => {
                    log::debug!("autodiscover at {url} failed: {err}");
                    continue;
                }
            };

            return parse_response(&response.body_text());
        }

        Err(Error::Autodiscover(format!(
            "no autodiscover endpoint answered for {address}"
        )))
    }
}
