/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use reqwest::Client;
use time::{Duration, OffsetDateTime};
use url::Url;
use xml::writer::XmlEvent;

use super::{WSA_NS_URI, WSSE_NS_URI, WSU_NS_URI};
use crate::{
    net::{self, SOAP12_CONTENT_TYPE},
    types::DateTime,
    xml::{document_writer, write_element, write_text_element, Namespace, XmlNode},
    Error,
};

/// The Windows Live security token service.
pub const DEFAULT_STS_URL: &str = "https://login.live.com/rst2.srf";

const SOAP12_NS_URI: &str = "http://www.w3.org/2003/05/soap-envelope";
const TRUST_NS_URI: &str = "http://schemas.xmlsoap.org/ws/2005/02/trust";
const POLICY_NS_URI: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";
const PASSPORT_NS_URI: &str = "http://schemas.microsoft.com/Passport/SoapServices/PPCRL";

const ISSUE_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/02/trust/RST/Issue";
const ISSUE_REQUEST_TYPE: &str = "http://schemas.xmlsoap.org/ws/2005/02/trust/Issue";

const HOSTING_APP: &str = "{63f179af-8bcd-49a0-a3e5-1154c02df090}";
const REQUEST_PARAMS: &str = "AQAAAAIAAABsYwQAAAAxMDMz";
const POLICY: &str = "LBI_FED_SSL";

/// How long the security token request itself stays valid.
const REQUEST_LIFETIME: Duration = Duration::minutes(5);

const ENVELOPE_NAMESPACES: &[Namespace] = &[
    (Some("s"), SOAP12_NS_URI),
    (Some("wsse"), WSSE_NS_URI),
    (Some("wsp"), POLICY_NS_URI),
    (Some("wsu"), WSU_NS_URI),
    (Some("wsa"), WSA_NS_URI),
    (Some("wst"), TRUST_NS_URI),
];

/// A token issued by the security token service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityToken {
    /// The token element, copied verbatim into the `wsse:Security` header.
    pub token: XmlNode,
    pub expires: DateTime,
}

impl SecurityToken {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires.0 <= now
    }
}

/// Credentials of a Windows Live ID.
///
/// A security token for the EWS endpoint is requested from the security token
/// service on first use and reused until it expires or the server rejects it.
/// Clones share the cached token.
#[derive(Clone)]
pub struct WindowsLiveCredentials {
    username: String,
    password: String,
    sts_url: String,
    cached_token: Arc<Mutex<Option<SecurityToken>>>,
}

impl WindowsLiveCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            sts_url: DEFAULT_STS_URL.to_string(),
            cached_token: Arc::default(),
        }
    }

    /// Uses a different security token service.
    pub fn with_sts_url(self, sts_url: impl Into<String>) -> Self {
        Self {
            sts_url: sts_url.into(),
            ..self
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn sts_url(&self) -> &str {
        &self.sts_url
    }

    /// Drops the cached token, e.g. after the server answered 401.
    pub fn invalidate(&self) {
        *self.lock_cache() = None;
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<SecurityToken>> {
        self.cached_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets a token for `target`, requesting a new one if none is cached or
    /// the cached one has expired.
    pub(crate) async fn security_token(
        &self,
        client: &Client,
        target: &Url,
        trace_payloads: bool,
    ) -> Result<XmlNode, Error> {
        let now = OffsetDateTime::now_utc();
        let cached = self.lock_cache().clone();
        if let Some(token) = cached.filter(|token| !token.is_expired_at(now)) {
            return Ok(token.token);
        }

        log::debug!("requesting a security token from {}", self.sts_url);

        let sts_url = Url::parse(&self.sts_url)?;
        let request = self.token_request(target.as_str(), now)?;
        let response = net::post(
            client,
            &sts_url,
            SOAP12_CONTENT_TYPE,
            None,
            request,
            trace_payloads,
        )
        .await?;

        let token = Self::parse_token_response(&response.body)?;
        let node = token.token.clone();
        *self.lock_cache() = Some(token);

        Ok(node)
    }

    /// Writes the `RequestSecurityToken` envelope asking for a token that
    /// applies to `target`.
    pub fn token_request(&self, target: &str, now: OffsetDateTime) -> Result<Vec<u8>, Error> {
        let created = DateTime(now).to_ews_string()?;
        let expires = DateTime(now + REQUEST_LIFETIME).to_ews_string()?;
        let must_understand = [("s:mustUnderstand", Cow::Borrowed("1"))];

        let mut buf = Vec::new();
        let mut writer = document_writer(&mut buf);

        write_element(&mut writer, "s:Envelope", ENVELOPE_NAMESPACES, &[], |writer| {
            write_element(writer, "s:Header", &[], &[], |writer| {
                write_element(writer, "wsa:Action", &[], &must_understand, |writer| {
                    writer.write(XmlEvent::characters(ISSUE_ACTION))
                })?;
                write_element(writer, "wsa:To", &[], &must_understand, |writer| {
                    writer.write(XmlEvent::characters(&self.sts_url))
                })?;

                write_element(
                    writer,
                    "ps:AuthInfo",
                    &[(Some("ps"), PASSPORT_NS_URI)],
                    &[("Id", Cow::Borrowed("PPAuthInfo"))],
                    |writer| {
                        write_text_element(writer, "ps:HostingApp", HOSTING_APP)?;
                        write_text_element(writer, "ps:BinaryVersion", "5")?;
                        write_text_element(writer, "ps:UIVersion", "1")?;
                        write_text_element(writer, "ps:Cookies", "")?;
                        write_text_element(writer, "ps:RequestParams", REQUEST_PARAMS)
                    },
                )?;

                write_element(writer, "wsse:Security", &[], &[], |writer| {
                    write_element(
                        writer,
                        "wsse:UsernameToken",
                        &[],
                        &[("wsu:Id", Cow::Borrowed("user"))],
                        |writer| {
                            write_text_element(writer, "wsse:Username", &self.username)?;
                            write_text_element(writer, "wsse:Password", &self.password)
                        },
                    )?;

                    write_element(
                        writer,
                        "wsu:Timestamp",
                        &[],
                        &[("Id", Cow::Borrowed("Timestamp"))],
                        |writer| {
                            write_text_element(writer, "wsu:Created", &created)?;
                            write_text_element(writer, "wsu:Expires", &expires)
                        },
                    )
                })
            })?;

            write_element(writer, "s:Body", &[], &[], |writer| {
                write_element(
                    writer,
                    "wst:RequestSecurityToken",
                    &[],
                    &[("Id", Cow::Borrowed("RST0"))],
                    |writer| {
                        write_text_element(writer, "wst:RequestType", ISSUE_REQUEST_TYPE)?;

                        write_element(writer, "wsp:AppliesTo", &[], &[], |writer| {
                            write_element(writer, "wsa:EndpointReference", &[], &[], |writer| {
                                write_text_element(writer, "wsa:Address", target)
                            })
                        })?;

                        write_element(
                            writer,
                            "wsp:PolicyReference",
                            &[],
                            &[("URI", Cow::Borrowed(POLICY))],
                            |_| Ok(()),
                        )
                    },
                )
            })
        })?;

        Ok(buf)
    }

    /// Reads a `RequestSecurityTokenResponse` envelope.
    ///
    /// A fault from the service becomes [`Error::Authentication`] with the
    /// fault reason and, when present, the Passport internal error text.
    pub fn parse_token_response(document: &[u8]) -> Result<SecurityToken, Error> {
        let envelope = XmlNode::parse(document)?;
        let body = envelope
            .required_child("Body")?
            .children
            .first()
            .ok_or_else(|| Error::Authentication("empty security token response".to_string()))?;

        if body.name == "Fault" {
            return Err(Error::Authentication(fault_message(body)));
        }

        let response = body
            .find_descendant("RequestSecurityTokenResponse")
            .ok_or_else(|| {
                Error::Authentication(format!(
                    "expected a security token response, got `{}`",
                    body.name
                ))
            })?;

        let token = response
            .required_child("RequestedSecurityToken")?
            .children
            .first()
            .cloned()
            .ok_or_else(|| Error::Authentication("the response carries no token".to_string()))?;

        let expires = response
            .required_child("Lifetime")?
            .required_child("Expires")?;

        Ok(SecurityToken {
            token,
            expires: DateTime::parse(&expires.text)?,
        })
    }
}

fn fault_message(fault: &XmlNode) -> String {
    let reason = fault
        .child("Reason")
        .and_then(|reason| reason.child_text("Text"))
        .map(str::trim)
        .unwrap_or("the security token service returned a fault");

    match fault
        .find_descendant("internalerror")
        .and_then(|error| error.child_text("text"))
    {
        Some(text) => format!("{reason}: {}", text.trim()),
        None => reason.to_string(),
    }
}

impl fmt::Debug for WindowsLiveCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsLiveCredentials")
            .field("username", &self.username)
            .field("sts_url", &self.sts_url)
            .finish_non_exhaustive()
    }
}
