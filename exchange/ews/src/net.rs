/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use url::Url;

use crate::{credentials::Credentials, Error};

/// The content type of SOAP 1.1 requests, used by EWS and autodiscover.
pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// The content type of SOAP 1.2 requests, used by the Windows Live security
/// token service.
pub const SOAP12_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// A response whose body may hold a SOAP envelope.
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Posts a document to `url`.
///
/// EWS reports SOAP faults with a 500 status, so those responses are returned
/// to the caller alongside successful ones. A 401 becomes
/// [`Error::Unauthorized`], any other status [`Error::HttpStatus`].
pub(crate) async fn post(
    client: &Client,
    url: &Url,
    content_type: &'static str,
    credentials: Option<&Credentials>,
    body: Vec<u8>,
    trace_payloads: bool,
) -> Result<HttpResponse, Error> {
    if trace_payloads {
        log::trace!("request to {url}:\n{}", String::from_utf8_lossy(&body));
    }

    let mut request = client
        .post(url.clone())
        .header(CONTENT_TYPE, content_type)
        .body(body);
    if let Some(credentials) = credentials {
        request = credentials.apply(request);
    }

    let response = request.send().await?;
    let status = response.status();
    log::debug!("{url} responded with HTTP status {status}");

    let body = response.bytes().await?.to_vec();
    if trace_payloads {
        log::trace!("response from {url}:\n{}", String::from_utf8_lossy(&body));
    }

    let response = HttpResponse { status, body };
    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
        status if status.is_success() || status == StatusCode::INTERNAL_SERVER_ERROR => {
            Ok(response)
        }
        status => Err(Error::HttpStatus {
            status,
            body: response.body_text(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn post_to(server: &mockito::Server, body: &str) -> Result<HttpResponse, Error> {
        let url = Url::parse(&server.url()).unwrap().join("/EWS/Exchange.asmx").unwrap();

        post(
            &Client::new(),
            &url,
            SOAP_CONTENT_TYPE,
            Some(&Credentials::basic("user", "pass")),
            body.as_bytes().to_vec(),
            true,
        )
        .await
    }

    #[tokio::test]
    async fn faults_are_returned_with_their_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/EWS/Exchange.asmx")
            .match_header("content-type", SOAP_CONTENT_TYPE)
            .match_header("authorization", "Basic dXNlcjpwYXNz")
            .match_body("<request/>")
            .with_status(500)
            .with_body("<fault/>")
            .create_async()
            .await;

        let response = post_to(&server, "<request/>").await.unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_text(), "<fault/>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_statuses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/EWS/Exchange.asmx")
            .with_status(401)
            .create_async()
            .await;

        assert!(matches!(
            post_to(&server, "<request/>").await,
            Err(Error::Unauthorized)
        ));

        server.reset();
        server
            .mock("POST", "/EWS/Exchange.asmx")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        match post_to(&server, "<request/>").await {
            Err(Error::HttpStatus { status, body }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
