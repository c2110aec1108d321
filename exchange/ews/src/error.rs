/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::{
    response::ResponseError,
    soap::SoapFault,
    types::{ExchangeVersion, ResponseCode},
};

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to write XML")]
    XmlWrite(#[from] xml::writer::Error),

    #[error("failed to read XML")]
    XmlRead(#[from] xml::reader::Error),

    #[error("failed to deserialize XML document")]
    Deserialize(#[from] serde_xml_rs::Error),

    #[error("unexpected XML content: {0}")]
    UnexpectedXml(String),

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    #[error("server responded with HTTP status {status}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("the server rejected the provided credentials")]
    Unauthorized,

    /// The server answered with a SOAP fault instead of a response.
    #[error("the request failed with a SOAP fault: {0}")]
    RequestFault(Box<SoapFault>),

    /// The server is throttling requests and asked the client to back off.
    #[error("the server is busy, retry after {back_off:?}")]
    ServerBusy {
        back_off: Option<Duration>,
        error: Box<ResponseError>,
    },

    /// A response message returned with `ResponseClass="Error"`.
    #[error("the server returned an error response: {0}")]
    Response(Box<ResponseError>),

    #[error("{} request(s) in a batch failed", .0.len())]
    Batch(Vec<ResponseError>),

    #[error("property `{0}` has not been loaded, load it before accessing its value")]
    PropertyNotLoaded(&'static str),

    #[error("property `{0}` cannot be set on a new object")]
    PropertyNotSettable(&'static str),

    #[error("property `{0}` cannot be updated on an existing object")]
    PropertyNotUpdatable(&'static str),

    #[error("property `{0}` cannot be deleted")]
    PropertyNotDeletable(&'static str),

    #[error("property `{0}` holds a value of a different type")]
    PropertyType(&'static str),

    #[error("{feature} requires {required} or later, the service targets {actual}")]
    Version {
        feature: String,
        required: ExchangeVersion,
        actual: ExchangeVersion,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("autodiscover failed: {0}")]
    Autodiscover(String),

    #[error("failed to parse configuration")]
    Config(#[from] toml::de::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("invalid URL")]
    Url(#[from] url::ParseError),

    #[error("invalid base64 content")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid date or time: {0}")]
    DateTime(String),
}

impl Error {
    /// Maps an error response message onto the matching error variant.
    pub fn from_response_error(error: ResponseError) -> Self {
        match error.response_code {
            ResponseCode::ErrorServerBusy => Error::ServerBusy {
                back_off: error.back_off(),
                error: Box::new(error),
            },

            _ => Error::Response(Box::new(error)),
        }
    }

    /// The response code attached to the error, if the server sent one.
    pub fn response_code(&self) -> Option<&ResponseCode> {
        match self {
            Error::RequestFault(fault) => fault.response_code(),
            Error::ServerBusy { error, .. } | Error::Response(error) => Some(&error.response_code),
            _ => None,
        }
    }
}

impl From<time::error::Parse> for Error {
    fn from(value: time::error::Parse) -> Self {
        Error::DateTime(value.to_string())
    }
}

impl From<time::error::Format> for Error {
    fn from(value: time::error::Format) -> Self {
        Error::DateTime(value.to_string())
    }
}

impl From<time::error::ComponentRange> for Error {
    fn from(value: time::error::ComponentRange) -> Self {
        Error::DateTime(value.to_string())
    }
}
