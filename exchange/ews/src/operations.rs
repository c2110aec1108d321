/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Each request is a value implementing [`Operation`], which knows how to
//! write its body and read the response messages it produces.

use std::io::Write;

use xml::EventWriter;

use crate::{
    response::{parse_response_messages, ServiceErrorHandling, ServiceResponseCollection},
    types::ExchangeVersion,
    xml::{WriteResult, XmlElement, XmlNode},
    Error,
};

mod attachment;
pub use attachment::*;

mod item;
pub use item::*;

mod notification;
pub use notification::*;

/// A request to the service.
///
/// The request element is written with the messages namespace as its default
/// namespace, so only elements from the types namespace need a prefix.
pub trait Operation: XmlElement {
    /// The name of the request element, e.g. `GetItem`.
    const NAME: &'static str;

    /// The value read from each successful response message.
    type Response;

    /// The oldest server version supporting the request as configured.
    fn minimum_version(&self) -> ExchangeVersion {
        ExchangeVersion::Exchange2007_SP1
    }

    /// Checks the request before it is sent to a server of `version`.
    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        Ok(())
    }

    fn write_body<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        self.write_as_element(writer, Self::NAME)
    }

    /// Reads the value of one successful response message.
    fn parse_response_message(&self, message: &XmlNode) -> Result<Self::Response, Error>;

    /// The number of response messages the server should return.
    fn expected_response_count(&self) -> usize;

    fn error_handling(&self) -> ServiceErrorHandling {
        ServiceErrorHandling::ThrowOnError
    }

    /// Reads the response element of the SOAP body.
    fn parse_response(
        &self,
        response: &XmlNode,
    ) -> Result<ServiceResponseCollection<Self::Response>, Error> {
        parse_response_messages(response, Self::NAME, |message| {
            self.parse_response_message(message)
        })
    }
}

/// Fails with [`Error::Validation`] when `condition` does not hold.
pub(crate) fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), Error> {
    if condition {
        Ok(())
    } else {
        Err(Error::Validation(message()))
    }
}

/// Fails with [`Error::Version`] when `version` is older than `required`.
pub(crate) fn ensure_version(
    feature: &str,
    required: ExchangeVersion,
    version: ExchangeVersion,
) -> Result<(), Error> {
    if version < required {
        Err(Error::Version {
            feature: feature.to_string(),
            required,
            actual: version,
        })
    } else {
        Ok(())
    }
}
