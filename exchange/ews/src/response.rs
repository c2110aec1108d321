/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{fmt, time::Duration};

use strum::{AsRefStr, Display, EnumString};

use crate::{types::ResponseCode, xml::XmlNode, Error};

/// The class of a response message.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/responseclass>.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum ServiceResult {
    Success,
    Warning,
    Error,
}

/// How a batch request reports failures of individual sub-requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceErrorHandling {
    /// The first failed response message is returned as an [`Error`].
    #[default]
    ThrowOnError,

    /// Failed response messages are kept in the returned collection.
    ReturnErrors,
}

/// The error (or warning) details of a response message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseError {
    pub response_code: ResponseCode,
    pub message_text: Option<String>,
    pub descriptive_link_key: Option<i64>,

    /// Name/value pairs from the `MessageXml` element, e.g.
    /// `BackOffMilliseconds`.
    pub details: Vec<(String, String)>,

    /// Field URIs of the properties the error relates to.
    pub property_paths: Vec<String>,
}

impl ResponseError {
    pub fn new(response_code: ResponseCode, message_text: impl Into<String>) -> Self {
        Self {
            response_code,
            message_text: Some(message_text.into()),
            ..Default::default()
        }
    }

    /// Reads the error fields of a response message.
    pub(crate) fn from_message(message: &XmlNode) -> Result<Self, Error> {
        let response_code = match message.child("ResponseCode") {
            Some(code) => code.parse_text()?,
            None => ResponseCode::Other(String::new()),
        };

        let descriptive_link_key = message
            .child("DescriptiveLinkKey")
            .map(XmlNode::parse_text)
            .transpose()?;

        let mut error = Self {
            response_code,
            message_text: message.child_text("MessageText").map(str::to_string),
            descriptive_link_key,
            ..Default::default()
        };

        if let Some(message_xml) = message.child("MessageXml") {
            error.read_message_xml(message_xml);
        }

        Ok(error)
    }

    /// Collects the details of a `MessageXml` element.
    pub(crate) fn read_message_xml(&mut self, message_xml: &XmlNode) {
        for child in &message_xml.children {
            match child.name.as_str() {
                "Value" => self.details.push((
                    child.attribute("Name").unwrap_or_default().to_string(),
                    child.text.clone(),
                )),

                "FieldURI" | "IndexedFieldURI" | "ExtendedFieldURI" => {
                    if let Some(uri) = child.attribute("FieldURI") {
                        self.property_paths.push(uri.to_string());
                    }
                }

                name => self.details.push((name.to_string(), child.text.clone())),
            }
        }
    }

    pub fn detail(&self, name: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The delay requested by a server refusing requests with
    /// `ErrorServerBusy`.
    pub fn back_off(&self) -> Option<Duration> {
        self.detail("BackOffMilliseconds")
            .and_then(|value| value.trim().parse().ok())
            .map(Duration::from_millis)
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message_text {
            Some(text) => write!(f, "{}: {text}", self.response_code),
            None => write!(f, "{}", self.response_code),
        }
    }
}

/// The outcome of one sub-request.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceResponse<T> {
    Success(T),
    Warning { value: T, warning: ResponseError },
    Error(ResponseError),
}

impl<T> ServiceResponse<T> {
    pub fn result(&self) -> ServiceResult {
        match self {
            ServiceResponse::Success(_) => ServiceResult::Success,
            ServiceResponse::Warning { .. } => ServiceResult::Warning,
            ServiceResponse::Error(_) => ServiceResult::Error,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ServiceResponse::Success(value) | ServiceResponse::Warning { value, .. } => Some(value),
            ServiceResponse::Error(_) => None,
        }
    }

    /// The error of a failed response, or the warning of a partially
    /// successful one.
    pub fn error(&self) -> Option<&ResponseError> {
        match self {
            ServiceResponse::Success(_) => None,
            ServiceResponse::Warning { warning, .. } => Some(warning),
            ServiceResponse::Error(error) => Some(error),
        }
    }

    /// Converts into the response value; warnings are treated as success.
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            ServiceResponse::Success(value) | ServiceResponse::Warning { value, .. } => Ok(value),
            ServiceResponse::Error(error) => Err(Error::from_response_error(error)),
        }
    }
}

/// The responses to a (possibly batched) request, in request order.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceResponseCollection<T> {
    responses: Vec<ServiceResponse<T>>,
}

impl<T> ServiceResponseCollection<T> {
    /// `Error` if any response failed, otherwise `Warning` if any response
    /// carries a warning.
    pub fn overall_result(&self) -> ServiceResult {
        self.responses
            .iter()
            .map(ServiceResponse::result)
            .fold(ServiceResult::Success, |overall, result| {
                match (overall, result) {
                    (ServiceResult::Error, _) | (_, ServiceResult::Error) => ServiceResult::Error,
                    (ServiceResult::Warning, _) | (_, ServiceResult::Warning) => {
                        ServiceResult::Warning
                    }
                    _ => ServiceResult::Success,
                }
            })
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ServiceResponse<T>> {
        self.responses.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceResponse<T>> {
        self.responses.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ResponseError> {
        self.responses.iter().filter_map(|response| match response {
            ServiceResponse::Error(error) => Some(error),
            _ => None,
        })
    }

    /// The values of all responses, or the first error.
    pub fn into_results(self) -> Result<Vec<T>, Error> {
        self.responses
            .into_iter()
            .map(ServiceResponse::into_result)
            .collect()
    }

    /// The value of the only response in the collection.
    pub fn into_single(self) -> Result<T, Error> {
        let count = self.responses.len();
        let mut responses = self.responses.into_iter();

        match (responses.next(), responses.next()) {
            (Some(response), None) => response.into_result(),
            _ => Err(Error::UnexpectedXml(format!(
                "expected exactly one response message, got {count}"
            ))),
        }
    }
}

impl<T> FromIterator<ServiceResponse<T>> for ServiceResponseCollection<T> {
    fn from_iter<I: IntoIterator<Item = ServiceResponse<T>>>(iter: I) -> Self {
        Self {
            responses: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for ServiceResponseCollection<T> {
    type Item = ServiceResponse<T>;
    type IntoIter = std::vec::IntoIter<ServiceResponse<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ServiceResponseCollection<T> {
    type Item = &'a ServiceResponse<T>;
    type IntoIter = std::slice::Iter<'a, ServiceResponse<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

/// Reads the response messages of an operation response element, e.g.
/// `m:GetItemResponse`, parsing the payload of successful messages with
/// `parse`.
pub(crate) fn parse_response_messages<T, F>(
    response: &XmlNode,
    operation: &str,
    mut parse: F,
) -> Result<ServiceResponseCollection<T>, Error>
where
    F: FnMut(&XmlNode) -> Result<T, Error>,
{
    let expected_name = format!("{operation}Response");
    if response.name != expected_name {
        return Err(Error::UnexpectedXml(format!(
            "expected `{expected_name}` in response body, got `{}`",
            response.name
        )));
    }

    let messages = response.required_child("ResponseMessages")?;

    messages
        .children
        .iter()
        .map(|message| {
            let class: ServiceResult = message
                .required_attribute("ResponseClass")?
                .parse()
                .map_err(|_| {
                    Error::UnexpectedXml(format!(
                        "invalid response class in `{}`",
                        message.name
                    ))
                })?;

            let response = match class {
                ServiceResult::Success => ServiceResponse::Success(parse(message)?),
                ServiceResult::Warning => {
                    let warning = ResponseError::from_message(message)?;
                    log::warn!("{operation} returned a warning: {warning}");

                    ServiceResponse::Warning {
                        value: parse(message)?,
                        warning,
                    }
                }
                ServiceResult::Error => {
                    let error = ResponseError::from_message(message)?;
                    log::debug!("{operation} returned an error: {error}");

                    ServiceResponse::Error(error)
                }
            };

            Ok(response)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::parse;

    const BATCH: &str = r#"<m:DeleteItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
  <m:ResponseMessages>
    <m:DeleteItemResponseMessage ResponseClass="Success">
      <m:ResponseCode>NoError</m:ResponseCode>
    </m:DeleteItemResponseMessage>
    <m:DeleteItemResponseMessage ResponseClass="Error">
      <m:MessageText>The specified object was not found in the store.</m:MessageText>
      <m:ResponseCode>ErrorItemNotFound</m:ResponseCode>
      <m:DescriptiveLinkKey>0</m:DescriptiveLinkKey>
    </m:DeleteItemResponseMessage>
    <m:DeleteItemResponseMessage ResponseClass="Error">
      <m:MessageText>The server cannot service this request right now. Try again later.</m:MessageText>
      <m:ResponseCode>ErrorServerBusy</m:ResponseCode>
      <m:DescriptiveLinkKey>0</m:DescriptiveLinkKey>
      <m:MessageXml>
        <t:Value Name="BackOffMilliseconds">5000</t:Value>
      </m:MessageXml>
    </m:DeleteItemResponseMessage>
  </m:ResponseMessages>
</m:DeleteItemResponse>"#;

    #[test]
    fn batch_results_keep_request_order() {
        let collection = parse_response_messages(&parse(BATCH), "DeleteItem", |_| Ok(()))
            .expect("response should parse");

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.overall_result(), ServiceResult::Error);
        assert_eq!(
            collection.get(0).map(ServiceResponse::result),
            Some(ServiceResult::Success)
        );

        let codes: Vec<_> = collection
            .errors()
            .map(|error| error.response_code.clone())
            .collect();
        assert_eq!(
            codes,
            vec![ResponseCode::ErrorItemNotFound, ResponseCode::ErrorServerBusy]
        );
        assert_eq!(
            collection.errors().last().and_then(ResponseError::back_off),
            Some(Duration::from_millis(5000))
        );
    }

    #[test]
    fn first_error_wins_when_collecting_values() {
        let collection = parse_response_messages(&parse(BATCH), "DeleteItem", |_| Ok(()))
            .expect("response should parse");

        match collection.into_results() {
            Err(Error::Response(error)) => {
                assert_eq!(error.response_code, ResponseCode::ErrorItemNotFound)
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn server_busy_messages_become_server_busy_errors() {
        let error = ResponseError {
            response_code: ResponseCode::ErrorServerBusy,
            details: vec![("BackOffMilliseconds".to_string(), "25".to_string())],
            ..Default::default()
        };

        match ServiceResponse::<()>::Error(error).into_result() {
            Err(Error::ServerBusy { back_off, .. }) => {
                assert_eq!(back_off, Some(Duration::from_millis(25)))
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn warnings_are_successful_with_details() {
        let document = r#"<GetItemResponse><ResponseMessages>
            <GetItemResponseMessage ResponseClass="Warning">
              <MessageText>Partial result.</MessageText>
              <ResponseCode>ErrorBatchProcessingStopped</ResponseCode>
              <MessageXml><FieldURI FieldURI="item:Subject"/></MessageXml>
            </GetItemResponseMessage>
        </ResponseMessages></GetItemResponse>"#;

        let collection = parse_response_messages(&parse(document), "GetItem", |_| Ok(42))
            .expect("response should parse");

        assert_eq!(collection.overall_result(), ServiceResult::Warning);
        let response = collection.get(0).expect("one response");
        assert_eq!(response.value(), Some(&42));
        assert_eq!(
            response.error().map(|warning| warning.property_paths.clone()),
            Some(vec!["item:Subject".to_string()])
        );
        assert_eq!(collection.into_single().unwrap(), 42);
    }

    #[test]
    fn mismatched_response_element_is_rejected() {
        assert!(matches!(
            parse_response_messages(&parse(BATCH), "GetItem", |_| Ok(())),
            Err(Error::UnexpectedXml(_))
        ));
    }
}
