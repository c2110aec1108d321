/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{fmt, io::Write};

use xml::{writer::XmlEvent, EventWriter};

use crate::{
    credentials::{WSA_NS_URI, WSSE_NS_URI},
    operations::Operation,
    response::ResponseError,
    timezone::TimeZoneDefinition,
    types::{ExchangeVersion, ResponseCode, ServerVersionInfo},
    xml::{
        document_writer, write_element, XmlElement, XmlNode, MESSAGES_NS_URI,
        SOAP_NS_URI, TYPES_NS_URI,
    },
    Error,
};

/// A SOAP fault returned in place of a response body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoapFault {
    pub fault_code: String,
    pub fault_string: String,
    pub fault_actor: Option<String>,

    /// The EWS error details, present when the fault was raised by EWS itself
    /// rather than by the SOAP stack.
    pub error: Option<ResponseError>,
}

impl SoapFault {
    pub(crate) fn from_xml(fault: &XmlNode) -> Result<Self, Error> {
        // SOAP 1.2 faults nest the code and reason one level deeper.
        let fault_code = fault
            .child_text("faultcode")
            .or_else(|| fault.child("Code").and_then(|code| code.child_text("Value")))
            .unwrap_or_default()
            .trim()
            .to_string();
        let fault_string = fault
            .child_text("faultstring")
            .or_else(|| fault.child("Reason").and_then(|reason| reason.child_text("Text")))
            .unwrap_or_default()
            .trim()
            .to_string();

        let error = match fault.child("detail").or_else(|| fault.child("Detail")) {
            Some(detail) => Self::error_from_detail(detail)?,
            None => None,
        };

        Ok(Self {
            fault_code,
            fault_string,
            fault_actor: fault.child_text("faultactor").map(str::to_string),
            error,
        })
    }

    fn error_from_detail(detail: &XmlNode) -> Result<Option<ResponseError>, Error> {
        let Some(code) = detail.child("ResponseCode") else {
            return Ok(None);
        };

        let mut error = ResponseError {
            response_code: code.parse_text()?,
            message_text: detail.child_text("Message").map(str::to_string),
            ..Default::default()
        };

        if let Some(message_xml) = detail.child("MessageXml") {
            error.read_message_xml(message_xml);
        }

        Ok(Some(error))
    }

    pub fn response_code(&self) -> Option<&ResponseCode> {
        self.error.as_ref().map(|error| &error.response_code)
    }
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.fault_string, self.fault_code)?;

        if let Some(error) = &self.error {
            write!(f, ": {error}")?;
        }

        Ok(())
    }
}

impl From<SoapFault> for Error {
    fn from(fault: SoapFault) -> Self {
        match fault.error {
            Some(error) if error.response_code == ResponseCode::ErrorServerBusy => {
                Error::ServerBusy {
                    back_off: error.back_off(),
                    error: Box::new(error),
                }
            }

            _ => Error::RequestFault(Box::new(fault)),
        }
    }
}

/// The identity of the user to impersonate.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/connectingsid>.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
#[xml_serialize(ns_prefix = "t")]
pub enum ConnectingSid {
    PrincipalName(String),
    PrimarySmtpAddress(String),
    SmtpAddress(String),
}

#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
pub struct ImpersonatedUserId {
    #[xml_serialize(ns_prefix = "t", rename = "ConnectingSID")]
    pub connecting_sid: ConnectingSid,
}

impl ImpersonatedUserId {
    pub fn smtp_address(address: impl Into<String>) -> Self {
        Self {
            connecting_sid: ConnectingSid::PrimarySmtpAddress(address.into()),
        }
    }
}

#[derive(XmlElement)]
struct RequestServerVersion {
    #[xml_serialize(is_attribute)]
    version: ExchangeVersion,
}

/// WS-Addressing and WS-Security headers for token-based credentials.
pub(crate) struct SecurityHeader<'a> {
    pub to: &'a str,
    pub token: &'a XmlNode,
}

/// The header content of a request envelope.
pub(crate) struct RequestHeaders<'a> {
    pub version: ExchangeVersion,
    pub time_zone: Option<&'a TimeZoneDefinition>,
    pub impersonation: Option<&'a ImpersonatedUserId>,
    pub security: Option<SecurityHeader<'a>>,
}

impl<'a> RequestHeaders<'a> {
    pub fn new(version: ExchangeVersion) -> Self {
        Self {
            version,
            time_zone: None,
            impersonation: None,
            security: None,
        }
    }
}

/// Writes the complete SOAP request document for an operation.
pub(crate) fn write_request<O: Operation>(
    operation: &O,
    headers: &RequestHeaders<'_>,
) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    let mut writer = document_writer(&mut buf);

    write_element(
        &mut writer,
        "soap:Envelope",
        &[
            (Some("soap"), SOAP_NS_URI),
            (Some("t"), TYPES_NS_URI),
            (Some("m"), MESSAGES_NS_URI),
        ],
        &[],
        |writer| {
            write_element(writer, "soap:Header", &[], &[], |writer| {
                write_headers(writer, O::NAME, headers)
            })?;

            write_element(writer, "soap:Body", &[], &[], |writer| {
                operation.write_body(writer)
            })
        },
    )?;

    Ok(buf)
}

fn write_headers<W: Write>(
    writer: &mut EventWriter<W>,
    operation_name: &str,
    headers: &RequestHeaders<'_>,
) -> crate::xml::WriteResult {
    RequestServerVersion {
        version: headers.version,
    }
    .write_as_element(writer, "t:RequestServerVersion")?;

    // Time zone context was only introduced with Exchange 2010.
    if let Some(time_zone) = headers.time_zone {
        if headers.version >= ExchangeVersion::Exchange2010 {
            write_element(writer, "t:TimeZoneContext", &[], &[], |writer| {
                time_zone.write_as_element(writer, "t:TimeZoneDefinition")
            })?;
        }
    }

    if let Some(impersonation) = headers.impersonation {
        impersonation.write_as_element(writer, "t:ExchangeImpersonation")?;
    }

    if let Some(security) = &headers.security {
        let action = format!("{MESSAGES_NS_URI}/{operation_name}");

        write_element(writer, "wsa:Action", &[(Some("wsa"), WSA_NS_URI)], &[], |writer| {
            writer.write(XmlEvent::characters(&action))
        })?;
        write_element(writer, "wsa:To", &[(Some("wsa"), WSA_NS_URI)], &[], |writer| {
            writer.write(XmlEvent::characters(security.to))
        })?;
        write_element(
            writer,
            "wsse:Security",
            &[(Some("wsse"), WSSE_NS_URI)],
            &[],
            |writer| security.token.write_to(writer),
        )?;
    }

    Ok(())
}

/// The useful parts of a response envelope.
#[derive(Debug)]
pub(crate) struct SoapResponse {
    pub server_version: Option<ServerVersionInfo>,

    /// The first element of the SOAP body, e.g. `m:GetItemResponse`.
    pub body: XmlNode,
}

/// Parses a response envelope, turning a SOAP fault into an error.
pub(crate) fn parse_response(document: &[u8]) -> Result<SoapResponse, Error> {
    let envelope = XmlNode::parse(document)?;
    if envelope.name != "Envelope" {
        return Err(Error::UnexpectedXml(format!(
            "expected a SOAP envelope, got `{}`",
            envelope.name
        )));
    }

    let server_version = envelope
        .child("Header")
        .and_then(|header| header.child("ServerVersionInfo"))
        .map(ServerVersionInfo::from_xml)
        .transpose()?;

    let body = envelope
        .required_child("Body")?
        .children
        .first()
        .ok_or_else(|| Error::UnexpectedXml("SOAP body is empty".to_string()))?;

    if body.name == "Fault" {
        let fault = SoapFault::from_xml(body)?;
        log::debug!("request failed with SOAP fault: {fault}");

        return Err(fault.into());
    }

    Ok(SoapResponse {
        server_version,
        body: body.clone(),
    })
}

/// Writes a standalone SOAP 1.1 envelope with a body built by `write_body`,
/// used for replies to push notifications.
pub(crate) fn write_envelope<F>(write_body: F) -> Result<Vec<u8>, Error>
where
    F: FnOnce(&mut EventWriter<&mut Vec<u8>>) -> crate::xml::WriteResult,
{
    let mut buf = Vec::new();
    let mut writer = document_writer(&mut buf);

    write_element(
        &mut writer,
        "soap:Envelope",
        &[
            (Some("soap"), SOAP_NS_URI),
            (Some("t"), TYPES_NS_URI),
            (Some("m"), MESSAGES_NS_URI),
        ],
        &[],
        |writer| write_element(writer, "soap:Body", &[], &[], write_body),
    )?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::soap_envelope;

    const SCHEMA_FAULT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode xmlns:a="http://schemas.microsoft.com/exchange/services/2006/types">a:ErrorSchemaValidation</faultcode>
      <faultstring xml:lang="en-US">The request failed schema validation: The 'Id' attribute is invalid.</faultstring>
      <detail>
        <e:ResponseCode xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">ErrorSchemaValidation</e:ResponseCode>
        <e:Message xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">The request failed schema validation.</e:Message>
        <t:MessageXml xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
          <t:LineNumber>2</t:LineNumber>
          <t:LinePosition>630</t:LinePosition>
          <t:Violation>The 'Id' attribute is invalid.</t:Violation>
        </t:MessageXml>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

    const BUSY_FAULT: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode xmlns:a="http://schemas.microsoft.com/exchange/services/2006/types">a:ErrorServerBusy</faultcode>
      <faultstring>The server cannot service this request right now. Try again later.</faultstring>
      <detail>
        <e:ResponseCode xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">ErrorServerBusy</e:ResponseCode>
        <e:Message xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">The server cannot service this request right now. Try again later.</e:Message>
        <t:MessageXml xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
          <t:Value Name="BackOffMilliseconds">297749</t:Value>
        </t:MessageXml>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn schema_faults_become_request_faults() {
        match parse_response(SCHEMA_FAULT.as_bytes()) {
            Err(Error::RequestFault(fault)) => {
                assert_eq!(fault.fault_code, "a:ErrorSchemaValidation");
                assert_eq!(
                    fault.response_code(),
                    Some(&ResponseCode::ErrorSchemaValidation)
                );

                let error = fault.error.as_ref().expect("fault should carry details");
                assert_eq!(error.detail("LineNumber"), Some("2"));
                assert_eq!(
                    error.detail("Violation"),
                    Some("The 'Id' attribute is invalid.")
                );
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn busy_faults_carry_the_back_off_hint() {
        let error = parse_response(BUSY_FAULT.as_bytes()).expect_err("fault should be an error");

        match &error {
            Error::ServerBusy { back_off, .. } => {
                assert_eq!(*back_off, Some(Duration::from_millis(297749)))
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(error.response_code(), Some(&ResponseCode::ErrorServerBusy));
    }

    #[test]
    fn responses_expose_body_and_server_version() {
        let document = soap_envelope(
            r#"<m:GetItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"><m:ResponseMessages/></m:GetItemResponse>"#,
        );

        let response = parse_response(document.as_bytes()).expect("response should parse");
        assert_eq!(response.body.name, "GetItemResponse");
        assert_eq!(
            response.server_version.map(|info| info.major_version),
            Some(15)
        );
    }

    #[test]
    fn request_headers() {
        let operation = crate::operations::Unsubscribe {
            subscription_id: "SUB1".to_string(),
        };
        let impersonation = ImpersonatedUserId::smtp_address("boss@example.com");
        let token = XmlNode::new("BinarySecurityToken");
        let time_zone = TimeZoneDefinition::utc();

        let headers = RequestHeaders {
            time_zone: Some(&time_zone),
            impersonation: Some(&impersonation),
            security: Some(SecurityHeader {
                to: "https://mail.example.com/EWS/Exchange.asmx",
                token: &token,
            }),
            ..RequestHeaders::new(ExchangeVersion::Exchange2007_SP1)
        };

        let request = write_request(&operation, &headers).unwrap();
        let envelope = XmlNode::parse(&request).unwrap();
        let header = envelope.required_child("Header").unwrap();

        let version = header.required_child("RequestServerVersion").unwrap();
        assert_eq!(version.attribute("Version"), Some("Exchange2007_SP1"));

        // Not understood by Exchange 2007.
        assert!(header.child("TimeZoneContext").is_none());

        let sid = header
            .find_descendant("PrimarySmtpAddress")
            .map(|sid| sid.text.as_str());
        assert_eq!(sid, Some("boss@example.com"));

        assert_eq!(
            header.child_text("Action"),
            Some("http://schemas.microsoft.com/exchange/services/2006/messages/Unsubscribe")
        );
        assert_eq!(
            header.child_text("To"),
            Some("https://mail.example.com/EWS/Exchange.asmx")
        );
        assert!(header
            .required_child("Security")
            .unwrap()
            .child("BinarySecurityToken")
            .is_some());

        let body = &envelope.required_child("Body").unwrap().children[0];
        assert_eq!(body.name, "Unsubscribe");
        assert_eq!(body.namespace.as_deref(), Some(MESSAGES_NS_URI));
        assert_eq!(body.child_text("SubscriptionId"), Some("SUB1"));
    }

    #[test]
    fn non_envelopes_are_rejected() {
        assert!(matches!(
            parse_response(b"<html><body>Gateway Timeout</body></html>"),
            Err(Error::UnexpectedXml(_))
        ));
    }
}
