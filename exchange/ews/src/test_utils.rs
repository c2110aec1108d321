/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use ::xml::{writer::EmitterConfig, EventWriter};

use crate::xml::{
    write_element, WriteResult, XmlNode, MESSAGES_NS_URI, SOAP_NS_URI, TYPES_NS_URI,
};

/// Runs `write` inside a wrapper element declaring the `t`, `m` and `soap`
/// prefixes, then parses the output and returns the first element written.
pub(crate) fn write_fragment<F>(write: F) -> XmlNode
where
    F: FnOnce(&mut EventWriter<&mut Vec<u8>>) -> WriteResult,
{
    let mut buf = Vec::new();
    {
        let mut writer = EmitterConfig::new()
            .write_document_declaration(false)
            .create_writer(&mut buf);

        write_element(
            &mut writer,
            "Fragment",
            &[
                (Some("t"), TYPES_NS_URI),
                (Some("m"), MESSAGES_NS_URI),
                (Some("soap"), SOAP_NS_URI),
            ],
            &[],
            write,
        )
        .expect("writing the fragment should succeed");
    }

    let root = XmlNode::parse(&buf).expect("written XML should be well-formed");
    root.children
        .into_iter()
        .next()
        .expect("the fragment should contain an element")
}

/// Parses a document, panicking on failure.
pub(crate) fn parse(document: &str) -> XmlNode {
    XmlNode::parse(document.as_bytes()).expect("test XML should be well-formed")
}

/// Wraps response messages in a SOAP envelope as the server would.
pub(crate) fn soap_envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Header>
    <h:ServerVersionInfo xmlns:h="http://schemas.microsoft.com/exchange/services/2006/types" MajorVersion="15" MinorVersion="20" MajorBuildNumber="7228" MinorBuildNumber="17" Version="V2018_01_08"/>
  </s:Header>
  <s:Body xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
    {body}
  </s:Body>
</s:Envelope>"#
    )
}
