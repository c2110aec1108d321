/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString};

use crate::{
    xml::{XmlAttribute, XmlNode},
    Error,
};

/// The schema version requested from the server.
///
/// Versions are ordered, so `version >= ExchangeVersion::Exchange2010` checks
/// for feature availability.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/requestserverversion>.
#[allow(non_camel_case_types)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Deserialize,
    XmlAttribute,
)]
pub enum ExchangeVersion {
    Exchange2007_SP1,
    Exchange2010,
    Exchange2010_SP1,
    Exchange2010_SP2,
    Exchange2013,
    #[default]
    Exchange2013_SP1,
}

/// The version of the server which handled a request, as reported in the
/// response header.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/serverversioninfo>.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerVersionInfo {
    pub major_version: u32,
    pub minor_version: u32,
    pub major_build_number: u32,
    pub minor_build_number: u32,
    pub version: Option<String>,
}

impl ServerVersionInfo {
    pub(crate) fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        let number = |name: &str| -> Result<u32, Error> {
            match node.attribute(name) {
                Some(value) => value.parse().map_err(|_| {
                    Error::UnexpectedXml(format!("invalid server version component `{value}`"))
                }),
                None => Ok(0),
            }
        };

        Ok(Self {
            major_version: number("MajorVersion")?,
            minor_version: number("MinorVersion")?,
            major_build_number: number("MajorBuildNumber")?,
            minor_build_number: number("MinorBuildNumber")?,
            version: node.attribute("Version").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_ordered() {
        assert!(ExchangeVersion::Exchange2007_SP1 < ExchangeVersion::Exchange2010);
        assert!(ExchangeVersion::Exchange2010_SP2 < ExchangeVersion::Exchange2013);
        assert_eq!(ExchangeVersion::default(), ExchangeVersion::Exchange2013_SP1);
        assert_eq!(
            "Exchange2010_SP1".parse::<ExchangeVersion>(),
            Ok(ExchangeVersion::Exchange2010_SP1)
        );
    }

    #[test]
    fn server_version_info_reads_attributes() {
        let node = XmlNode::parse(
            br#"<h:ServerVersionInfo xmlns:h="urn:h" MajorVersion="15" MinorVersion="20"
                MajorBuildNumber="7228" MinorBuildNumber="17" Version="V2018_01_08"/>"#,
        )
        .unwrap();

        let info = ServerVersionInfo::from_xml(&node).unwrap();
        assert_eq!(info.major_version, 15);
        assert_eq!(info.minor_build_number, 17);
        assert_eq!(info.version.as_deref(), Some("V2018_01_08"));
    }
}
