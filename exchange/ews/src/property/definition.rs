/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{borrow::Cow, fmt, io::Write};

use xml::EventWriter;

use crate::{
    types::ExchangeVersion,
    xml::{write_element, WriteResult, XmlElement},
};

/// What can be done with a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    pub const NONE: Self = Self(0);

    /// The property may be set on a new object.
    pub const CAN_SET: Self = Self(1);

    /// The property may be changed on an existing object.
    pub const CAN_UPDATE: Self = Self(1 << 1);

    /// The property may be removed from an existing object.
    pub const CAN_DELETE: Self = Self(1 << 2);

    /// The property is returned by `FindItem`.
    pub const CAN_FIND: Self = Self(1 << 3);

    /// The property is only returned when explicitly requested.
    pub const MUST_BE_EXPLICITLY_LOADED: Self = Self(1 << 4);

    /// Reading an unset property creates an empty value, e.g. an empty
    /// recipient list.
    pub const AUTO_INSTANTIATE_ON_READ: Self = Self(1 << 5);

    /// `CAN_SET | CAN_UPDATE | CAN_FIND`, the common case.
    pub const EDITABLE: Self = Self(Self::CAN_SET.0 | Self::CAN_UPDATE.0 | Self::CAN_FIND.0);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for PropertyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// The type of value a property holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    String,
    Boolean,
    Integer,
    Double,
    DateTime,

    /// An enumeration, stored as its wire name.
    Enum,
    ItemId,
    FolderId,
    Body,
    StringList,
    EmailAddress,
    EmailAddressList,
    Attachments,
    Recurrence,
}

/// A schema-defined property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyDefinition {
    /// The local name of the element holding the property.
    pub name: &'static str,

    /// The path identifying the property in `FieldURI` elements, e.g.
    /// `item:Subject`.
    pub uri: &'static str,
    pub kind: PropertyKind,
    pub flags: PropertyFlags,

    /// The first server version supporting the property.
    pub version: ExchangeVersion,
}

impl PropertyDefinition {
    pub const fn new(
        name: &'static str,
        uri: &'static str,
        kind: PropertyKind,
        flags: PropertyFlags,
    ) -> Self {
        Self::since(name, uri, kind, flags, ExchangeVersion::Exchange2007_SP1)
    }

    pub const fn since(
        name: &'static str,
        uri: &'static str,
        kind: PropertyKind,
        flags: PropertyFlags,
        version: ExchangeVersion,
    ) -> Self {
        Self {
            name,
            uri,
            kind,
            flags,
            version,
        }
    }

    pub fn has_flag(&self, flag: PropertyFlags) -> bool {
        self.flags.contains(flag)
    }
}

impl fmt::Display for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri)
    }
}

/// A definition is written as the `t:FieldURI` path element referring to it.
impl XmlElement for PropertyDefinition {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        write_element(
            writer,
            "t:FieldURI",
            &[],
            &[("FieldURI", Cow::Borrowed(self.uri))],
            |_| Ok(()),
        )
    }
}
