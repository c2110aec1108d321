/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{
    collections::{HashMap, HashSet},
    io::Write,
    str::FromStr,
};

use xml::EventWriter;

use super::{PropertyDefinition, PropertyFlags, PropertyKind, PropertyValue, Schema};
use crate::{
    recurrence::Recurrence,
    types::{DateTime, EmailAddress, ExchangeVersion, FolderId, ItemId, MessageBody},
    xml::{write_element, WriteResult, XmlElement, XmlNode},
    Error,
};

macro_rules! typed_getter {
    ($(#[$meta:meta])* $name:ident, $variant:ident, ref $ty:ty) => {
        $(#[$meta])*
        pub fn $name(&self, definition: &'static PropertyDefinition) -> Result<Option<&$ty>, Error> {
            match self.get(definition)? {
                Some(PropertyValue::$variant(value)) => Ok(Some(value)),
                Some(_) => Err(Error::PropertyType(definition.name)),
                None => Ok(None),
            }
        }
    };

    ($(#[$meta:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $name(&self, definition: &'static PropertyDefinition) -> Result<Option<$ty>, Error> {
            match self.get(definition)? {
                Some(PropertyValue::$variant(value)) => Ok(Some(*value)),
                Some(_) => Err(Error::PropertyType(definition.name)),
                None => Ok(None),
            }
        }
    };
}

/// The property values of a service object, with the bookkeeping needed to
/// tell apart properties which were never loaded, properties the server
/// returned without a value and properties changed locally.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyBag {
    schema: &'static Schema,

    /// Values keyed by field URI.
    values: HashMap<&'static str, PropertyValue>,
    loaded: HashSet<&'static str>,
    changed: Vec<&'static PropertyDefinition>,
    deleted: Vec<&'static PropertyDefinition>,
    is_new: bool,
}

impl PropertyBag {
    /// Creates the bag of an object which does not exist on the server yet.
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            values: HashMap::new(),
            loaded: HashSet::new(),
            changed: Vec::new(),
            deleted: Vec::new(),
            is_new: true,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Whether the owner has not been saved to (or loaded from) the server.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_loaded(&self, definition: &PropertyDefinition) -> bool {
        self.loaded.contains(definition.uri)
    }

    pub fn contains(&self, definition: &PropertyDefinition) -> bool {
        self.values.contains_key(definition.uri)
    }

    fn check_schema(&self, definition: &PropertyDefinition) -> Result<(), Error> {
        if self.schema.contains(definition) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "property `{definition}` is not part of the {} schema",
                self.schema.name
            )))
        }
    }

    /// Gets the value of a property.
    ///
    /// Returns `Ok(None)` when the property has no value, which is only known
    /// for new objects and for properties which were requested from the
    /// server. Any other property fails with [`Error::PropertyNotLoaded`].
    pub fn get(&self, definition: &'static PropertyDefinition) -> Result<Option<&PropertyValue>, Error> {
        self.check_schema(definition)?;

        match self.values.get(definition.uri) {
            Some(value) => Ok(Some(value)),
            None if self.is_new || self.is_loaded(definition) => Ok(None),
            None => Err(Error::PropertyNotLoaded(definition.name)),
        }
    }

    pub fn get_string(&self, definition: &'static PropertyDefinition) -> Result<Option<&str>, Error> {
        match self.get(definition)? {
            Some(PropertyValue::String(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(Error::PropertyType(definition.name)),
            None => Ok(None),
        }
    }

    typed_getter!(get_bool, Boolean, bool);
    typed_getter!(get_integer, Integer, i64);
    typed_getter!(get_double, Double, f64);
    typed_getter!(get_date_time, DateTime, DateTime);
    typed_getter!(get_item_id, ItemId, ref ItemId);
    typed_getter!(get_folder_id, FolderId, ref FolderId);
    typed_getter!(get_body, Body, ref MessageBody);
    typed_getter!(get_string_list, StringList, ref Vec<String>);
    typed_getter!(get_email_address, EmailAddress, ref EmailAddress);
    typed_getter!(get_email_addresses, EmailAddressList, ref Vec<EmailAddress>);
    typed_getter!(get_recurrence, Recurrence, ref Recurrence);

    /// Gets an enumeration property parsed into `T`.
    pub fn get_enum<T: FromStr>(&self, definition: &'static PropertyDefinition) -> Result<Option<T>, Error> {
        match self.get(definition)? {
            Some(PropertyValue::Enum(value)) => value.parse().map(Some).map_err(|_| {
                Error::UnexpectedXml(format!("invalid value `{value}` for property `{definition}`"))
            }),
            Some(_) => Err(Error::PropertyType(definition.name)),
            None => Ok(None),
        }
    }

    fn check_can_change(&self, definition: &'static PropertyDefinition) -> Result<(), Error> {
        if self.is_new && !definition.has_flag(PropertyFlags::CAN_SET) {
            return Err(Error::PropertyNotSettable(definition.name));
        }
        if !self.is_new && !definition.has_flag(PropertyFlags::CAN_UPDATE) {
            return Err(Error::PropertyNotUpdatable(definition.name));
        }

        Ok(())
    }

    fn mark_changed(&mut self, definition: &'static PropertyDefinition) {
        self.deleted.retain(|deleted| deleted.uri != definition.uri);
        if !self.changed.iter().any(|changed| changed.uri == definition.uri) {
            self.changed.push(definition);
        }
    }

    /// Sets the value of a property, recording the change.
    pub fn set(
        &mut self,
        definition: &'static PropertyDefinition,
        value: impl Into<PropertyValue>,
    ) -> Result<(), Error> {
        self.check_schema(definition)?;

        let value = value.into();
        if value.kind() != definition.kind {
            return Err(Error::PropertyType(definition.name));
        }
        self.check_can_change(definition)?;

        self.values.insert(definition.uri, value);
        self.mark_changed(definition);

        Ok(())
    }

    /// Removes the value of a property. On existing objects this records a
    /// deletion sent with the next update.
    pub fn delete(&mut self, definition: &'static PropertyDefinition) -> Result<(), Error> {
        self.check_schema(definition)?;

        if !self.is_new && !definition.has_flag(PropertyFlags::CAN_DELETE) {
            return Err(Error::PropertyNotDeletable(definition.name));
        }

        self.values.remove(definition.uri);
        self.changed.retain(|changed| changed.uri != definition.uri);

        if !self.is_new && !self.deleted.iter().any(|deleted| deleted.uri == definition.uri) {
            self.deleted.push(definition);
        }

        Ok(())
    }

    /// Gets mutable access to a collection property, creating an empty value
    /// for properties which are instantiated on read.
    ///
    /// Any access counts as a change, except for attachments which are saved
    /// through their own requests.
    pub fn value_mut(&mut self, definition: &'static PropertyDefinition) -> Result<&mut PropertyValue, Error> {
        self.check_schema(definition)?;

        let tracks_changes = definition.kind != PropertyKind::Attachments;
        if tracks_changes {
            self.check_can_change(definition)?;
        }

        if !self.values.contains_key(definition.uri) {
            let known_absent = self.is_new || self.is_loaded(definition);
            let empty = PropertyValue::empty(definition.kind)
                .filter(|_| definition.has_flag(PropertyFlags::AUTO_INSTANTIATE_ON_READ));

            match empty {
                Some(empty) if known_absent => {
                    self.values.insert(definition.uri, empty);
                }
                Some(_) => return Err(Error::PropertyNotLoaded(definition.name)),
                None => return Err(Error::PropertyType(definition.name)),
            }
        }

        if tracks_changes {
            self.mark_changed(definition);
        }

        self.values
            .get_mut(definition.uri)
            .ok_or(Error::PropertyNotLoaded(definition.name))
    }

    /// Stores a value the server reported, without recording a change.
    pub(crate) fn set_loaded(&mut self, definition: &'static PropertyDefinition, value: PropertyValue) {
        self.values.insert(definition.uri, value);
        self.loaded.insert(definition.uri);
    }

    /// Reads property values from the element representing the owner.
    ///
    /// Known child elements are stored; unknown ones are skipped. Every
    /// definition in `requested` is marked as loaded whether or not the server
    /// returned it. With `clear`, previously loaded values are discarded
    /// first.
    pub fn load_from_xml(
        &mut self,
        node: &XmlNode,
        clear: bool,
        requested: &[&'static PropertyDefinition],
    ) -> Result<(), Error> {
        if clear {
            self.values.clear();
            self.loaded.clear();
        }

        for child in &node.children {
            match self.schema.find_by_name(&child.name) {
                Some(definition) => {
                    let value = PropertyValue::from_xml(definition, child)?;
                    self.values.insert(definition.uri, value);
                    self.loaded.insert(definition.uri);
                }

                None => log::trace!("skipping unknown element `{}` of {}", child.name, node.name),
            }
        }

        for definition in requested {
            self.loaded.insert(definition.uri);
        }

        self.clear_change_log();
        self.is_new = false;

        Ok(())
    }

    /// Takes over the values `other` loaded from the server, replacing local
    /// values and pending changes of the same properties.
    pub(crate) fn merge_loaded(&mut self, mut other: PropertyBag) {
        for uri in other.loaded {
            match other.values.remove(uri) {
                Some(value) => self.values.insert(uri, value),
                None => self.values.remove(uri),
            };

            self.loaded.insert(uri);
            self.changed.retain(|changed| changed.uri != uri);
            self.deleted.retain(|deleted| deleted.uri != uri);
        }
    }

    /// Marks a new object as existing on the server once it has been
    /// created.
    pub(crate) fn mark_saved(&mut self) {
        self.clear_change_log();
        self.is_new = false;
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty() || !self.deleted.is_empty()
    }

    pub fn changed_properties(&self) -> &[&'static PropertyDefinition] {
        &self.changed
    }

    pub fn deleted_properties(&self) -> &[&'static PropertyDefinition] {
        &self.deleted
    }

    pub fn clear_change_log(&mut self) {
        self.changed.clear();
        self.deleted.clear();
    }

    /// Checks that every changed property is supported by `version`.
    pub fn validate_version(&self, version: ExchangeVersion) -> Result<(), Error> {
        match self.changed.iter().find(|definition| definition.version > version) {
            Some(definition) => Err(Error::Version {
                feature: format!("property `{definition}`"),
                required: definition.version,
                actual: version,
            }),
            None => Ok(()),
        }
    }

    /// Writes the values of a new object in schema order.
    pub fn write_for_create<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        for definition in self.schema.iter() {
            if definition.kind == PropertyKind::Attachments {
                continue;
            }

            if let Some(value) = self.values.get(definition.uri) {
                value.write_as(writer, &format!("t:{}", definition.name))?;
            }
        }

        Ok(())
    }

    /// Writes the `SetItemField` and `DeleteItemField` changes of an existing
    /// object, wrapping new values in an element named `element_name`.
    pub fn write_for_update<W: Write>(
        &self,
        writer: &mut EventWriter<W>,
        element_name: &str,
    ) -> WriteResult {
        for definition in self.schema.iter() {
            let is_changed = self.changed.iter().any(|changed| changed.uri == definition.uri);
            let is_deleted = self.deleted.iter().any(|deleted| deleted.uri == definition.uri);

            if is_changed {
                let Some(value) = self.values.get(definition.uri) else {
                    continue;
                };

                write_element(writer, "t:SetItemField", &[], &[], |writer| {
                    definition.write_children(writer)?;
                    write_element(writer, element_name, &[], &[], |writer| {
                        value.write_as(writer, &format!("t:{}", definition.name))
                    })
                })?;
            } else if is_deleted {
                write_element(writer, "t:DeleteItemField", &[], &[], |writer| {
                    definition.write_children(writer)
                })?;
            }
        }

        Ok(())
    }
}
