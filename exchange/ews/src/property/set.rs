/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::io::Write;

use xml::EventWriter;

use super::{schema::item, PropertyDefinition, PropertyFlags, Schema};
use crate::{
    types::{BaseShape, BodyType, ExchangeVersion},
    xml::{WriteResult, XmlElement},
    Error,
};

/// The properties to request when loading items.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertySet {
    pub base_shape: BaseShape,
    pub additional_properties: Vec<&'static PropertyDefinition>,
    pub body_type: Option<BodyType>,
}

impl PropertySet {
    pub fn new(base_shape: BaseShape) -> Self {
        Self {
            base_shape,
            additional_properties: Vec::new(),
            body_type: None,
        }
    }

    pub fn id_only() -> Self {
        Self::new(BaseShape::IdOnly)
    }

    /// Every property of the item's schema, except for those which must be
    /// requested explicitly.
    pub fn first_class_properties() -> Self {
        Self::new(BaseShape::AllProperties)
    }

    pub fn with(mut self, definition: &'static PropertyDefinition) -> Self {
        if !self.additional_properties.contains(&definition) {
            self.additional_properties.push(definition);
        }

        self
    }

    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = Some(body_type);
        self
    }

    /// Checks that the requested properties are supported by `version` and,
    /// for `FindItem`, can be returned by a search.
    pub fn validate(&self, version: ExchangeVersion, for_find: bool) -> Result<(), Error> {
        for definition in &self.additional_properties {
            if definition.version > version {
                return Err(Error::Version {
                    feature: format!("property `{definition}`"),
                    required: definition.version,
                    actual: version,
                });
            }

            if for_find && !definition.has_flag(PropertyFlags::CAN_FIND) {
                return Err(Error::Validation(format!(
                    "property `{definition}` cannot be requested from FindItem"
                )));
            }
        }

        Ok(())
    }

    /// The properties of `schema` whose absence in a response means that the
    /// item has no value for them.
    pub fn requested(&self, schema: &Schema, for_find: bool) -> Vec<&'static PropertyDefinition> {
        let mut requested: Vec<&'static PropertyDefinition> = match self.base_shape {
            BaseShape::AllProperties => schema
                .iter()
                .filter(|definition| {
                    !definition.has_flag(PropertyFlags::MUST_BE_EXPLICITLY_LOADED)
                        && (!for_find || definition.has_flag(PropertyFlags::CAN_FIND))
                })
                .collect(),
            BaseShape::IdOnly | BaseShape::Default => vec![&item::ITEM_ID],
        };

        for definition in &self.additional_properties {
            if schema.contains(definition) && !requested.contains(definition) {
                requested.push(definition);
            }
        }

        requested
    }
}

impl Default for PropertySet {
    fn default() -> Self {
        Self::first_class_properties()
    }
}

/// Written as the content of an `ItemShape` element.
impl XmlElement for PropertySet {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        self.base_shape.write_as_element(writer, "t:BaseShape")?;
        self.body_type.write_as_element(writer, "t:BodyType")?;

        if !self.additional_properties.is_empty() {
            self.additional_properties
                .write_as_element(writer, "t:AdditionalProperties")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        property::schema::{task, ITEM_SCHEMA, TASK_SCHEMA},
        test_utils::write_fragment,
    };

    #[test]
    fn written_as_item_shape() {
        let set = PropertySet::id_only()
            .with(&item::SUBJECT)
            .with(&task::STATUS)
            .with(&item::SUBJECT)
            .with_body_type(BodyType::Text);

        let node = write_fragment(|writer| set.write_as_element(writer, "m:ItemShape"));

        assert_eq!(node.child_text("BaseShape"), Some("IdOnly"));
        assert_eq!(node.child_text("BodyType"), Some("Text"));

        let paths: Vec<_> = node
            .required_child("AdditionalProperties")
            .unwrap()
            .children_named("FieldURI")
            .filter_map(|path| path.attribute("FieldURI"))
            .collect();
        assert_eq!(paths, vec!["item:Subject", "task:Status"]);
    }

    #[test]
    fn requested_properties_depend_on_the_shape() {
        let id_only = PropertySet::id_only().with(&task::STATUS);
        assert_eq!(
            id_only.requested(&TASK_SCHEMA, false),
            vec![&item::ITEM_ID, &task::STATUS]
        );
        assert_eq!(id_only.requested(&ITEM_SCHEMA, false), vec![&item::ITEM_ID]);

        let all = PropertySet::first_class_properties().requested(&TASK_SCHEMA, false);
        assert!(all.contains(&&task::RECURRENCE));
        assert!(!all.contains(&&item::UNIQUE_BODY));

        let found = PropertySet::first_class_properties().requested(&TASK_SCHEMA, true);
        assert!(found.contains(&&item::SUBJECT));
        assert!(!found.contains(&&item::BODY));
    }

    #[test]
    fn validation() {
        let set = PropertySet::id_only().with(&item::UNIQUE_BODY);
        assert!(matches!(
            set.validate(ExchangeVersion::Exchange2007_SP1, false),
            Err(Error::Version { .. })
        ));
        assert!(matches!(
            set.validate(ExchangeVersion::Exchange2013, true),
            Err(Error::Validation(_))
        ));
        assert!(set.validate(ExchangeVersion::Exchange2013, false).is_ok());
    }
}
