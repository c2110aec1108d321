/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use super::{PropertyDefinition, PropertyFlags as F, PropertyKind as K};
use crate::types::ExchangeVersion;

/// The properties of one kind of service object, in the order the EWS
/// schema expects them.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub properties: &'static [&'static PropertyDefinition],
}

impl Schema {
    /// Looks a property up by the local name of its element.
    pub fn find_by_name(&self, name: &str) -> Option<&'static PropertyDefinition> {
        self.properties
            .iter()
            .copied()
            .find(|definition| definition.name == name)
    }

    pub fn find_by_uri(&self, uri: &str) -> Option<&'static PropertyDefinition> {
        self.properties
            .iter()
            .copied()
            .find(|definition| definition.uri == uri)
    }

    pub fn contains(&self, definition: &PropertyDefinition) -> bool {
        self.find_by_uri(definition.uri).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static PropertyDefinition> {
        self.properties.iter().copied()
    }
}

const DELETABLE: F = F::EDITABLE.union(F::CAN_DELETE);
const LIST: F = F::CAN_SET
    .union(F::CAN_UPDATE)
    .union(F::CAN_DELETE)
    .union(F::AUTO_INSTANTIATE_ON_READ);

/// Properties common to every item.
pub mod item {
    use super::*;

    pub static ITEM_ID: PropertyDefinition =
        PropertyDefinition::new("ItemId", "item:ItemId", K::ItemId, F::CAN_FIND);
    pub static PARENT_FOLDER_ID: PropertyDefinition = PropertyDefinition::new(
        "ParentFolderId",
        "item:ParentFolderId",
        K::FolderId,
        F::CAN_FIND,
    );
    pub static ITEM_CLASS: PropertyDefinition =
        PropertyDefinition::new("ItemClass", "item:ItemClass", K::String, F::EDITABLE);
    pub static SUBJECT: PropertyDefinition =
        PropertyDefinition::new("Subject", "item:Subject", K::String, DELETABLE);
    pub static SENSITIVITY: PropertyDefinition =
        PropertyDefinition::new("Sensitivity", "item:Sensitivity", K::Enum, F::EDITABLE);
    pub static BODY: PropertyDefinition = PropertyDefinition::new(
        "Body",
        "item:Body",
        K::Body,
        F::CAN_SET.union(F::CAN_UPDATE).union(F::CAN_DELETE),
    );
    pub static ATTACHMENTS: PropertyDefinition = PropertyDefinition::new(
        "Attachments",
        "item:Attachments",
        K::Attachments,
        F::AUTO_INSTANTIATE_ON_READ,
    );
    pub static DATE_TIME_RECEIVED: PropertyDefinition = PropertyDefinition::new(
        "DateTimeReceived",
        "item:DateTimeReceived",
        K::DateTime,
        F::CAN_FIND,
    );
    pub static SIZE: PropertyDefinition =
        PropertyDefinition::new("Size", "item:Size", K::Integer, F::CAN_FIND);
    pub static CATEGORIES: PropertyDefinition = PropertyDefinition::new(
        "Categories",
        "item:Categories",
        K::StringList,
        LIST.union(F::CAN_FIND),
    );
    pub static IMPORTANCE: PropertyDefinition =
        PropertyDefinition::new("Importance", "item:Importance", K::Enum, F::EDITABLE);
    pub static IN_REPLY_TO: PropertyDefinition =
        PropertyDefinition::new("InReplyTo", "item:InReplyTo", K::String, DELETABLE);
    pub static IS_SUBMITTED: PropertyDefinition =
        PropertyDefinition::new("IsSubmitted", "item:IsSubmitted", K::Boolean, F::CAN_FIND);
    pub static IS_DRAFT: PropertyDefinition =
        PropertyDefinition::new("IsDraft", "item:IsDraft", K::Boolean, F::CAN_FIND);
    pub static IS_FROM_ME: PropertyDefinition =
        PropertyDefinition::new("IsFromMe", "item:IsFromMe", K::Boolean, F::CAN_FIND);
    pub static IS_RESEND: PropertyDefinition =
        PropertyDefinition::new("IsResend", "item:IsResend", K::Boolean, F::CAN_FIND);
    pub static IS_UNMODIFIED: PropertyDefinition =
        PropertyDefinition::new("IsUnmodified", "item:IsUnmodified", K::Boolean, F::CAN_FIND);
    pub static DATE_TIME_SENT: PropertyDefinition = PropertyDefinition::new(
        "DateTimeSent",
        "item:DateTimeSent",
        K::DateTime,
        F::CAN_FIND,
    );
    pub static DATE_TIME_CREATED: PropertyDefinition = PropertyDefinition::new(
        "DateTimeCreated",
        "item:DateTimeCreated",
        K::DateTime,
        F::CAN_FIND,
    );
    pub static REMINDER_DUE_BY: PropertyDefinition = PropertyDefinition::new(
        "ReminderDueBy",
        "item:ReminderDueBy",
        K::DateTime,
        F::EDITABLE,
    );
    pub static REMINDER_IS_SET: PropertyDefinition = PropertyDefinition::new(
        "ReminderIsSet",
        "item:ReminderIsSet",
        K::Boolean,
        F::EDITABLE,
    );
    pub static REMINDER_MINUTES_BEFORE_START: PropertyDefinition = PropertyDefinition::new(
        "ReminderMinutesBeforeStart",
        "item:ReminderMinutesBeforeStart",
        K::Integer,
        F::EDITABLE,
    );
    pub static DISPLAY_CC: PropertyDefinition =
        PropertyDefinition::new("DisplayCc", "item:DisplayCc", K::String, F::CAN_FIND);
    pub static DISPLAY_TO: PropertyDefinition =
        PropertyDefinition::new("DisplayTo", "item:DisplayTo", K::String, F::CAN_FIND);
    pub static HAS_ATTACHMENTS: PropertyDefinition = PropertyDefinition::new(
        "HasAttachments",
        "item:HasAttachments",
        K::Boolean,
        F::CAN_FIND,
    );
    pub static CULTURE: PropertyDefinition =
        PropertyDefinition::new("Culture", "item:Culture", K::String, F::EDITABLE);
    pub static LAST_MODIFIED_NAME: PropertyDefinition = PropertyDefinition::since(
        "LastModifiedName",
        "item:LastModifiedName",
        K::String,
        F::CAN_FIND,
        ExchangeVersion::Exchange2010,
    );
    pub static LAST_MODIFIED_TIME: PropertyDefinition = PropertyDefinition::since(
        "LastModifiedTime",
        "item:LastModifiedTime",
        K::DateTime,
        F::CAN_FIND,
        ExchangeVersion::Exchange2010,
    );
    pub static IS_ASSOCIATED: PropertyDefinition = PropertyDefinition::since(
        "IsAssociated",
        "item:IsAssociated",
        K::Boolean,
        F::CAN_SET.union(F::CAN_FIND),
        ExchangeVersion::Exchange2010,
    );
    pub static UNIQUE_BODY: PropertyDefinition = PropertyDefinition::since(
        "UniqueBody",
        "item:UniqueBody",
        K::Body,
        F::MUST_BE_EXPLICITLY_LOADED,
        ExchangeVersion::Exchange2010,
    );
}

/// Properties of email messages.
pub mod message {
    use super::*;

    pub static SENDER: PropertyDefinition =
        PropertyDefinition::new("Sender", "message:Sender", K::EmailAddress, F::EDITABLE);
    pub static TO_RECIPIENTS: PropertyDefinition = PropertyDefinition::new(
        "ToRecipients",
        "message:ToRecipients",
        K::EmailAddressList,
        LIST,
    );
    pub static CC_RECIPIENTS: PropertyDefinition = PropertyDefinition::new(
        "CcRecipients",
        "message:CcRecipients",
        K::EmailAddressList,
        LIST,
    );
    pub static BCC_RECIPIENTS: PropertyDefinition = PropertyDefinition::new(
        "BccRecipients",
        "message:BccRecipients",
        K::EmailAddressList,
        LIST,
    );
    pub static IS_READ_RECEIPT_REQUESTED: PropertyDefinition = PropertyDefinition::new(
        "IsReadReceiptRequested",
        "message:IsReadReceiptRequested",
        K::Boolean,
        F::EDITABLE,
    );
    pub static IS_DELIVERY_RECEIPT_REQUESTED: PropertyDefinition = PropertyDefinition::new(
        "IsDeliveryReceiptRequested",
        "message:IsDeliveryReceiptRequested",
        K::Boolean,
        F::EDITABLE,
    );
    pub static CONVERSATION_TOPIC: PropertyDefinition = PropertyDefinition::new(
        "ConversationTopic",
        "message:ConversationTopic",
        K::String,
        F::CAN_FIND,
    );
    pub static FROM: PropertyDefinition =
        PropertyDefinition::new("From", "message:From", K::EmailAddress, F::EDITABLE);
    pub static INTERNET_MESSAGE_ID: PropertyDefinition = PropertyDefinition::new(
        "InternetMessageId",
        "message:InternetMessageId",
        K::String,
        F::CAN_FIND,
    );
    pub static IS_READ: PropertyDefinition =
        PropertyDefinition::new("IsRead", "message:IsRead", K::Boolean, F::EDITABLE);
    pub static IS_RESPONSE_REQUESTED: PropertyDefinition = PropertyDefinition::new(
        "IsResponseRequested",
        "message:IsResponseRequested",
        K::Boolean,
        F::EDITABLE,
    );
    pub static REFERENCES: PropertyDefinition =
        PropertyDefinition::new("References", "message:References", K::String, F::EDITABLE);
    pub static REPLY_TO: PropertyDefinition = PropertyDefinition::new(
        "ReplyTo",
        "message:ReplyTo",
        K::EmailAddressList,
        LIST,
    );
}

/// Properties of tasks.
pub mod task {
    use super::*;

    pub static ACTUAL_WORK: PropertyDefinition =
        PropertyDefinition::new("ActualWork", "task:ActualWork", K::Integer, DELETABLE);
    pub static ASSIGNED_TIME: PropertyDefinition = PropertyDefinition::new(
        "AssignedTime",
        "task:AssignedTime",
        K::DateTime,
        F::CAN_FIND,
    );
    pub static BILLING_INFORMATION: PropertyDefinition = PropertyDefinition::new(
        "BillingInformation",
        "task:BillingInformation",
        K::String,
        DELETABLE,
    );
    pub static CHANGE_COUNT: PropertyDefinition =
        PropertyDefinition::new("ChangeCount", "task:ChangeCount", K::Integer, F::CAN_FIND);
    pub static COMPANIES: PropertyDefinition = PropertyDefinition::new(
        "Companies",
        "task:Companies",
        K::StringList,
        LIST.union(F::CAN_FIND),
    );
    pub static COMPLETE_DATE: PropertyDefinition = PropertyDefinition::new(
        "CompleteDate",
        "task:CompleteDate",
        K::DateTime,
        F::EDITABLE,
    );
    pub static CONTACTS: PropertyDefinition = PropertyDefinition::new(
        "Contacts",
        "task:Contacts",
        K::StringList,
        LIST.union(F::CAN_FIND),
    );
    pub static DELEGATION_STATE: PropertyDefinition = PropertyDefinition::new(
        "DelegationState",
        "task:DelegationState",
        K::Enum,
        F::CAN_FIND,
    );
    pub static DELEGATOR: PropertyDefinition =
        PropertyDefinition::new("Delegator", "task:Delegator", K::String, F::CAN_FIND);
    pub static DUE_DATE: PropertyDefinition =
        PropertyDefinition::new("DueDate", "task:DueDate", K::DateTime, DELETABLE);
    pub static IS_COMPLETE: PropertyDefinition =
        PropertyDefinition::new("IsComplete", "task:IsComplete", K::Boolean, F::CAN_FIND);
    pub static IS_RECURRING: PropertyDefinition =
        PropertyDefinition::new("IsRecurring", "task:IsRecurring", K::Boolean, F::CAN_FIND);
    pub static IS_TEAM_TASK: PropertyDefinition =
        PropertyDefinition::new("IsTeamTask", "task:IsTeamTask", K::Boolean, F::CAN_FIND);
    pub static MILEAGE: PropertyDefinition =
        PropertyDefinition::new("Mileage", "task:Mileage", K::String, DELETABLE);
    pub static OWNER: PropertyDefinition =
        PropertyDefinition::new("Owner", "task:Owner", K::String, F::CAN_FIND);
    pub static PERCENT_COMPLETE: PropertyDefinition = PropertyDefinition::new(
        "PercentComplete",
        "task:PercentComplete",
        K::Double,
        F::EDITABLE,
    );
    pub static RECURRENCE: PropertyDefinition = PropertyDefinition::new(
        "Recurrence",
        "task:Recurrence",
        K::Recurrence,
        F::CAN_SET.union(F::CAN_UPDATE).union(F::CAN_DELETE),
    );
    pub static START_DATE: PropertyDefinition =
        PropertyDefinition::new("StartDate", "task:StartDate", K::DateTime, DELETABLE);
    pub static STATUS: PropertyDefinition =
        PropertyDefinition::new("Status", "task:Status", K::Enum, F::EDITABLE);
    pub static STATUS_DESCRIPTION: PropertyDefinition = PropertyDefinition::new(
        "StatusDescription",
        "task:StatusDescription",
        K::String,
        F::CAN_FIND,
    );
    pub static TOTAL_WORK: PropertyDefinition =
        PropertyDefinition::new("TotalWork", "task:TotalWork", K::Integer, DELETABLE);
}

macro_rules! with_item_properties {
    ($($extra:expr),* $(,)?) => {
        &[
            &item::ITEM_ID,
            &item::PARENT_FOLDER_ID,
            &item::ITEM_CLASS,
            &item::SUBJECT,
            &item::SENSITIVITY,
            &item::BODY,
            &item::ATTACHMENTS,
            &item::DATE_TIME_RECEIVED,
            &item::SIZE,
            &item::CATEGORIES,
            &item::IMPORTANCE,
            &item::IN_REPLY_TO,
            &item::IS_SUBMITTED,
            &item::IS_DRAFT,
            &item::IS_FROM_ME,
            &item::IS_RESEND,
            &item::IS_UNMODIFIED,
            &item::DATE_TIME_SENT,
            &item::DATE_TIME_CREATED,
            &item::REMINDER_DUE_BY,
            &item::REMINDER_IS_SET,
            &item::REMINDER_MINUTES_BEFORE_START,
            &item::DISPLAY_CC,
            &item::DISPLAY_TO,
            &item::HAS_ATTACHMENTS,
            &item::CULTURE,
            &item::LAST_MODIFIED_NAME,
            &item::LAST_MODIFIED_TIME,
            &item::IS_ASSOCIATED,
            &item::UNIQUE_BODY,
            $($extra,)*
        ]
    };
}

pub static ITEM_SCHEMA: Schema = Schema {
    name: "Item",
    properties: with_item_properties!(),
};

pub static MESSAGE_SCHEMA: Schema = Schema {
    name: "Message",
    properties: with_item_properties!(
        &message::SENDER,
        &message::TO_RECIPIENTS,
        &message::CC_RECIPIENTS,
        &message::BCC_RECIPIENTS,
        &message::IS_READ_RECEIPT_REQUESTED,
        &message::IS_DELIVERY_RECEIPT_REQUESTED,
        &message::CONVERSATION_TOPIC,
        &message::FROM,
        &message::INTERNET_MESSAGE_ID,
        &message::IS_READ,
        &message::IS_RESPONSE_REQUESTED,
        &message::REFERENCES,
        &message::REPLY_TO,
    ),
};

pub static TASK_SCHEMA: Schema = Schema {
    name: "Task",
    properties: with_item_properties!(
        &task::ACTUAL_WORK,
        &task::ASSIGNED_TIME,
        &task::BILLING_INFORMATION,
        &task::CHANGE_COUNT,
        &task::COMPANIES,
        &task::COMPLETE_DATE,
        &task::CONTACTS,
        &task::DELEGATION_STATE,
        &task::DELEGATOR,
        &task::DUE_DATE,
        &task::IS_COMPLETE,
        &task::IS_RECURRING,
        &task::IS_TEAM_TASK,
        &task::MILEAGE,
        &task::OWNER,
        &task::PERCENT_COMPLETE,
        &task::RECURRENCE,
        &task::START_DATE,
        &task::STATUS,
        &task::STATUS_DESCRIPTION,
        &task::TOTAL_WORK,
    ),
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn schemas_extend_the_item_schema_without_duplicates() {
        for schema in [&ITEM_SCHEMA, &MESSAGE_SCHEMA, &TASK_SCHEMA] {
            let uris: HashSet<_> = schema.iter().map(|definition| definition.uri).collect();
            assert_eq!(uris.len(), schema.properties.len(), "{}", schema.name);

            assert_eq!(
                &schema.properties[..ITEM_SCHEMA.properties.len()],
                ITEM_SCHEMA.properties
            );
        }
    }

    #[test]
    fn lookups() {
        assert_eq!(TASK_SCHEMA.find_by_name("Status"), Some(&task::STATUS));
        assert_eq!(
            MESSAGE_SCHEMA.find_by_uri("message:IsRead"),
            Some(&message::IS_READ)
        );
        assert!(!ITEM_SCHEMA.contains(&task::STATUS));
        assert!(TASK_SCHEMA.contains(&item::SUBJECT));
    }
}
