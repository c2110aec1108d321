/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{borrow::Cow, io::Write};

use xml::EventWriter;

use super::{ensure, Operation};
use crate::{
    attachment::Attachment,
    response::ServiceErrorHandling,
    types::{AttachmentId, ExchangeVersion, ItemId},
    xml::{write_element, Namespace, WriteResult, XmlElement, XmlNode, MESSAGES_NS_URI},
    Error,
};

fn write_attachment_ids<W: Write>(
    writer: &mut EventWriter<W>,
    attachment_ids: &[AttachmentId],
) -> WriteResult {
    write_element(writer, "AttachmentIds", &[], &[], |writer| {
        for id in attachment_ids {
            write_element(
                writer,
                "t:AttachmentId",
                &[],
                &[("Id", Cow::Borrowed(id.id.as_str()))],
                |_| Ok(()),
            )?;
        }

        Ok(())
    })
}

fn attachments_of(message: &XmlNode) -> Result<Vec<Attachment>, Error> {
    message
        .child("Attachments")
        .map(|attachments| {
            attachments
                .children
                .iter()
                .map(Attachment::from_xml)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Adds attachments to an existing item. Each attachment gets its own
/// response message.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/createattachment>.
pub struct CreateAttachment {
    pub parent_item_id: ItemId,
    pub attachments: Vec<Attachment>,
}

impl XmlElement for CreateAttachment {
    fn namespaces(&self) -> &'static [Namespace] {
        &[(None, MESSAGES_NS_URI)]
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        self.parent_item_id
            .write_as_element(writer, "ParentItemId")?;

        write_element(writer, "Attachments", &[], &[], |writer| {
            for attachment in &self.attachments {
                attachment.write_as_element(writer, attachment.element_name())?;
            }

            Ok(())
        })
    }
}

impl Operation for CreateAttachment {
    const NAME: &'static str = "CreateAttachment";
    type Response = AttachmentId;

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.attachments.is_empty(), || {
            "at least one attachment is required".to_string()
        })?;

        self.attachments
            .iter()
            .try_for_each(|attachment| attachment.validate(version))
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<AttachmentId, Error> {
        attachments_of(message)?
            .into_iter()
            .next()
            .and_then(|attachment| attachment.id().cloned())
            .ok_or_else(|| {
                Error::UnexpectedXml("CreateAttachment response carries no attachment id".to_string())
            })
    }

    fn expected_response_count(&self) -> usize {
        self.attachments.len()
    }

    fn error_handling(&self) -> ServiceErrorHandling {
        ServiceErrorHandling::ReturnErrors
    }
}

/// Loads attachments, including their content.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getattachment>.
#[derive(Clone, Debug)]
pub struct GetAttachment {
    pub attachment_ids: Vec<AttachmentId>,
}

impl XmlElement for GetAttachment {
    fn namespaces(&self) -> &'static [Namespace] {
        &[(None, MESSAGES_NS_URI)]
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        write_attachment_ids(writer, &self.attachment_ids)
    }
}

impl Operation for GetAttachment {
    const NAME: &'static str = "GetAttachment";
    type Response = Attachment;

    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.attachment_ids.is_empty(), || {
            "at least one attachment id is required".to_string()
        })
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<Attachment, Error> {
        attachments_of(message)?.into_iter().next().ok_or_else(|| {
            Error::UnexpectedXml("GetAttachment response carries no attachment".to_string())
        })
    }

    fn expected_response_count(&self) -> usize {
        self.attachment_ids.len()
    }
}

/// Deletes attachments.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/deleteattachment>.
#[derive(Clone, Debug)]
pub struct DeleteAttachment {
    pub attachment_ids: Vec<AttachmentId>,
}

impl XmlElement for DeleteAttachment {
    fn namespaces(&self) -> &'static [Namespace] {
        &[(None, MESSAGES_NS_URI)]
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        write_attachment_ids(writer, &self.attachment_ids)
    }
}

impl Operation for DeleteAttachment {
    const NAME: &'static str = "DeleteAttachment";

    /// The id and new change key of the item the attachment was removed
    /// from.
    type Response = Option<ItemId>;

    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.attachment_ids.is_empty(), || {
            "at least one attachment id is required".to_string()
        })
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<Option<ItemId>, Error> {
        Ok(message.child("RootItemId").and_then(|root| {
            Some(ItemId {
                id: root.attribute("RootItemId")?.to_string(),
                change_key: root.attribute("RootItemChangeKey").map(str::to_string),
            })
        }))
    }

    fn expected_response_count(&self) -> usize {
        self.attachment_ids.len()
    }

    fn error_handling(&self) -> ServiceErrorHandling {
        ServiceErrorHandling::ReturnErrors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attachment::FileAttachment,
        response::ServiceResult,
        test_utils::{parse, write_fragment},
        types::ResponseCode,
    };

    #[test]
    fn create_attachment_request() {
        let request = CreateAttachment {
            parent_item_id: ItemId::with_change_key("AAMk", "CQAA"),
            attachments: vec![Attachment::File(FileAttachment {
                name: "a.txt".to_string(),
                content: Some(b"a".to_vec()),
                ..Default::default()
            })],
        };

        let node = write_fragment(|writer| request.write_body(writer));
        let parent = node.required_child("ParentItemId").unwrap();
        assert_eq!(parent.attribute("Id"), Some("AAMk"));
        assert_eq!(parent.attribute("ChangeKey"), Some("CQAA"));

        let file = &node.required_child("Attachments").unwrap().children[0];
        assert_eq!(file.name, "FileAttachment");
        assert_eq!(file.child_text("Content"), Some("YQ=="));
    }

    #[test]
    fn batch_responses_keep_individual_errors() {
        let request = CreateAttachment {
            parent_item_id: ItemId::new("AAMk"),
            attachments: vec![
                Attachment::File(FileAttachment {
                    name: "a.txt".to_string(),
                    content: Some(Vec::new()),
                    ..Default::default()
                });
                2
            ],
        };

        let response = parse(
            r#"<m:CreateAttachmentResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
                <m:ResponseMessages>
                    <m:CreateAttachmentResponseMessage ResponseClass="Success">
                        <m:ResponseCode>NoError</m:ResponseCode>
                        <m:Attachments>
                            <t:FileAttachment>
                                <t:AttachmentId Id="ATT1" RootItemId="AAMk" RootItemChangeKey="CQAB"/>
                            </t:FileAttachment>
                        </m:Attachments>
                    </m:CreateAttachmentResponseMessage>
                    <m:CreateAttachmentResponseMessage ResponseClass="Error">
                        <m:MessageText>The attachment is too large.</m:MessageText>
                        <m:ResponseCode>ErrorAttachmentSizeLimitExceeded</m:ResponseCode>
                        <m:DescriptiveLinkKey>0</m:DescriptiveLinkKey>
                    </m:CreateAttachmentResponseMessage>
                </m:ResponseMessages>
            </m:CreateAttachmentResponse>"#,
        );

        let responses = request.parse_response(&response).unwrap();
        assert_eq!(responses.overall_result(), ServiceResult::Error);

        let id = responses.get(0).and_then(|response| response.value()).unwrap();
        assert_eq!(id.id, "ATT1");
        assert_eq!(id.root_item_change_key.as_deref(), Some("CQAB"));

        let error = responses.errors().next().unwrap();
        assert_eq!(
            error.response_code,
            ResponseCode::ErrorAttachmentSizeLimitExceeded
        );
    }

    #[test]
    fn delete_attachment_returns_the_root_item() {
        let request = DeleteAttachment {
            attachment_ids: vec![AttachmentId::new("ATT1")],
        };

        let node = write_fragment(|writer| request.write_body(writer));
        let id = &node.required_child("AttachmentIds").unwrap().children[0];
        assert_eq!(id.attribute("Id"), Some("ATT1"));

        let message = parse(
            r#"<DeleteAttachmentResponseMessage ResponseClass="Success">
                <ResponseCode>NoError</ResponseCode>
                <RootItemId RootItemId="AAMk" RootItemChangeKey="CQAC"/>
            </DeleteAttachmentResponseMessage>"#,
        );
        assert_eq!(
            request.parse_response_message(&message).unwrap(),
            Some(ItemId::with_change_key("AAMk", "CQAC"))
        );
    }
}
