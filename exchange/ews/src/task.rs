/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{
    item::{wrong_item_type, AnyItem, ItemType, ServiceObject},
    property::{
        schema::{task, TASK_SCHEMA},
        PropertyBag, PropertyDefinition, PropertyValue, Schema,
    },
    recurrence::Recurrence,
    types::{DateTime, DistinguishedFolderName, TaskDelegateState, TaskStatus},
    Error,
};

/// A task.
///
/// Completing an occurrence of a recurring task (setting its status to
/// [`TaskStatus::Completed`] and updating it) makes the server create the
/// next occurrence, which
/// [`ExchangeService::update_item`](crate::ExchangeService::update_item)
/// returns.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    bag: PropertyBag,
}

impl Task {
    pub fn new() -> Self {
        Self {
            bag: PropertyBag::new(&TASK_SCHEMA),
        }
    }

    pub(crate) fn from_property_bag(bag: PropertyBag) -> Self {
        Self { bag }
    }

    pub(crate) fn into_property_bag(self) -> PropertyBag {
        self.bag
    }

    fn string_list_mut(
        &mut self,
        definition: &'static PropertyDefinition,
    ) -> Result<&mut Vec<String>, Error> {
        match self.bag.value_mut(definition)? {
            PropertyValue::StringList(values) => Ok(values),
            _ => Err(Error::PropertyType(definition.name)),
        }
    }

    pub fn status(&self) -> Result<Option<TaskStatus>, Error> {
        self.bag.get_enum(&task::STATUS)
    }

    pub fn set_status(&mut self, status: TaskStatus) -> Result<(), Error> {
        self.bag
            .set(&task::STATUS, PropertyValue::Enum(status.to_string()))
    }

    pub fn status_description(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&task::STATUS_DESCRIPTION)
    }

    pub fn percent_complete(&self) -> Result<Option<f64>, Error> {
        self.bag.get_double(&task::PERCENT_COMPLETE)
    }

    /// Sets the completion percentage, which must be between 0 and 100.
    pub fn set_percent_complete(&mut self, percent_complete: f64) -> Result<(), Error> {
        if !(0.0..=100.0).contains(&percent_complete) {
            return Err(Error::Validation(format!(
                "percent complete must be between 0 and 100, got {percent_complete}"
            )));
        }

        self.bag.set(&task::PERCENT_COMPLETE, percent_complete)
    }

    pub fn start_date(&self) -> Result<Option<DateTime>, Error> {
        self.bag.get_date_time(&task::START_DATE)
    }

    pub fn set_start_date(&mut self, start_date: DateTime) -> Result<(), Error> {
        self.bag.set(&task::START_DATE, start_date)
    }

    pub fn due_date(&self) -> Result<Option<DateTime>, Error> {
        self.bag.get_date_time(&task::DUE_DATE)
    }

    pub fn set_due_date(&mut self, due_date: DateTime) -> Result<(), Error> {
        self.bag.set(&task::DUE_DATE, due_date)
    }

    pub fn complete_date(&self) -> Result<Option<DateTime>, Error> {
        self.bag.get_date_time(&task::COMPLETE_DATE)
    }

    pub fn set_complete_date(&mut self, complete_date: DateTime) -> Result<(), Error> {
        self.bag.set(&task::COMPLETE_DATE, complete_date)
    }

    pub fn assigned_time(&self) -> Result<Option<DateTime>, Error> {
        self.bag.get_date_time(&task::ASSIGNED_TIME)
    }

    pub fn is_complete(&self) -> Result<Option<bool>, Error> {
        self.bag.get_bool(&task::IS_COMPLETE)
    }

    pub fn is_recurring(&self) -> Result<Option<bool>, Error> {
        self.bag.get_bool(&task::IS_RECURRING)
    }

    pub fn is_team_task(&self) -> Result<Option<bool>, Error> {
        self.bag.get_bool(&task::IS_TEAM_TASK)
    }

    pub fn recurrence(&self) -> Result<Option<&Recurrence>, Error> {
        self.bag.get_recurrence(&task::RECURRENCE)
    }

    /// Makes the task recurring. The recurrence is validated first.
    pub fn set_recurrence(&mut self, recurrence: Recurrence) -> Result<(), Error> {
        recurrence.validate()?;
        self.bag.set(&task::RECURRENCE, recurrence)
    }

    /// Stops the task from recurring.
    pub fn clear_recurrence(&mut self) -> Result<(), Error> {
        self.bag.delete(&task::RECURRENCE)
    }

    pub fn owner(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&task::OWNER)
    }

    pub fn delegator(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&task::DELEGATOR)
    }

    pub fn delegation_state(&self) -> Result<Option<TaskDelegateState>, Error> {
        self.bag.get_enum(&task::DELEGATION_STATE)
    }

    pub fn companies(&self) -> Result<Option<&[String]>, Error> {
        Ok(self
            .bag
            .get_string_list(&task::COMPANIES)?
            .map(Vec::as_slice))
    }

    pub fn companies_mut(&mut self) -> Result<&mut Vec<String>, Error> {
        self.string_list_mut(&task::COMPANIES)
    }

    pub fn contacts(&self) -> Result<Option<&[String]>, Error> {
        Ok(self
            .bag
            .get_string_list(&task::CONTACTS)?
            .map(Vec::as_slice))
    }

    pub fn contacts_mut(&mut self) -> Result<&mut Vec<String>, Error> {
        self.string_list_mut(&task::CONTACTS)
    }

    /// Total work in minutes.
    pub fn total_work(&self) -> Result<Option<i64>, Error> {
        self.bag.get_integer(&task::TOTAL_WORK)
    }

    pub fn set_total_work(&mut self, minutes: i64) -> Result<(), Error> {
        self.bag.set(&task::TOTAL_WORK, minutes)
    }

    /// Actual work in minutes.
    pub fn actual_work(&self) -> Result<Option<i64>, Error> {
        self.bag.get_integer(&task::ACTUAL_WORK)
    }

    pub fn set_actual_work(&mut self, minutes: i64) -> Result<(), Error> {
        self.bag.set(&task::ACTUAL_WORK, minutes)
    }

    pub fn mileage(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&task::MILEAGE)
    }

    pub fn set_mileage(&mut self, mileage: &str) -> Result<(), Error> {
        self.bag.set(&task::MILEAGE, mileage)
    }

    pub fn billing_information(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&task::BILLING_INFORMATION)
    }

    pub fn set_billing_information(&mut self, billing_information: &str) -> Result<(), Error> {
        self.bag
            .set(&task::BILLING_INFORMATION, billing_information)
    }

    /// The number of times the task has been changed.
    pub fn change_count(&self) -> Result<Option<i64>, Error> {
        self.bag.get_integer(&task::CHANGE_COUNT)
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceObject for Task {
    fn property_bag(&self) -> &PropertyBag {
        &self.bag
    }

    fn property_bag_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    fn xml_element_name(&self) -> &str {
        "Task"
    }

    fn default_folder(&self) -> Option<DistinguishedFolderName> {
        Some(DistinguishedFolderName::Tasks)
    }
}

impl ItemType for Task {
    const SCHEMA: &'static Schema = &TASK_SCHEMA;

    fn from_any(item: AnyItem) -> Result<Self, Error> {
        match item {
            AnyItem::Task(task) => Ok(task),
            other => Err(wrong_item_type("Task", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::{
        item::ItemProperties,
        property::PropertySet,
        recurrence::{RecurrencePattern, RecurrenceRange},
        test_utils::{parse, write_fragment},
        xml::write_element,
    };

    #[test]
    fn percent_complete_is_bounded() {
        let mut task = Task::new();

        assert!(matches!(
            task.set_percent_complete(100.5),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            task.set_percent_complete(-1.0),
            Err(Error::Validation(_))
        ));

        task.set_percent_complete(100.0).unwrap();
        assert_eq!(task.percent_complete().unwrap(), Some(100.0));
    }

    #[test]
    fn invalid_recurrences_are_rejected() {
        let mut task = Task::new();

        let invalid = Recurrence::new(
            RecurrencePattern::DailyRecurrence { interval: 0 },
            RecurrenceRange::NoEndRecurrence {
                start_date: date!(2024 - 01 - 01),
            },
        );
        assert!(matches!(
            task.set_recurrence(invalid),
            Err(Error::Validation(_))
        ));
        assert_eq!(task.recurrence().unwrap(), None);
    }

    #[test]
    fn new_tasks_are_written_in_schema_order() {
        let mut task = Task::new();
        task.set_status(TaskStatus::InProgress).unwrap();
        task.set_due_date(datetime!(2024-03-01 17:00 UTC).into())
            .unwrap();
        task.set_subject("Quarterly report").unwrap();
        task.companies_mut().unwrap().push("Contoso".to_string());
        task.set_recurrence(Recurrence::new(
            RecurrencePattern::WeeklyRegeneration { interval: 2 },
            RecurrenceRange::NumberedRecurrence {
                start_date: date!(2024 - 03 - 01),
                number_of_occurrences: 5,
            },
        ))
        .unwrap();

        let node = write_fragment(|writer| {
            write_element(writer, "t:Task", &[], &[], |writer| {
                task.property_bag().write_for_create(writer)
            })
        });

        let names: Vec<_> = node.children.iter().map(|child| child.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Subject", "Companies", "DueDate", "Recurrence", "Status"]
        );
        assert_eq!(node.child_text("DueDate"), Some("2024-03-01T17:00:00Z"));
        assert_eq!(node.child_text("Status"), Some("InProgress"));

        let recurrence = node.required_child("Recurrence").unwrap();
        assert!(recurrence.child("WeeklyRegeneration").is_some());
        assert!(recurrence.child("NumberedRecurrence").is_some());
    }

    #[test]
    fn loaded_tasks_expose_server_values() {
        let node = parse(
            r#"<t:Task xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
                <t:ItemId Id="AAMkTask" ChangeKey="EwAA"/>
                <t:Subject>Water plants</t:Subject>
                <t:ChangeCount>3</t:ChangeCount>
                <t:DelegationState>Owned</t:DelegationState>
                <t:IsComplete>false</t:IsComplete>
                <t:IsRecurring>true</t:IsRecurring>
                <t:PercentComplete>25</t:PercentComplete>
                <t:Recurrence>
                    <t:DailyRegeneration><t:Interval>3</t:Interval></t:DailyRegeneration>
                    <t:NoEndRecurrence><t:StartDate>2024-05-01Z</t:StartDate></t:NoEndRecurrence>
                </t:Recurrence>
                <t:Status>InProgress</t:Status>
            </t:Task>"#,
        );

        let item = AnyItem::from_xml(&node, &PropertySet::first_class_properties(), false).unwrap();
        let task = Task::from_any(item).unwrap();

        assert_eq!(task.subject().unwrap(), Some("Water plants"));
        assert_eq!(task.change_count().unwrap(), Some(3));
        assert_eq!(
            task.delegation_state().unwrap(),
            Some(TaskDelegateState::Owned)
        );
        assert_eq!(task.is_recurring().unwrap(), Some(true));
        assert_eq!(task.percent_complete().unwrap(), Some(25.0));
        assert_eq!(task.due_date().unwrap(), None);
        assert!(matches!(
            task.recurrence().unwrap().map(|recurrence| &recurrence.pattern),
            Some(RecurrencePattern::DailyRegeneration { interval: 3 })
        ));

        assert!(matches!(
            crate::item::EmailMessage::from_any(AnyItem::Task(task)),
            Err(Error::Validation(_))
        ));
    }
}
