/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use strum::{AsRefStr, Display, EnumString};

use crate::xml::{XmlAttribute, XmlElement};

/// The base set of properties to be returned in response to our request, which
/// can be modified by the parent.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/baseshape>.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum BaseShape {
    IdOnly,
    Default,
    AllProperties,
}

/// The format in which item bodies are returned.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/bodytype>.
#[allow(clippy::upper_case_acronyms)]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum BodyType {
    Best,
    HTML,
    Text,
}

/// The manner in which to traverse nested folders.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum Traversal {
    Shallow,
    SoftDeleted,
    Associated,
}

/// The end of a result set a paging offset is counted from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum BasePoint {
    Beginning,
    End,
}

/// How items are deleted.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/deleteitem>.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum DeleteType {
    HardDelete,
    SoftDelete,
    MoveToDeletedItems,
}

/// Which occurrences of a recurring task a deletion applies to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum AffectedTaskOccurrences {
    AllOccurrences,
    SpecifiedOccurrenceOnly,
}

/// What to do with an email message once it has been created or updated.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum MessageDisposition {
    SaveOnly,
    SendOnly,
    SendAndSaveCopy,
}

/// How the server handles conflicting changes during an update.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/updateitem>.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum ConflictResolution {
    NeverOverwrite,
    AutoResolve,
    AlwaysOverwrite,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum Importance {
    Low,
    Normal,
    High,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum Sensitivity {
    Normal,
    Personal,
    Private,
    Confidential,
}

/// The progress of a task.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/status>.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    WaitingOnOthers,
    Deferred,
}

/// The delegation state of a task.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum TaskDelegateState {
    NoMatch,
    OwnNew,
    Owned,
    Accepted,
    Declined,
    Max,
}

/// The kind of mailbox an email address refers to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum MailboxType {
    Unknown,
    OneOff,
    Mailbox,
    PublicDL,
    PrivateDL,
    Contact,
    PublicFolder,
    GroupMailbox,
    ImplicitContact,
    User,
}

/// A day of the week, or a class of days used by relative recurrence
/// patterns.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Day,
    Weekday,
    WeekendDay,
}

impl DayOfWeek {
    /// Whether the given calendar day belongs to this day or class of days.
    pub fn matches(self, weekday: time::Weekday) -> bool {
        match self {
            DayOfWeek::Day => true,
            DayOfWeek::Weekday => !matches!(weekday, time::Weekday::Saturday | time::Weekday::Sunday),
            DayOfWeek::WeekendDay => {
                matches!(weekday, time::Weekday::Saturday | time::Weekday::Sunday)
            }
            day => time::Weekday::try_from(day).is_ok_and(|day| day == weekday),
        }
    }
}

impl From<time::Weekday> for DayOfWeek {
    fn from(value: time::Weekday) -> Self {
        match value {
            time::Weekday::Sunday => DayOfWeek::Sunday,
            time::Weekday::Monday => DayOfWeek::Monday,
            time::Weekday::Tuesday => DayOfWeek::Tuesday,
            time::Weekday::Wednesday => DayOfWeek::Wednesday,
            time::Weekday::Thursday => DayOfWeek::Thursday,
            time::Weekday::Friday => DayOfWeek::Friday,
            time::Weekday::Saturday => DayOfWeek::Saturday,
        }
    }
}

impl TryFrom<DayOfWeek> for time::Weekday {
    type Error = DayOfWeek;

    /// Fails for the `Day`, `Weekday` and `WeekendDay` classes.
    fn try_from(value: DayOfWeek) -> Result<Self, Self::Error> {
        match value {
            DayOfWeek::Sunday => Ok(time::Weekday::Sunday),
            DayOfWeek::Monday => Ok(time::Weekday::Monday),
            DayOfWeek::Tuesday => Ok(time::Weekday::Tuesday),
            DayOfWeek::Wednesday => Ok(time::Weekday::Wednesday),
            DayOfWeek::Thursday => Ok(time::Weekday::Thursday),
            DayOfWeek::Friday => Ok(time::Weekday::Friday),
            DayOfWeek::Saturday => Ok(time::Weekday::Saturday),
            other => Err(other),
        }
    }
}

/// Which occurrence of a day within a month a relative pattern refers to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum DayOfWeekIndex {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl DayOfWeekIndex {
    /// The zero-based position for the first four indices, `None` for `Last`.
    pub fn position(self) -> Option<usize> {
        match self {
            DayOfWeekIndex::First => Some(0),
            DayOfWeekIndex::Second => Some(1),
            DayOfWeekIndex::Third => Some(2),
            DayOfWeekIndex::Fourth => Some(3),
            DayOfWeekIndex::Last => None,
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, XmlElement, XmlAttribute,
)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl From<Month> for time::Month {
    fn from(value: Month) -> Self {
        match value {
            Month::January => time::Month::January,
            Month::February => time::Month::February,
            Month::March => time::Month::March,
            Month::April => time::Month::April,
            Month::May => time::Month::May,
            Month::June => time::Month::June,
            Month::July => time::Month::July,
            Month::August => time::Month::August,
            Month::September => time::Month::September,
            Month::October => time::Month::October,
            Month::November => time::Month::November,
            Month::December => time::Month::December,
        }
    }
}

impl From<time::Month> for Month {
    fn from(value: time::Month) -> Self {
        match value {
            time::Month::January => Month::January,
            time::Month::February => Month::February,
            time::Month::March => Month::March,
            time::Month::April => Month::April,
            time::Month::May => Month::May,
            time::Month::June => Month::June,
            time::Month::July => Month::July,
            time::Month::August => Month::August,
            time::Month::September => Month::September,
            time::Month::October => Month::October,
            time::Month::November => Month::November,
            time::Month::December => Month::December,
        }
    }
}

/// The kinds of notification a subscription can report.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/eventtype>.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum EventType {
    CopiedEvent,
    CreatedEvent,
    DeletedEvent,
    ModifiedEvent,
    MovedEvent,
    NewMailEvent,
    FreeBusyChangedEvent,
    StatusEvent,
}

/// The body of an item.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/body>.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
pub struct MessageBody {
    #[xml_serialize(is_attribute)]
    pub body_type: BodyType,

    #[xml_serialize(is_attribute)]
    pub is_truncated: Option<bool>,

    #[xml_serialize(flatten)]
    pub text: String,
}

impl MessageBody {
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            body_type: BodyType::HTML,
            is_truncated: None,
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            body_type: BodyType::Text,
            is_truncated: None,
            text: text.into(),
        }
    }
}
