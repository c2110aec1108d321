/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{borrow::Cow, io::Write};

use time::{Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, Weekday};
use xml::EventWriter;

use crate::{
    recurrence::nth_matching_day,
    types::{format_duration, parse_duration, DayOfWeek, DayOfWeekIndex},
    xml::{write_element, write_text_element, WriteResult, XmlElement, XmlNode},
    Error,
};

/// A time zone with an optional yearly daylight saving time rule.
///
/// `base_offset` is the offset from UTC of standard time, e.g. `-8h` for
/// US Pacific.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeZoneDefinition {
    pub id: String,
    pub name: String,
    pub base_offset: Duration,
    pub adjustment: Option<DaylightAdjustment>,
}

/// A yearly daylight saving time rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaylightAdjustment {
    /// Added to the base offset while daylight saving time is in effect.
    pub delta: Duration,

    /// When daylight time starts, in local standard time.
    pub daylight_start: TransitionTime,

    /// When standard time resumes, in local daylight time.
    pub standard_start: TransitionTime,
}

/// The point in a year at which a transition happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionTime {
    /// The same calendar day every year.
    Fixed {
        month: Month,
        day: u8,
        time_of_day: Time,
    },

    /// The nth (or last) given weekday of a month, e.g. the second Sunday of
    /// March.
    Floating {
        month: Month,
        week: DayOfWeekIndex,
        day_of_week: Weekday,
        time_of_day: Time,
    },
}

impl TransitionTime {
    /// The local date and time of the transition in the given year.
    ///
    /// Fixed days past the end of a shorter month fall on its last day.
    pub fn date_in_year(&self, year: i32) -> Result<PrimitiveDateTime, Error> {
        match *self {
            TransitionTime::Fixed {
                month,
                day,
                time_of_day,
            } => {
                let day = day.clamp(1, month.length(year));
                let date = time::Date::from_calendar_date(year, month, day)?;

                Ok(PrimitiveDateTime::new(date, time_of_day))
            }

            TransitionTime::Floating {
                month,
                week,
                day_of_week,
                time_of_day,
            } => {
                let date = nth_matching_day(year, month, DayOfWeek::from(day_of_week), week)?;

                Ok(PrimitiveDateTime::new(date, time_of_day))
            }
        }
    }

    fn month(&self) -> Month {
        match self {
            TransitionTime::Fixed { month, .. } | TransitionTime::Floating { month, .. } => *month,
        }
    }

    fn time_of_day(&self) -> Time {
        match self {
            TransitionTime::Fixed { time_of_day, .. }
            | TransitionTime::Floating { time_of_day, .. } => *time_of_day,
        }
    }
}

impl TimeZoneDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_offset: Duration) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_offset,
            adjustment: None,
        }
    }

    pub fn utc() -> Self {
        Self::new("UTC", "(UTC) Coordinated Universal Time", Duration::ZERO)
    }

    pub fn with_daylight_adjustment(mut self, adjustment: DaylightAdjustment) -> Self {
        self.adjustment = Some(adjustment);
        self
    }

    /// Whether daylight saving time is in effect at the given instant.
    ///
    /// Rules whose daylight period spans the turn of the year (southern
    /// hemisphere) are supported.
    pub fn is_daylight_at(&self, instant: OffsetDateTime) -> Result<bool, Error> {
        let Some(adjustment) = &self.adjustment else {
            return Ok(false);
        };

        let standard_local = to_primitive(instant) + self.base_offset;
        let year = standard_local.year();

        let daylight_start = adjustment.daylight_start.date_in_year(year)?;
        let standard_start = adjustment.standard_start.date_in_year(year)? - adjustment.delta;

        Ok(if daylight_start < standard_start {
            daylight_start <= standard_local && standard_local < standard_start
        } else {
            standard_local >= daylight_start || standard_local < standard_start
        })
    }

    /// The offset from UTC in effect at the given instant.
    pub fn utc_offset_at(&self, instant: OffsetDateTime) -> Result<Duration, Error> {
        let mut offset = self.base_offset;

        if let Some(adjustment) = &self.adjustment {
            if self.is_daylight_at(instant)? {
                offset += adjustment.delta;
            }
        }

        Ok(offset)
    }

    /// Converts an instant to the local wall-clock time of the zone.
    pub fn to_local(&self, instant: OffsetDateTime) -> Result<PrimitiveDateTime, Error> {
        Ok(to_primitive(instant) + self.utc_offset_at(instant)?)
    }

    /// Converts a local wall-clock time to an instant.
    ///
    /// Times repeated when clocks go back resolve to the first (daylight)
    /// occurrence. Times skipped when clocks go forward are read as standard
    /// time.
    pub fn to_utc(&self, local: PrimitiveDateTime) -> Result<OffsetDateTime, Error> {
        let as_utc = local.assume_utc();

        if let Some(adjustment) = &self.adjustment {
            let as_daylight = as_utc - (self.base_offset + adjustment.delta);
            if self.is_daylight_at(as_daylight)? {
                return Ok(as_daylight);
            }
        }

        Ok(as_utc - self.base_offset)
    }

    /// Reads a `t:TimeZoneDefinition` element.
    ///
    /// When the definition lists rules for several periods of history, the
    /// most recent transition group is used.
    pub fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        let id = node.required_attribute("Id")?.to_string();
        let name = node.attribute("Name").unwrap_or(id.as_str()).to_string();

        let periods = node
            .child("Periods")
            .map(|periods| {
                periods
                    .children_named("Period")
                    .map(|period| {
                        Ok((
                            period.required_attribute("Id")?.to_string(),
                            parse_duration(period.required_attribute("Bias")?)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, Error>>()
            })
            .transpose()?
            .unwrap_or_default();

        let bias_of = |period_id: &str| -> Result<Duration, Error> {
            periods
                .iter()
                .find(|(id, _)| id == period_id)
                .map(|(_, bias)| *bias)
                .ok_or_else(|| Error::UnexpectedXml(format!("unknown time zone period `{period_id}`")))
        };

        let group_id = node
            .child("Transitions")
            .and_then(|transitions| transitions.children.last())
            .and_then(|transition| transition.child("To"))
            .filter(|to| to.attribute("Kind") == Some("Group"))
            .map(|to| to.text.trim().to_string());

        let group = match (&group_id, node.child("TransitionsGroups")) {
            (Some(group_id), Some(groups)) => groups
                .children_named("TransitionsGroup")
                .find(|group| group.attribute("Id") == Some(group_id.as_str())),
            _ => None,
        };

        let rules: Vec<(TransitionTime, Duration)> = match group {
            Some(group) => group
                .children
                .iter()
                .filter(|transition| transition.name != "Transition")
                .map(|transition| {
                    let to = transition.required_child("To")?;
                    Ok((transition_from_xml(transition)?, bias_of(to.text.trim())?))
                })
                .collect::<Result<_, Error>>()?,
            None => Vec::new(),
        };

        match rules.as_slice() {
            [(first, first_bias), (second, second_bias)] => {
                // Daylight periods have the smaller bias.
                let (daylight_start, daylight_bias, standard_start, standard_bias) =
                    if first_bias < second_bias {
                        (*first, *first_bias, *second, *second_bias)
                    } else {
                        (*second, *second_bias, *first, *first_bias)
                    };

                Ok(Self {
                    id,
                    name,
                    base_offset: -standard_bias,
                    adjustment: Some(DaylightAdjustment {
                        delta: standard_bias - daylight_bias,
                        daylight_start,
                        standard_start,
                    }),
                })
            }

            [] => {
                let standard_bias = match group
                    .and_then(|group| group.child("Transition"))
                    .and_then(|transition| transition.child("To"))
                {
                    Some(to) => bias_of(to.text.trim())?,
                    None => periods.first().map(|(_, bias)| *bias).unwrap_or_default(),
                };

                Ok(Self::new(id, name, -standard_bias))
            }

            _ => Err(Error::UnexpectedXml(format!(
                "unsupported transition rules in time zone `{id}`"
            ))),
        }
    }

    fn period_id(&self, kind: &str) -> String {
        format!("trule:{}/{kind}", self.id)
    }
}

impl XmlElement for TimeZoneDefinition {
    fn attributes(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("Id", Cow::Borrowed(self.id.as_str())),
            ("Name", Cow::Borrowed(self.name.as_str())),
        ]
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        let standard_id = self.period_id("Standard");
        let daylight_id = self.period_id("Daylight");

        write_element(writer, "t:Periods", &[], &[], |writer| {
            write_period(writer, &standard_id, "Standard", -self.base_offset)?;

            match &self.adjustment {
                Some(adjustment) => write_period(
                    writer,
                    &daylight_id,
                    "Daylight",
                    -(self.base_offset + adjustment.delta),
                ),
                None => Ok(()),
            }
        })?;

        write_element(writer, "t:TransitionsGroups", &[], &[], |writer| {
            write_element(
                writer,
                "t:TransitionsGroup",
                &[],
                &[("Id", Cow::Borrowed("0"))],
                |writer| match &self.adjustment {
                    Some(adjustment) => {
                        write_transition(writer, &adjustment.daylight_start, &daylight_id)?;
                        write_transition(writer, &adjustment.standard_start, &standard_id)
                    }
                    None => write_element(writer, "t:Transition", &[], &[], |writer| {
                        write_to(writer, "Period", &standard_id)
                    }),
                },
            )
        })?;

        write_element(writer, "t:Transitions", &[], &[], |writer| {
            write_element(writer, "t:Transition", &[], &[], |writer| {
                write_to(writer, "Group", "0")
            })
        })
    }
}

fn write_period<W: Write>(
    writer: &mut EventWriter<W>,
    id: &str,
    name: &str,
    bias: Duration,
) -> WriteResult {
    let bias = format_duration(bias);

    write_element(
        writer,
        "t:Period",
        &[],
        &[
            ("Bias", Cow::Borrowed(bias.as_str())),
            ("Name", Cow::Borrowed(name)),
            ("Id", Cow::Borrowed(id)),
        ],
        |_| Ok(()),
    )
}

fn write_to<W: Write>(writer: &mut EventWriter<W>, kind: &str, target: &str) -> WriteResult {
    write_element(
        writer,
        "t:To",
        &[],
        &[("Kind", Cow::Borrowed(kind))],
        |writer| writer.write(xml::writer::XmlEvent::characters(target)),
    )
}

fn write_transition<W: Write>(
    writer: &mut EventWriter<W>,
    transition: &TransitionTime,
    period_id: &str,
) -> WriteResult {
    let time_offset = format_duration(transition.time_of_day() - Time::MIDNIGHT);
    let month = u8::from(transition.month()).to_string();

    match transition {
        TransitionTime::Fixed { day, .. } => {
            write_element(writer, "t:RecurringDateTransition", &[], &[], |writer| {
                write_to(writer, "Period", period_id)?;
                write_text_element(writer, "t:TimeOffset", &time_offset)?;
                write_text_element(writer, "t:Month", &month)?;
                write_text_element(writer, "t:Day", &day.to_string())
            })
        }

        TransitionTime::Floating {
            week, day_of_week, ..
        } => {
            let occurrence = match week.position() {
                Some(position) => (position + 1).to_string(),
                None => "-1".to_string(),
            };

            write_element(writer, "t:RecurringDayTransition", &[], &[], |writer| {
                write_to(writer, "Period", period_id)?;
                write_text_element(writer, "t:TimeOffset", &time_offset)?;
                write_text_element(writer, "t:Month", &month)?;
                write_text_element(writer, "t:DayOfWeek", DayOfWeek::from(*day_of_week).as_ref())?;
                write_text_element(writer, "t:Occurrence", &occurrence)
            })
        }
    }
}

fn transition_from_xml(node: &XmlNode) -> Result<TransitionTime, Error> {
    let offset = parse_duration(&node.required_child("TimeOffset")?.text)?;
    if offset < Duration::ZERO || offset >= Duration::DAY {
        return Err(Error::UnexpectedXml(format!(
            "transition time offset out of range in `{}`",
            node.name
        )));
    }
    let time_of_day = Time::MIDNIGHT + offset;

    let month: u8 = node.required_child("Month")?.parse_text()?;
    let month = Month::try_from(month)?;

    match node.name.as_str() {
        "RecurringDateTransition" => Ok(TransitionTime::Fixed {
            month,
            day: node.required_child("Day")?.parse_text()?,
            time_of_day,
        }),

        "RecurringDayTransition" => {
            let day_of_week: DayOfWeek = node.required_child("DayOfWeek")?.parse_text()?;
            let day_of_week = Weekday::try_from(day_of_week).map_err(|day| {
                Error::UnexpectedXml(format!("`{day}` is not a single day of the week"))
            })?;

            let week = match node.required_child("Occurrence")?.parse_text::<i32>()? {
                1 => DayOfWeekIndex::First,
                2 => DayOfWeekIndex::Second,
                3 => DayOfWeekIndex::Third,
                4 => DayOfWeekIndex::Fourth,
                -1 | 5 => DayOfWeekIndex::Last,
                other => {
                    return Err(Error::UnexpectedXml(format!(
                        "invalid transition occurrence `{other}`"
                    )))
                }
            };

            Ok(TransitionTime::Floating {
                month,
                week,
                day_of_week,
                time_of_day,
            })
        }

        other => Err(Error::UnexpectedXml(format!(
            "unsupported time zone transition `{other}`"
        ))),
    }
}

fn to_primitive(instant: OffsetDateTime) -> PrimitiveDateTime {
    let utc = instant.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, time};

    use super::*;
    use crate::test_utils::{parse, write_fragment};

    fn pacific() -> TimeZoneDefinition {
        TimeZoneDefinition::new(
            "Pacific Standard Time",
            "(UTC-08:00) Pacific Time (US & Canada)",
            -Duration::hours(8),
        )
        .with_daylight_adjustment(DaylightAdjustment {
            delta: Duration::hours(1),
            daylight_start: TransitionTime::Floating {
                month: Month::March,
                week: DayOfWeekIndex::Second,
                day_of_week: Weekday::Sunday,
                time_of_day: time!(2:00),
            },
            standard_start: TransitionTime::Floating {
                month: Month::November,
                week: DayOfWeekIndex::First,
                day_of_week: Weekday::Sunday,
                time_of_day: time!(2:00),
            },
        })
    }

    fn sydney() -> TimeZoneDefinition {
        TimeZoneDefinition::new(
            "AUS Eastern Standard Time",
            "(UTC+10:00) Canberra, Melbourne, Sydney",
            Duration::hours(10),
        )
        .with_daylight_adjustment(DaylightAdjustment {
            delta: Duration::hours(1),
            daylight_start: TransitionTime::Floating {
                month: Month::October,
                week: DayOfWeekIndex::First,
                day_of_week: Weekday::Sunday,
                time_of_day: time!(2:00),
            },
            standard_start: TransitionTime::Floating {
                month: Month::April,
                week: DayOfWeekIndex::First,
                day_of_week: Weekday::Sunday,
                time_of_day: time!(3:00),
            },
        })
    }

    #[test]
    fn transition_dates() {
        let zone = pacific();
        let adjustment = zone.adjustment.as_ref().unwrap();

        assert_eq!(
            adjustment.daylight_start.date_in_year(2024).unwrap(),
            datetime!(2024-03-10 02:00)
        );
        assert_eq!(
            adjustment.standard_start.date_in_year(2024).unwrap(),
            datetime!(2024-11-03 02:00)
        );

        let last_sunday_of_october = TransitionTime::Floating {
            month: Month::October,
            week: DayOfWeekIndex::Last,
            day_of_week: Weekday::Sunday,
            time_of_day: time!(3:00),
        };
        assert_eq!(
            last_sunday_of_october.date_in_year(2024).unwrap(),
            datetime!(2024-10-27 03:00)
        );

        let fixed = TransitionTime::Fixed {
            month: Month::February,
            day: 30,
            time_of_day: time!(0:00),
        };
        assert_eq!(
            fixed.date_in_year(2023).unwrap(),
            datetime!(2023-02-28 00:00)
        );
    }

    #[test]
    fn daylight_boundaries_in_the_northern_hemisphere() {
        let zone = pacific();

        assert!(!zone.is_daylight_at(datetime!(2024-03-10 09:59 UTC)).unwrap());
        assert!(zone.is_daylight_at(datetime!(2024-03-10 10:00 UTC)).unwrap());
        assert!(zone.is_daylight_at(datetime!(2024-11-03 08:59 UTC)).unwrap());
        assert!(!zone.is_daylight_at(datetime!(2024-11-03 09:00 UTC)).unwrap());

        assert_eq!(
            zone.utc_offset_at(datetime!(2024-07-01 00:00 UTC)).unwrap(),
            -Duration::hours(7)
        );
        assert_eq!(
            zone.to_local(datetime!(2024-01-15 20:00 UTC)).unwrap(),
            datetime!(2024-01-15 12:00)
        );
    }

    #[test]
    fn daylight_spanning_the_new_year() {
        let zone = sydney();

        assert!(zone.is_daylight_at(datetime!(2024-01-15 00:00 UTC)).unwrap());
        assert!(!zone.is_daylight_at(datetime!(2024-06-15 00:00 UTC)).unwrap());
        assert!(zone.is_daylight_at(datetime!(2024-12-25 00:00 UTC)).unwrap());
        assert_eq!(
            zone.utc_offset_at(datetime!(2024-01-15 00:00 UTC)).unwrap(),
            Duration::hours(11)
        );
    }

    #[test]
    fn local_times_convert_back_to_utc() {
        let zone = pacific();

        assert_eq!(
            zone.to_utc(datetime!(2024-07-01 12:00)).unwrap(),
            datetime!(2024-07-01 19:00 UTC)
        );
        assert_eq!(
            zone.to_utc(datetime!(2024-01-15 12:00)).unwrap(),
            datetime!(2024-01-15 20:00 UTC)
        );

        // Repeated hour when clocks go back.
        assert_eq!(
            zone.to_utc(datetime!(2024-11-03 01:30)).unwrap(),
            datetime!(2024-11-03 08:30 UTC)
        );

        assert_eq!(
            TimeZoneDefinition::utc()
                .to_utc(datetime!(2024-01-15 12:00))
                .unwrap(),
            datetime!(2024-01-15 12:00 UTC)
        );
    }

    #[test]
    fn server_definitions_are_read() {
        let node = parse(
            r#"<t:TimeZoneDefinition xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" Id="Pacific Standard Time" Name="(UTC-08:00) Pacific Time (US &amp; Canada)">
  <t:Periods>
    <t:Period Bias="PT8H" Name="Standard" Id="trule:Microsoft/Registry/Pacific Standard Time/2006-Standard"/>
    <t:Period Bias="PT7H" Name="Daylight" Id="trule:Microsoft/Registry/Pacific Standard Time/2006-Daylight"/>
    <t:Period Bias="PT8H" Name="Standard" Id="trule:Microsoft/Registry/Pacific Standard Time/2007-Standard"/>
    <t:Period Bias="PT7H" Name="Daylight" Id="trule:Microsoft/Registry/Pacific Standard Time/2007-Daylight"/>
  </t:Periods>
  <t:TransitionsGroups>
    <t:TransitionsGroup Id="0">
      <t:RecurringDayTransition>
        <t:To Kind="Period">trule:Microsoft/Registry/Pacific Standard Time/2006-Daylight</t:To>
        <t:TimeOffset>PT2H</t:TimeOffset>
        <t:Month>4</t:Month>
        <t:DayOfWeek>Sunday</t:DayOfWeek>
        <t:Occurrence>1</t:Occurrence>
      </t:RecurringDayTransition>
      <t:RecurringDayTransition>
        <t:To Kind="Period">trule:Microsoft/Registry/Pacific Standard Time/2006-Standard</t:To>
        <t:TimeOffset>PT2H</t:TimeOffset>
        <t:Month>10</t:Month>
        <t:DayOfWeek>Sunday</t:DayOfWeek>
        <t:Occurrence>-1</t:Occurrence>
      </t:RecurringDayTransition>
    </t:TransitionsGroup>
    <t:TransitionsGroup Id="1">
      <t:RecurringDayTransition>
        <t:To Kind="Period">trule:Microsoft/Registry/Pacific Standard Time/2007-Daylight</t:To>
        <t:TimeOffset>PT2H</t:TimeOffset>
        <t:Month>3</t:Month>
        <t:DayOfWeek>Sunday</t:DayOfWeek>
        <t:Occurrence>2</t:Occurrence>
      </t:RecurringDayTransition>
      <t:RecurringDayTransition>
        <t:To Kind="Period">trule:Microsoft/Registry/Pacific Standard Time/2007-Standard</t:To>
        <t:TimeOffset>PT2H</t:TimeOffset>
        <t:Month>11</t:Month>
        <t:DayOfWeek>Sunday</t:DayOfWeek>
        <t:Occurrence>1</t:Occurrence>
      </t:RecurringDayTransition>
    </t:TransitionsGroup>
  </t:TransitionsGroups>
  <t:Transitions>
    <t:Transition>
      <t:To Kind="Group">0</t:To>
    </t:Transition>
    <t:AbsoluteDateTransition>
      <t:To Kind="Group">1</t:To>
      <t:DateTime>2007-01-01T08:00:00.000Z</t:DateTime>
    </t:AbsoluteDateTransition>
  </t:Transitions>
</t:TimeZoneDefinition>"#,
        );

        let zone = TimeZoneDefinition::from_xml(&node).expect("definition should parse");
        let expected = pacific();

        assert_eq!(zone.name, expected.name);
        assert_eq!(zone.base_offset, expected.base_offset);
        assert_eq!(zone.adjustment, expected.adjustment);
    }

    #[test]
    fn written_definitions_can_be_read_back() {
        let zone = sydney();

        let node = write_fragment(|writer| zone.write_as_element(writer, "t:TimeZoneDefinition"));
        assert_eq!(node.attribute("Id"), Some("AUS Eastern Standard Time"));

        let periods: Vec<_> = node
            .required_child("Periods")
            .unwrap()
            .children_named("Period")
            .map(|period| period.attribute("Bias").unwrap_or_default().to_string())
            .collect();
        assert_eq!(periods, vec!["-PT10H", "-PT11H"]);

        assert_eq!(TimeZoneDefinition::from_xml(&node).unwrap(), zone);
    }

    #[test]
    fn zones_without_daylight_time() {
        let zone = TimeZoneDefinition::utc();
        let node = write_fragment(|writer| zone.write_as_element(writer, "t:TimeZoneDefinition"));

        let parsed = TimeZoneDefinition::from_xml(&node).unwrap();
        assert_eq!(parsed.base_offset, Duration::ZERO);
        assert!(parsed.adjustment.is_none());
        assert!(!parsed
            .is_daylight_at(datetime!(2024-07-01 00:00 UTC))
            .unwrap());
    }
}
