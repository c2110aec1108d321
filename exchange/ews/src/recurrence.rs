/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{collections::VecDeque, io::Write};

use time::{Date, Duration, Weekday};
use xml::{writer::XmlEvent, EventWriter};

use crate::{
    types::{parse_date, DayOfWeek, DayOfWeekIndex, Month},
    xml::{WriteResult, XmlElement, XmlNode},
    Error,
};

/// The recurrence of a task: how often it repeats and for how long.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/recurrence-taskrecurrencetype>.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
pub struct Recurrence {
    #[xml_serialize(flatten)]
    pub pattern: RecurrencePattern,

    #[xml_serialize(flatten)]
    pub range: RecurrenceRange,
}

/// How often an item recurs.
///
/// The regeneration patterns only exist for tasks: the next occurrence is
/// scheduled relative to the completion of the current one.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
#[xml_serialize(ns_prefix = "t")]
pub enum RecurrencePattern {
    DailyRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,
    },

    WeeklyRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,

        #[xml_serialize(ns_prefix = "t")]
        days_of_week: DaysOfWeek,

        #[xml_serialize(ns_prefix = "t")]
        first_day_of_week: Option<DayOfWeek>,
    },

    AbsoluteMonthlyRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,

        #[xml_serialize(ns_prefix = "t")]
        day_of_month: u8,
    },

    RelativeMonthlyRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,

        #[xml_serialize(ns_prefix = "t")]
        days_of_week: DayOfWeek,

        #[xml_serialize(ns_prefix = "t")]
        day_of_week_index: DayOfWeekIndex,
    },

    AbsoluteYearlyRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        day_of_month: u8,

        #[xml_serialize(ns_prefix = "t")]
        month: Month,
    },

    RelativeYearlyRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        days_of_week: DayOfWeek,

        #[xml_serialize(ns_prefix = "t")]
        day_of_week_index: DayOfWeekIndex,

        #[xml_serialize(ns_prefix = "t")]
        month: Month,
    },

    DailyRegeneration {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,
    },

    WeeklyRegeneration {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,
    },

    MonthlyRegeneration {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,
    },

    YearlyRegeneration {
        #[xml_serialize(ns_prefix = "t")]
        interval: u32,
    },
}

/// A set of days, written as a space-separated list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DaysOfWeek(pub Vec<DayOfWeek>);

impl XmlElement for DaysOfWeek {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        let days = self
            .0
            .iter()
            .map(|day| day.as_ref())
            .collect::<Vec<_>>()
            .join(" ");

        writer.write(XmlEvent::characters(&days))
    }
}

impl From<Vec<DayOfWeek>> for DaysOfWeek {
    fn from(value: Vec<DayOfWeek>) -> Self {
        Self(value)
    }
}

/// When a recurrence starts and how it ends.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
#[xml_serialize(ns_prefix = "t")]
pub enum RecurrenceRange {
    NoEndRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        start_date: Date,
    },

    EndDateRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        start_date: Date,

        #[xml_serialize(ns_prefix = "t")]
        end_date: Date,
    },

    NumberedRecurrence {
        #[xml_serialize(ns_prefix = "t")]
        start_date: Date,

        #[xml_serialize(ns_prefix = "t")]
        number_of_occurrences: u32,
    },
}

impl RecurrenceRange {
    pub fn start_date(&self) -> Date {
        match self {
            RecurrenceRange::NoEndRecurrence { start_date }
            | RecurrenceRange::EndDateRecurrence { start_date, .. }
            | RecurrenceRange::NumberedRecurrence { start_date, .. } => *start_date,
        }
    }

    fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        let start_date = parse_date(&node.required_child("StartDate")?.text)?;

        match node.name.as_str() {
            "NoEndRecurrence" => Ok(RecurrenceRange::NoEndRecurrence { start_date }),
            "EndDateRecurrence" => Ok(RecurrenceRange::EndDateRecurrence {
                start_date,
                end_date: parse_date(&node.required_child("EndDate")?.text)?,
            }),
            "NumberedRecurrence" => Ok(RecurrenceRange::NumberedRecurrence {
                start_date,
                number_of_occurrences: node.required_child("NumberOfOccurrences")?.parse_text()?,
            }),
            other => Err(Error::UnexpectedXml(format!(
                "unknown recurrence range `{other}`"
            ))),
        }
    }
}

impl RecurrencePattern {
    pub fn is_regeneration(&self) -> bool {
        matches!(
            self,
            RecurrencePattern::DailyRegeneration { .. }
                | RecurrencePattern::WeeklyRegeneration { .. }
                | RecurrencePattern::MonthlyRegeneration { .. }
                | RecurrencePattern::YearlyRegeneration { .. }
        )
    }

    fn interval(&self) -> Option<u32> {
        match self {
            RecurrencePattern::DailyRecurrence { interval }
            | RecurrencePattern::WeeklyRecurrence { interval, .. }
            | RecurrencePattern::AbsoluteMonthlyRecurrence { interval, .. }
            | RecurrencePattern::RelativeMonthlyRecurrence { interval, .. }
            | RecurrencePattern::DailyRegeneration { interval }
            | RecurrencePattern::WeeklyRegeneration { interval }
            | RecurrencePattern::MonthlyRegeneration { interval }
            | RecurrencePattern::YearlyRegeneration { interval } => Some(*interval),
            RecurrencePattern::AbsoluteYearlyRecurrence { .. }
            | RecurrencePattern::RelativeYearlyRecurrence { .. } => None,
        }
    }

    fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        let interval = || node.required_child("Interval")?.parse_text::<u32>();
        let day_of_month = || node.required_child("DayOfMonth")?.parse_text::<u8>();
        let days_of_week = || node.required_child("DaysOfWeek")?.parse_text::<DayOfWeek>();
        let day_of_week_index = || {
            node.required_child("DayOfWeekIndex")?
                .parse_text::<DayOfWeekIndex>()
        };
        let month = || node.required_child("Month")?.parse_text::<Month>();

        let pattern = match node.name.as_str() {
            "DailyRecurrence" => RecurrencePattern::DailyRecurrence {
                interval: interval()?,
            },
            "WeeklyRecurrence" => RecurrencePattern::WeeklyRecurrence {
                interval: interval()?,
                days_of_week: DaysOfWeek(
                    node.required_child("DaysOfWeek")?
                        .text
                        .split_whitespace()
                        .map(|day| {
                            day.parse().map_err(|_| {
                                Error::UnexpectedXml(format!("invalid day of week `{day}`"))
                            })
                        })
                        .collect::<Result<_, _>>()?,
                ),
                first_day_of_week: node
                    .child("FirstDayOfWeek")
                    .map(XmlNode::parse_text)
                    .transpose()?,
            },
            "AbsoluteMonthlyRecurrence" => RecurrencePattern::AbsoluteMonthlyRecurrence {
                interval: interval()?,
                day_of_month: day_of_month()?,
            },
            "RelativeMonthlyRecurrence" => RecurrencePattern::RelativeMonthlyRecurrence {
                interval: interval()?,
                days_of_week: days_of_week()?,
                day_of_week_index: day_of_week_index()?,
            },
            "AbsoluteYearlyRecurrence" => RecurrencePattern::AbsoluteYearlyRecurrence {
                day_of_month: day_of_month()?,
                month: month()?,
            },
            "RelativeYearlyRecurrence" => RecurrencePattern::RelativeYearlyRecurrence {
                days_of_week: days_of_week()?,
                day_of_week_index: day_of_week_index()?,
                month: month()?,
            },
            "DailyRegeneration" => RecurrencePattern::DailyRegeneration {
                interval: interval()?,
            },
            "WeeklyRegeneration" => RecurrencePattern::WeeklyRegeneration {
                interval: interval()?,
            },
            "MonthlyRegeneration" => RecurrencePattern::MonthlyRegeneration {
                interval: interval()?,
            },
            "YearlyRegeneration" => RecurrencePattern::YearlyRegeneration {
                interval: interval()?,
            },
            other => {
                return Err(Error::UnexpectedXml(format!(
                    "unknown recurrence pattern `{other}`"
                )))
            }
        };

        Ok(pattern)
    }
}

impl Recurrence {
    pub fn new(pattern: RecurrencePattern, range: RecurrenceRange) -> Self {
        Self { pattern, range }
    }

    /// Reads a `t:Recurrence` element.
    pub fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        let mut pattern = None;
        let mut range = None;

        for child in &node.children {
            if child.name.ends_with("Recurrence") && child.child("StartDate").is_some() {
                range = Some(RecurrenceRange::from_xml(child)?);
            } else {
                pattern = Some(RecurrencePattern::from_xml(child)?);
            }
        }

        match (pattern, range) {
            (Some(pattern), Some(range)) => Ok(Self { pattern, range }),
            _ => Err(Error::UnexpectedXml(
                "recurrence must have a pattern and a range".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.pattern.interval() == Some(0) {
            return Err(Error::Validation(
                "recurrence interval must be at least 1".to_string(),
            ));
        }

        match &self.pattern {
            RecurrencePattern::WeeklyRecurrence { days_of_week, .. }
                if days_of_week.0.is_empty() =>
            {
                return Err(Error::Validation(
                    "weekly recurrence needs at least one day of the week".to_string(),
                ));
            }

            RecurrencePattern::AbsoluteMonthlyRecurrence { day_of_month, .. }
                if !(1..=31).contains(day_of_month) =>
            {
                return Err(Error::Validation(format!(
                    "day of month {day_of_month} is out of range"
                )));
            }

            RecurrencePattern::AbsoluteYearlyRecurrence {
                day_of_month,
                month,
            } => {
                // February 29th is allowed and falls back to the 28th in
                // common years.
                let max_day = time::Month::from(*month).length(2024);
                if !(1..=max_day).contains(day_of_month) {
                    return Err(Error::Validation(format!(
                        "day of month {day_of_month} is out of range for {month}"
                    )));
                }
            }

            _ => {}
        }

        match &self.range {
            RecurrenceRange::NumberedRecurrence {
                number_of_occurrences: 0,
                ..
            } => Err(Error::Validation(
                "number of occurrences must be at least 1".to_string(),
            )),

            RecurrenceRange::EndDateRecurrence {
                start_date,
                end_date,
            } if end_date < start_date => Err(Error::Validation(format!(
                "end date {end_date} is before start date {start_date}"
            ))),

            _ => Ok(()),
        }
    }

    /// Iterates over the dates on which the recurrence occurs, in order,
    /// starting at the start date of the range.
    ///
    /// The iterator is unbounded for ranges without end.
    pub fn occurrences(&self) -> Result<Occurrences, Error> {
        self.validate()?;

        if self.pattern.is_regeneration() {
            return Err(Error::Validation(
                "regenerating recurrences have no fixed occurrences".to_string(),
            ));
        }

        Ok(Occurrences {
            recurrence: self.clone(),
            period: 0,
            emitted: 0,
            pending: VecDeque::new(),
            done: false,
        })
    }
}

/// Occurrence dates of a [`Recurrence`].
#[derive(Clone, Debug)]
pub struct Occurrences {
    recurrence: Recurrence,
    period: u32,
    emitted: u32,
    pending: VecDeque<Date>,
    done: bool,
}

impl Occurrences {
    /// Fills `pending` with the occurrences of the next period.
    fn fill_period(&mut self) -> Result<(), Error> {
        let start = self.recurrence.range.start_date();
        let period = i64::from(self.period);
        self.period += 1;

        let mut dates = match &self.recurrence.pattern {
            RecurrencePattern::DailyRecurrence { interval } => {
                vec![add_days(start, period.checked_mul(i64::from(*interval)))?]
            }

            RecurrencePattern::WeeklyRecurrence {
                interval,
                days_of_week,
                first_day_of_week,
            } => {
                let first_day = first_day_of_week
                    .and_then(|day| Weekday::try_from(day).ok())
                    .unwrap_or(Weekday::Sunday);
                let into_week = (7 + start.weekday().number_days_from_sunday()
                    - first_day.number_days_from_sunday())
                    % 7;
                let week_start = add_days(
                    add_days(start, Some(-i64::from(into_week)))?,
                    period
                        .checked_mul(i64::from(*interval))
                        .and_then(|weeks| weeks.checked_mul(7)),
                )?;

                (0..7)
                    .filter_map(|offset| week_start.checked_add(Duration::days(offset)))
                    .filter(|date| days_of_week.0.iter().any(|day| day.matches(date.weekday())))
                    .collect()
            }

            RecurrencePattern::AbsoluteMonthlyRecurrence {
                interval,
                day_of_month,
            } => {
                let (year, month) = add_months(start, period * i64::from(*interval))?;
                vec![clamped_date(year, month, *day_of_month)?]
            }

            RecurrencePattern::RelativeMonthlyRecurrence {
                interval,
                days_of_week,
                day_of_week_index,
            } => {
                let (year, month) = add_months(start, period * i64::from(*interval))?;
                vec![nth_matching_day(year, month, *days_of_week, *day_of_week_index)?]
            }

            RecurrencePattern::AbsoluteYearlyRecurrence {
                day_of_month,
                month,
            } => {
                let year = year_at(start, period)?;
                vec![clamped_date(year, (*month).into(), *day_of_month)?]
            }

            RecurrencePattern::RelativeYearlyRecurrence {
                days_of_week,
                day_of_week_index,
                month,
            } => {
                let year = year_at(start, period)?;
                vec![nth_matching_day(
                    year,
                    (*month).into(),
                    *days_of_week,
                    *day_of_week_index,
                )?]
            }

            _ => Vec::new(),
        };

        dates.retain(|date| *date >= start);
        self.pending.extend(dates);

        Ok(())
    }
}

impl Iterator for Occurrences {
    type Item = Date;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // The first periods may precede the start date; a handful of empty
        // periods in a row means the pattern can never match.
        let mut empty_periods = 0;
        while self.pending.is_empty() {
            if empty_periods > 2 || self.fill_period().is_err() {
                self.done = true;
                return None;
            }
            empty_periods += 1;
        }

        let date = self.pending.pop_front()?;

        let exhausted = match &self.recurrence.range {
            RecurrenceRange::NoEndRecurrence { .. } => false,
            RecurrenceRange::EndDateRecurrence { end_date, .. } => date > *end_date,
            RecurrenceRange::NumberedRecurrence {
                number_of_occurrences,
                ..
            } => self.emitted >= *number_of_occurrences,
        };

        if exhausted {
            self.done = true;
            return None;
        }

        self.emitted += 1;
        Some(date)
    }
}

/// The date of the nth (or last) day of a month matching a day of the week
/// or class of days.
pub(crate) fn nth_matching_day(
    year: i32,
    month: time::Month,
    day: DayOfWeek,
    index: DayOfWeekIndex,
) -> Result<Date, Error> {
    let mut matching = (1..=month.length(year))
        .filter_map(|day_of_month| Date::from_calendar_date(year, month, day_of_month).ok())
        .filter(|date| day.matches(date.weekday()));

    let date = match index.position() {
        Some(position) => matching.nth(position),
        None => matching.last(),
    };

    date.ok_or_else(|| {
        Error::Validation(format!("there is no {index} {day} in {month} {year}"))
    })
}

fn clamped_date(year: i32, month: time::Month, day: u8) -> Result<Date, Error> {
    let day = day.min(month.length(year));

    Ok(Date::from_calendar_date(year, month, day)?)
}

/// Moves `date` by a number of days, `None` standing for an overflowed
/// count.
fn add_days(date: Date, days: Option<i64>) -> Result<Date, Error> {
    days.and_then(|days| days.checked_mul(86_400))
        .and_then(|seconds| date.checked_add(Duration::seconds(seconds)))
        .ok_or_else(|| Error::Validation("recurrence date out of range".to_string()))
}

fn add_months(start: Date, months: i64) -> Result<(i32, time::Month), Error> {
    let index = i64::from(start.year()) * 12 + i64::from(u8::from(start.month())) - 1 + months;

    let year = i32::try_from(index.div_euclid(12))
        .map_err(|_| Error::Validation("recurrence date out of range".to_string()))?;
    let month = time::Month::try_from((index.rem_euclid(12) + 1) as u8)?;

    Ok((year, month))
}

fn year_at(start: Date, period: i64) -> Result<i32, Error> {
    i32::try_from(i64::from(start.year()) + period)
        .map_err(|_| Error::Validation("recurrence date out of range".to_string()))
}
