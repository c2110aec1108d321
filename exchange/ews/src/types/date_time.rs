/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{fmt, io::Write, str::FromStr};

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, Duration,
    OffsetDateTime, UtcOffset,
};
use xml::{writer::XmlEvent, EventWriter};

use crate::{
    xml::{WriteResult, XmlElement},
    Error,
};

/// A point in time as exchanged with the server.
///
/// Values are always written in UTC (`2024-01-31T08:30:00Z`). Values read
/// without an offset are interpreted as UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(pub OffsetDateTime);

impl DateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        let value = value.trim();

        let parsed = match OffsetDateTime::parse(value, &Rfc3339) {
            Ok(parsed) => parsed,
            Err(_) => OffsetDateTime::parse(&format!("{value}Z"), &Rfc3339)?,
        };

        Ok(Self(parsed))
    }

    /// Formats the value in UTC with second precision.
    pub fn to_ews_string(&self) -> Result<String, Error> {
        Ok(self
            .0
            .to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
            ))?)
    }

    pub fn date(&self) -> Date {
        self.0.to_offset(UtcOffset::UTC).date()
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(value: OffsetDateTime) -> Self {
        Self(value)
    }
}

impl FromStr for DateTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_ews_string() {
            Ok(value) => f.write_str(&value),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl XmlElement for DateTime {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        let value = self
            .to_ews_string()
            .map_err(|err| xml::writer::Error::Io(std::io::Error::other(err)))?;

        writer.write(XmlEvent::characters(&value))
    }
}

/// Parses an `xs:date`, ignoring any time zone suffix (`2024-03-10`,
/// `2024-03-10Z`, `2024-03-10-08:00`).
pub fn parse_date(value: &str) -> Result<Date, Error> {
    let value = value.trim();
    let date = value
        .get(..10)
        .ok_or_else(|| Error::DateTime(format!("`{value}` is not a date")))?;

    Ok(Date::parse(date, format_description!("[year]-[month]-[day]"))?)
}

/// Parses the day-time subset of an `xs:duration` (`PT8H`, `-PT1H30M`,
/// `P1DT2H`, `PT0.5S`).
pub fn parse_duration(value: &str) -> Result<Duration, Error> {
    let invalid = || Error::DateTime(format!("`{value}` is not a supported duration"));

    let value = value.trim();
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let rest = rest.strip_prefix('P').ok_or_else(invalid)?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date_part, time_part)) => (date_part, Some(time_part)),
        None => (rest, None),
    };

    let mut total = Duration::ZERO;
    let mut number = String::new();

    for character in date_part.chars() {
        match character {
            '0'..='9' => number.push(character),
            'D' => {
                let days: i64 = number.parse().map_err(|_| invalid())?;
                total += Duration::days(days);
                number.clear();
            }

            // Years and months have no fixed length.
            'Y' | 'M' if number.parse::<i64>().map_err(|_| invalid())? == 0 => number.clear(),
            _ => return Err(invalid()),
        }
    }

    if let Some(time_part) = time_part {
        if time_part.is_empty() {
            return Err(invalid());
        }

        for character in time_part.chars() {
            match character {
                '0'..='9' | '.' => number.push(character),
                'H' => {
                    let hours: i64 = number.parse().map_err(|_| invalid())?;
                    total += Duration::hours(hours);
                    number.clear();
                }
                'M' => {
                    let minutes: i64 = number.parse().map_err(|_| invalid())?;
                    total += Duration::minutes(minutes);
                    number.clear();
                }
                'S' => {
                    let seconds: f64 = number.parse().map_err(|_| invalid())?;
                    total += Duration::seconds_f64(seconds);
                    number.clear();
                }
                _ => return Err(invalid()),
            }
        }
    }

    if !number.is_empty() {
        return Err(invalid());
    }

    Ok(if negative { -total } else { total })
}

/// Formats a duration as an `xs:duration` with hour, minute and second
/// components.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "PT0S".to_string();
    }

    let sign = if duration.is_negative() { "-" } else { "" };
    let duration = duration.abs();

    let hours = duration.whole_hours();
    let minutes = duration.whole_minutes() % 60;
    let seconds = duration.whole_seconds() % 60;

    let mut value = format!("{sign}PT");
    if hours > 0 {
        value.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        value.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 {
        value.push_str(&format!("{seconds}S"));
    }

    value
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn date_times_accept_offsets_and_bare_values() {
        assert_eq!(
            DateTime::parse("2024-01-31T08:30:00Z").unwrap().0,
            datetime!(2024-01-31 08:30:00 UTC)
        );
        assert_eq!(
            DateTime::parse("2024-01-31T08:30:00.123-08:00")
                .unwrap()
                .to_ews_string()
                .unwrap(),
            "2024-01-31T16:30:00Z"
        );
        assert_eq!(
            DateTime::parse("2024-01-31T08:30:00").unwrap().0,
            datetime!(2024-01-31 08:30:00 UTC)
        );
        assert!(DateTime::parse("yesterday").is_err());
    }

    #[test]
    fn dates_ignore_zone_suffix() {
        assert_eq!(parse_date("2024-03-10").unwrap(), date!(2024 - 03 - 10));
        assert_eq!(parse_date("2024-03-10Z").unwrap(), date!(2024 - 03 - 10));
        assert_eq!(parse_date("2024-03-10-08:00").unwrap(), date!(2024 - 03 - 10));
        assert!(parse_date("2024").is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("PT8H").unwrap(), Duration::hours(8));
        assert_eq!(
            parse_duration("-PT1H30M").unwrap(),
            -Duration::minutes(90)
        );
        assert_eq!(
            parse_duration("P0DT2H0M0.0S").unwrap(),
            Duration::hours(2)
        );
        assert_eq!(parse_duration("P1D").unwrap(), Duration::days(1));
        assert!(parse_duration("P1M").is_err());
        assert!(parse_duration("8H").is_err());
        assert!(parse_duration("PT").is_err());

        assert_eq!(format_duration(Duration::hours(8)), "PT8H");
        assert_eq!(format_duration(-Duration::minutes(90)), "-PT1H30M");
        assert_eq!(format_duration(Duration::ZERO), "PT0S");
    }
}
