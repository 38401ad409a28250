// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Natural-language date resolution in a fixed reference timezone.
//!
//! Resolution never fails: anything that cannot be understood resolves to
//! today. Day-month phrases are read day first.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use regex::Regex;
use tracing::warn;

use cinebot_storage::START_TIME_FORMAT;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})").unwrap());

static DAY_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[-/.](\d{1,2})(?:[-/.](\d{4}))?").unwrap());

const TODAY_WORDS: &[&str] = &["hôm nay", "today"];
const TOMORROW_WORDS: &[&str] = &["ngày mai", "tomorrow"];

/// Resolves date phrases and converts instants against a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct DateResolver {
    offset: FixedOffset,
}

impl Default for DateResolver {
    /// UTC+7.
    fn default() -> Self {
        Self::with_offset_hours(7).unwrap_or(Self { offset: Utc.fix() })
    }
}

impl DateResolver {
    /// Resolver for a whole-hour offset from UTC. `None` if out of range.
    pub fn with_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(|offset| Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar date of `now` in the reference timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Resolve against the wall clock.
    pub fn resolve_now(&self, phrase: Option<&str>) -> NaiveDate {
        self.resolve(phrase, Utc::now())
    }

    /// Resolve a phrase against an explicit anchor instant.
    pub fn resolve(&self, phrase: Option<&str>, now: DateTime<Utc>) -> NaiveDate {
        let today = self.today(now);
        let Some(phrase) = phrase.map(str::trim).filter(|p| !p.is_empty()) else {
            return today;
        };
        let lower = phrase.to_lowercase();

        if TODAY_WORDS.iter().any(|w| lower.contains(w)) {
            return today;
        }
        if TOMORROW_WORDS.iter().any(|w| lower.contains(w)) {
            return today + Days::new(1);
        }

        if let Some(caps) = ISO_DATE.captures(&lower) {
            if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
                return date;
            }
        } else if let Some(caps) = DAY_MONTH.captures(&lower) {
            let explicit = caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok());
            let year = explicit.unwrap_or_else(|| today.year());
            let on = |year: i32| ymd(&year.to_string(), &caps[2], &caps[1]);
            // A past date moves to the following year. Without a year, a
            // date missing from this year (29-02) may still exist in the next.
            match on(year) {
                Some(date) if date >= today => return date,
                Some(_) => {
                    if let Some(date) = on(year + 1) {
                        return date;
                    }
                }
                None if explicit.is_none() => {
                    if let Some(date) = on(year + 1) {
                        return date;
                    }
                }
                None => {}
            }
        }

        warn!(phrase = %phrase, today = %today, "unparseable date phrase, using today");
        today
    }

    /// UTC bounds `[start, end)` of a calendar day in the reference timezone.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let local_midnight = |d: NaiveDate| {
            let naive = d.and_hms_opt(0, 0, 0).unwrap_or_default();
            (naive - self.offset).and_utc()
        };
        let next = date.succ_opt().unwrap_or(date);
        (local_midnight(date), local_midnight(next))
    }

    /// `HH:MM` of a stored instant in the reference timezone.
    ///
    /// Accepts RFC 3339 with any offset, or a bare `YYYY-MM-DD HH:MM:SS`
    /// taken as UTC.
    pub fn clock_time(&self, instant: &str) -> Option<String> {
        let utc = parse_instant(instant)?;
        Some(utc.with_timezone(&self.offset).format("%H:%M").to_string())
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Parse a stored instant into UTC.
pub fn parse_instant(instant: &str) -> Option<DateTime<Utc>> {
    let instant = instant.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(instant) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(instant, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format an instant the way `showtimes.start_time` stores it.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(START_TIME_FORMAT).to_string()
}
