use crate::errors::AppError;
use crate::models::RaceDays;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

const DAYS_IN_WEEK: usize = 7;

/// A displayed calendar page. `month` is zero-based (0 = January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if month > 11 {
            return Err(AppError::bad_request("month must be between 0 and 11"));
        }
        let this = Self { year, month };
        // The page and both of its navigation targets must be real dates.
        let in_range = [this.prev(), this, this.next()]
            .iter()
            .all(|candidate| candidate.first_day().is_some())
            && this.prev() != this
            && this.next() != this;
        if !in_range {
            return Err(AppError::bad_request(format!("year {year} is out of range")));
        }
        Ok(this)
    }

    pub fn current(today: NaiveDate) -> Self {
        Self {
            year: today.year(),
            month: today.month0(),
        }
    }

    /// The following month. Stays put at the end of `i32`.
    pub fn next(self) -> Self {
        if self.month < 11 {
            return Self { year: self.year, month: self.month + 1 };
        }
        match self.year.checked_add(1) {
            Some(year) => Self { year, month: 0 },
            None => self,
        }
    }

    /// The preceding month. Stays put at the start of `i32`.
    pub fn prev(self) -> Self {
        if self.month > 0 {
            return Self { year: self.year, month: self.month - 1 };
        }
        match self.year.checked_sub(1) {
            Some(year) => Self { year, month: 11 },
            None => self,
        }
    }

    pub fn heading(self) -> String {
        format!("{}年 {}月", self.year, self.month + 1)
    }

    fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarCell {
    Empty,
    Day { day: u32, is_race_day: bool },
}

/// Monday-first weeks. Every week but the last holds exactly seven cells;
/// the last one is left short rather than padded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub weeks: Vec<Vec<CalendarCell>>,
}

impl Grid {
    pub fn cells(&self) -> impl Iterator<Item = &CalendarCell> {
        self.weeks.iter().flatten()
    }

    pub fn leading_blanks(&self) -> usize {
        self.cells()
            .take_while(|cell| matches!(cell, CalendarCell::Empty))
            .count()
    }

    pub fn day_count(&self) -> usize {
        self.cells()
            .filter(|cell| matches!(cell, CalendarCell::Day { .. }))
            .count()
    }
}

pub fn date_key(year: i32, month: u32, day: u32) -> String {
    format!("{year:04}{:02}{day:02}", month + 1)
}

pub fn date_key_for(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parses an 8-digit `YYYYMMDD` key into a real calendar date.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    if key.len() != 8 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(key, "%Y%m%d").ok()
}

pub fn leading_blanks(first: NaiveDate) -> usize {
    match first.weekday().num_days_from_sunday() {
        0 => 6,
        n => n as usize - 1,
    }
}

pub fn days_in_month(month: MonthRef) -> u32 {
    if month.month == 11 {
        return 31;
    }
    NaiveDate::from_ymd_opt(month.year, month.month + 2, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

pub fn build_grid(month: MonthRef, race_days: &RaceDays) -> Grid {
    let Some(first) = month.first_day() else {
        return Grid { weeks: Vec::new() };
    };

    let blanks = leading_blanks(first);
    let days = days_in_month(month);

    let mut cells = Vec::with_capacity(blanks + days as usize);
    cells.extend(std::iter::repeat_n(CalendarCell::Empty, blanks));
    for day in 1..=days {
        let key = date_key(month.year, month.month, day);
        cells.push(CalendarCell::Day {
            day,
            is_race_day: race_days.contains(&key),
        });
    }

    Grid {
        weeks: cells.chunks(DAYS_IN_WEEK).map(<[CalendarCell]>::to_vec).collect(),
    }
}
