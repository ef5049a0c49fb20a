//! crates/trip_planner_core/src/calendar.rs
//!
//! The date-range selector behind the calendar overlay. A sequence of single
//! day taps is folded into a start/end range; the calendar markings and the
//! summary text are recomputed on every tap so they can never go stale.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// How a day is highlighted on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayMark {
    Start,
    End,
    InRange,
}

impl DayMark {
    pub fn as_str(self) -> &'static str {
        match self {
            DayMark::Start => "start",
            DayMark::End => "end",
            DayMark::InRange => "in-range",
        }
    }
}

/// The currently selected trip dates, plus the data derived from them.
///
/// Fields are only reachable through accessors; the only way to get a
/// different selection is [`select_day`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateSelection {
    starts_at: Option<NaiveDate>,
    ends_at: Option<NaiveDate>,
    marked_dates: BTreeMap<String, DayMark>,
    display_text: String,
}

impl DateSelection {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_bounds(starts_at: Option<NaiveDate>, ends_at: Option<NaiveDate>) -> Self {
        Self {
            starts_at,
            ends_at,
            marked_dates: mark_range(starts_at, ends_at),
            display_text: format_range(starts_at, ends_at),
        }
    }

    pub fn starts_at(&self) -> Option<NaiveDate> {
        self.starts_at
    }

    pub fn ends_at(&self) -> Option<NaiveDate> {
        self.ends_at
    }

    /// ISO date (`YYYY-MM-DD`) to marking, ordered by date.
    pub fn marked_dates(&self) -> &BTreeMap<String, DayMark> {
        &self.marked_dates
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Both bounds are set.
    pub fn is_complete(&self) -> bool {
        self.starts_at.is_some() && self.ends_at.is_some()
    }

    /// Both bounds, when the range is complete.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.starts_at.zip(self.ends_at)
    }

    /// Number of days in the inclusive range; 0 until the range is complete.
    pub fn day_count(&self) -> usize {
        match self.bounds() {
            Some((start, end)) => ((end - start).num_days() + 1) as usize,
            None => 0,
        }
    }
}

/// Folds one day tap into the current selection.
///
/// * no start yet: the day becomes the start
/// * start only: an earlier day restarts the range, anything else closes it
/// * full range: the day starts a fresh range
///
/// Never rejects a day; callers restrict which days can be tapped.
pub fn select_day(current: &DateSelection, day: NaiveDate) -> DateSelection {
    match (current.starts_at, current.ends_at) {
        (Some(start), None) if day >= start => DateSelection::from_bounds(Some(start), Some(day)),
        _ => DateSelection::from_bounds(Some(day), None),
    }
}

fn mark_range(
    starts_at: Option<NaiveDate>,
    ends_at: Option<NaiveDate>,
) -> BTreeMap<String, DayMark> {
    let mut marks = BTreeMap::new();
    let Some(start) = starts_at else {
        return marks;
    };
    let end = ends_at.unwrap_or(start);

    for day in start.iter_days().take_while(|day| *day <= end) {
        let mark = if day == start {
            DayMark::Start
        } else if day == end {
            DayMark::End
        } else {
            DayMark::InRange
        };
        marks.insert(day.format("%Y-%m-%d").to_string(), mark);
    }
    marks
}

fn format_range(starts_at: Option<NaiveDate>, ends_at: Option<NaiveDate>) -> String {
    match starts_at.zip(ends_at) {
        Some((start, end)) => format!("{} a {}", start.format("%d/%m"), end.format("%d/%m")),
        None => String::new(),
    }
}
