//! Work and break durations.
//!
//! Minutes are whole minutes (`floor`). Open break intervals contribute zero.
//! Work time is not clamped at zero: breaks longer than the span give a
//! negative result.

use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::Span;

/// How the hour part of `H:MM` is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourStyle {
    /// `8:05`
    Unpadded,
    /// `08:05`
    ZeroPadded,
}

pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_seconds().div_euclid(60)
}

/// Sum of closed break intervals.
pub fn break_minutes<'a>(breaks: impl IntoIterator<Item = &'a Span>) -> i64 {
    breaks
        .into_iter()
        .filter_map(|b| b.end.map(|end| minutes_between(b.start, end)))
        .sum()
}

pub fn work_minutes<'a>(
    start: NaiveDateTime,
    end: NaiveDateTime,
    breaks: impl IntoIterator<Item = &'a Span>,
) -> i64 {
    minutes_between(start, end) - break_minutes(breaks)
}

pub fn format_minutes(minutes: i64, style: HourStyle) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let abs = minutes.unsigned_abs();
    let (hours, mins) = (abs / 60, abs % 60);
    match style {
        HourStyle::Unpadded => format!("{sign}{hours}:{mins:02}"),
        HourStyle::ZeroPadded => format!("{sign}{hours:02}:{mins:02}"),
    }
}

/// One day's totals. Only days with both clock-in and clock-out count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTotals {
    pub work_minutes: i64,
    pub break_minutes: i64,
}

impl DayTotals {
    pub fn of(
        clock_in: Option<NaiveDateTime>,
        clock_out: Option<NaiveDateTime>,
        breaks: &[Span],
    ) -> Option<Self> {
        let (start, end) = (clock_in?, clock_out?);
        Some(Self {
            work_minutes: work_minutes(start, end, breaks),
            break_minutes: break_minutes(breaks),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct MonthlySummary {
    #[schema(example = 20)]
    pub work_days: u32,
    #[schema(example = 160.5)]
    pub total_work_hours: f64,
    #[schema(example = 20.0)]
    pub total_break_hours: f64,
}

fn hours_one_decimal(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 10.0).round() / 10.0
}

pub fn summarize(days: impl IntoIterator<Item = DayTotals>) -> MonthlySummary {
    let (mut work_days, mut work, mut rest) = (0u32, 0i64, 0i64);
    for day in days {
        work_days += 1;
        work += day.work_minutes;
        rest += day.break_minutes;
    }
    MonthlySummary {
        work_days,
        total_work_hours: hours_one_decimal(work),
        total_break_hours: hours_one_decimal(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn one_hour_lunch_in_a_nine_hour_day() {
        let breaks = [Span::closed(at(12, 0), at(13, 0))];
        let work = work_minutes(at(9, 0), at(18, 0), &breaks);
        assert_eq!(format_minutes(work, HourStyle::ZeroPadded), "08:00");
        assert_eq!(
            format_minutes(break_minutes(&breaks), HourStyle::ZeroPadded),
            "01:00"
        );
    }

    #[test]
    fn two_breaks_add_up() {
        let breaks = [
            Span::closed(at(10, 0), at(10, 15)),
            Span::closed(at(12, 0), at(13, 0)),
        ];
        assert_eq!(
            format_minutes(break_minutes(&breaks), HourStyle::ZeroPadded),
            "01:15"
        );
        assert_eq!(
            format_minutes(work_minutes(at(9, 0), at(18, 0), &breaks), HourStyle::ZeroPadded),
            "07:45"
        );
    }

    #[test]
    fn open_breaks_count_as_zero() {
        let breaks = [Span::open(at(12, 0)), Span::closed(at(15, 0), at(15, 30))];
        assert_eq!(break_minutes(&breaks), 30);
        assert_eq!(work_minutes(at(9, 0), at(17, 0), &breaks), 450);
    }

    #[test]
    fn partial_minutes_are_floored() {
        let start = at(9, 0);
        let end = start + chrono::Duration::seconds(59 * 60 + 59);
        assert_eq!(minutes_between(start, end), 59);
    }

    #[test]
    fn breaks_longer_than_the_day_go_negative() {
        let breaks = [Span::closed(at(8, 0), at(12, 0))];
        let work = work_minutes(at(9, 0), at(11, 30), &breaks);
        assert_eq!(work, -90);
        assert_eq!(format_minutes(work, HourStyle::Unpadded), "-1:30");
    }

    #[test]
    fn formatter_supports_both_hour_styles() {
        assert_eq!(format_minutes(485, HourStyle::Unpadded), "8:05");
        assert_eq!(format_minutes(485, HourStyle::ZeroPadded), "08:05");
        assert_eq!(format_minutes(0, HourStyle::Unpadded), "0:00");
        assert_eq!(format_minutes(600, HourStyle::ZeroPadded), "10:00");
    }

    #[test]
    fn day_totals_need_both_ends() {
        assert!(DayTotals::of(Some(at(9, 0)), None, &[]).is_none());
        assert!(DayTotals::of(None, Some(at(18, 0)), &[]).is_none());
        assert_eq!(
            DayTotals::of(Some(at(9, 0)), Some(at(18, 0)), &[]),
            Some(DayTotals {
                work_minutes: 540,
                break_minutes: 0
            })
        );
    }

    #[test]
    fn monthly_summary_rounds_to_one_decimal() {
        let summary = summarize([
            DayTotals {
                work_minutes: 480,
                break_minutes: 60,
            },
            DayTotals {
                work_minutes: 465,
                break_minutes: 75,
            },
        ]);
        assert_eq!(summary.work_days, 2);
        // 945 minutes = 15.75 h
        assert_eq!(summary.total_work_hours, 15.8);
        // 135 minutes = 2.25 h
        assert_eq!(summary.total_break_hours, 2.3);
    }
}
