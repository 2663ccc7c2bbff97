use chrono::{Datelike, Duration, NaiveDate};
use indexmap::IndexMap;

use crate::model::hierarchy::TimeEntry;

/// Month-to-date summary of logged hours against an 8h workday budget.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub required_hours: f64,
    pub billable: f64,
    pub non_billable: f64,
    pub today_hours: f64,
}

impl MonthSummary {
    pub fn total(&self) -> f64 {
        self.billable + self.non_billable
    }

    pub fn remaining(&self) -> f64 {
        self.required_hours - self.total()
    }

    pub fn non_billable_percent(&self) -> f64 {
        let total = self.total();
        if total == 0.0 {
            0.0
        } else {
            (1000.0 * self.non_billable / total).round() / 10.0
        }
    }
}

/// Entry dates arrive as ISO timestamps from the report endpoints but are
/// written as yyyymmdd; accept both.
pub fn parse_entry_date(s: &str) -> Option<NaiveDate> {
    let head: String = s.chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .ok()
}

pub fn yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Count weekdays from `start` through `end` inclusive, within `start`'s
/// month (the summary never spans a month boundary).
pub fn workday_count(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut count = 0;
    let mut day = start;
    while day <= end && day.month() == start.month() {
        if day.weekday().number_from_monday() <= 5 {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

pub fn first_of_month(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

pub fn first_of_previous_month(today: NaiveDate) -> NaiveDate {
    first_of_month(first_of_month(today) - Duration::days(1))
}

pub fn last_of_month(today: NaiveDate) -> NaiveDate {
    let next_month = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    };
    match next_month {
        Some(d) => d - Duration::days(1),
        None => today,
    }
}

/// Fold this month's entries into the summary: entries up to and including
/// today count toward the month, split by the billable flag; today's entries
/// also feed the daily total. The required budget is 8h per workday elapsed
/// plus 8h per full workday left.
pub fn month_summary(entries: &[TimeEntry], today: NaiveDate) -> MonthSummary {
    let elapsed = workday_count(first_of_month(today), today);
    let left = workday_count(today, last_of_month(today)) - 1;
    let required_hours = 8.0 * (elapsed + left) as f64;

    let mut billable = 0.0;
    let mut non_billable = 0.0;
    let mut today_hours = 0.0;

    for entry in entries {
        let Some(date) = parse_entry_date(&entry.date) else {
            continue;
        };
        if date > today {
            continue;
        }
        let hours = entry.total_hours();
        if entry.billable {
            billable += hours;
        } else {
            non_billable += hours;
        }
        if date == today {
            today_hours += hours;
        }
    }

    MonthSummary {
        required_hours,
        billable,
        non_billable,
        today_hours,
    }
}

/// Previously-logged tasks, oldest first, one line per distinct task.
pub fn previous_tasks(entries: &[TimeEntry]) -> Vec<String> {
    let mut sorted: Vec<&TimeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let mut seen = indexmap::IndexSet::new();
    for e in sorted {
        seen.insert(format!("{}: {} : {}", e.task_id, e.project_name, e.task_name));
    }
    seen.into_iter().collect()
}

/// Share of logged time per project, largest first.
pub fn percentages(entries: &[TimeEntry]) -> Vec<(String, f64)> {
    let mut by_project: IndexMap<String, f64> = IndexMap::new();
    let mut total = 0.0;
    for e in entries {
        let hours = e.total_hours();
        *by_project.entry(e.project_name.clone()).or_insert(0.0) += hours;
        total += hours;
    }
    if total == 0.0 {
        return Vec::new();
    }
    let mut shares: Vec<(String, f64)> = by_project
        .into_iter()
        .map(|(name, hours)| (name, (1000.0 * hours / total).round() / 10.0))
        .collect();
    shares.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    shares
}

/// Resolve a "since" argument: `week` → seven days back, `month` → the first
/// of this month, otherwise a yyyymmdd date (falling back to today).
pub fn since_date(when: &str, today: NaiveDate) -> NaiveDate {
    match when {
        "week" => today - Duration::days(7),
        "month" => first_of_month(today),
        other => parse_entry_date(other).unwrap_or(today),
    }
}
