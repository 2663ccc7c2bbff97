use crate::model::hierarchy::{TimeEntry, TimeTotal};
use crate::ops::reports::MonthSummary;

/// Render milliseconds as `Xh Ym`.
pub fn duration_string(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let ms = ms.abs();
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    format!("{}{}h {}m", sign, hours, minutes)
}

/// Parse `HH:MM` into (hours, minutes).
pub fn parse_hhmm(s: &str) -> Option<(i64, i64)> {
    let (h, m) = s.split_once(':')?;
    let h = h.trim().parse().ok()?;
    let m = m.trim().parse().ok()?;
    if !(0..60).contains(&m) {
        return None;
    }
    Some((h, m))
}

/// Length between two `HH:MM` clock times as (hours, minutes). A negative
/// span assumes the end time rolled past a 12-hour clock face.
pub fn time_diff(start: &str, end: &str) -> Option<(i64, i64)> {
    let (sh, sm) = parse_hhmm(start)?;
    let (eh, em) = parse_hhmm(end)?;
    let mut hours = eh - sh;
    let mut minutes = em - sm;
    if hours < 0 {
        hours += 12;
    }
    if minutes < 0 {
        hours -= 1;
        minutes += 60;
    }
    Some((hours, minutes))
}

/// Multi-line block for one time entry, as the date reports print them.
pub fn format_entry_block(e: &TimeEntry) -> Vec<String> {
    vec![
        format!("  {}", e.description),
        format!("    Project: {}", e.project_name),
        format!("    TaskName: {}", e.task_name),
        format!("    TaskId: {}", e.task_id),
        format!("    Billable: {}", if e.billable { "Yes" } else { "No" }),
        format!("    Hours: {:.2}", e.total_hours()),
    ]
}

pub fn format_month_summary(s: &MonthSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Month Required Hours: {}", s.required_hours),
        format!("Logged Total Hours: {}", s.total()),
        String::new(),
        format!("Logged Billable Hours: {}", s.billable),
        format!(
            "Logged NonBillable Hours: {} ({}%)",
            s.non_billable,
            s.non_billable_percent()
        ),
        format!("Remaining Monthly Hours: {}", s.remaining()),
        String::new(),
        format!("Total today: {}", s.today_hours),
    ];
    let worked = s.total();
    if worked > s.required_hours {
        lines.push(format!(
            "You are {} over for today.",
            worked - s.required_hours
        ));
    } else {
        lines.push(format!(
            "You are {} short for today.",
            s.required_hours - worked
        ));
    }
    lines
}

pub fn format_total(label: &str, t: &TimeTotal) -> Vec<String> {
    vec![
        format!("Total time for {}:", label),
        format!("  Total: {}h", t.total),
        format!("  Billable: {}h", t.billable),
        format!("  NonBillable: {}h", t.non_billable),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duration_strings() {
        assert_eq!(duration_string(0), "0h 0m");
        assert_eq!(duration_string(90 * 60_000), "1h 30m");
        assert_eq!(duration_string(-30 * 60_000), "-0h 30m");
        assert_eq!(duration_string(8 * 3_600_000 + 5 * 60_000), "8h 5m");
    }

    #[test]
    fn hhmm_parsing() {
        assert_eq!(parse_hhmm("09:00"), Some((9, 0)));
        assert_eq!(parse_hhmm("13:45"), Some((13, 45)));
        assert_eq!(parse_hhmm("13:60"), None);
        assert_eq!(parse_hhmm("nope"), None);
    }

    #[test]
    fn time_diff_spans() {
        assert_eq!(time_diff("09:00", "10:30"), Some((1, 30)));
        assert_eq!(time_diff("09:45", "10:15"), Some((0, 30)));
        // 12-hour wrap for times written without am/pm.
        assert_eq!(time_diff("11:00", "01:00"), Some((2, 0)));
    }

    #[test]
    fn entry_block_shape() {
        let e: TimeEntry = serde_json::from_value(serde_json::json!({
            "id": "1",
            "description": "standup",
            "hours": 1,
            "minutes": 30,
            "isbillable": 1,
            "project-name": "Apollo",
            "todo-item-name": "Meetings",
            "todo-item-id": "42",
        }))
        .unwrap();
        let block = format_entry_block(&e);
        assert_eq!(block[0], "  standup");
        assert_eq!(block[4], "    Billable: Yes");
        assert_eq!(block[5], "    Hours: 1.50");
    }
}
