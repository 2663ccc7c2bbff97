use chrono::{DateTime, Local};
use indexmap::IndexMap;

use crate::model::state::Timer;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer not found: {0}")]
    NotFound(String),
}

pub type Timers = IndexMap<String, Timer>;

/// Start (or resume) a timer. A timer that does not exist, or whose last
/// start was not today, begins fresh; a stopped timer from today resumes
/// with its accumulated duration; a running timer is left alone.
pub fn start(timers: &mut Timers, name: &str, now: DateTime<Local>) {
    match timers.get_mut(name) {
        Some(t) if t.is_today(now) => {
            if !t.running {
                t.started = Some(now);
                t.running = true;
            }
        }
        _ => {
            timers.insert(
                name.to_string(),
                Timer {
                    started: Some(now),
                    running: true,
                    duration: 0,
                },
            );
        }
    }
}

/// Stop a running timer started today, folding the current run into its
/// duration. Anything else (absent, stopped, stale) is a no-op. Returns the
/// new accumulated duration when the timer actually stopped.
pub fn stop(timers: &mut Timers, name: &str, now: DateTime<Local>) -> Option<i64> {
    let t = timers.get_mut(name)?;
    if t.running
        && t.is_today(now)
        && let Some(s) = t.started
    {
        t.duration += (now - s).num_milliseconds();
        t.running = false;
        return Some(t.duration);
    }
    None
}

/// Stop every running timer, returning the (name, duration) pairs that
/// actually stopped.
pub fn stop_all(timers: &mut Timers, now: DateTime<Local>) -> Vec<(String, i64)> {
    let names: Vec<String> = timers
        .iter()
        .filter(|(_, t)| t.running)
        .map(|(n, _)| n.clone())
        .collect();
    names
        .into_iter()
        .filter_map(|n| stop(timers, &n, now).map(|d| (n, d)))
        .collect()
}

/// Add (or with negative deltas, subtract) time from an existing timer.
/// Returns the new accumulated duration; a zero net delta changes nothing.
pub fn modify(
    timers: &mut Timers,
    name: &str,
    hours_delta: i64,
    minutes_delta: i64,
) -> Result<i64, TimerError> {
    let t = timers
        .get_mut(name)
        .ok_or_else(|| TimerError::NotFound(name.to_string()))?;
    let delta = hours_delta * 3_600_000 + minutes_delta * 60_000;
    if delta != 0 {
        t.duration += delta;
    }
    Ok(t.duration)
}

/// Elapsed milliseconds for a timer, including the current run. Zero for an
/// unknown name. Never mutates.
pub fn elapsed(timers: &Timers, name: &str, now: DateTime<Local>) -> i64 {
    timers.get(name).map(|t| t.elapsed(now)).unwrap_or(0)
}

pub fn remove(timers: &mut Timers, name: &str) -> Option<Timer> {
    timers.shift_remove(name)
}

/// Lazy daily rollover: drop timers not started today. Called by every
/// enumeration/summary path rather than by a background sweep.
pub fn sweep(timers: &mut Timers, now: DateTime<Local>) {
    timers.retain(|_, t| t.is_today(now));
}

/// Sweep stale timers, then summarize the survivors as
/// (name, elapsed ms, running).
pub fn summaries(timers: &mut Timers, now: DateTime<Local>) -> Vec<(String, i64, bool)> {
    sweep(timers, now);
    timers
        .iter()
        .map(|(n, t)| (n.clone(), t.elapsed(now), t.running))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 21, h, m, 0).unwrap()
    }

    #[test]
    fn start_creates_a_running_timer() {
        let mut timers = Timers::new();
        start(&mut timers, "design", at(9, 0));
        let t = &timers["design"];
        assert!(t.running);
        assert_eq!(t.duration, 0);
        assert_eq!(t.started, Some(at(9, 0)));
    }

    #[test]
    fn duration_is_conserved_across_stop_start_cycles() {
        let mut timers = Timers::new();
        start(&mut timers, "design", at(9, 0));
        stop(&mut timers, "design", at(9, 45));
        let before = elapsed(&timers, "design", at(10, 0));
        start(&mut timers, "design", at(10, 0));
        // Immediately after restarting, elapsed equals the pre-start value.
        assert_eq!(elapsed(&timers, "design", at(10, 0)), before);
        stop(&mut timers, "design", at(10, 15));
        assert_eq!(elapsed(&timers, "design", at(11, 0)), 60 * 60_000);
    }

    #[test]
    fn ninety_minutes_then_subtract_reaches_zero() {
        let mut timers = Timers::new();
        start(&mut timers, "design", at(9, 0));
        stop(&mut timers, "design", at(10, 30));
        assert_eq!(elapsed(&timers, "design", at(10, 30)), 90 * 60_000);
        let new = modify(&mut timers, "design", -1, -30).unwrap();
        assert_eq!(new, 0);
        assert_eq!(elapsed(&timers, "design", at(11, 0)), 0);
    }

    #[test]
    fn modify_unknown_timer_is_an_error() {
        let mut timers = Timers::new();
        assert_eq!(
            modify(&mut timers, "ghost", 1, 0),
            Err(TimerError::NotFound("ghost".to_string()))
        );
    }

    #[test]
    fn modify_zero_delta_changes_nothing() {
        let mut timers = Timers::new();
        start(&mut timers, "design", at(9, 0));
        stop(&mut timers, "design", at(9, 30));
        assert_eq!(modify(&mut timers, "design", 0, 0).unwrap(), 30 * 60_000);
    }

    #[test]
    fn stop_on_absent_or_stopped_timer_is_a_noop() {
        let mut timers = Timers::new();
        assert_eq!(stop(&mut timers, "ghost", at(9, 0)), None);
        start(&mut timers, "design", at(9, 0));
        stop(&mut timers, "design", at(9, 30));
        assert_eq!(stop(&mut timers, "design", at(10, 0)), None);
        assert_eq!(elapsed(&timers, "design", at(10, 0)), 30 * 60_000);
    }

    #[test]
    fn start_on_stale_timer_begins_fresh() {
        let mut timers = Timers::new();
        let yesterday = at(9, 0) - Duration::days(1);
        start(&mut timers, "design", yesterday);
        // Left running overnight.
        start(&mut timers, "design", at(9, 0));
        let t = &timers["design"];
        assert!(t.running);
        assert_eq!(t.duration, 0);
        assert_eq!(t.started, Some(at(9, 0)));
    }

    #[test]
    fn stop_on_stale_running_timer_is_a_noop() {
        let mut timers = Timers::new();
        start(&mut timers, "design", at(9, 0) - Duration::days(1));
        assert_eq!(stop(&mut timers, "design", at(9, 0)), None);
        assert!(timers["design"].running);
    }

    #[test]
    fn summaries_drop_stale_timers() {
        let mut timers = Timers::new();
        start(&mut timers, "stale", at(9, 0) - Duration::days(1));
        start(&mut timers, "fresh", at(9, 0));
        let list = summaries(&mut timers, at(10, 0));
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].0, "fresh");
        assert_eq!(list[0].1, 60 * 60_000);
        assert!(!timers.contains_key("stale"));
    }

    #[test]
    fn stop_all_only_touches_running_timers() {
        let mut timers = Timers::new();
        start(&mut timers, "a", at(9, 0));
        start(&mut timers, "b", at(9, 30));
        stop(&mut timers, "a", at(9, 45));
        let stopped = stop_all(&mut timers, at(10, 0));
        assert_eq!(stopped, vec![("b".to_string(), 30 * 60_000)]);
    }
}
