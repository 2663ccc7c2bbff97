use std::error::Error;
use std::path::PathBuf;

use chrono::{Duration, Local, Timelike};

use crate::api::{HierarchyApi, TeamworkClient};
use crate::cli::commands::{
    ArrivedArgs, Cli, Commands, ConfigArgs, EntriesArgs, FavoritesArgs, GetArgs, LogArgs,
    MoveArgs, PercentArgs, ShellArgs, SinceArgs, TimerAction, TimerCmd,
};
use crate::cli::output;
use crate::io::state_io;
use crate::model::hierarchy::NewTimeEntry;
use crate::model::state::UserState;
use crate::ops::{favorites, reports, timers};
use crate::repl::{self, Session};

/// Top-level dispatch. State is loaded once; commands that mutate it save it
/// back before returning. No subcommand means the month summary.
pub fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let state_path = state_io::state_path();
    let mut state = state_io::load(&state_path);

    match cli.command {
        None | Some(Commands::Logged) => cmd_logged(&state),
        Some(Commands::Shell(args)) => cmd_shell(state, state_path, args),
        Some(Commands::Log(args)) => cmd_log(&state, args),
        Some(Commands::Tasks) => cmd_tasks(&state),
        Some(Commands::Entries(args)) => cmd_entries(&state, args),
        Some(Commands::Since(args)) => cmd_since(&state, args),
        Some(Commands::Percent(args)) => cmd_percent(&state, args),
        Some(Commands::Favorites(args)) => cmd_favorites(&state, args),
        Some(Commands::Timer(cmd)) => cmd_timer(&mut state, &state_path, cmd),
        Some(Commands::Move(args)) => cmd_move(&state, args),
        Some(Commands::Arrived(args)) => cmd_arrived(&mut state, &state_path, args),
        Some(Commands::Get(args)) => cmd_get(&state, args),
        Some(Commands::Config(args)) => cmd_config(&mut state, &state_path, args),
    }
}

fn client(state: &UserState) -> Result<TeamworkClient, Box<dyn Error>> {
    Ok(TeamworkClient::from_credentials(&state.teamwork)?)
}

fn save(state: &UserState, path: &PathBuf) {
    if let Err(e) = state_io::save(path, state) {
        eprintln!("hours: could not save state: {}", e);
    }
}

fn cmd_shell(state: UserState, state_path: PathBuf, args: ShellArgs) -> Result<(), Box<dyn Error>> {
    let api = client(&state)?;
    let mut session = Session::new(Box::new(api), state, state_path);
    session.start(args.path.as_deref());
    repl::run(&mut session);
    Ok(())
}

fn cmd_logged(state: &UserState) -> Result<(), Box<dyn Error>> {
    let api = client(state)?;
    let today = Local::now().date_naive();
    let from = reports::yyyymmdd(reports::first_of_month(today));
    let entries = api.entries_between(Some(&from), None)?;
    let summary = reports::month_summary(&entries, today);
    for line in output::format_month_summary(&summary) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_tasks(state: &UserState) -> Result<(), Box<dyn Error>> {
    let api = client(state)?;
    let today = Local::now().date_naive();
    let from = reports::yyyymmdd(reports::first_of_previous_month(today));
    let entries = api.entries_between(Some(&from), None)?;
    for line in reports::previous_tasks(&entries) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_entries(state: &UserState, args: EntriesArgs) -> Result<(), Box<dyn Error>> {
    let api = client(state)?;
    let date = args
        .date
        .unwrap_or_else(|| reports::yyyymmdd(Local::now().date_naive()));
    print_date_entries(&api, &date)?;
    Ok(())
}

fn print_date_entries(api: &dyn HierarchyApi, date: &str) -> Result<(), Box<dyn Error>> {
    let entries = api.entries_between(Some(date), Some(date))?;
    for entry in &entries {
        println!();
        for line in output::format_entry_block(entry) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_since(state: &UserState, args: SinceArgs) -> Result<(), Box<dyn Error>> {
    let api = client(state)?;
    let today = Local::now().date_naive();
    let mut day = reports::since_date(&args.since, today);
    while day <= today {
        println!("\nDate: {}", day.format("%Y-%m-%d"));
        print_date_entries(&api, &reports::yyyymmdd(day))?;
        day += Duration::days(1);
    }
    Ok(())
}

fn cmd_percent(state: &UserState, args: PercentArgs) -> Result<(), Box<dyn Error>> {
    let api = client(state)?;
    let today = Local::now().date_naive();
    let from = reports::yyyymmdd(reports::since_date(&args.since, today));
    let entries = api.entries_between(Some(&from), None)?;
    for (project, share) in reports::percentages(&entries) {
        println!("{}: {}%", project, share);
    }
    Ok(())
}

fn cmd_favorites(state: &UserState, args: FavoritesArgs) -> Result<(), Box<dyn Error>> {
    if !args.full {
        for (name, task_id) in &state.favorites {
            println!("{} -> {}", name, task_id);
        }
        return Ok(());
    }
    let api = client(state)?;
    for (name, task_id) in &state.favorites {
        match api.task(task_id) {
            Ok(task) => println!("{} -> {}: {}", name, task_id, task.content),
            Err(e) => println!("{} -> {}: ({})", name, task_id, e),
        }
    }
    Ok(())
}

fn cmd_timer(
    state: &mut UserState,
    state_path: &PathBuf,
    cmd: TimerCmd,
) -> Result<(), Box<dyn Error>> {
    let now = Local::now();
    match cmd.action {
        TimerAction::Start(args) => {
            start_timer(state, &args.name, now);
        }
        TimerAction::Stop(args) => match args.name {
            Some(name) => match timers::stop(&mut state.timers, &name, now) {
                Some(duration) => println!(
                    "Timer {} stopped at {}.",
                    name,
                    output::duration_string(duration)
                ),
                None => println!("Timer {} is not running.", name),
            },
            None => {
                for (name, duration) in timers::stop_all(&mut state.timers, now) {
                    println!(
                        "Timer {} stopped at {}.",
                        name,
                        output::duration_string(duration)
                    );
                }
            }
        },
        TimerAction::Switch(args) => {
            let stopped = timers::stop_all(&mut state.timers, now);
            for (name, duration) in &stopped {
                println!(
                    "Timer {} stopped at {}.",
                    name,
                    output::duration_string(*duration)
                );
            }
            // Stopping the named timer itself means "switch off", not restart.
            if !stopped.iter().any(|(name, _)| name == &args.name) {
                start_timer(state, &args.name, now);
            }
        }
        TimerAction::Delete(args) => match timers::remove(&mut state.timers, &args.name) {
            Some(t) => println!(
                "Deleted timer {} at {}",
                args.name,
                output::duration_string(t.elapsed(now))
            ),
            None => println!("Unable to find timer {} to delete", args.name),
        },
        TimerAction::Add(args) => {
            apply_timer_delta(state, &args.name, args.hours, args.minutes);
        }
        TimerAction::Sub(args) => {
            apply_timer_delta(state, &args.name, -args.hours, -args.minutes);
        }
        TimerAction::List => {
            for (name, elapsed, running) in timers::summaries(&mut state.timers, now) {
                let marker = if running { " (running)" } else { "" };
                println!("{}: {}{}", name, output::duration_string(elapsed), marker);
            }
        }
    }
    save(state, state_path);
    Ok(())
}

fn start_timer(state: &mut UserState, name: &str, now: chrono::DateTime<Local>) {
    let resumable = state
        .timers
        .get(name)
        .map(|t| t.is_today(now) && !t.running && t.duration > 0)
        .unwrap_or(false);
    timers::start(&mut state.timers, name, now);
    if resumable {
        println!(
            "Timer {} resumed from {}.",
            name,
            output::duration_string(state.timers[name].duration)
        );
    } else {
        println!("Recorded start time for {}.", name);
    }
}

fn apply_timer_delta(state: &mut UserState, name: &str, hours: i64, minutes: i64) {
    match timers::modify(&mut state.timers, name, hours, minutes) {
        Ok(duration) => println!("{}: {}", name, output::duration_string(duration)),
        Err(e) => eprintln!("hours: {}", e),
    }
}

fn cmd_log(state: &UserState, args: LogArgs) -> Result<(), Box<dyn Error>> {
    let Some(task_id) = favorites::resolve_task_ref(&state.favorites, &args.task) else {
        return Err(format!("unknown task reference: {}", args.task).into());
    };

    // Explicit hours/minutes win; otherwise derive the span from start/end
    // clock times when an end time was given.
    let (hours, minutes) = match (args.hours, args.minutes) {
        (None, None) => match &args.end_time {
            Some(end) => output::time_diff(&args.start_time, end)
                .ok_or_else(|| format!("bad time range: {} to {}", args.start_time, end))?,
            None => (0, 0),
        },
        (h, m) => (h.unwrap_or(0), m.unwrap_or(0)),
    };
    if hours == 0 && minutes == 0 {
        return Err("nothing to log: give --hours/--minutes or an --end-time".into());
    }

    let entry = NewTimeEntry {
        task_id: task_id.clone(),
        description: args.description,
        date: args
            .date
            .unwrap_or_else(|| reports::yyyymmdd(Local::now().date_naive())),
        hours,
        minutes,
        billable: args.billable != "0",
        start_time: args.start_time,
        tags: args
            .tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    };

    let api = client(state)?;
    api.create_entry(&entry)?;
    println!(
        "Logged {} to task {}.",
        output::duration_string(hours * 3_600_000 + minutes * 60_000),
        task_id
    );
    Ok(())
}

fn cmd_move(state: &UserState, args: MoveArgs) -> Result<(), Box<dyn Error>> {
    let Some(task_id) = favorites::resolve_task_ref(&state.favorites, &args.task) else {
        return Err(format!("unknown task reference: {}", args.task).into());
    };
    let api = client(state)?;
    let entry = api.entry(&args.entry_id)?;
    let date = reports::parse_entry_date(&entry.date)
        .map(reports::yyyymmdd)
        .unwrap_or_default();
    let new_entry = NewTimeEntry {
        task_id: task_id.clone(),
        description: entry.description.clone(),
        date,
        hours: entry.hours as i64,
        minutes: entry.minutes as i64,
        billable: entry.billable,
        ..NewTimeEntry::default()
    };
    api.create_entry(&new_entry)?;
    api.delete_entry(&args.entry_id)?;
    println!("Moved entry {} to task {}.", args.entry_id, task_id);
    Ok(())
}

fn cmd_arrived(
    state: &mut UserState,
    state_path: &PathBuf,
    args: ArrivedArgs,
) -> Result<(), Box<dyn Error>> {
    let now = Local::now();
    let arrived = match args.time.as_deref() {
        Some(time) => {
            let (h, m) = output::parse_hhmm(time)
                .ok_or_else(|| format!("bad arrival time: {}", time))?;
            now.with_hour(h as u32)
                .and_then(|t| t.with_minute(m as u32))
                .and_then(|t| t.with_second(0))
                .ok_or_else(|| format!("bad arrival time: {}", time))?
        }
        None => now,
    };
    state.arrived = Some(arrived);
    save(state, state_path);
    println!("Marking that you arrived at {}.", arrived.format("%H:%M"));
    Ok(())
}

fn cmd_get(state: &UserState, args: GetArgs) -> Result<(), Box<dyn Error>> {
    match args.item.as_str() {
        "time-worked" => {
            let now = Local::now();
            match state.arrived {
                Some(arrived) if arrived.date_naive() == now.date_naive() => {
                    let worked = (now - arrived).num_milliseconds();
                    println!("{}", output::duration_string(worked));
                }
                _ => println!("no arrival recorded today"),
            }
        }
        other => return Err(format!("unknown item: {} (try time-worked)", other).into()),
    }
    Ok(())
}

fn cmd_config(
    state: &mut UserState,
    state_path: &PathBuf,
    args: ConfigArgs,
) -> Result<(), Box<dyn Error>> {
    if let Some(key) = args.key {
        state.teamwork.key = Some(key);
    }
    if let Some(url) = args.url {
        state.teamwork.url = Some(url);
    }
    save(state, state_path);
    println!("Saved credentials to {}.", state_path.display());
    Ok(())
}
