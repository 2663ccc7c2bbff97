use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::Local;
use regex::RegexBuilder;

use crate::api::HierarchyApi;
use crate::cli::output;
use crate::io::state_io;
use crate::model::hierarchy::{Level, NewTimeEntry};
use crate::model::state::UserState;
use crate::ops::reports;
use crate::ops::{favorites, nav::Browser, timers};

/// Shared state for one interactive session. Every command acts on this and
/// nothing else, so the whole shell can be driven by a fake remote in tests.
pub struct Session {
    pub api: Box<dyn HierarchyApi>,
    pub state: UserState,
    pub browser: Browser,
    state_path: PathBuf,
}

impl Session {
    pub fn new(api: Box<dyn HierarchyApi>, state: UserState, state_path: PathBuf) -> Self {
        Session {
            api,
            state,
            browser: Browser::new(),
            state_path,
        }
    }

    /// Load the project listing and resume at `initial` (or the remembered
    /// path). Stale paths resolve as far as they can and stop; a dead remote
    /// leaves an empty top level rather than killing the session.
    pub fn start(&mut self, initial: Option<&str>) {
        if let Err(e) = self.browser.refresh(&*self.api) {
            eprintln!("hours: {}", e);
        }
        let target = initial
            .map(str::to_string)
            .or_else(|| self.state.last_path.clone());
        if let Some(path) = target
            && let Err(e) = self.browser.change_dir(&*self.api, &self.state.favorites, &path)
        {
            eprintln!("hours: {}", e);
        }
    }

    /// Persist the state document; a failed save is reported and the session
    /// carries on in memory.
    pub fn save(&mut self) {
        if let Err(e) = state_io::save(&self.state_path, &self.state) {
            eprintln!("hours: could not save state: {}", e);
        }
    }

    fn cd(&mut self, expr: &str) {
        match self
            .browser
            .change_dir_reversible(&*self.api, &self.state.favorites, expr)
        {
            Ok(()) => {
                self.state.last_path = Some(self.browser.path());
                self.save();
            }
            Err(e) => eprintln!("hours: {}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One shell verb: canonical name, aliases, and a uniform action over the
/// session state.
pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
    run: fn(&mut Session, &[&str]) -> Flow,
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "cd",
        aliases: &["select", "sel", "c", ":e", "enter", "dir"],
        usage: "cd [path]",
        description: "change level; .. up, / top, - back, or a favorite name",
        run: cmd_cd,
    },
    Command {
        name: "ls",
        aliases: &["l", "list"],
        usage: "ls [path]",
        description: "list children here or at a path",
        run: cmd_ls,
    },
    Command {
        name: "pwd",
        aliases: &["path"],
        usage: "pwd",
        description: "print the canonical id path",
        run: cmd_pwd,
    },
    Command {
        name: "entry",
        aliases: &["log", "record"],
        usage: "entry",
        description: "log time to the selected task (interactive)",
        run: cmd_entry,
    },
    Command {
        name: "create",
        aliases: &["add"],
        usage: "create <title>",
        description: "create a task in the selected task list",
        run: cmd_create,
    },
    Command {
        name: "edit",
        aliases: &["rename"],
        usage: "edit <text>",
        description: "retitle the selected task or entry description",
        run: cmd_edit,
    },
    Command {
        name: "delete",
        aliases: &["del", "rm"],
        usage: "delete",
        description: "delete the selected task or time entry",
        run: cmd_delete,
    },
    Command {
        name: "copy",
        aliases: &["cp"],
        usage: "copy <task>",
        description: "copy the selected time entry to another task",
        run: cmd_copy,
    },
    Command {
        name: "move",
        aliases: &["mv"],
        usage: "move <task>",
        description: "move the selected time entry to another task",
        run: cmd_move,
    },
    Command {
        name: "total",
        aliases: &["time"],
        usage: "total",
        description: "total logged time for the selected level",
        run: cmd_total,
    },
    Command {
        name: "fav",
        aliases: &["favorite"],
        usage: "fav [name]",
        description: "name the selected task, or list favorites",
        run: cmd_fav,
    },
    Command {
        name: "search",
        aliases: &["find"],
        usage: "search <term>",
        description: "search tasks within the current scope",
        run: cmd_search,
    },
    Command {
        name: "show",
        aliases: &["echo", "cat"],
        usage: "show",
        description: "print the selected entity as raw JSON",
        run: cmd_show,
    },
    Command {
        name: "print",
        aliases: &[],
        usage: "print hours|logged|on <date>",
        description: "print logged-time summaries",
        run: cmd_print,
    },
    Command {
        name: "start",
        aliases: &[],
        usage: "start <timer>",
        description: "start or resume a local timer",
        run: cmd_start,
    },
    Command {
        name: "stop",
        aliases: &[],
        usage: "stop [timer]",
        description: "stop a timer, or all running timers",
        run: cmd_stop,
    },
    Command {
        name: "timers",
        aliases: &["t"],
        usage: "timers",
        description: "list today's timers",
        run: cmd_timers,
    },
    Command {
        name: "help",
        aliases: &["h", "please"],
        usage: "help",
        description: "show this help",
        run: cmd_help,
    },
    Command {
        name: "exit",
        aliases: &["quit", "q", ":q"],
        usage: "exit",
        description: "leave the shell",
        run: cmd_exit,
    },
];

/// Match a verb against the table, case-insensitively, canonical names and
/// aliases alike. First match wins.
pub fn find_command(verb: &str) -> Option<&'static Command> {
    let verb = verb.to_lowercase();
    COMMANDS
        .iter()
        .find(|c| c.name == verb || c.aliases.contains(&verb.as_str()))
}

/// Split a raw input line and run the matching command. Unknown verbs and
/// blank lines are silently ignored.
pub fn dispatch_line(session: &mut Session, line: &str) -> Flow {
    let args: Vec<&str> = line.split_whitespace().collect();
    let Some(verb) = args.first() else {
        return Flow::Continue;
    };
    match find_command(verb) {
        Some(cmd) => (cmd.run)(session, &args),
        None => Flow::Continue,
    }
}

/// The read-eval loop. Blocks on stdin; one command runs to completion
/// (including any remote calls) before the next prompt.
pub fn run(session: &mut Session) {
    let stdin = io::stdin();
    loop {
        print!("\n{}", session.browser.prompt());
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if dispatch_line(session, &line) == Flow::Quit {
            break;
        }
    }
}

pub fn usage() {
    for cmd in COMMANDS {
        let aliases = if cmd.aliases.is_empty() {
            String::new()
        } else {
            format!(" ({})", cmd.aliases.join(", "))
        };
        println!("  {:<28}{}{}", cmd.usage, cmd.description, aliases);
    }
}

fn ask(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_cd(s: &mut Session, args: &[&str]) -> Flow {
    s.cd(args.get(1).copied().unwrap_or(""));
    Flow::Continue
}

fn cmd_ls(s: &mut Session, args: &[&str]) -> Flow {
    match s
        .browser
        .list(&*s.api, &s.state.favorites, args.get(1).copied())
    {
        Ok(lines) => {
            println!();
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

fn cmd_pwd(s: &mut Session, _args: &[&str]) -> Flow {
    println!("{}", s.browser.path());
    Flow::Continue
}

fn cmd_entry(s: &mut Session, _args: &[&str]) -> Flow {
    let Some(task) = s.browser.selection.task.clone() else {
        println!("select a task first");
        return Flow::Continue;
    };

    let today = reports::yyyymmdd(Local::now().date_naive());
    let description = ask("Description []: ");
    let hours = ask("Hours [1]: ").parse().unwrap_or(1);
    let minutes = ask("Minutes [0]: ").parse().unwrap_or(0);
    let date_answer = ask(&format!("Date [{}]: ", today));
    let date = if date_answer.is_empty() { today } else { date_answer };
    let billable = ask("Is Billable [1]: ") != "0";

    let entry = NewTimeEntry {
        task_id: task.id.clone(),
        description,
        date,
        hours,
        minutes,
        billable,
        ..NewTimeEntry::default()
    };
    match s.api.create_entry(&entry) {
        Ok(()) => {
            println!("Logged {} to {}.", output::duration_string(hours * 3_600_000 + minutes * 60_000), task.content);
            if let Err(e) = s.browser.refresh(&*s.api) {
                eprintln!("hours: {}", e);
            }
        }
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

fn cmd_create(s: &mut Session, args: &[&str]) -> Flow {
    let Some(tasklist) = s.browser.selection.tasklist.clone() else {
        println!("select a task list first");
        return Flow::Continue;
    };
    let title = args[1..].join(" ");
    if title.is_empty() {
        println!("usage: create <title>");
        return Flow::Continue;
    }
    match s.api.create_task(&tasklist.id, &title) {
        Ok(()) => {
            println!("created task in {}", tasklist.name);
            if s.browser.level() == Level::TaskList
                && let Err(e) = s.browser.refresh(&*s.api)
            {
                eprintln!("hours: {}", e);
            }
        }
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

/// Retitle the selected task, or rewrite the selected entry's description.
fn cmd_edit(s: &mut Session, args: &[&str]) -> Flow {
    let text = args[1..].join(" ");
    if text.is_empty() {
        println!("usage: edit <text>");
        return Flow::Continue;
    }
    if let Some(entry) = s.browser.selection.entry.clone() {
        let mut updated = reentry(&entry, &entry.task_id);
        updated.description = text.clone();
        match s.api.update_entry(&entry.id, &updated) {
            Ok(()) => {
                if let Some(e) = s.browser.selection.entry.as_mut() {
                    e.description = text;
                }
                println!("updated");
            }
            Err(e) => eprintln!("hours: {}", e),
        }
        return Flow::Continue;
    }
    let Some(task) = s.browser.selection.task.clone() else {
        println!("select a task or time entry first");
        return Flow::Continue;
    };
    match s.api.update_task(&task.id, &text) {
        Ok(()) => {
            if let Some(t) = s.browser.selection.task.as_mut() {
                t.content = text;
            }
            println!("updated");
        }
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

fn cmd_delete(s: &mut Session, _args: &[&str]) -> Flow {
    let result = match s.browser.level() {
        Level::Entry => {
            let id = s.browser.selection.entry.as_ref().map(|e| e.id.clone());
            id.map(|id| s.api.delete_entry(&id))
        }
        Level::Task => {
            let id = s.browser.selection.task.as_ref().map(|t| t.id.clone());
            id.map(|id| s.api.delete_task(&id))
        }
        _ => {
            println!("select a task or time entry first");
            return Flow::Continue;
        }
    };
    match result {
        Some(Ok(())) => {
            // Step out of the deleted item and refresh its siblings.
            if let Err(e) = s
                .browser
                .change_dir(&*s.api, &s.state.favorites, "..")
                .and_then(|()| s.browser.refresh(&*s.api))
            {
                eprintln!("hours: {}", e);
            }
            println!("deleted");
        }
        Some(Err(e)) => eprintln!("hours: {}", e),
        None => {}
    }
    Flow::Continue
}

/// Rebuild creation fields from an existing entry so it can be re-homed.
fn reentry(e: &crate::model::hierarchy::TimeEntry, task_id: &str) -> NewTimeEntry {
    let date = reports::parse_entry_date(&e.date)
        .map(reports::yyyymmdd)
        .unwrap_or_default();
    NewTimeEntry {
        task_id: task_id.to_string(),
        description: e.description.clone(),
        date,
        hours: e.hours as i64,
        minutes: e.minutes as i64,
        billable: e.billable,
        ..NewTimeEntry::default()
    }
}

fn copy_entry_to(s: &mut Session, args: &[&str], delete_original: bool) -> Flow {
    let Some(entry) = s.browser.selection.entry.clone() else {
        println!("select a time entry first");
        return Flow::Continue;
    };
    let Some(reference) = args.get(1) else {
        println!("usage: {} <task>", if delete_original { "move" } else { "copy" });
        return Flow::Continue;
    };
    let Some(task_id) = favorites::resolve_task_ref(&s.state.favorites, reference) else {
        println!("unknown task reference: {}", reference);
        return Flow::Continue;
    };
    let new_entry = reentry(&entry, &task_id);
    match s.api.create_entry(&new_entry) {
        Ok(()) => {
            if delete_original {
                if let Err(e) = s.api.delete_entry(&entry.id) {
                    eprintln!("hours: {}", e);
                    return Flow::Continue;
                }
                if let Err(e) = s
                    .browser
                    .change_dir(&*s.api, &s.state.favorites, "..")
                    .and_then(|()| s.browser.refresh(&*s.api))
                {
                    eprintln!("hours: {}", e);
                }
                println!("moved entry to task {}", task_id);
            } else {
                println!("copied entry to task {}", task_id);
            }
        }
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

fn cmd_copy(s: &mut Session, args: &[&str]) -> Flow {
    copy_entry_to(s, args, false)
}

fn cmd_move(s: &mut Session, args: &[&str]) -> Flow {
    copy_entry_to(s, args, true)
}

fn cmd_total(s: &mut Session, _args: &[&str]) -> Flow {
    let (level, id, label) = match (
        &s.browser.selection.task,
        &s.browser.selection.tasklist,
        &s.browser.selection.project,
    ) {
        (Some(t), _, _) => (Level::Task, t.id.clone(), t.content.clone()),
        (None, Some(tl), _) => (Level::TaskList, tl.id.clone(), tl.name.clone()),
        (None, None, Some(p)) => (Level::Project, p.id.clone(), p.name.clone()),
        _ => {
            println!("select a project, task list, or task first");
            return Flow::Continue;
        }
    };
    match s.api.total_time(level, &id) {
        Ok(total) => {
            for line in output::format_total(&label, &total) {
                println!("{}", line);
            }
        }
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

fn cmd_fav(s: &mut Session, args: &[&str]) -> Flow {
    match args.get(1) {
        None => {
            for (name, task_id) in &s.state.favorites {
                println!("{} -> {}", name, task_id);
            }
        }
        Some(name) => {
            let Some(task) = s.browser.selection.task.clone() else {
                println!("select a task first");
                return Flow::Continue;
            };
            favorites::set(&mut s.state.favorites, name, &task.id);
            s.save();
            println!("favorite {} -> {} ({})", name, task.id, task.content);
        }
    }
    Flow::Continue
}

fn cmd_search(s: &mut Session, args: &[&str]) -> Flow {
    let term = args[1..].join(" ");
    if term.is_empty() {
        println!("usage: search <term>");
        return Flow::Continue;
    }
    let project_id = s.browser.selection.project.as_ref().map(|p| p.id.clone());
    let tasklist_id = s.browser.selection.tasklist.as_ref().map(|t| t.id.clone());
    match s
        .api
        .search_tasks(&term, project_id.as_deref(), tasklist_id.as_deref())
    {
        Ok(tasks) => {
            let re = RegexBuilder::new(&term).case_insensitive(true).build().ok();
            for task in tasks {
                let matched = re
                    .as_ref()
                    .map(|re| re.is_match(&task.content))
                    .unwrap_or(true);
                if matched {
                    println!("{}: {}", task.id, task.content);
                }
            }
        }
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

fn cmd_show(s: &mut Session, _args: &[&str]) -> Flow {
    let raw = match s.browser.level() {
        Level::Entry => serde_json::to_string_pretty(&s.browser.selection.entry),
        Level::Task => serde_json::to_string_pretty(&s.browser.selection.task),
        Level::TaskList => serde_json::to_string_pretty(&s.browser.selection.tasklist),
        Level::Project => serde_json::to_string_pretty(&s.browser.selection.project),
        Level::Top => {
            println!("nothing selected");
            return Flow::Continue;
        }
    };
    match raw {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("hours: {}", e),
    }
    Flow::Continue
}

fn cmd_print(s: &mut Session, args: &[&str]) -> Flow {
    let today = Local::now().date_naive();
    match args.get(1).copied() {
        Some("hours") => {
            let from = reports::yyyymmdd(reports::first_of_month(today));
            match s.api.entries_between(Some(&from), None) {
                Ok(entries) => {
                    let summary = reports::month_summary(&entries, today);
                    println!();
                    for line in output::format_month_summary(&summary) {
                        println!("{}", line);
                    }
                }
                Err(e) => eprintln!("hours: {}", e),
            }
        }
        Some("logged") => {
            let from = reports::yyyymmdd(reports::first_of_previous_month(today));
            match s.api.entries_between(Some(&from), None) {
                Ok(entries) => {
                    for line in reports::previous_tasks(&entries) {
                        println!("{}", line);
                    }
                }
                Err(e) => eprintln!("hours: {}", e),
            }
        }
        Some("on") => match args.get(2) {
            Some(date) => match s.api.entries_between(Some(date), Some(date)) {
                Ok(entries) => {
                    for entry in &entries {
                        println!();
                        for line in output::format_entry_block(entry) {
                            println!("{}", line);
                        }
                    }
                }
                Err(e) => eprintln!("hours: {}", e),
            },
            None => println!("usage: print on <yyyymmdd>"),
        },
        _ => println!("usage: print hours|logged|on <date>"),
    }
    Flow::Continue
}

fn cmd_start(s: &mut Session, args: &[&str]) -> Flow {
    let Some(name) = args.get(1) else {
        println!("usage: start <timer>");
        return Flow::Continue;
    };
    let now = Local::now();
    let resumed = s
        .state
        .timers
        .get(*name)
        .map(|t| t.is_today(now) && !t.running)
        .unwrap_or(false);
    timers::start(&mut s.state.timers, name, now);
    let duration = s.state.timers[*name].duration;
    if resumed && duration > 0 {
        println!(
            "Timer {} resumed from {}.",
            name,
            output::duration_string(duration)
        );
    } else {
        println!("Recorded start time for {}.", name);
    }
    s.save();
    Flow::Continue
}

fn cmd_stop(s: &mut Session, args: &[&str]) -> Flow {
    let now = Local::now();
    match args.get(1) {
        Some(name) => match timers::stop(&mut s.state.timers, name, now) {
            Some(duration) => println!(
                "Timer {} stopped at {}.",
                name,
                output::duration_string(duration)
            ),
            None => println!("Timer {} is not running.", name),
        },
        None => {
            for (name, duration) in timers::stop_all(&mut s.state.timers, now) {
                println!(
                    "Timer {} stopped at {}.",
                    name,
                    output::duration_string(duration)
                );
            }
        }
    }
    s.save();
    Flow::Continue
}

fn cmd_timers(s: &mut Session, _args: &[&str]) -> Flow {
    let now = Local::now();
    let list = timers::summaries(&mut s.state.timers, now);
    if list.is_empty() {
        println!("no timers today");
    }
    for (name, elapsed, running) in list {
        let marker = if running { " (running)" } else { "" };
        println!("{}: {}{}", name, output::duration_string(elapsed), marker);
    }
    // The sweep may have dropped stale timers.
    s.save();
    Flow::Continue
}

fn cmd_help(_s: &mut Session, _args: &[&str]) -> Flow {
    println!();
    usage();
    Flow::Continue
}

fn cmd_exit(_s: &mut Session, _args: &[&str]) -> Flow {
    Flow::Quit
}
