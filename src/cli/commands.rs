use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hours",
    about = concat!("hours v", env!("CARGO_PKG_VERSION"), " - log Teamwork time from the terminal"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enter the interactive shell, optionally starting at a path
    #[command(visible_alias = "i")]
    Shell(ShellArgs),
    /// Log a time entry against a task
    #[command(visible_alias = "e")]
    Log(LogArgs),
    /// Print the month's logged-time summary (default with no subcommand)
    #[command(visible_alias = "l")]
    Logged,
    /// Print previously logged tasks since last month
    #[command(visible_alias = "p")]
    Tasks,
    /// Print the time entries for a date
    #[command(visible_alias = "q")]
    Entries(EntriesArgs),
    /// Print entries for every day since a date
    Since(SinceArgs),
    /// Print the share of logged time per project
    #[command(visible_alias = "w")]
    Percent(PercentArgs),
    /// List favorites
    #[command(visible_alias = "f")]
    Favorites(FavoritesArgs),
    /// Manage local work timers
    #[command(visible_alias = "t")]
    Timer(TimerCmd),
    /// Move a time entry to another task
    Move(MoveArgs),
    /// Record the time you arrived (default: now)
    #[command(visible_alias = "a")]
    Arrived(ArrivedArgs),
    /// Print one piece of data (default: time-worked)
    #[command(visible_alias = "g")]
    Get(GetArgs),
    /// Save the API key and base URL for future runs
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ShellArgs {
    /// Path to start in (overrides the remembered one)
    pub path: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    /// Task id, or a favorite name
    #[arg(short, long)]
    pub task: String,
    /// Entry description
    #[arg(short = 'm', long, default_value = "")]
    pub description: String,
    /// Hours to log
    #[arg(short = 'H', long)]
    pub hours: Option<i64>,
    /// Minutes to log
    #[arg(short = 'M', long)]
    pub minutes: Option<i64>,
    /// Date to log for (yyyymmdd, default today)
    #[arg(short, long)]
    pub date: Option<String>,
    /// Billable time (0 or 1, default 1)
    #[arg(short, long, default_value = "1")]
    pub billable: String,
    /// Start time of the entry (HH:MM)
    #[arg(short = 'T', long, default_value = "09:00")]
    pub start_time: String,
    /// Derive the length from start/end time when hours are not given (HH:MM)
    #[arg(short = 'O', long)]
    pub end_time: Option<String>,
    /// Comma-separated tags
    #[arg(short = 'z', long, default_value = "")]
    pub tags: String,
}

#[derive(Args)]
pub struct EntriesArgs {
    /// Date (yyyymmdd), default today
    pub date: Option<String>,
}

#[derive(Args)]
pub struct SinceArgs {
    /// week, month, or yyyymmdd (default week)
    #[arg(default_value = "week")]
    pub since: String,
}

#[derive(Args)]
pub struct PercentArgs {
    /// week, month, or yyyymmdd (default week)
    #[arg(default_value = "week")]
    pub since: String,
}

#[derive(Args)]
pub struct FavoritesArgs {
    /// Also fetch and show each favorite's task
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct TimerCmd {
    #[command(subcommand)]
    pub action: TimerAction,
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume a timer
    Start(TimerNameArg),
    /// Stop a timer, or all running timers when no name is given
    Stop(TimerOptNameArg),
    /// Stop all running timers, then start this one
    Switch(TimerNameArg),
    /// Delete a timer
    Delete(TimerNameArg),
    /// Add time to a timer
    Add(TimerModifyArgs),
    /// Subtract time from a timer
    Sub(TimerModifyArgs),
    /// List today's timers
    List,
}

#[derive(Args)]
pub struct TimerNameArg {
    /// Timer name
    pub name: String,
}

#[derive(Args)]
pub struct TimerOptNameArg {
    /// Timer name (omit to stop all)
    pub name: Option<String>,
}

#[derive(Args)]
pub struct TimerModifyArgs {
    /// Timer name
    pub name: String,
    /// Hours to apply
    #[arg(short = 'H', long, default_value = "0")]
    pub hours: i64,
    /// Minutes to apply
    #[arg(short = 'M', long, default_value = "0")]
    pub minutes: i64,
}

#[derive(Args)]
pub struct MoveArgs {
    /// Time entry id to move
    pub entry_id: String,
    /// Destination task id, or a favorite name
    #[arg(short, long)]
    pub task: String,
}

#[derive(Args)]
pub struct ArrivedArgs {
    /// Arrival time (HH:MM), default now
    pub time: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    /// What to print (time-worked)
    #[arg(default_value = "time-worked")]
    pub item: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Teamwork API key
    #[arg(short, long)]
    pub key: Option<String>,
    /// Teamwork base URL (e.g. https://example.teamwork.com)
    #[arg(short, long)]
    pub url: Option<String>,
}
