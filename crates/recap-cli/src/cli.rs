//! Command-line argument definitions.

use clap::Parser;

/// Summarize a week of GitHub activity as Markdown.
///
/// Collects the issues and pull requests a user opened, closed, commented on
/// or reviewed, grouped by repository.
#[derive(Debug, Parser)]
#[command(name = "recap", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// GitHub username [default: $GITHUB_USERNAME, then the token's owner].
    #[arg(long)]
    pub user: Option<String>,

    /// GitHub access token [default: $GITHUB_TOKEN].
    #[arg(long)]
    pub token: Option<String>,

    /// First day to include. Requires --end-date.
    #[arg(long, alias = "start_date", value_name = "YYYY-MM-DD")]
    pub start_date: Option<String>,

    /// Day after the last day to include. Requires --start-date.
    #[arg(long, alias = "end_date", value_name = "YYYY-MM-DD")]
    pub end_date: Option<String>,

    /// The first day of your digest week.
    #[arg(long, alias = "start_of_week", value_name = "WEEKDAY", default_value = "Saturday")]
    pub start_of_week: String,

    /// How many weeks ago to report on; 0 is the current week.
    #[arg(long, alias = "weeks_back", value_name = "N", default_value_t = 1)]
    pub weeks_back: u32,
}
