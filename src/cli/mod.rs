//! Command-line parsing for the R&D indicator explorer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the reconciliation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Language, Level, Metric, Sector};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rds", version, about = "R&D indicators for Spain, its regions and Europe")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join country / EU / region series, print metrics and optionally plot/export.
    Series(SeriesArgs),
    /// Rank countries or regions for one year.
    Rank(RankArgs),
    /// Show how names or codes resolve against the entity table.
    Resolve(ResolveArgs),
    /// Plot a previously exported chart JSON.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same pipeline as `rds series`, but renders results in a
    /// terminal UI using Ratatui.
    Tui(SeriesArgs),
}

/// Where data, entity table and catalog come from; logging.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Data directory or base URL (defaults to RDS_DATA_URL / RDS_DATA_DIR / ./data).
    #[arg(long, value_name = "DIR|URL")]
    pub data: Option<String>,

    /// Entity table JSON (defaults to the built-in table).
    #[arg(long, value_name = "JSON")]
    pub entities: Option<PathBuf>,

    /// Dataset catalog JSON (defaults to the built-in catalog).
    #[arg(long, value_name = "JSON")]
    pub catalog: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to a file instead of stderr (also enables logging in the TUI).
    #[arg(long, env = "RDS_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Options for `series` and `tui`.
#[derive(Debug, Args, Clone)]
pub struct SeriesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Indicator to show.
    #[arg(short = 'm', long, value_enum, default_value_t = Metric::RdGdp)]
    pub metric: Metric,

    /// Country (name or code).
    #[arg(short = 'c', long, default_value = "ES")]
    pub country: String,

    /// Autonomous community (name or NUTS2 code); makes it the focal series.
    #[arg(short = 'r', long)]
    pub region: Option<String>,

    /// Performing sector.
    #[arg(short = 's', long, value_enum, default_value_t = Sector::Total)]
    pub sector: Sector,

    /// First year (defaults to the first year with data).
    #[arg(long)]
    pub from: Option<i32>,

    /// Last year (defaults to the last year with data, capped at the current year).
    #[arg(long)]
    pub to: Option<i32>,

    /// Display language for names and labels.
    #[arg(short = 'l', long, value_enum, default_value_t = Language::Es)]
    pub lang: Language,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export joined rows to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the chart (rows + summary) to JSON for `rds plot`.
    #[arg(long = "export-chart")]
    pub export_chart: Option<PathBuf>,

    /// Write a markdown debug bundle (resolution misses, row errors, joined table).
    #[arg(long)]
    pub debug: bool,
}

/// Options for `rank`.
#[derive(Debug, Args, Clone)]
pub struct RankArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(short = 'm', long, value_enum, default_value_t = Metric::RdGdp)]
    pub metric: Metric,

    /// Rank countries or regions.
    #[arg(long, value_enum, default_value_t = Level::Country)]
    pub level: Level,

    #[arg(short = 's', long, value_enum, default_value_t = Sector::Total)]
    pub sector: Sector,

    /// Year to rank (defaults to the latest year with data).
    #[arg(short = 'y', long)]
    pub year: Option<i32>,

    /// Show only the top N entries.
    #[arg(long)]
    pub top: Option<usize>,

    #[arg(short = 'l', long, value_enum, default_value_t = Language::Es)]
    pub lang: Language,
}

/// Options for `resolve`.
#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    /// Names or codes to resolve.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Dataset id used to pick dataset-scoped overrides.
    #[arg(long, default_value = "")]
    pub dataset: String,

    /// Entity table JSON (defaults to the built-in table).
    #[arg(long, value_name = "JSON")]
    pub entities: Option<PathBuf>,

    #[arg(short = 'l', long, value_enum, default_value_t = Language::Es)]
    pub lang: Language,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Options for plotting a saved chart.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Chart JSON produced by `rds series --export-chart`.
    #[arg(long, value_name = "JSON")]
    pub chart: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_flags_parse() {
        let cli = Cli::parse_from([
            "rds", "series", "-r", "Cataluña", "-s", "business", "--from", "2015", "-l", "en", "--data", "fixtures",
            "-vv",
        ]);
        let Command::Series(args) = cli.command else {
            panic!("expected series");
        };
        assert_eq!(args.region.as_deref(), Some("Cataluña"));
        assert_eq!(args.sector, Sector::Business);
        assert_eq!(args.from, Some(2015));
        assert_eq!(args.lang, Language::En);
        assert_eq!(args.source.data.as_deref(), Some("fixtures"));
        assert_eq!(args.source.verbose, 2);
        assert_eq!(args.country, "ES");
    }

    #[test]
    fn rank_defaults() {
        let cli = Cli::parse_from(["rds", "rank", "--level", "region", "-m", "patents"]);
        let Command::Rank(args) = cli.command else {
            panic!("expected rank");
        };
        assert_eq!(args.level, Level::Region);
        assert_eq!(args.metric, Metric::Patents);
        assert_eq!(args.year, None);
    }
}
