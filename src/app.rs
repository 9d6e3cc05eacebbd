//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - builds the immutable context (catalog, entity table, data source)
//! - runs the shared pipeline
//! - prints reports/plots
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;

use crate::app::pipeline::{Context, Selection};
use crate::cli::{Command, PlotArgs, RankArgs, ResolveArgs, SeriesArgs, SourceArgs};
use crate::data::catalog::Catalog;
use crate::data::fetch::DataSource;
use crate::domain::{EntityClass, Level};
use crate::error::{AppError, DatasetError};
use crate::logging::{LogConfig, init_logging};
use crate::resolve::EntityTable;

pub mod pipeline;

/// Entry point for the `rds` binary.
pub fn run() -> Result<(), AppError> {
    // We want `rds` and `rds -r Cataluña` to behave like `rds tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Series(args) => handle_series(args),
        Command::Rank(args) => handle_rank(args),
        Command::Resolve(args) => handle_resolve(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn init_cli_logging(source: &SourceArgs) -> Result<(), AppError> {
    init_logging(&LogConfig::from_verbosity(source.verbose).with_log_file(source.log_file.clone()))
}

/// Catalog, entity table and data location from flags, env and defaults.
pub fn build_context(source: &SourceArgs) -> Result<Context, AppError> {
    let catalog = match &source.catalog {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };
    let table = load_table(source.entities.as_ref())?;
    let source = match &source.data {
        Some(arg) => DataSource::parse(arg),
        None => DataSource::from_env(),
    };
    tracing::info!(%source, entities = table.version(), datasets = catalog.datasets.len(), "context ready");
    Ok(Context { catalog, table, source })
}

fn load_table(path: Option<&PathBuf>) -> Result<EntityTable, AppError> {
    match path {
        Some(path) => EntityTable::from_path(path)
            .map_err(|e| AppError::new(2, format!("Failed to load entity table '{}': {e}", path.display()))),
        None => EntityTable::builtin().map_err(|e| AppError::new(4, format!("Built-in entity table is invalid: {e}"))),
    }
}

/// Turn flags into a selection with resolved codes.
pub fn selection_from_args(args: &SeriesArgs, table: &EntityTable) -> Result<Selection, AppError> {
    let country = pipeline::resolve_focus(table, &args.country, EntityClass::Country)?;
    let region = args
        .region
        .as_deref()
        .map(|r| pipeline::resolve_focus(table, r, EntityClass::Region))
        .transpose()?;
    if let (Some(from), Some(to)) = (args.from, args.to)
        && from > to
    {
        return Err(AppError::new(2, format!("--from {from} is after --to {to}.")));
    }
    Ok(Selection {
        metric: args.metric,
        country,
        region,
        sector: args.sector,
        from: args.from,
        to: args.to,
        language: args.lang,
    })
}

fn handle_series(args: SeriesArgs) -> Result<(), AppError> {
    init_cli_logging(&args.source)?;
    let ctx = build_context(&args.source)?;
    let selection = selection_from_args(&args, &ctx.table)?;

    let data = pipeline::load(&ctx, selection.metric, selection.region.is_some())?;
    let view = pipeline::build_view(&ctx, &data, &selection);

    // The bundle is most useful when the selection came back empty.
    if args.debug {
        let path = crate::debug::write_debug_bundle(
            &PathBuf::from("debug"),
            &data,
            &selection,
            view.as_ref().ok(),
            &ctx.table,
        )?;
        eprintln!("Wrote debug bundle: {}", path.display());
    }

    let view = view?;

    println!("{}", crate::report::format_summary(&view));
    println!("{}", crate::report::format_series_table(&view));
    if !view.breakdown.is_empty() {
        println!("{}", crate::report::format_breakdown(&view));
    }

    if !args.no_plot {
        let plot = crate::plot::render_ascii_plot(&view.legends, &view.rows, args.width, args.height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::export::write_series_csv(path, &view)?;
    }
    if let Some(path) = &args.export_chart {
        crate::io::chart::write_chart_json(path, &view.to_chart_file())?;
    }

    Ok(())
}

fn handle_rank(args: RankArgs) -> Result<(), AppError> {
    init_cli_logging(&args.source)?;
    let ctx = build_context(&args.source)?;

    let data = pipeline::load(&ctx, args.metric, args.level == Level::Region)?;
    let dataset = data
        .dataset(args.level)
        .ok_or_else(|| DatasetError::UnknownDataset(format!("{:?}/{:?}", args.metric, args.level)))?;
    let (year, ranking) = pipeline::rank_year(&ctx, dataset, args.sector, args.year)?;

    print!(
        "{}",
        crate::report::format_rank_heading(args.metric, args.level, args.sector, args.lang)
    );
    println!(
        "{}",
        crate::report::format_ranking(&ranking, year, &ctx.table, args.metric, args.lang, args.top, None)
    );
    Ok(())
}

fn handle_resolve(args: ResolveArgs) -> Result<(), AppError> {
    init_logging(&LogConfig::from_verbosity(args.verbose))?;
    let table = load_table(args.entities.as_ref())?;

    let results: Vec<_> = args
        .names
        .iter()
        .map(|name| {
            let hit = table
                .resolve_with_rule(name, &args.dataset)
                .map(|(entity, rule)| (entity.code.clone(), entity.name(args.lang).to_string(), rule));
            (name.clone(), hit)
        })
        .collect();

    print!("{}", crate::report::format_resolution(&results));
    Ok(())
}

fn handle_tui(args: SeriesArgs) -> Result<(), AppError> {
    init_logging(
        &LogConfig::from_verbosity(args.source.verbose)
            .with_log_file(args.source.log_file.clone())
            .for_tui(),
    )?;
    let ctx = build_context(&args.source)?;
    let selection = selection_from_args(&args, &ctx.table)?;
    crate::tui::run(ctx, selection)
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let chart = crate::io::chart::read_chart_json(&args.chart)?;
    let plot = crate::plot::render_chart_file(&chart, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Rewrite argv so `rds` defaults to `rds tui`.
///
/// Rules:
/// - `rds`                       -> `rds tui`
/// - `rds -r Cataluña ...`       -> `rds tui -r Cataluña ...`
/// - `rds --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "series" | "rank" | "resolve" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
