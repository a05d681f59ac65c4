//! # yamarec CLI
//!
//! Command-line interface for fetching, caching, and filtering hiking
//! records from Yamareco and YAMAP.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `yamarec record <url>...` | Fetch record detail pages and dump their fields |
//! | `yamarec recent <name>...` | Show recent records for mountains by name |
//! | `yamarec lookup <name>...` | Resolve names against the mountain dictionary |
//! | `yamarec cache clear` | Delete cached entries |
//!
//! ## Examples
//!
//! ```bash
//! # One record, every extracted field
//! yamarec record https://www.yamareco.com/modules/yamareco/detail-1234567.html
//!
//! # Fresh records for mountains above 2000m, excluding already-climbed ones
//! yamarec recent 雲取山 金峰山 --min-altitude 2000 -e climbed.lst
//!
//! # Open the newest record per mountain in the browser
//! yamarec recent 富士山 --open -n 1
//! ```
//!
//! Credentials for the authenticated rendered-fetch fallback come from
//! `YAMARECO_USER`/`YAMARECO_PASSWORD` and `YAMAP_USER`/`YAMAP_PASSWORD`;
//! without them the fallback is simply unavailable.

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use yamarec::config::{self, Config};
use yamarec::directory::{Mountain, MountainDirectory};
use yamarec::filter;
use yamarec::retriever::{RecordRetriever, Retrieval};
use yamarec::units::parse_altitude;

/// yamarec — fetch, cache, and filter hiking-activity records.
#[derive(Parser)]
#[command(
    name = "yamarec",
    about = "Fetch, cache, and filter hiking-activity records from Yamareco and YAMAP",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used when the file
    /// does not exist.
    #[arg(long, global = true, default_value = "./config/yamarec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch activity record detail pages and dump their fields.
    Record {
        /// Record URL(s).
        urls: Vec<String>,

        /// Skip records that fail the owning site's validity check.
        #[arg(long)]
        skip_invalid: bool,

        /// Only show out-and-back routes.
        #[arg(long)]
        piston: bool,

        /// Only show one-way routes.
        #[arg(long)]
        one_way: bool,

        /// Open each shown record in the default browser.
        #[arg(short, long)]
        open: bool,
    },

    /// Show recent records for mountains, resolved by name.
    Recent {
        /// Mountain name(s).
        names: Vec<String>,

        /// Print matching record URLs only.
        #[arg(long)]
        url_only: bool,

        /// Open matching records in the default browser.
        #[arg(short, long)]
        open: bool,

        /// How many records to show per mountain.
        #[arg(short = 'n', long, default_value_t = 1)]
        num: usize,

        /// Acceptable difficulty grades, `|`-separated.
        #[arg(short = 'f', long, default_value = "D|C|B|A|S")]
        levels: String,

        /// Only records at most this many days old.
        #[arg(short = 'd', long, default_value_t = 7)]
        days: i64,

        /// Mountain list file(s) to exclude (e.g. climbed.lst). Repeatable.
        #[arg(short = 'e', long = "exclude")]
        exclude: Vec<String>,

        /// Mountain list file(s) to include. Repeatable.
        #[arg(short = 'i', long = "include")]
        include: Vec<String>,

        /// Minimum mountain altitude in meters.
        #[arg(long, default_value_t = 0)]
        min_altitude: i64,

        /// Maximum mountain altitude in meters.
        #[arg(long, default_value_t = 9000)]
        max_altitude: i64,
    },

    /// Resolve mountain names against the dictionary.
    Lookup {
        /// Mountain name(s); substring fallback applies.
        names: Vec<String>,
    },

    /// Manage the on-disk caches.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete cached entries. Without flags, both namespaces are cleared.
    Clear {
        /// Only the record cache.
        #[arg(long)]
        records: bool,

        /// Only the listing cache.
        #[arg(long)]
        listings: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Record {
            urls,
            skip_invalid,
            piston,
            one_way,
            open,
        } => run_record(&cfg, &urls, skip_invalid, piston, one_way, open),
        Commands::Recent {
            names,
            url_only,
            open,
            num,
            levels,
            days,
            exclude,
            include,
            min_altitude,
            max_altitude,
        } => run_recent(
            &cfg,
            names,
            &RecentOptions {
                url_only,
                open,
                num,
                levels,
                days,
                exclude,
                include,
                min_altitude,
                max_altitude,
            },
        ),
        Commands::Lookup { names } => run_lookup(&cfg, &names),
        Commands::Cache { action } => run_cache(&cfg, action),
    }
}

fn run_record(
    cfg: &Config,
    urls: &[String],
    skip_invalid: bool,
    piston: bool,
    one_way: bool,
    open_in_browser: bool,
) -> Result<()> {
    let retriever = RecordRetriever::from_config(cfg)?;
    let mut shown = 0;
    for url in urls {
        let retrieval = retriever.fetch(url);
        if skip_invalid && !retriever.is_valid(&retrieval.record) {
            debug!(url = %url, "skipping invalid record");
            continue;
        }
        if !filter::route_accepted(&retrieval.record, piston, one_way) {
            continue;
        }
        if shown > 0 {
            println!();
        }
        shown += 1;
        print_record(&retrieval);
        if open_in_browser {
            if shown >= 2 {
                std::thread::sleep(std::time::Duration::from_secs(1));
            }
            open_url(url);
        }
    }
    Ok(())
}

struct RecentOptions {
    url_only: bool,
    open: bool,
    num: usize,
    levels: String,
    days: i64,
    exclude: Vec<String>,
    include: Vec<String>,
    min_altitude: i64,
    max_altitude: i64,
}

fn run_recent(cfg: &Config, names: Vec<String>, opts: &RecentOptions) -> Result<()> {
    let retriever = RecordRetriever::from_config(cfg)?;
    let directory = MountainDirectory::load(&cfg.directory.path)?;

    let names = filter::include_exclude(
        names.into_iter().collect(),
        &opts.exclude,
        &opts.include,
    );
    let levels = filter::parse_levels(&opts.levels);
    let today = Local::now().date_naive();

    let mut mountains: Vec<&Mountain> = Vec::new();
    for name in &names {
        mountains.extend(directory.lookup(name));
    }
    mountains.sort_by(|a, b| {
        let alt_a = parse_altitude(a.altitude.as_deref().unwrap_or(""));
        let alt_b = parse_altitude(b.altitude.as_deref().unwrap_or(""));
        alt_b.cmp(&alt_a).then_with(|| b.name.cmp(&a.name))
    });

    let mut opened = 0;
    for mountain in mountains {
        let altitude = parse_altitude(mountain.altitude.as_deref().unwrap_or(""));
        if altitude < opts.min_altitude || altitude > opts.max_altitude {
            continue;
        }

        let mut matched = 0;
        for entry in retriever.fetch_recent(&mountain.url) {
            if let Some(level) = &entry.level {
                if !levels.contains(level) {
                    continue;
                }
            }
            let Some(date) = entry.date else { continue };
            if !filter::within_days(date, today, opts.days) {
                continue;
            }
            matched += 1;
            if matched > opts.num {
                break;
            }
            if opts.url_only {
                println!("{}", entry.url);
            } else {
                println!(
                    "name:{}, yomi:{}, altitude:{} : {} : {} : {}",
                    mountain.name,
                    mountain.yomi,
                    mountain.altitude.as_deref().unwrap_or("-"),
                    entry.url,
                    entry.date_text,
                    entry.title.as_deref().unwrap_or("")
                );
            }
            if opts.open {
                opened += 1;
                if opened >= 2 {
                    std::thread::sleep(std::time::Duration::from_secs(1));
                }
                open_url(&entry.url);
            }
        }
    }
    Ok(())
}

fn run_lookup(cfg: &Config, names: &[String]) -> Result<()> {
    let directory = MountainDirectory::load(&cfg.directory.path)?;
    for name in names {
        for mountain in directory.lookup(name) {
            println!(
                "name:{}, yomi:{}, altitude:{} : {}",
                mountain.name,
                mountain.yomi,
                mountain.altitude.as_deref().unwrap_or("-"),
                mountain.url
            );
        }
    }
    Ok(())
}

fn run_cache(cfg: &Config, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Clear { records, listings } => {
            let both = !records && !listings;
            if records || both {
                cfg.record_cache().clear();
                println!("Record cache cleared.");
            }
            if listings || both {
                cfg.listing_cache().clear();
                println!("Listing cache cleared.");
            }
        }
    }
    Ok(())
}

/// Dumps every field of a record, one per line, values column-aligned.
fn print_record(retrieval: &Retrieval) {
    let record = &retrieval.record;
    let line = |key: &str, value: &str| println!("{}: {}", ljust_jp(key, 18), value);

    line("url", &record.url);
    line("title", record.title.as_deref().unwrap_or(""));
    line("date", record.date_text.as_deref().unwrap_or(""));
    line("level", record.level.as_deref().unwrap_or(""));
    line("duration", record.duration.as_deref().unwrap_or(""));
    line(
        "actual_duration",
        record.actual_duration.as_deref().unwrap_or(""),
    );
    line(
        "rest_duration",
        record.rest_duration.as_deref().unwrap_or(""),
    );
    line("distance", record.distance.as_deref().unwrap_or(""));
    line(
        "elevation_gained",
        record.elevation_gained.as_deref().unwrap_or(""),
    );
    line(
        "elevation_lost",
        record.elevation_lost.as_deref().unwrap_or(""),
    );
    line(
        "pace",
        &record.pace.map(|p| p.to_string()).unwrap_or_default(),
    );
    line("weather", record.weather.as_deref().unwrap_or(""));
    print_list("access", &record.access);
    line("course_info", record.course_info.as_deref().unwrap_or(""));
    line("impression", record.impression.as_deref().unwrap_or(""));
    print_list("photo_captions", &record.photo_captions);
    line("prefecture", record.prefecture.as_deref().unwrap_or(""));
}

fn print_list(key: &str, values: &[String]) {
    if values.is_empty() {
        println!("{}: ", ljust_jp(key, 18));
        return;
    }
    println!("{}:", ljust_jp(key, 18));
    for value in values {
        println!("{}  {}", " ".repeat(18), value);
    }
}

/// Left-justifies to a display width where fullwidth characters count
/// double, so CJK values line up in terminal columns.
fn ljust_jp(value: &str, width: usize) -> String {
    let display_width: usize = value
        .chars()
        .map(|c| if (c as u32) <= 0xFF { 1 } else { 2 })
        .sum();
    let pad = width.saturating_sub(display_width);
    format!("{}{}", value, " ".repeat(pad))
}

fn open_url(url: &str) {
    if let Err(e) = open::that(url) {
        eprintln!("Warning: could not open {}: {}", url, e);
    }
}
