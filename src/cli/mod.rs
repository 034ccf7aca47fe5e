//! Rental pricer CLI module
//!
//! Command-line interface for cleaning datasets, building schemas and pricing
//! listings.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cache::{CacheConfig, CityCache};
use crate::encoding::{build_schema, ListingAttributes};
use crate::preprocessing::{Cleaner, CleaningConfig, CleaningReport};
use crate::utils::{city_key, discover_cities, DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "rental-pricer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean short-term-rental listings and price new ones")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean a raw listings file
    Clean {
        /// Raw listings CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Where to write the cleaned CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Cleaning configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Build and save the feature schema of a city dataset
    Schema {
        /// Raw listings CSV
        #[arg(short, long)]
        data: PathBuf,

        /// City the schema belongs to (defaults to the file name)
        #[arg(long)]
        city: Option<String>,

        /// Where to write the schema JSON
        #[arg(short, long)]
        output: PathBuf,

        /// Cleaning configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Price a listing described in a JSON attribute file
    Predict {
        /// City to price in
        #[arg(long)]
        city: String,

        /// Directory with one raw `{city}.csv` per city
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Directory with one `{city}.json` model artifact per city
        #[arg(long, default_value = "./models")]
        models_dir: PathBuf,

        /// Listing attributes (JSON)
        #[arg(short, long)]
        attributes: PathBuf,

        /// Also write the encoded feature vector to this CSV
        #[arg(long)]
        debug_out: Option<PathBuf>,
    },

    /// List the cities with a dataset
    Cities {
        /// Directory with one raw `{city}.csv` per city
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CleaningConfig> {
    Ok(match path {
        Some(p) => CleaningConfig::load(p)?,
        None => CleaningConfig::default(),
    })
}

fn print_report(report: &CleaningReport) {
    kv("Rows in", &report.rows_in.to_string());
    kv("Rows retained", &report.rows_retained.to_string());
    kv("Price cutoff", &format!("{:.2}", report.price_cutoff));
    kv("Bathrooms unparsed", &report.bathrooms_unparsed.to_string());
    kv(
        "Bedrooms imputed",
        &(report.bedrooms.imputed + report.bedrooms.fallback).to_string(),
    );
    for stats in report.coercions.iter().filter(|s| s.defaulted > 0) {
        kv(
            &format!("Malformed {}", stats.column),
            &format!("{} ({})", stats.defaulted, stats.dtype).yellow().to_string(),
        );
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_clean(data_path: &Path, output_path: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    section("Clean");

    step_run("Loading data");
    let start = Instant::now();
    let raw = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", raw.height(), raw.width(), start.elapsed()));

    step_run("Cleaning");
    let start = Instant::now();
    let cleaned = Cleaner::with_config(load_config(config)?).clean(&raw)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output_path.display()));
    let (mut df, vocabulary, report) = cleaned.into_parts();
    DataSaver::save_csv(&mut df, output_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    section("Report");
    print_report(&report);

    section("Amenity vocabulary");
    for (token, count) in vocabulary.tokens().iter().zip(vocabulary.counts()) {
        println!("  {:<32} {}", token.white(), dim(&count.to_string()));
    }
    println!();
    Ok(())
}

pub fn cmd_schema(
    data_path: &Path,
    city: Option<&str>,
    output_path: &Path,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    section("Schema");

    let city = match city {
        Some(c) => city_key(c),
        None => data_path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(city_key)
            .ok_or_else(|| anyhow::anyhow!("cannot derive a city name from {}", data_path.display()))?,
    };

    step_run("Cleaning");
    let raw = DataLoader::new().load_csv(data_path)?;
    let cleaned = Cleaner::with_config(load_config(config)?).clean(&raw)?;
    step_done(&format!("{} rows", cleaned.height()));

    step_run(&format!("Saving → {}", output_path.display()));
    let schema = build_schema(&city, &cleaned)?;
    schema.save(output_path)?;
    step_done(&format!("{} columns", schema.len()));

    println!();
    kv("City", &city);
    kv("Version", &schema.version().to_string());
    kv("Fingerprint", &schema.fingerprint());
    println!();
    Ok(())
}

pub fn cmd_predict(
    city: &str,
    data_dir: &Path,
    models_dir: &Path,
    attributes_path: &Path,
    debug_out: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    let attributes = ListingAttributes::load(attributes_path)?;
    let cache = CityCache::new(CacheConfig::new(data_dir, models_dir));

    step_run(&format!("Loading {}", city.cyan()));
    let start = Instant::now();
    let artifacts = cache.get(city)?;
    step_done(&format!("{} listings in {:?}", artifacts.dataset().height(), start.elapsed()));

    let features = artifacts.encoder().encode(&attributes)?;
    if let Some(path) = debug_out {
        features.write_csv(path)?;
        kv("Feature vector", &path.display().to_string());
    }

    let prediction = artifacts.predict_encoded(&features)?;

    println!();
    println!(
        "  {:<22} {}",
        muted("Predicted price"),
        prediction.to_string().white().bold()
    );
    println!();
    Ok(())
}

pub fn cmd_cities(data_dir: &Path) -> anyhow::Result<()> {
    section("Cities");
    let cities = discover_cities(data_dir)?;
    if cities.is_empty() {
        println!("  {}", "No datasets found".yellow());
    }
    for (name, path) in &cities {
        kv(name, &path.display().to_string());
    }
    println!();
    Ok(())
}
