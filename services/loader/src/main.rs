//! Loader - Loads the registry sources and answers ad-hoc queries
//!
//! Responsibilities:
//! - Resolve source files from the environment (overridable by flags)
//! - Load units, facilities and assets exactly like the API does at startup
//! - Print a summary, or run one facility search / asset lookup
//!
//! Usage:
//!   cargo run --bin loader
//!   cargo run --bin loader -- --unit 145-1685 --search "san roque"
//!   cargo run --bin loader -- --site "C.S. SAN ROQUE" --code 0012345678901

use anyhow::{Context, Result};
use clap::Parser;
use registry::{AssetLookup, Config, Registry, SourceFile};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "loader", about = "Loads facility and asset registries and runs queries")]
struct Args {
    /// Units workbook (defaults to USERS_FILE)
    #[arg(long)]
    users: Option<PathBuf>,

    /// Facility master file (defaults to IPRESS_FILE)
    #[arg(long)]
    facilities: Option<PathBuf>,

    /// Facility sheet to use instead of autodetection
    #[arg(long)]
    facilities_sheet: Option<String>,

    /// Asset inventory file (defaults to SIGA_FILE)
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Asset sheet to use instead of autodetection
    #[arg(long)]
    assets_sheet: Option<String>,

    /// Free-text facility search
    #[arg(long)]
    search: Option<String>,

    /// Unit code scoping the facility search
    #[arg(long, default_value = "")]
    unit: String,

    /// Site for an asset lookup
    #[arg(long)]
    site: Option<String>,

    /// Patrimonial code for an asset lookup
    #[arg(long)]
    code: Option<String>,
}

impl Args {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(path) = &self.users {
            config.users = SourceFile {
                path: path.clone(),
                sheet: config.users.sheet,
            };
        }
        if let Some(path) = &self.facilities {
            config.facilities = SourceFile::new(path);
        }
        if let Some(sheet) = &self.facilities_sheet {
            config.facilities.sheet = Some(sheet.clone());
        }
        if let Some(path) = &self.assets {
            config.assets = SourceFile::new(path);
        }
        if let Some(sheet) = &self.assets_sheet {
            config.assets.sheet = Some(sheet.clone());
        }
        config
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.apply(Config::from_env());

    println!("=== Registry Loader ===");
    println!("Units:      {}", config.users.path.display());
    println!("Facilities: {}", config.facilities.path.display());
    println!("Assets:     {}", config.assets.path.display());

    let registry = Registry::load(&config).context("Failed to load registry sources")?;

    println!("\nLoaded:");
    println!("  Units:          {}", registry.units.len());
    println!("  Facility units: {}", registry.facilities.key_count());
    println!("  Facilities:     {}", registry.facilities.record_count());
    println!("  Assets:         {}", registry.assets.len());

    if let Some(query) = &args.search {
        let hits = registry.facilities.search(&args.unit, query);
        println!("\nSearch '{}' (unit '{}'): {} hit(s)", query, args.unit, hits.len());
        for (i, hit) in hits.iter().enumerate() {
            println!(
                "  [{:2}] {} | {} | {}",
                i + 1,
                hit.facility_code,
                hit.facility_name,
                hit.category
            );
        }
    }

    if args.site.is_some() || args.code.is_some() {
        let site = args.site.as_deref().unwrap_or("");
        let code = args.code.as_deref().unwrap_or("");
        let found = registry
            .assets
            .lookup(site, code)
            .with_context(|| format!("Invalid lookup (site '{}', code '{}')", site, code))?;

        println!("\nLookup '{}' / '{}':", site, code);
        match AssetLookup::from(found) {
            AssetLookup {
                asset: Some(asset), ..
            } => {
                println!("  Denomination: {}", asset.denomination);
                println!("  Brand:        {}", asset.brand);
                println!("  Model:        {}", asset.model);
                println!("  Serial:       {}", asset.serial);
                println!("  Age (years):  {}", asset.age_years);
            }
            AssetLookup { asset: None, .. } => println!("  Not found"),
        }
    }

    Ok(())
}
