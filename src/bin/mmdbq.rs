use anyhow::{Context, Result};
use clap::Parser;
use mmdb_client::{Database, Error, LookupError, Native, OpenMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mmdbq")]
#[command(
    about = "Query MaxMind-format IP databases",
    long_about = "mmdbq - Query MaxMind-format IP databases through the native lookup engine\n\n\
    Looks up one or more IP addresses in a .mmdb database and prints each\n\
    matched record as JSON (null when the database has no record for an\n\
    address).\n\n\
    Examples:\n\
      mmdbq GeoLite2-Country.mmdb 89.160.20.112\n\
      mmdbq GeoLite2-City.mmdb 8.8.8.8 2001:4860:4860::8888\n\
      mmdbq --compact threats.mmdb 1.2.3.4"
)]
#[command(version)]
struct Cli {
    /// Path to the database file (.mmdb)
    database: PathBuf,

    /// IP addresses to look up
    #[arg(value_name = "ADDRESS", required = true)]
    addresses: Vec<String>,

    /// Open the database with the engine's full mode mask instead of plain mmap
    #[arg(long)]
    mask: bool,

    /// Print one compact JSON document per address instead of pretty output
    #[arg(short, long)]
    compact: bool,

    /// Print the native engine version to stderr before querying
    #[arg(long)]
    engine_version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.engine_version {
        eprintln!("engine: {}", Database::<Native>::version());
    }

    let mode = if cli.mask {
        OpenMode::Mask
    } else {
        OpenMode::MemoryMap
    };

    let db = Database::<Native>::open(&cli.database, mode)
        .with_context(|| format!("Failed to open database: {}", cli.database.display()))?;

    let mut found_any = false;
    for address in &cli.addresses {
        let record = match db.lookup(address) {
            Ok(record) => record,
            // Unresolvable input only fails that one address
            Err(Error::Lookup(LookupError::AddressResolution { message, .. })) => {
                eprintln!("{}: {}", address, message);
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Lookup failed for: {}", address))
            }
        };

        let json = match &record {
            Some(value) => value.to_json(),
            None => serde_json::Value::Null,
        };
        let rendered = if cli.compact {
            serde_json::to_string(&json)?
        } else {
            serde_json::to_string_pretty(&json)?
        };
        println!("{}", rendered);

        found_any |= record.is_some();
    }

    // Exit code mirrors whether anything matched
    std::process::exit(if found_any { 0 } else { 1 });
}
