//! CLI for osmtile - inspect and query tile expiry lists
//!
//! This is a thin wrapper around the osmtile-core library.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use osmtile_core::tile::MAX_ZOOM;
use osmtile_core::{TileCoordinate, TileExpiryList};

#[derive(Parser, Debug)]
#[command(
    name = "osmtile",
    about = "List and query the tiles named in a tile expiry list",
    version
)]
struct Args {
    /// Expiry list with one `zoom/x/y` record per line
    #[arg(value_name = "LIST")]
    list: PathBuf,

    /// Zoom level of every record in the list
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64))]
    base_zoom: u8,

    /// Print the expired tiles coarsened to this zoom (repeatable, defaults to the base zoom)
    #[arg(long = "zoom", value_name = "ZOOM")]
    zooms: Vec<u8>,

    /// Report whether tile X/Y at the base zoom is expired (repeatable)
    #[arg(long = "contains", value_name = "X/Y")]
    queries: Vec<TileCoordinate>,

    /// Treat the expiry filter as switched off
    #[arg(long)]
    disabled: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Some(&zoom) = args.zooms.iter().find(|&&z| z > args.base_zoom) {
        anyhow::bail!(
            "Zoom {} is finer than the base zoom {}",
            zoom,
            args.base_zoom
        );
    }

    let mut expired = TileExpiryList::new(args.base_zoom, !args.disabled);
    expired
        .read_list_from_file(&args.list)
        .with_context(|| format!("Failed to load expiry list {}", args.list.display()))?;
    log::info!(
        "{} expired tiles at zoom {}",
        expired.len(),
        expired.base_zoom()
    );

    let zooms = if args.zooms.is_empty() {
        vec![args.base_zoom]
    } else {
        args.zooms.clone()
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for zoom in zooms {
        for tile in expired.clone_at_zoom(zoom) {
            writeln!(out, "{}/{}", zoom, tile).context("Failed to write tile list")?;
        }
    }
    for query in &args.queries {
        let state = if expired.contains(*query) {
            "expired"
        } else {
            "current"
        };
        writeln!(out, "{}: {}", query, state).context("Failed to write query result")?;
    }
    out.flush().context("Failed to flush output")?;

    Ok(())
}
