use anyhow::{Context, Result};
use geodata::{
    cli::{Cli, Commands},
    BarProgress, DatasetEdit, DatasetStore, LogProgress, NewDataset, Phase, ProgressSink,
    TileCoord,
};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Progress bar on a terminal, log lines with `--quiet`
enum CliProgress {
    Bar(BarProgress),
    Log(LogProgress),
}

impl CliProgress {
    fn new(quiet: bool) -> Self {
        if quiet {
            CliProgress::Log(LogProgress::new())
        } else {
            CliProgress::Bar(BarProgress::new())
        }
    }
}

impl ProgressSink for CliProgress {
    fn set_phase(&mut self, phase: Phase) {
        match self {
            CliProgress::Bar(bar) => bar.set_phase(phase),
            CliProgress::Log(log) => log.set_phase(phase),
        }
    }

    fn set_progress(&mut self, current: u64, total: u64) {
        match self {
            CliProgress::Bar(bar) => bar.set_progress(current, total),
            CliProgress::Log(log) => log.set_progress(current, total),
        }
    }

    fn log(&mut self, message: impl Into<String>) {
        match self {
            CliProgress::Bar(bar) => bar.log(message),
            CliProgress::Log(log) => log.log(message),
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "geodata=warn",
        1 => "geodata=info",
        2 => "geodata=debug",
        _ => "geodata=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_upload(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let config = cli.config()?;
    let mut store = DatasetStore::open_with_config(&config)
        .with_context(|| format!("Failed to open database {:?}", config.database))?;

    match cli.command {
        Commands::Ingest {
            name,
            file,
            kind,
            color,
            coordinate,
            user,
        } => {
            let start = Instant::now();
            let upload = read_upload(&file)?;
            let mut dataset = NewDataset::new(&name, kind, color);
            dataset.coordinate = coordinate;

            let mut progress = CliProgress::new(cli.quiet);
            let count = store
                .ingest(&dataset, &upload, &user, &mut progress)
                .with_context(|| format!("Failed to ingest {}", name))?;

            println!(
                "Ingested {} ({} features) in {:.1}s",
                name,
                count,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Edit {
            name,
            rename,
            file,
            color,
            coordinate,
            user,
        } => {
            let upload = file.as_deref().map(read_upload).transpose()?;
            let edit = DatasetEdit {
                table_name: rename,
                color,
                coordinate,
            };

            let mut progress = CliProgress::new(cli.quiet);
            let loaded = store
                .edit(&name, &edit, upload.as_deref(), &user, &mut progress)
                .with_context(|| format!("Failed to edit {}", name))?;

            let current = edit.table_name.as_deref().unwrap_or(&name);
            match loaded {
                Some(count) => println!("Updated {} ({} features replaced)", current, count),
                None => println!("Updated {}", current),
            }
        }

        Commands::Delete { name } => {
            store
                .delete_dataset(&name)
                .with_context(|| format!("Failed to delete {}", name))?;
            println!("Deleted {}", name);
        }

        Commands::List => {
            let entries = store.list_datasets()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }

        Commands::Layers => {
            let layers = store.map_layers(&config.tile_url_base)?;
            println!("{}", serde_json::to_string_pretty(&layers)?);
        }

        Commands::Document { name, output } => {
            let collection = store
                .document(&name)
                .with_context(|| format!("Failed to read {}", name))?;
            let json = serde_json::to_string(&collection)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {:?}", path))?,
                None => println!("{}", json),
            }
        }

        Commands::Tile {
            name,
            z,
            x,
            y,
            output,
        } => {
            let coord = TileCoord::new(z, x, y)?;
            let bytes = store
                .tile(&name, coord)
                .with_context(|| format!("Failed to render {}/{}/{}/{}", name, z, x, y))?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {:?}", output))?;
            println!("Wrote {} bytes to {:?}", bytes.len(), output);
        }
    }

    Ok(())
}
