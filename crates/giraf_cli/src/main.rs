//! Bootstrap entry point for the Giraf core.
//!
//! # Responsibility
//! - Load configuration, start logging, migrate the database and seed the
//!   placeholder pictogram.
//! - Print one `key=value` status line per step for quick local checks.

use clap::Parser;
use giraf_core::{
    init_logging_from_config, open_configured_db, FsImageStore, GirafConfig, PictogramService,
    SqliteResourceRepository,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "giraf")]
#[command(about = "Bootstraps Giraf core storage and reports its status")]
struct Cli {
    /// Path to a TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("giraf status=error error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => GirafConfig::load(path)?,
        None => GirafConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.database_path = database.clone();
        config.validate()?;
    }

    let logging = init_logging_from_config(&config)?;
    println!("giraf version={}", giraf_core::core_version());
    println!("giraf logging={}", if logging { "on" } else { "off" });

    let conn = open_configured_db(&config)?;
    println!("giraf database={}", config.database_path.display());

    let images = FsImageStore::open(&config.image_dir)?;
    let pictograms = PictogramService::new(SqliteResourceRepository::try_new(&conn)?, images);
    let placeholder = pictograms.ensure_default_pictogram(&config.default_pictogram_title)?;
    println!("giraf default_pictogram_id={}", placeholder.key);

    info!(
        "event=bootstrap module=cli status=ok default_pictogram_id={}",
        placeholder.key
    );
    Ok(())
}
