use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use db5fuse::config::LOG_FILENAME;
use db5fuse::Checker;

#[derive(Parser, Debug)]
#[command(name = "fsck-db5")]
#[command(about = "Check a db5 filesystem and optionally repair it", long_about = None)]
struct Args {
    /// Fix errors instead of only listing them
    #[arg(short = 'f')]
    fix: bool,

    /// Path of the db5 device
    device: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let device = std::fs::canonicalize(&args.device)
        .with_context(|| format!("unable to reach device {:?}", args.device))?;

    println!("Scan of '{}'.", device.display());
    println!(
        "Information will be stored in file '{}/{}'",
        device.display(),
        LOG_FILENAME
    );

    db5fuse::logger::init(&device, args.verbose);
    log::info!("scanning device {:?}", device);

    let mut checker = Checker::open(&device, args.fix).context("unable to open the database")?;
    let problems = checker.run().context("scan aborted")?;

    log::info!("scan complete, {} problem(s)", problems);
    if problems == 0 {
        println!("done, no problems found.");
    } else if args.fix {
        println!("done, {} problem(s) repaired.", problems);
    } else {
        println!("done, {} problem(s) found; run with -f to repair.", problems);
    }

    Ok(())
}
