use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fuser::MountOption;

use db5fuse::fuse::parse_mount_option;
use db5fuse::{Db, Db5Filesystem};

#[derive(Parser, Debug)]
#[command(name = "db5fuse")]
#[command(about = "Mount a db5 media-player library as a filesystem", long_about = None)]
struct Args {
    /// Path of the mounted device FAT filesystem
    device: PathBuf,

    /// Where the virtual filesystem will be mounted
    mountpoint: PathBuf,

    /// Mount option forwarded to the FUSE host (can be repeated)
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let device = std::fs::canonicalize(&args.device)
        .with_context(|| format!("unable to reach device {:?}", args.device))?;

    db5fuse::logger::init(&device, args.verbose);
    log::info!("initialisation, device is {:?}", device);

    // Open the database before mounting so a broken device aborts the
    // mount instead of serving an empty tree.
    let db = Db::open(&device).context("unable to initialise the database")?;
    let filesystem = Db5Filesystem::new(db);

    let mut options = vec![MountOption::FSName("db5fuse".to_string())];
    options.extend(args.options.iter().map(|o| parse_mount_option(o)));

    fuser::mount2(filesystem, &args.mountpoint, &options)
        .with_context(|| format!("unable to mount on {:?}", args.mountpoint))?;

    Ok(())
}
