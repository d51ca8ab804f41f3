//! Log file setup
//!
//! Both binaries log to `db5fuse.log` at the device root, one record per
//! line in `context.level: message` form. The sink is the standard `log`
//! facade, so the library modules never know where their output goes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::config::LOG_FILENAME;

/// Install the device log. Falls back to stderr when the log file
/// cannot be opened; a broken log must not block a mount.
pub fn init(device_root: &Path, verbose: bool) {
    let default_level = if verbose { "trace" } else { "info" };

    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{}.{}: {}",
            record.target(),
            record.level().as_str().to_lowercase(),
            record.args()
        )
    });

    let log_path = device_root.join(LOG_FILENAME);
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("db5fuse: unable to open log file {:?}: {}", log_path, e);
        }
    }

    // Ignore the error from a second init in tests.
    let _ = builder.try_init();
}
