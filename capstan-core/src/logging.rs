//! env_logger setup for the capstan binary.

use env_logger::Target;
use once_cell::sync::OnceCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

static INIT: OnceCell<()> = OnceCell::new();

/// Level used when `RUST_LOG` is unset: 0 = info, 1 = debug, 2+ = trace.
pub fn level_for_verbosity(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Install the global logger once; later calls are no-ops.
///
/// Logs go to `log_file` (append) when given, falling back to stderr if it cannot be opened.
pub fn init(verbosity: u8, log_file: Option<PathBuf>) {
    INIT.get_or_init(|| {
        let target = log_file
            .as_deref()
            .and_then(|path| open_log_file(path).ok())
            .map(|file| Target::Pipe(Box::new(file)))
            .unwrap_or(Target::Stderr);

        let mut builder = env_logger::Builder::new();
        builder.filter_level(level_for_verbosity(verbosity));
        // RUST_LOG wins over the verbosity flag.
        if let Ok(spec) = std::env::var("RUST_LOG") {
            builder.parse_filters(&spec);
        }
        builder.target(target).format_timestamp_secs();
        let _ = builder.try_init();
    });
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::OpenOptions::new().create(true).append(true).open(path)
}
