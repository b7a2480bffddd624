//! Logger setup: `env_logger` to stderr, optionally tee'd into an
//! append-only log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes every record to stderr and to the log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // stderr is best-effort; the file is the record of the session
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Initialise the global logger. Default level is `info` for this crate
/// and `warn` for dependencies; `RUST_LOG` overrides both.
///
/// A log file that cannot be opened is reported and skipped, it never
/// stops startup.
pub fn init(log_file: Option<&Path>) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,aim_lens_lib=info,aim_lens=info"),
    );

    let mut file_error = None;
    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
            }
            Err(e) => file_error = Some((path.display().to_string(), e)),
        }
    }

    // A second init (tests, embedding) keeps the first logger.
    if builder.try_init().is_err() {
        return;
    }

    if let Some((path, e)) = file_error {
        log::warn!("[LOG] Could not open log file {}: {}, logging to stderr only", path, e);
    } else if let Some(path) = log_file {
        log::info!("[LOG] Appending to {}", path.display());
    }
}
