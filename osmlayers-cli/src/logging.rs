//! Process-wide logging to the console and `<log-dir>/logs/processing_log.txt`.
//!
//! Lines read `<timestamp> - <LEVEL> - <message>`. The default filter is
//! `info`; `RUST_LOG` overrides it. Parent and worker processes append to
//! the same file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use env_logger::{Builder, Env, Target, WriteStyle};

use crate::CliError;

const LOG_SUBDIR: &str = "logs";
const LOG_FILE: &str = "processing_log.txt";

/// The processing log inside `log_dir`.
pub(crate) fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_SUBDIR).join(LOG_FILE)
}

/// Install the global logger.
pub(crate) fn init(log_dir: &Path) -> Result<(), CliError> {
    let path = log_file_path(log_dir);
    let open_error = |source| CliError::OpenLog {
        path: path.clone(),
        source,
    };
    let utf8 = osmlayers_fs::utf8_path(&path).map_err(open_error)?;
    let file = osmlayers_fs::open_append(utf8).map_err(open_error)?;
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    configure(&mut builder, Tee::new(io::stderr(), file));
    builder.try_init()?;
    Ok(())
}

fn configure<W>(builder: &mut Builder, sink: W)
where
    W: Write + Send + 'static,
{
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(sink)));
}

/// Writes every buffer to both the console and the log file.
struct Tee<C, F> {
    console: C,
    file: F,
}

impl<C, F> Tee<C, F> {
    const fn new(console: C, file: F) -> Self {
        Self { console, file }
    }
}

impl<C: Write, F: Write> Write for Tee<C, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        // A closed console must not stop the file log.
        self.console.write_all(buf).ok();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.console.flush().ok();
        Ok(())
    }
}
