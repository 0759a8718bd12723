//! Log output that does not tear the progress bar.

use std::io::{self, Write};

use indicatif::MultiProgress;
use tracing::Level;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// `-q` keeps errors only, `-v` enables debug, otherwise `RUST_LOG` with an
/// `info` floor.
pub fn env_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    }
}

pub fn init_logging(verbose: bool, quiet: bool, multi: MultiProgress) {
    tracing_subscriber::registry()
        .with(env_filter(verbose, quiet))
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(SuspendingStderr { multi }),
        )
        .init();
}

/// Writes to stderr with the progress bars cleared for the duration.
#[derive(Debug, Clone)]
pub struct SuspendingStderr {
    multi: MultiProgress,
}

impl<'a> MakeWriter<'a> for SuspendingStderr {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for SuspendingStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
