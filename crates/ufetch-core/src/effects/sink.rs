use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::data::Request;

/// Resolves the destination for an accepted response.
///
/// Called at most once per fetch, only after the final response has been
/// accepted. Opening happens inline on the loop's thread and is expected to
/// be quick (a local file or a standard stream).
pub trait SinkOpener {
    type Sink: Write;

    fn open(&mut self, request: &Request) -> io::Result<Self::Sink>;
}

/// Opens a fixed path.
///
/// With `exclusive` set the file must not exist yet; otherwise it is created
/// or truncated.
#[derive(Debug, Clone)]
pub struct FileOpener {
    path: PathBuf,
    exclusive: bool,
}

impl FileOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exclusive: false,
        }
    }

    #[must_use]
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }
}

impl SinkOpener for FileOpener {
    type Sink = File;

    fn open(&mut self, _request: &Request) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true);
        if self.exclusive {
            options.create_new(true);
        } else {
            options.create(true).truncate(true);
        }
        options.open(&self.path)
    }
}

/// Holds the single output destination of a fetch.
///
/// The destination is opened lazily and closed exactly once; a second
/// `open` while one is live is refused.
pub struct SinkAdapter<O: SinkOpener> {
    opener: O,
    sink: Option<O::Sink>,
    written: u64,
}

impl<O: SinkOpener> SinkAdapter<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            sink: None,
            written: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Bytes forwarded to the destination so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn open(&mut self, request: &Request) -> io::Result<()> {
        if self.sink.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "output destination is already open",
            ));
        }
        self.sink = Some(self.opener.open(request)?);
        Ok(())
    }

    /// Forward `chunk` verbatim. Empty chunks are a no-op.
    pub fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        let sink = self.sink.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "output destination is not open")
        })?;
        sink.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and release the destination. Returns `Ok(false)` if nothing was open.
    pub fn close(&mut self) -> io::Result<bool> {
        match self.sink.take() {
            Some(mut sink) => {
                sink.flush()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }
}
