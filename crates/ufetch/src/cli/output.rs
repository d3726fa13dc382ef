use std::fs::File;
use std::io::{self, Stdout, Write};

use tracing::debug;
use ufetch_core::{FileOpener, Request, SinkOpener};

const DEFAULT_FILE_NAME: &str = "index.html";

/// Destination chosen from `-O`.
#[derive(Debug)]
pub enum Output {
    Stdout(Stdout),
    File(File),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(out) => out.write(buf),
            Output::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(out) => out.flush(),
            Output::File(file) => file.flush(),
        }
    }
}

/// Opens the output once the final response is accepted.
///
/// - `-` writes to stdout
/// - an explicit path is created or truncated
/// - otherwise the name comes from the final request's location and the
///   file must not exist yet
#[derive(Debug, Clone, Default)]
pub struct OutputOpener {
    target: Option<String>,
}

impl OutputOpener {
    pub fn new(target: Option<String>) -> Self {
        Self { target }
    }
}

impl SinkOpener for OutputOpener {
    type Sink = Output;

    fn open(&mut self, request: &Request) -> io::Result<Output> {
        match self.target.as_deref() {
            Some("-") => Ok(Output::Stdout(io::stdout())),
            Some(path) => FileOpener::new(path).open(request).map(Output::File),
            None => {
                let name = file_name_for(&request.location());
                debug!(%name, "derived output file name");
                FileOpener::new(name).exclusive(true).open(request).map(Output::File)
            }
        }
    }
}

/// File name for a request location such as `/dir/file.txt?x=1`.
///
/// The location is cut at the first `;` or `&`, trailing slashes are
/// dropped and the last segment is kept. An empty result becomes
/// `index.html`.
pub fn file_name_for(location: &str) -> String {
    let end = location.find([';', '&']).unwrap_or(location.len());
    let trimmed = location[..end].trim_end_matches('/');
    let name = match trimmed.rfind('/') {
        Some(slash) => &trimmed[slash + 1..],
        None => trimmed,
    };
    if name.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_name_from_last_segment() {
        assert_eq!(file_name_for("/releases/v1/tool.tar.gz"), "tool.tar.gz");
        assert_eq!(file_name_for("/dir/"), "dir");
        assert_eq!(file_name_for("/dir///"), "dir");
    }

    #[test]
    fn test_file_name_cut_at_separators() {
        assert_eq!(file_name_for("/a/b.txt;type=i"), "b.txt");
        assert_eq!(file_name_for("/a/b.txt&x=1"), "b.txt");
        assert_eq!(file_name_for("/get?file=1&x=2"), "get?file=1");
    }

    #[test]
    fn test_file_name_falls_back_to_index() {
        assert_eq!(file_name_for("/"), DEFAULT_FILE_NAME);
        assert_eq!(file_name_for(""), DEFAULT_FILE_NAME);
        assert_eq!(file_name_for("/;params"), DEFAULT_FILE_NAME);
    }

    #[test]
    fn test_explicit_path_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, "stale contents").unwrap();

        let request = Request::get("http://example.com/file").unwrap();
        let mut opener = OutputOpener::new(Some(path.to_string_lossy().into_owned()));
        let mut output = opener.open(&request).unwrap();
        output.write_all(b"new").unwrap();
        output.flush().unwrap();
        drop(output);

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_dash_selects_stdout() {
        let request = Request::get("http://example.com/file").unwrap();
        let output = OutputOpener::new(Some("-".into())).open(&request).unwrap();
        assert!(matches!(output, Output::Stdout(_)));
    }
}
