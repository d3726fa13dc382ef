use console::Term;
use ufetch_core::{ErrorKind, FetchEvent};

/// Prints fetch progress to stderr.
#[derive(Debug, Clone)]
pub struct Reporter {
    term: Term,
}

impl Reporter {
    pub fn stderr() -> Self {
        Self { term: Term::stderr() }
    }

    pub fn report(&self, event: &FetchEvent) {
        for line in render(event) {
            // nowhere left to report a broken stderr
            let _ = self.term.write_line(&line);
        }
    }
}

/// Diagnostic lines for `event`; empty when it has nothing to say.
pub fn render(event: &FetchEvent) -> Vec<String> {
    match event {
        FetchEvent::Connecting { host, addr: Some(addr) } => {
            vec![format!("Connecting to {host} {}:{}", addr.ip(), addr.port())]
        }
        FetchEvent::Connecting { host, addr: None } => vec![format!("Connecting to {host}")],
        FetchEvent::Redirected { host, location } => {
            let mut path = location.path().to_string();
            if let Some(query) = location.query() {
                path.push('?');
                path.push_str(query);
            }
            vec![format!("Redirected to {path} on {host}")]
        }
        FetchEvent::Headers { status, headers } => {
            let mut lines = Vec::with_capacity(headers.len() + 1);
            lines.push(format!("Headers ({status}):"));
            lines.extend(headers.iter().map(|(name, value)| format!("{name}={value}")));
            lines
        }
        FetchEvent::Error { kind, ignored, detail } => vec![error_line(*kind, *ignored, detail)],
        FetchEvent::Finished(_) => Vec::new(),
    }
}

fn error_line(kind: ErrorKind, ignored: bool, detail: &str) -> String {
    match kind {
        ErrorKind::SinkOpenFailed => format!("{kind}: {detail}"),
        ErrorKind::StatusRejected => format!("{detail} rejected"),
        ErrorKind::Unknown if !detail.is_empty() => format!("Connection error: {kind} ({detail})"),
        _ if ignored => format!("Connection error: {kind} (ignored)"),
        _ => format!("Connection error: {kind}"),
    }
}
