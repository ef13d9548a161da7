use std::io::Write;

use monaspect_core::SourceFailure;
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;
use crate::metadata::Metadata;

/// JSON document written to stdout for every command.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub meta: Metadata,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SourceFailure>,
}

impl Envelope {
    pub fn new(meta: Metadata, data: Value) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<SourceFailure>) -> Self {
        self.errors.extend(errors);
        self
    }
}

pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    stdout.flush()?;
    Ok(())
}

/// One compact envelope per line, for streaming commands.
pub fn render_line(envelope: &Envelope) -> Result<(), CliError> {
    render(envelope, false)
}
