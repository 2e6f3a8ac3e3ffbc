use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::dates::{DateFormat, DateFormatSpec};
use crate::error::FormatError;

// Include default formats at compile time
const DEFAULT_FORMATS_BYTES: &[u8] = include_bytes!("../default_date_formats.txt");

/// Looked up in the working directory when no file is given.
pub const DEFAULT_FORMATS_FILE: &str = "date_formats.txt";

/// Candidate formats for access lines and for error lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFormats {
    pub access: DateFormatSpec,
    pub error: DateFormatSpec,
}

impl DateFormats {
    /// The formats compiled into the binary.
    pub fn embedded() -> Result<Self> {
        let content = std::str::from_utf8(DEFAULT_FORMATS_BYTES)
            .context("Failed to decode embedded default date formats")?;
        parse_formats(content, true).context("Embedded default date formats are invalid")
    }

    fn fill_missing_from(&mut self, defaults: &DateFormats) {
        if self.access.is_empty() {
            self.access = defaults.access.clone();
        }
        if self.error.is_empty() {
            self.error = defaults.error.clone();
        }
    }
}

/// Parses `<kind>: <pattern>` lines. A strict parse stops at the first bad
/// line, a lenient one warns and skips it.
pub fn parse_formats(content: &str, strict: bool) -> Result<DateFormats, FormatError> {
    let mut formats = DateFormats::default();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line_num + 1, line) {
            Ok((FormatKind::Access, format)) => formats.access.push(format),
            Ok((FormatKind::Error, format)) => formats.error.push(format),
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!(action = "parse", component = "date_format", line_number = line_num + 1, error = %e, "Invalid date format line")
            }
        }
    }

    Ok(formats)
}

enum FormatKind {
    Access,
    Error,
}

fn parse_line(line_num: usize, line: &str) -> Result<(FormatKind, DateFormat), FormatError> {
    let (kind, pattern) = line
        .split_once(':')
        .ok_or_else(|| FormatError::MalformedLine {
            line: line_num,
            content: line.to_string(),
        })?;

    let kind = match kind.trim().to_ascii_lowercase().as_str() {
        "access" => FormatKind::Access,
        "error" => FormatKind::Error,
        other => {
            return Err(FormatError::UnknownKind {
                line: line_num,
                kind: other.to_string(),
            })
        }
    };

    let format = DateFormat::new(pattern).map_err(|e| FormatError::AtLine {
        line: line_num,
        source: Box::new(e),
    })?;
    Ok((kind, format))
}

pub fn load_date_formats(format_file_path: Option<&Path>) -> Result<DateFormats> {
    load_date_formats_in(format_file_path, Path::new(DEFAULT_FORMATS_FILE))
}

/// Same as [`load_date_formats`] with an explicit fallback file location.
pub fn load_date_formats_in(
    format_file_path: Option<&Path>,
    default_file: &Path,
) -> Result<DateFormats> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "format_loading",
        "Starting date format loading"
    );

    let defaults = DateFormats::embedded()?;

    let mut formats = if let Some(path) = format_file_path {
        info!(action = "load", component = "format_file", file_path = ?path, "Loading date formats from specified file");
        if !path.exists() {
            anyhow::bail!("Date format file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read date format file {:?}", path))?;
        parse_formats(&content, true)
            .with_context(|| format!("Invalid date format file {:?}", path))?
    } else if default_file.exists() {
        info!(action = "load", component = "default_format_file", file_path = ?default_file, "Loading date formats from default file");
        let content = fs::read_to_string(default_file)
            .with_context(|| format!("Failed to read date format file {:?}", default_file))?;
        parse_formats(&content, false)?
    } else {
        info!(
            action = "load",
            component = "embedded_formats",
            "Using embedded default date formats"
        );
        defaults.clone()
    };

    formats.fill_missing_from(&defaults);

    info!(
        action = "complete",
        component = "format_loading",
        access_formats = formats.access.len(),
        error_formats = formats.error.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Date formats ready"
    );
    Ok(formats)
}

/// Writes the embedded formats to `target`, refusing to overwrite.
pub fn init_default_formats(target: &Path) -> Result<()> {
    if target.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            target.display()
        );
    }

    let default_content = std::str::from_utf8(DEFAULT_FORMATS_BYTES)
        .context("Failed to decode embedded default date formats")?;

    fs::write(target, default_content)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    info!(action = "init", component = "format_file", file_path = ?target, "Wrote default date formats");

    Ok(())
}
