use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use encoding_rs::Encoding;
use flate2::read::MultiGzDecoder;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::domain::{classify_file_name, Classification, LogKind, SourceGroup};
use crate::encoding;
use crate::error::{InputError, SourceError};

/// One log file discovered on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSource {
    pub path: PathBuf,
    pub encoding: &'static Encoding,
    pub compressed: bool,
    pub group: SourceGroup,
    pub kind: LogKind,
}

impl LogSource {
    /// Classifies `path` by its file name and samples its encoding.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let Classification {
            group,
            kind,
            compressed,
        } = classify_file_name(name)?;

        Some(Self {
            path: path.to_path_buf(),
            encoding: encoding::detect(path, compressed),
            compressed,
            group,
            kind,
        })
    }

    pub fn is_error_log(&self) -> bool {
        self.kind == LogKind::Error
    }

    /// Opens the file, decompressing transparently when needed.
    pub fn open(&self) -> Result<Box<dyn BufRead>, SourceError> {
        let file = File::open(&self.path).map_err(|source| SourceError::Open {
            path: self.path.clone(),
            source,
        })?;

        Ok(if self.compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        })
    }
}

/// Every recognized log file of a directory, partitioned by domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogInventory {
    pub default: Vec<LogSource>,
    pub domains: BTreeMap<String, Vec<LogSource>>,
}

impl LogInventory {
    pub fn add(&mut self, source: LogSource) {
        match &source.group {
            SourceGroup::Default => self.default.push(source),
            SourceGroup::Domain(name) => self
                .domains
                .entry(name.clone())
                .or_default()
                .push(source),
        }
    }

    pub fn source_count(&self) -> usize {
        self.default.len() + self.domains.values().map(Vec::len).sum::<usize>()
    }

    /// Groups in report order: `default` first, then domains by name.
    pub fn groups(&self) -> Vec<(SourceGroup, &[LogSource])> {
        std::iter::once((SourceGroup::Default, self.default.as_slice()))
            .chain(
                self.domains
                    .iter()
                    .map(|(name, sources)| (SourceGroup::Domain(name.clone()), sources.as_slice())),
            )
            .collect()
    }

    fn sort(&mut self) {
        self.default.sort_by(|a, b| a.path.cmp(&b.path));
        for sources in self.domains.values_mut() {
            sources.sort_by(|a, b| a.path.cmp(&b.path));
        }
    }
}

/// Scans `root` (not recursively) for access and error logs.
pub fn enumerate(root: &Path, cancel: &CancelToken) -> Result<LogInventory, InputError> {
    let start_time = Instant::now();
    info!(action = "start", component = "enumeration", root = ?root, "Scanning log directory");

    let entries = fs::read_dir(root).map_err(|source| SourceError::ListDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut inventory = LogInventory::default();
    for entry in entries {
        cancel.check()?;

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(action = "scan", component = "enumeration", root = ?root, error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        match LogSource::from_path(&path) {
            Some(source) => {
                debug!(action = "classify", component = "enumeration", path = ?path, group = %source.group, kind = ?source.kind, compressed = source.compressed, "Found log source");
                inventory.add(source);
            }
            None => debug!(action = "classify", component = "enumeration", path = ?path, "Ignoring unrecognized file"),
        }
    }
    inventory.sort();

    info!(
        action = "complete",
        component = "enumeration",
        source_count = inventory.source_count(),
        domain_count = inventory.domains.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Log directory scanned"
    );
    Ok(inventory)
}
