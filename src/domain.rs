use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the pseudo-domain holding host-wide logs.
pub const DEFAULT_DOMAIN: &str = "default";

static MULTI_VHOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^other_vhosts_access\.log").expect("multi-vhost pattern is valid")
});

// The domain is the first `_` token; the kind marker may follow further tokens.
static DOMAIN_LOG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<domain>[A-Za-z0-9.-]+)_(?:.*?_)??(?P<kind>access|error)(?P<rest>.*)$")
        .expect("domain log pattern is valid")
});

static DEFAULT_LOG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kind>access|error)(?P<rest>.*)$").expect("default log pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceGroup {
    Default,
    Domain(String),
}

impl SourceGroup {
    pub fn name(&self) -> &str {
        match self {
            SourceGroup::Default => DEFAULT_DOMAIN,
            SourceGroup::Domain(name) => name,
        }
    }
}

impl fmt::Display for SourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceGroup::Default => f.write_str(DEFAULT_DOMAIN),
            SourceGroup::Domain(name) => write!(f, "domain:{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Access,
    Error,
}

impl LogKind {
    fn from_token(token: &str) -> Self {
        if token == "error" {
            LogKind::Error
        } else {
            LogKind::Access
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub group: SourceGroup,
    pub kind: LogKind,
    pub compressed: bool,
}

/// Classifies a log file by its base name.
///
/// Returns `None` for files that follow none of the access/error naming
/// conventions. A `<domain>_` prefix wins over the host-wide names, except for
/// the multi-vhost log which always belongs to the default group.
pub fn classify_file_name(name: &str) -> Option<Classification> {
    let compressed = name.ends_with(".gz");

    if MULTI_VHOST.is_match(name) {
        return Some(Classification {
            group: SourceGroup::Default,
            kind: LogKind::Access,
            compressed,
        });
    }

    if let Some(captures) = DOMAIN_LOG.captures(name) {
        if is_log_suffix(&captures["rest"]) {
            let domain = &captures["domain"];
            let group = if domain == DEFAULT_DOMAIN {
                SourceGroup::Default
            } else {
                SourceGroup::Domain(domain.to_string())
            };
            return Some(Classification {
                group,
                kind: LogKind::from_token(&captures["kind"]),
                compressed,
            });
        }
    }

    let captures = DEFAULT_LOG.captures(name)?;
    is_log_suffix(&captures["rest"]).then(|| Classification {
        group: SourceGroup::Default,
        kind: LogKind::from_token(&captures["kind"]),
        compressed,
    })
}

/// `*.log*` or `*.gz`, covering rotations such as `.log.1`, `.log-20231010`
/// and `.log.2.gz`.
fn is_log_suffix(rest: &str) -> bool {
    rest.contains(".log") || rest.ends_with(".gz")
}
