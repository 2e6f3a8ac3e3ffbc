pub mod aggregate;
pub mod args;
pub mod cancel;
pub mod config;
pub mod dates;
pub mod domain;
pub mod encoding;
pub mod error;
pub mod formats;
pub mod render;
pub mod report;
pub mod run;
pub mod sources;
pub mod stats;
pub mod utils;

pub use aggregate::{AggregateOutcome, Aggregator};
pub use args::Args;
pub use cancel::CancelToken;
pub use config::{Config, ReportFormat};
pub use dates::{resolve, DateFormat, DateFormatSpec, Timestamp};
pub use domain::{classify_file_name, Classification, LogKind, SourceGroup};
pub use formats::{init_default_formats, load_date_formats, DateFormats};
pub use render::{HtmlRenderer, JsonRenderer};
pub use report::{assemble, Renderer, Report, ReportData};
pub use run::{generate_reports, RunSummary};
pub use sources::{enumerate, LogInventory, LogSource};
pub use stats::{Counter, DomainStats, ErrorKey, ErrorKeyMode};
