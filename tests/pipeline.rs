use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;

use logstats::error::ReportError;
use logstats::report::{IndexEntry, Ranked};
use logstats::{
    generate_reports, CancelToken, Config, ErrorKey, ErrorKeyMode, HtmlRenderer, JsonRenderer,
    Renderer, ReportData,
};

const SHOP_LINES: &str = concat!(
    "10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] \"GET /cart HTTP/1.1\" 200 10\n",
    "10.0.0.2 - - [10/Oct/2023:14:01:00 +0000] \"GET /checkout HTTP/1.1\" 200 10\n",
    "10.0.0.3 - - [11/Oct/2023:09:00:00 +0000] \"GET /cart HTTP/1.1\" 200 10\n",
);

const HOST_ACCESS: &str = concat!(
    "127.0.0.1 - - [10/Oct/2023:13:55:36 +0000] \"GET /index.html HTTP/1.1\" 200 612\n",
    "127.0.0.1 - - [garbled] \"GET /index.html HTTP/1.1\" 200 612\n",
);

const HOST_ERRORS: &str = concat!(
    "[Tue Oct 10 13:55:36.123456 2023] [core:error] [pid 1234] File not found\n",
    "[Tue Oct 10 13:57:01.000001 2023] [core:error] [pid 1234] File not found\n",
    "[Tue Oct 10 14:00:00.5 2023] [ssl:warn] [pid 99] Certificate expires soon\n",
);

#[derive(Default)]
struct Recording {
    reports: Mutex<Vec<ReportData>>,
    index: Mutex<Vec<IndexEntry>>,
}

impl Renderer for Recording {
    fn extension(&self) -> &str {
        "txt"
    }

    fn render_report(&self, report: &ReportData) -> Result<String, ReportError> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(format!("{}\n", report.domain))
    }

    fn render_index(&self, entries: &[IndexEntry]) -> Result<String, ReportError> {
        *self.index.lock().unwrap() = entries.to_vec();
        Ok(String::new())
    }
}

impl Recording {
    fn report(&self, domain: &str) -> ReportData {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.domain == domain)
            .cloned()
            .unwrap_or_else(|| panic!("no report rendered for {domain}"))
    }
}

fn gzip(path: &Path, content: &str) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn populate(log_dir: &Path) {
    fs::write(log_dir.join("access.log"), HOST_ACCESS).unwrap();
    fs::write(log_dir.join("error.log"), HOST_ERRORS).unwrap();
    fs::write(log_dir.join("shop_access.log"), SHOP_LINES).unwrap();
    gzip(&log_dir.join("shop_access.log.1.gz"), SHOP_LINES);
    fs::write(log_dir.join("blog_error.log"), "").unwrap();
    fs::write(log_dir.join("notes.txt"), "not a log").unwrap();
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 10, d).unwrap()
}

fn config(log_dir: &Path, output_dir: &Path) -> Config {
    let mut config = Config::new(log_dir, output_dir).unwrap();
    config.workers = Some(2);
    config
}

#[test]
fn renders_every_domain_and_index() {
    let logs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    populate(logs.path());
    let renderer = Recording::default();

    let summary = generate_reports(
        &config(logs.path(), out.path()),
        &renderer,
        &CancelToken::new(),
    )
    .unwrap();

    let domains: Vec<&str> = summary.domains.iter().map(|d| d.domain.as_str()).collect();
    assert_eq!(domains, ["default", "blog", "shop"]);
    assert_eq!(summary.reports_written(), 3);
    assert_eq!(summary.index_path, out.path().join("index.txt"));

    let index: Vec<String> = renderer
        .index
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.file_name.clone())
        .collect();
    assert_eq!(index, ["default.txt", "blog.txt", "shop.txt"]);
    let shop = summary.domains.iter().find(|d| d.domain == "shop").unwrap();
    assert_eq!(shop.index.as_ref().map(|e| e.file_name.as_str()), Some("shop.txt"));
    for name in &index {
        assert!(out.path().join(name).is_file(), "{name}");
    }
}

#[test]
fn rotated_and_compressed_shop_logs_are_summed() {
    let logs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    populate(logs.path());
    let renderer = Recording::default();

    generate_reports(&config(logs.path(), out.path()), &renderer, &CancelToken::new()).unwrap();
    let shop = renderer.report("shop");

    let daily: Vec<(NaiveDate, u64)> = shop
        .daily_access
        .iter()
        .map(|d| (d.date, d.count))
        .collect();
    assert_eq!(daily, [(date(10), 4), (date(11), 2)]);

    let hours: Vec<(u32, u64)> = shop.hourly_access[0]
        .hours
        .iter()
        .map(|h| (h.hour, h.count))
        .collect();
    assert_eq!(hours, [(13, 2), (14, 2)]);

    assert_eq!(
        shop.popular_pages,
        vec![
            Ranked { key: "/cart".to_string(), count: 4 },
            Ranked { key: "/checkout".to_string(), count: 2 },
        ]
    );
    assert!(shop.top_errors.is_empty());
}

#[test]
fn host_wide_report_combines_access_and_error_logs() {
    let logs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    populate(logs.path());
    let renderer = Recording::default();
    let mut config = config(logs.path(), out.path());
    config.error_keys = ErrorKeyMode::Message;

    generate_reports(&config, &renderer, &CancelToken::new()).unwrap();
    let default = renderer.report("default");

    // the garbled line only counts as a page view
    assert_eq!(default.daily_access.len(), 1);
    assert_eq!(default.daily_access[0].count, 1);
    assert_eq!(
        default.popular_pages,
        vec![Ranked { key: "/index.html".to_string(), count: 2 }]
    );
    assert_eq!(
        default.top_errors,
        vec![
            Ranked { key: ErrorKey::Message("File not found".into()), count: 2 },
            Ranked { key: ErrorKey::Message("Certificate expires soon".into()), count: 1 },
        ]
    );
}

#[test]
fn timestamped_error_keys_keep_occurrences_apart() {
    let logs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    populate(logs.path());
    let renderer = Recording::default();

    generate_reports(&config(logs.path(), out.path()), &renderer, &CancelToken::new()).unwrap();
    let default = renderer.report("default");

    assert_eq!(default.top_errors.len(), 3);
    assert!(default.top_errors.iter().all(|e| e.count == 1));
    assert_eq!(default.top_errors[0].key.message(), "File not found");
}

#[test]
fn hourly_breakdown_can_be_disabled() {
    let logs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    populate(logs.path());
    let renderer = Recording::default();
    let mut config = config(logs.path(), out.path());
    config.hourly = false;

    generate_reports(&config, &renderer, &CancelToken::new()).unwrap();

    assert!(renderer.report("shop").hourly_access.is_empty());
    assert!(!renderer.report("shop").daily_access.is_empty());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let logs = tempfile::tempdir().unwrap();
    populate(logs.path());

    for renderer in [&HtmlRenderer as &dyn Renderer, &JsonRenderer] {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        generate_reports(
            &config(logs.path(), first.path()),
            renderer,
            &CancelToken::new(),
        )
        .unwrap();
        generate_reports(
            &config(logs.path(), second.path()),
            renderer,
            &CancelToken::new(),
        )
        .unwrap();

        let mut names: Vec<_> = fs::read_dir(first.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names.len(), 4);
        for name in names {
            assert_eq!(
                fs::read(first.path().join(&name)).unwrap(),
                fs::read(second.path().join(&name)).unwrap(),
                "{name:?}"
            );
        }
    }
}

#[test]
fn missing_log_directory_still_produces_default_report() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("reports");
    let renderer = Recording::default();

    let summary = generate_reports(
        &config(&root.path().join("absent"), &out),
        &renderer,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(summary.domains.len(), 1);
    assert!(out.join("default.txt").is_file());
    assert!(out.join("index.txt").is_file());
}

#[test]
fn unusable_output_directory_is_fatal() {
    let logs = tempfile::tempdir().unwrap();
    populate(logs.path());
    let blocker = logs.path().join("access.log");

    let result = generate_reports(
        &config(logs.path(), &blocker.join("stats")),
        &Recording::default(),
        &CancelToken::new(),
    );
    assert!(result.is_err());
}

#[test]
fn cancelled_run_writes_no_index() {
    let logs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    populate(logs.path());
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = generate_reports(
        &config(logs.path(), out.path()),
        &Recording::default(),
        &cancel,
    );

    assert!(result.is_err());
    assert!(!out.path().join("index.txt").exists());
}

#[test]
fn html_reports_link_back_to_index() {
    let logs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    populate(logs.path());

    generate_reports(
        &config(logs.path(), out.path()),
        &HtmlRenderer,
        &CancelToken::new(),
    )
    .unwrap();

    let shop = fs::read_to_string(out.path().join("shop.html")).unwrap();
    assert!(shop.contains("Statistics for shop"));
    assert!(shop.contains("href=\"index.html\""));
    assert!(shop.contains("/checkout"));

    let index = fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(index.contains("href=\"shop.html\""));
    assert!(index.contains("href=\"default.html\""));
}
