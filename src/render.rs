use std::fmt::Write;

use crate::error::ReportError;
use crate::report::{IndexEntry, Ranked, ReportData, Renderer};
use crate::utils::format_number;

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:4px 10px;text-align:left}\
th{background:#f0f0f0}td.n{text-align:right}";

/// Self-contained HTML documents, one table per view.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

/// Pretty-printed JSON of the report fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for HtmlRenderer {
    fn extension(&self) -> &str {
        "html"
    }

    fn render_report(&self, report: &ReportData) -> Result<String, ReportError> {
        let domain = escape(&report.domain);
        let mut html = String::new();
        render_report_html(&mut html, report, &domain).map_err(|e| ReportError::Render {
            document: format!("{domain}.html"),
            message: e.to_string(),
        })?;
        Ok(html)
    }

    fn render_index(&self, entries: &[IndexEntry]) -> Result<String, ReportError> {
        let mut html = String::new();
        render_index_html(&mut html, entries).map_err(|e| ReportError::Render {
            document: "index.html".to_string(),
            message: e.to_string(),
        })?;
        Ok(html)
    }
}

fn render_report_html(out: &mut String, report: &ReportData, domain: &str) -> std::fmt::Result {
    open_document(out, &format!("Statistics for {domain}"))?;
    writeln!(out, "<p><a href=\"index.html\">All domains</a></p>")?;

    writeln!(out, "<h2>Daily access</h2>")?;
    if report.daily_access.is_empty() {
        writeln!(out, "<p>No dated requests.</p>")?;
    } else {
        writeln!(out, "<table><tr><th>Date</th><th>Requests</th></tr>")?;
        for day in &report.daily_access {
            writeln!(
                out,
                "<tr><td>{}</td><td class=\"n\">{}</td></tr>",
                day.date,
                format_number(day.count)
            )?;
        }
        writeln!(out, "</table>")?;
    }

    if !report.hourly_access.is_empty() {
        writeln!(out, "<h2>Hourly access</h2>")?;
        writeln!(out, "<table><tr><th>Date</th><th>Hour</th><th>Requests</th></tr>")?;
        for day in &report.hourly_access {
            for hour in &day.hours {
                writeln!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td class=\"n\">{}</td></tr>",
                    day.date,
                    hour_range(hour.hour),
                    format_number(hour.count)
                )?;
            }
        }
        writeln!(out, "</table>")?;
    }

    ranking(out, "Popular pages", "Page", &report.popular_pages)?;
    ranking(out, "Top errors", "Error", &report.top_errors)?;
    close_document(out)
}

fn ranking<K: std::fmt::Display>(
    out: &mut String,
    title: &str,
    column: &str,
    entries: &[Ranked<K>],
) -> std::fmt::Result {
    writeln!(out, "<h2>{title}</h2>")?;
    if entries.is_empty() {
        return writeln!(out, "<p>None recorded.</p>");
    }

    writeln!(out, "<table><tr><th>#</th><th>{column}</th><th>Count</th></tr>")?;
    for (rank, entry) in entries.iter().enumerate() {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td class=\"n\">{}</td></tr>",
            rank + 1,
            escape(&entry.key.to_string()),
            format_number(entry.count)
        )?;
    }
    writeln!(out, "</table>")
}

fn render_index_html(out: &mut String, entries: &[IndexEntry]) -> std::fmt::Result {
    open_document(out, "Log statistics")?;
    writeln!(out, "<ul>")?;
    for entry in entries {
        writeln!(
            out,
            "<li><a href=\"{}\">{}</a></li>",
            escape(&entry.file_name),
            escape(&entry.domain)
        )?;
    }
    writeln!(out, "</ul>")?;
    close_document(out)
}

fn open_document(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head><meta charset=\"utf-8\"><title>{title}</title>")?;
    writeln!(out, "<style>{STYLE}</style></head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<h1>{title}</h1>")
}

fn close_document(out: &mut String) -> std::fmt::Result {
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

/// Label of a one-hour bucket, e.g. `13:00 - 13:59`.
pub fn hour_range(hour: u32) -> String {
    format!("{hour:02}:00 - {hour:02}:59")
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Renderer for JsonRenderer {
    fn extension(&self) -> &str {
        "json"
    }

    fn render_report(&self, report: &ReportData) -> Result<String, ReportError> {
        serde_json::to_string_pretty(report).map_err(|e| ReportError::Render {
            document: format!("{}.json", report.domain),
            message: e.to_string(),
        })
    }

    fn render_index(&self, entries: &[IndexEntry]) -> Result<String, ReportError> {
        serde_json::to_string_pretty(entries).map_err(|e| ReportError::Render {
            document: "index.json".to_string(),
            message: e.to_string(),
        })
    }
}
