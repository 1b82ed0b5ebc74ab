use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use url::Url;

use super::types::QueueItem;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

const CSV_HEADERS: [&str; 16] = [
    "id",
    "detector_id",
    "status",
    "result_type",
    "model_label",
    "model_confidence",
    "count",
    "received_ts",
    "updated_ts",
    "human_label",
    "human_confidence",
    "human_user",
    "human_notes",
    "human_labeled_at",
    "image_uri",
    "review_state",
];

#[derive(Debug, Clone, Serialize)]
struct ExportRecord<'a> {
    #[serde(flatten)]
    item: &'a QueueItem,
    review_state: &'static str,
}

fn review_state(item: &QueueItem) -> &'static str {
    if item.is_pending() { "pending" } else { "labeled" }
}

fn opt_text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn opt_num<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_csv(path: &Path, items: &[QueueItem]) -> io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADERS)?;
    for item in items {
        writer.write_record([
            item.id.clone(),
            opt_text(item.detector_id.as_deref()),
            opt_text(item.status.as_deref()),
            opt_text(item.result_type.as_deref()),
            opt_text(item.model_label.as_deref()),
            opt_num(item.model_confidence),
            opt_num(item.count),
            opt_text(item.received_ts.as_deref()),
            opt_text(item.updated_ts.as_deref()),
            opt_text(item.human_label.as_deref()),
            opt_num(item.human_confidence),
            opt_text(item.human_user.as_deref()),
            opt_text(item.human_notes.as_deref()),
            opt_text(item.human_labeled_at.as_deref()),
            opt_text(item.image_uri.as_deref()),
            review_state(item).to_string(),
        ])?;
    }
    writer.flush()
}

fn write_json(path: &Path, items: &[QueueItem]) -> io::Result<()> {
    let records: Vec<ExportRecord> = items
        .iter()
        .map(|item| ExportRecord {
            item,
            review_state: review_state(item),
        })
        .collect();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &records).map_err(io::Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

pub fn export_items(path: &Path, format: DataFormat, items: &[QueueItem]) -> io::Result<usize> {
    match format {
        DataFormat::Csv => write_csv(path, items)?,
        DataFormat::Json => write_json(path, items)?,
    }
    Ok(items.len())
}

pub fn detect_data_format(path: &Path, fallback: DataFormat) -> DataFormat {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => DataFormat::Json,
        Some("csv") => DataFormat::Csv,
        _ => fallback,
    }
}

pub fn default_output_path(api_base: &Url, format: DataFormat) -> String {
    let host = api_base.host_str().unwrap_or("review");
    let host = host
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    match format {
        DataFormat::Csv => format!("review_{host}_{ts}.csv"),
        DataFormat::Json => format!("review_{host}_{ts}.json"),
    }
}
