//! Presentation helpers for the file list: sizes, categories, usage.
//!
//! Nothing here touches storage. Usage figures are cosmetic and never gate an upload.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use time::macros::format_description;

use crate::domain::FileRow;

/// Cosmetic capacity used for the usage bar (5 GiB).
pub const DEFAULT_CAPACITY: u64 = 5 * 1024 * 1024 * 1024;

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// `0 Bytes`, `1.5 KB`, `12.25 MB`... base 1024, two decimals at most.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut i = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && i < UNITS.len() - 1 {
        scaled /= 1024;
        i += 1;
    }
    let value = bytes as f64 / 1024f64.powi(i as i32);
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[i])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 6] = [
        FileCategory::Image,
        FileCategory::Video,
        FileCategory::Audio,
        FileCategory::Document,
        FileCategory::Archive,
        FileCategory::Other,
    ];

    pub fn of(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            FileCategory::Image
        } else if mime_type.starts_with("video/") {
            FileCategory::Video
        } else if mime_type.starts_with("audio/") {
            FileCategory::Audio
        } else if ["pdf", "document", "text"]
            .iter()
            .any(|k| mime_type.contains(k))
        {
            FileCategory::Document
        } else if mime_type.contains("zip") || mime_type.contains("rar") {
            FileCategory::Archive
        } else {
            FileCategory::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileCategory::Image => "Images",
            FileCategory::Video => "Videos",
            FileCategory::Audio => "Audio",
            FileCategory::Document => "Documents",
            FileCategory::Archive => "Archives",
            FileCategory::Other => "Other",
        }
    }
}

/// Short type column for one entry: a family name, or the upper-cased extension.
pub fn type_label(mime_type: &str, name: &str) -> String {
    let family = if mime_type.starts_with("image/") {
        Some("Image")
    } else if mime_type.starts_with("video/") {
        Some("Video")
    } else if mime_type.starts_with("audio/") {
        Some("Audio")
    } else if mime_type.contains("pdf") {
        Some("PDF")
    } else if mime_type.contains("zip") || mime_type.contains("rar") {
        Some("Archive")
    } else if mime_type.contains("text") {
        Some("Text")
    } else {
        None
    };
    if let Some(f) = family {
        return f.to_string();
    }
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_uppercase(),
        _ => "File".to_string(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategoryStat {
    pub count: u64,
    pub bytes: u64,
}

pub fn category_stats(rows: &[FileRow]) -> BTreeMap<FileCategory, CategoryStat> {
    let mut stats: BTreeMap<FileCategory, CategoryStat> = FileCategory::ALL
        .iter()
        .map(|c| (*c, CategoryStat::default()))
        .collect();
    for row in rows {
        let s = stats.entry(FileCategory::of(&row.mime_type)).or_default();
        s.count += 1;
        s.bytes += row.size;
    }
    stats
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StorageUsage {
    pub used: u64,
    pub capacity: u64,
    /// May exceed 100; the store does not enforce the capacity.
    pub percent: f64,
}

impl StorageUsage {
    pub fn of(rows: &[FileRow], capacity: u64) -> Self {
        let used: u64 = rows.iter().map(|r| r.size).sum();
        let percent = if capacity == 0 {
            100.0
        } else {
            used as f64 / capacity as f64 * 100.0
        };
        Self {
            used,
            capacity,
            percent,
        }
    }

    /// `[#####-----]`, clamped to full.
    pub fn bar(&self, width: usize) -> String {
        let filled = ((self.percent.min(100.0) / 100.0) * width as f64).round() as usize;
        let filled = filled.min(width);
        format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
    }
}

/// Rows sorted by name; the store itself promises no order.
pub fn sorted_by_name(mut rows: Vec<FileRow>) -> Vec<FileRow> {
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Date shown next to entries. Synthesized at render time; no date is stored.
pub fn display_date(now: OffsetDateTime) -> String {
    let fmt = format_description!("[month repr:short] [day padding:none], [year]");
    now.format(&fmt).unwrap_or_default()
}
