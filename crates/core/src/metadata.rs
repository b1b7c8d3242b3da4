use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Both columns must be set; the catalog stores `0, 0` for "unknown".
    pub fn from_columns(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        let (latitude, longitude) = (latitude?, longitude?);
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub owner_id: i64,
    pub path: String,
    pub filename: String,
    pub checksum: String,
    pub caption: Option<String>,
    pub gps: Option<GpsCoordinate>,
    pub taken_at: Option<String>,
}

impl ContentRecord {
    pub fn taken_at_local(&self) -> Option<DateTime<Local>> {
        self.taken_at.as_deref().and_then(parse_catalog_timestamp)
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMembership {
    pub album_id: i64,
    /// `None` when the album is not filed in any folder.
    pub folder_id: Option<i64>,
    pub album_name: String,
    pub album_owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedContent {
    pub content_id: i64,
    pub path: String,
    pub filename: String,
    pub checksum: String,
    pub stored_at: Option<String>,
}

impl EditedContent {
    pub fn stored_at_local(&self) -> Option<DateTime<Local>> {
        self.stored_at.as_deref().and_then(parse_catalog_timestamp)
    }
}

pub fn parse_catalog_naive(input: &str) -> Option<NaiveDateTime> {
    let normalized = input.trim();

    let candidates = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y:%m:%d %H:%M:%S",
    ];

    for fmt in candidates {
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            return Some(naive);
        }
    }

    NaiveDate::parse_from_str(normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn parse_catalog_timestamp(input: &str) -> Option<DateTime<Local>> {
    let naive = parse_catalog_naive(input)?;
    Local.from_local_datetime(&naive).earliest()
}
