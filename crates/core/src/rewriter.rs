//! Merges caption, GPS and tag data into the EXIF block of a JPEG.
//!
//! GPS and the device stamp are committed first in their own write; they
//! live in dedicated fields and are never subject to truncation. The free
//! text block (`ImageDescription`) is then written through a ladder of
//! progressively stricter caption/tag limits until the encoded block fits
//! into the APP1 budget. Every write goes through a temp file beside the
//! target that replaces it only on success.

use crate::caption::{
    clean_existing_description, compose_description, keywords_line, sanitize_caption,
    to_single_byte, truncate_to_limit, CAPTION_MAX_CHARS,
};
use crate::error::MetadataError;
use crate::exif_reader::{description, has_gps, parse_jpeg, read_jpeg_exif, thumbnail};
use crate::metadata::GpsCoordinate;
use exif::experimental::Writer;
use exif::{Exif, Field, In, Rational, Tag, Value};
use img_parts::{Bytes, ImageEXIF};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Budget for `Exif\0\0` + TIFF payload inside the APP1 segment.
pub const DEFAULT_SEGMENT_LIMIT: usize = 60 * 1024;
/// A JPEG segment length is a u16 that includes its own two bytes.
const MAX_APP1_PAYLOAD: usize = 65_533;
const EXIF_HEADER_LEN: usize = 6;

/// `(caption_limit, tag_limit)` pairs, tried in order. Zero drops the section.
pub const TRUNCATION_LADDER: &[(usize, usize)] = &[
    (500, 300),
    (300, 200),
    (150, 100),
    (100, 50),
    (50, 0),
    (0, 0),
];

const TEMP_PREFIX: &str = ".monument_tmp_";

const GPS_TAGS: &[Tag] = &[
    Tag::GPSVersionID,
    Tag::GPSLatitudeRef,
    Tag::GPSLatitude,
    Tag::GPSLongitudeRef,
    Tag::GPSLongitude,
];
const DEVICE_TAGS: &[Tag] = &[Tag::Make, Tag::Model];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStamp {
    pub make: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRequest {
    pub caption: Option<String>,
    pub gps: Option<GpsCoordinate>,
    pub tags: Vec<String>,
    pub device: Option<DeviceStamp>,
}

impl MetadataRequest {
    /// Edited variants carry a fixed device stamp and never a keywords line.
    pub fn for_edited(caption: String, gps: Option<GpsCoordinate>, device: DeviceStamp) -> Self {
        Self {
            caption: Some(caption),
            gps,
            tags: Vec::new(),
            device: Some(device),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.caption.as_deref().map_or(true, |c| c.trim().is_empty())
            && self.gps.is_none()
            && self.tags.is_empty()
            && self.device.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    /// `false` for anything that is not a JPEG; the file was left alone.
    pub supported: bool,
    pub gps_written: bool,
    pub device_written: bool,
    pub caption_written: bool,
    pub tags_written: bool,
    /// 1-based ladder rung that fit, if the text block was written.
    pub attempt: Option<usize>,
    pub truncated: bool,
    /// Every rung overflowed; no caption or keywords were written.
    pub text_dropped: bool,
}

impl RewriteOutcome {
    fn unsupported() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct MetadataRewriter {
    segment_limit: usize,
}

impl Default for MetadataRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_LIMIT)
    }
}

impl MetadataRewriter {
    pub fn new(segment_limit: usize) -> Self {
        Self {
            segment_limit: segment_limit.min(MAX_APP1_PAYLOAD),
        }
    }

    pub fn rewrite(
        &self,
        path: &Path,
        request: &MetadataRequest,
    ) -> Result<RewriteOutcome, MetadataError> {
        self.run(path, request, true)
    }

    /// Runs the same passes as [`rewrite`](Self::rewrite) against the
    /// file at `source` in memory and reports the outcome. Nothing is
    /// written.
    pub fn simulate(
        &self,
        source: &Path,
        request: &MetadataRequest,
    ) -> Result<RewriteOutcome, MetadataError> {
        self.run(source, request, false)
    }

    fn run(
        &self,
        path: &Path,
        request: &MetadataRequest,
        persist: bool,
    ) -> Result<RewriteOutcome, MetadataError> {
        if !is_jpeg(path) {
            return Ok(RewriteOutcome::unsupported());
        }

        let mut outcome = RewriteOutcome {
            supported: true,
            ..RewriteOutcome::default()
        };

        let mut current = fs::read(path).map_err(|err| MetadataError::io(path, err))?;
        let exif = read_jpeg_exif(&parse_jpeg(current.clone())?)?;

        let gps = request
            .gps
            .filter(|_| !exif.as_ref().is_some_and(has_gps));
        if gps.is_some() || request.device.is_some() {
            let mut fields = Vec::new();
            let mut replaced = Vec::new();
            if let Some(gps) = gps {
                fields.extend(gps_fields(gps));
                replaced.extend_from_slice(GPS_TAGS);
            }
            if let Some(device) = &request.device {
                fields.push(ascii_field(Tag::Make, &device.make));
                fields.push(ascii_field(Tag::Model, &device.model));
                replaced.extend_from_slice(DEVICE_TAGS);
            }
            current = self.encode(&current, exif.as_ref(), &fields, &replaced)?;
            if persist {
                replace_file(path, &current)?;
            }
            outcome.gps_written = gps.is_some();
            outcome.device_written = request.device.is_some();
        }

        let raw_caption = request.caption.as_deref().map(str::trim).unwrap_or("");
        let caption = Some(sanitize_caption(raw_caption)).filter(|c| !c.is_empty());
        let caption_capped = to_single_byte(raw_caption).chars().count() > CAPTION_MAX_CHARS;
        let keywords = keywords_line(&request.tags);
        if caption.is_none() && keywords.is_none() {
            return Ok(outcome);
        }

        let exif = read_jpeg_exif(&parse_jpeg(current.clone())?)?;
        let existing = exif
            .as_ref()
            .and_then(description)
            .and_then(|text| clean_existing_description(&text));

        for (index, &(caption_limit, tag_limit)) in TRUNCATION_LADDER.iter().enumerate() {
            let caption_part = caption
                .as_deref()
                .and_then(|c| truncate_to_limit(c, caption_limit));
            let keywords_part = keywords
                .as_deref()
                .and_then(|k| truncate_to_limit(k, tag_limit));
            if caption_part.is_none() && keywords_part.is_none() {
                break;
            }

            let Some(text) = compose_description(
                existing.as_deref(),
                caption_part.as_deref(),
                keywords_part.as_deref(),
            ) else {
                break;
            };
            let adds_nothing = existing.as_deref() == Some(text.as_str());

            let result = if adds_nothing {
                Ok(())
            } else {
                let field = ascii_field(Tag::ImageDescription, &text);
                self.encode(
                    &current,
                    exif.as_ref(),
                    std::slice::from_ref(&field),
                    &[Tag::ImageDescription],
                )
                .and_then(|bytes| if persist { replace_file(path, &bytes) } else { Ok(()) })
            };

            match result {
                Ok(()) => {
                    outcome.attempt = Some(index + 1);
                    outcome.caption_written = !adds_nothing && caption_part.is_some();
                    outcome.tags_written = !adds_nothing && keywords_part.is_some();
                    outcome.truncated = caption_capped
                        || caption_part != caption
                        || keywords_part != keywords;
                    return Ok(outcome);
                }
                Err(err) if err.is_segment_overflow() => {
                    tracing::debug!(
                        path = %path.display(),
                        attempt = index + 1,
                        caption_limit,
                        tag_limit,
                        "metadata block too large, retrying with stricter limits: {err}"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        if persist {
            tracing::warn!(
                path = %path.display(),
                "no caption or keyword metadata could be written within {} bytes",
                self.segment_limit
            );
        }
        outcome.text_dropped = true;
        Ok(outcome)
    }

    /// Returns `original` with its EXIF block rebuilt, or
    /// `SegmentTooLarge` when the block exceeds the ceiling.
    fn encode(
        &self,
        original: &[u8],
        exif: Option<&Exif>,
        fields: &[Field],
        replaced: &[Tag],
    ) -> Result<Vec<u8>, MetadataError> {
        let tiff = encode_exif(exif, fields, replaced)?;
        let size = tiff.len() + EXIF_HEADER_LEN;
        if size > self.segment_limit {
            return Err(MetadataError::SegmentTooLarge {
                size,
                limit: self.segment_limit,
            });
        }

        let mut jpeg = parse_jpeg(original.to_vec())?;
        jpeg.set_exif(Some(Bytes::from(tiff)));
        Ok(jpeg.encoder().bytes().to_vec())
    }
}

/// Writes `bytes` to a temp file beside `path` and renames it over `path`.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), MetadataError> {
    let temp = temp_path_for(path);
    if let Err(err) = fs::write(&temp, bytes) {
        let _ = fs::remove_file(&temp);
        return Err(MetadataError::io(&temp, err));
    }
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(MetadataError::io(path, err));
    }
    Ok(())
}

/// Re-encodes the existing fields, minus `replaced` tags of the primary
/// image, plus `fields`.
fn encode_exif(
    exif: Option<&Exif>,
    fields: &[Field],
    replaced: &[Tag],
) -> Result<Vec<u8>, MetadataError> {
    let kept: Vec<Field> = exif
        .map(|exif| {
            exif.fields()
                .filter(|f| !(f.ifd_num == In::PRIMARY && replaced.contains(&f.tag)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let thumb = exif.and_then(thumbnail);

    let mut writer = Writer::new();
    for field in kept.iter().chain(fields) {
        writer.push_field(field);
    }
    if let Some(thumb) = thumb {
        writer.set_jpeg(thumb, In::THUMBNAIL);
    }

    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, exif.is_some_and(Exif::little_endian))?;
    Ok(buf.into_inner())
}

fn ascii_field(tag: Tag, text: &str) -> Field {
    let bytes = to_single_byte(text)
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![bytes]),
    }
}

fn gps_fields(gps: GpsCoordinate) -> Vec<Field> {
    let lat_ref = if gps.latitude >= 0.0 { "N" } else { "S" };
    let lon_ref = if gps.longitude >= 0.0 { "E" } else { "W" };
    vec![
        Field {
            tag: Tag::GPSVersionID,
            ifd_num: In::PRIMARY,
            value: Value::Byte(vec![2, 2, 0, 0]),
        },
        ascii_field(Tag::GPSLatitudeRef, lat_ref),
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(to_dms(gps.latitude)),
        },
        ascii_field(Tag::GPSLongitudeRef, lon_ref),
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(to_dms(gps.longitude)),
        },
    ]
}

/// Degrees and minutes as whole numbers, seconds in thousandths.
fn to_dms(decimal: f64) -> Vec<Rational> {
    let value = decimal.abs();
    let degrees = value.trunc();
    let minutes_full = (value - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;
    // Nudge past float noise such as 30.239999 before truncating.
    let millis = (seconds * 1000.0 + 1e-6).trunc();

    vec![
        Rational::from((degrees as u32, 1)),
        Rational::from((minutes as u32, 1)),
        Rational::from((millis as u32, 1000)),
    ]
}

pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg")
        })
        .unwrap_or(false)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    parent.join(format!("{TEMP_PREFIX}{}_{}_{}", std::process::id(), now, file_name))
}
