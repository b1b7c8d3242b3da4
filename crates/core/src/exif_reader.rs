use crate::error::MetadataError;
use exif::{Exif, Field, In, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

pub fn parse_jpeg(bytes: Vec<u8>) -> Result<Jpeg, MetadataError> {
    Jpeg::from_bytes(Bytes::from(bytes)).map_err(|err| MetadataError::Jpeg(err.to_string()))
}

/// Parses the APP1 EXIF payload of a JPEG, if it has one.
pub fn read_jpeg_exif(jpeg: &Jpeg) -> Result<Option<Exif>, MetadataError> {
    let Some(tiff) = jpeg.exif() else {
        return Ok(None);
    };
    if tiff.is_empty() {
        return Ok(None);
    }
    let exif = Reader::new().read_raw(tiff.to_vec())?;
    Ok(Some(exif))
}

#[cfg(test)]
pub(crate) fn read_exif_file(path: &std::path::Path) -> Result<Option<Exif>, MetadataError> {
    let bytes = std::fs::read(path).map_err(|err| MetadataError::io(path, err))?;
    read_jpeg_exif(&parse_jpeg(bytes)?)
}

pub fn description(exif: &Exif) -> Option<String> {
    field_text(exif, Tag::ImageDescription)
}

pub fn has_gps(exif: &Exif) -> bool {
    exif.get_field(Tag::GPSLatitude, In::PRIMARY).is_some()
        || exif.get_field(Tag::GPSLongitude, In::PRIMARY).is_some()
}

/// ASCII field of the primary image, decoded as Latin-1.
pub fn field_text(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    ascii_value(field)
}

fn ascii_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(parts) => {
            let text = parts
                .iter()
                .map(|part| part.iter().map(|&b| b as char).collect::<String>())
                .collect::<Vec<_>>()
                .join("\n");
            let text = text.trim_end_matches('\0').to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// Embedded thumbnail JPEG of IFD1, located through its offset/length pair.
pub fn thumbnail(exif: &Exif) -> Option<&[u8]> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    exif.buf().get(offset..offset.checked_add(length)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_without_app1_has_no_exif() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("plain.jpg");
        image::RgbImage::new(4, 4).save(&path).expect("write jpeg");

        assert!(read_exif_file(&path).expect("read").is_none());
    }

    #[test]
    fn garbage_is_not_a_jpeg() {
        let err = parse_jpeg(b"not a jpeg".to_vec()).expect_err("must fail");
        assert!(matches!(err, MetadataError::Jpeg(_)));
    }
}
