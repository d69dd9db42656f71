//! EXIF tags used for enrichment: orientation, capture time and GPS position.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use exif::{Exif, In, Rational, Reader, Tag, Value};
use std::io::{BufRead, Seek};

use crate::metadata::GeoPoint;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifFields {
    pub orientation: Option<u8>,
    pub taken_at: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
}

/// Read EXIF from a JPEG/PNG/WebP/TIFF/HEIF container.
///
/// Missing or unreadable EXIF yields empty fields; EXIF is optional on every format.
pub fn read_exif<R: BufRead + Seek>(reader: &mut R) -> ExifFields {
    match Reader::new().read_from_container(reader) {
        Ok(exif) => fields_from(&exif),
        Err(e) => {
            tracing::debug!(error = %e, "No readable EXIF block");
            ExifFields::default()
        }
    }
}

pub fn fields_from(exif: &Exif) -> ExifFields {
    ExifFields {
        orientation: orientation(exif),
        taken_at: taken_at(exif),
        location: location(exif),
    }
}

fn orientation(exif: &Exif) -> Option<u8> {
    let value = exif
        .get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)?;
    match value {
        1..=8 => u8::try_from(value).ok(),
        _ => None,
    }
}

fn first_ascii(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Ascii(parts) => parts.first().map(Vec::as_slice),
        _ => None,
    }
}

fn taken_at(exif: &Exif) -> Option<DateTime<Utc>> {
    let raw = first_ascii(&exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?.value)?;
    let mut parsed = exif::DateTime::from_ascii(raw).ok()?;
    if let Some(offset) = exif
        .get_field(Tag::OffsetTimeOriginal, In::PRIMARY)
        .and_then(|f| first_ascii(&f.value))
    {
        // An unparsable offset leaves the time as UTC.
        let _ = parsed.parse_offset(offset);
    }
    exif_datetime_to_utc(&parsed)
}

/// EXIF local time without an offset tag is taken as UTC.
pub fn exif_datetime_to_utc(dt: &exif::DateTime) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_nano_opt(
            u32::from(dt.hour),
            u32::from(dt.minute),
            u32::from(dt.second),
            dt.nanosecond.unwrap_or(0),
        )?;
    match dt.offset {
        Some(minutes) => FixedOffset::east_opt(i32::from(minutes) * 60)?
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc)),
        None => Some(naive.and_utc()),
    }
}

fn location(exif: &Exif) -> Option<GeoPoint> {
    let latitude = coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
    let longitude = coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)?;
    GeoPoint::new(latitude, longitude)
}

fn coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let dms = match &exif.get_field(value_tag, In::PRIMARY)?.value {
        Value::Rational(parts) => parts.as_slice(),
        _ => return None,
    };
    let reference = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| first_ascii(&f.value));
    dms_to_degrees(dms, reference)
}

/// Degrees/minutes/seconds to signed decimal degrees; `S` and `W` references are negative.
pub fn dms_to_degrees(dms: &[Rational], reference: Option<&[u8]>) -> Option<f64> {
    if dms.is_empty() || dms.iter().any(|r| r.denom == 0) {
        return None;
    }
    let part = |i: usize| dms.get(i).map(Rational::to_f64).unwrap_or(0.0);
    let degrees = part(0) + part(1) / 60.0 + part(2) / 3600.0;
    let negative = matches!(reference.and_then(|r| r.first()), Some(b'S' | b'W'));
    Some(if negative { -degrees } else { degrees })
}
