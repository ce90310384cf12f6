use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::provider::{Result, Tz};

const CAPTURE_TAGS: &[(exif::Tag, exif::Tag)] = &[
    (exif::Tag::DateTimeOriginal, exif::Tag::OffsetTimeOriginal),
    (exif::Tag::DateTimeDigitized, exif::Tag::OffsetTimeDigitized),
    (exif::Tag::DateTime, exif::Tag::OffsetTime),
];

fn ascii_of(field: &exif::Field) -> Option<&[u8]> {
    match &field.value {
        exif::Value::Ascii(values) => values.first().map(Vec::as_slice),
        _ => None,
    }
}

fn naive_of(datetime: &exif::DateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(
        i32::from(datetime.year),
        u32::from(datetime.month),
        u32::from(datetime.day),
    )?
    .and_hms_opt(
        u32::from(datetime.hour),
        u32::from(datetime.minute),
        u32::from(datetime.second),
    )
}

/// Capture time recorded in the EXIF data of `path`.
///
/// EXIF times are wall clock times. They are placed in `tz` unless the file
/// also records its own UTC offset.
pub(super) fn exif_capture_time(path: &Path, tz: &Tz) -> Result<Option<DateTime<Utc>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    for (tag, offset_tag) in CAPTURE_TAGS {
        let ascii = match exif
            .get_field(*tag, exif::In::PRIMARY)
            .and_then(ascii_of)
        {
            Some(ascii) => ascii,
            None => continue,
        };

        let mut datetime = exif::DateTime::from_ascii(ascii)?;
        if let Some(offset) = exif
            .get_field(*offset_tag, exif::In::PRIMARY)
            .and_then(ascii_of)
        {
            // a malformed offset leaves the time zone to `tz`
            let _ = datetime.parse_offset(offset);
        }

        let naive = match naive_of(&datetime) {
            Some(naive) => naive,
            None => continue,
        };

        let captured = match datetime.offset {
            Some(minutes) => FixedOffset::east_opt(i32::from(minutes) * 60)
                .and_then(|offset| offset.from_local_datetime(&naive).single())
                .map(|dt| dt.with_timezone(&Utc)),
            None => tz.to_utc(&naive),
        };

        if captured.is_some() {
            return Ok(captured);
        }
    }

    Ok(None)
}
