//! CSV → `CommunityMember` parsing.
//!
//! The header must name `name`, `location`, `latitude` and `longitude`
//! (case-insensitive, quotes stripped). `image`, `title`, `linkedin` and
//! `website` are picked up when present, other columns are ignored.
//!
//! Coordinates that are empty or not numbers become `None`. A row survives when
//! it has a name and either a location to geocode or a usable coordinate pair.

use crate::error::UploadError;
use common::model::member::CommunityMember;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};

pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "location", "latitude", "longitude"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Rejects anything that does not look like a CSV by its file name.
pub fn ensure_csv_file_name(file_name: &str) -> Result<(), UploadError> {
    if file_name.trim().to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(UploadError::Format(file_name.to_string()))
    }
}

/// Picks the most frequent of `, ; \t |` in the header line, comma on ties.
pub fn detect_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t', b'|']
        .into_iter()
        .map(|d| (d, header_line.bytes().filter(|&b| b == d).count()))
        .fold((b',', 0), |best, cur| if cur.1 > best.1 { cur } else { best })
        .0
}

fn normalize_cell(cell: &str) -> String {
    let s = cell.trim();
    // one layer of single or double quotes
    let s = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s);
    s.replace('\u{00A0}', " ").trim().to_lowercase()
}

/// Column positions resolved from the header row.
struct Columns {
    name: usize,
    location: usize,
    latitude: usize,
    longitude: usize,
    image: Option<usize>,
    title: Option<usize>,
    linkedin: Option<usize>,
    website: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, UploadError> {
        let titles: Vec<String> = headers.iter().map(normalize_cell).collect();
        let find = |title: &str| titles.iter().position(|t| t == title);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|c| find(*c).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(UploadError::Columns(missing));
        }

        let required =
            |title: &str| find(title).ok_or_else(|| UploadError::Columns(vec![title.into()]));
        Ok(Self {
            name: required("name")?,
            location: required("location")?,
            latitude: required("latitude")?,
            longitude: required("longitude")?,
            image: find("image"),
            title: find("title"),
            linkedin: find("linkedin"),
            website: find("website"),
        })
    }
}

fn cell(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn coordinate(record: &StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn member_from_record(row: usize, record: &StringRecord, cols: &Columns) -> CommunityMember {
    CommunityMember {
        id: format!("member-{}", row),
        uid: uuid::Uuid::new_v4().to_string(),
        name: cell(record, Some(cols.name)).unwrap_or_default(),
        location: cell(record, Some(cols.location)),
        latitude: coordinate(record, cols.latitude),
        longitude: coordinate(record, cols.longitude),
        image: cell(record, cols.image),
        title: cell(record, cols.title),
        website: cell(record, cols.website),
        linkedin: cell(record, cols.linkedin),
    }
}

fn is_placeable(member: &CommunityMember) -> bool {
    !member.name.is_empty()
        && (member.location_query().is_some() || member.coordinates().is_some())
}

/// Parses raw upload bytes into members that are worth geocoding or placing.
pub fn parse_members(bytes: &[u8], max_rows: usize) -> Result<Vec<CommunityMember>, UploadError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|_| UploadError::Process("The file is not valid UTF-8 text".into()))?;
    if text.trim().is_empty() {
        return Err(UploadError::Empty("The file is empty".into()));
    }

    let header_line = text.lines().next().unwrap_or_default();
    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| UploadError::Process(format!("Failed to parse CSV: {}", e)))?
        .clone();
    let cols = Columns::resolve(&headers)?;

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| UploadError::Process(format!("Failed to parse CSV: {}", e)))?;
    if records.is_empty() {
        return Err(UploadError::Empty("The CSV file has no data rows".into()));
    }
    if records.len() > max_rows {
        return Err(UploadError::TooManyRows {
            rows: records.len(),
            limit: max_rows,
        });
    }

    let total = records.len();
    let members: Vec<CommunityMember> = records
        .iter()
        .enumerate()
        .map(|(row, record)| member_from_record(row, record, &cols))
        .filter(|member| {
            let keep = is_placeable(member);
            if !keep {
                debug!("Skipping {}: no name or no location signal", member.id);
            }
            keep
        })
        .collect();

    if members.is_empty() {
        return Err(UploadError::Empty(
            "No valid rows found. Each row needs a name and a location or coordinates".into(),
        ));
    }
    info!("Parsed {} of {} CSV rows", members.len(), total);
    Ok(members)
}
