//! CSV loading and cell coercion shared by every import command.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use unesco_map_heritage_models::{AccessibilityFlags, Coordinates, TriState};

use crate::ImportError;

/// Columns required by the site import, in interchange order.
pub const SITE_COLUMNS: [&str; 13] = [
    "unesco_id",
    "nome",
    "descrizione",
    "regione",
    "citta",
    "lat",
    "long",
    "categoria",
    "anno",
    "wheelchair",
    "ausili_visivi",
    "supporto_uditivo",
    "note",
];

/// One decoded CSV record keyed by (trimmed) header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    fields: BTreeMap<String, String>,
}

impl CsvRow {
    /// Raw cell value, `None` if the column is absent or the record short.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Trimmed cell value, empty if absent.
    #[must_use]
    pub fn text(&self, column: &str) -> &str {
        self.get(column).map_or("", str::trim)
    }

    /// First non-blank value among `columns`.
    #[must_use]
    pub fn first_non_blank(&self, columns: &[&str]) -> Option<&str> {
        columns
            .iter()
            .map(|c| self.text(c))
            .find(|v| !v.is_empty())
    }

    /// The three accessibility flag columns parsed as tri-states.
    #[must_use]
    pub fn accessibility_flags(&self) -> AccessibilityFlags {
        AccessibilityFlags::new(
            TriState::from_csv_value(self.text("wheelchair")),
            TriState::from_csv_value(self.text("ausili_visivi")),
            TriState::from_csv_value(self.text("supporto_uditivo")),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CsvRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A fully loaded CSV file. Records the reader could not decode are kept as
/// errors so callers can count them.
#[derive(Debug, Clone, Default)]
pub struct CsvRows {
    headers: Vec<String>,
    records: Vec<Result<CsvRow, String>>,
}

impl CsvRows {
    /// Reads a CSV file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Io`] if the file cannot be opened and
    /// [`ImportError::Csv`] if the header row cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file)
    }

    /// Reads CSV data from any source. The first record is the header.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Csv`] if the header row cannot be read.
    pub fn from_reader(reader: impl Read) -> Result<Self, ImportError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let records = reader
            .records()
            .map(|result| {
                result
                    .map(|record| {
                        headers
                            .iter()
                            .zip(record.iter())
                            .map(|(h, v)| (h.clone(), v.to_string()))
                            .collect()
                    })
                    .map_err(|e| e.to_string())
            })
            .collect();

        Ok(Self { headers, records })
    }

    /// Header names, trimmed.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Decoded records in file order.
    #[must_use]
    pub fn records(&self) -> &[Result<CsvRow, String>] {
        &self.records
    }

    /// Fails unless every column in `required` is present in the header.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MissingColumns`] with the absent columns,
    /// sorted.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), ImportError> {
        let present: BTreeSet<&str> = self.headers.iter().map(String::as_str).collect();
        let missing: BTreeSet<&str> = required
            .iter()
            .copied()
            .filter(|c| !present.contains(c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns(
                missing.into_iter().map(str::to_string).collect(),
            ))
        }
    }
}

/// Parses a decimal that may use a comma separator (`41,9` or `41.9`).
#[must_use]
pub fn parse_decimal(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.replace(',', ".").parse().ok()
}

/// Parses a coordinate cell that may be blank or a literal `NaN`.
#[must_use]
pub fn parse_optional_coordinate(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("nan") {
        return None;
    }
    parse_decimal(value).filter(|v| v.is_finite())
}

/// Builds a position from two cells, `None` unless both parse and are in
/// range.
#[must_use]
pub fn parse_coordinates(latitude: Option<&str>, longitude: Option<&str>) -> Option<Coordinates> {
    Coordinates::from_pair(
        latitude.and_then(parse_optional_coordinate),
        longitude.and_then(parse_optional_coordinate),
    )
}

/// Parses an inscription year: only all-digit cells are kept.
#[must_use]
pub fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// A location cell that is neither blank nor a literal `nan`.
#[must_use]
pub fn meaningful_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_short_records() {
        let data = " unesco_id ,nome,lat\n91,Centro Storico,\"41,9\"\n92\n";
        let rows = CsvRows::from_reader(data.as_bytes()).unwrap();
        assert_eq!(rows.headers(), &["unesco_id", "nome", "lat"]);
        assert_eq!(rows.records().len(), 2);

        let first = rows.records()[0].as_ref().unwrap();
        assert_eq!(first.text("nome"), "Centro Storico");
        assert_eq!(first.get("lat"), Some("41,9"));

        let short = rows.records()[1].as_ref().unwrap();
        assert_eq!(short.text("unesco_id"), "92");
        assert_eq!(short.get("nome"), None);
    }

    #[test]
    fn invalid_utf8_record_is_kept_as_error() {
        let mut data = b"unesco_id,nome\n1,ok\n2,".to_vec();
        data.extend_from_slice(&[0xff, 0xfe]);
        data.extend_from_slice(b"\n3,fine\n");
        let rows = CsvRows::from_reader(data.as_slice()).unwrap();
        assert_eq!(rows.records().len(), 3);
        assert!(rows.records()[0].is_ok());
        assert!(rows.records()[1].is_err());
        assert!(rows.records()[2].is_ok());
    }

    #[test]
    fn missing_columns_are_sorted() {
        let rows = CsvRows::from_reader("nome,unesco_id,lat\n".as_bytes()).unwrap();
        let Err(ImportError::MissingColumns(missing)) = rows.require_columns(&SITE_COLUMNS) else {
            panic!("expected missing columns");
        };
        assert_eq!(missing.first().map(String::as_str), Some("anno"));
        assert_eq!(missing.last().map(String::as_str), Some("wheelchair"));
        assert_eq!(missing.len(), 10);
    }

    #[test]
    fn decimal_and_coordinate_parsing() {
        assert_eq!(parse_decimal("41,9"), Some(41.9));
        assert_eq!(parse_decimal(" 12.49 "), Some(12.49));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("n/d"), None);
        assert_eq!(parse_optional_coordinate("NaN"), None);
        assert!(parse_coordinates(Some("41,9"), Some("12,49")).is_some());
        assert!(parse_coordinates(Some("41.9"), Some("")).is_none());
        assert!(parse_coordinates(Some("95"), Some("12")).is_none());
    }

    #[test]
    fn year_requires_all_digits() {
        assert_eq!(parse_year("1980"), Some(1980));
        assert_eq!(parse_year(" 1997 "), Some(1997));
        assert_eq!(parse_year("1980.0"), None);
        assert_eq!(parse_year("-5"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn location_text_skips_nan() {
        assert_eq!(meaningful_text(Some(" Roma ")), Some("Roma".to_string()));
        assert_eq!(meaningful_text(Some("nan")), None);
        assert_eq!(meaningful_text(Some("  ")), None);
        assert_eq!(meaningful_text(None), None);
    }

    #[test]
    fn flags_use_wide_vocabulary() {
        let row: CsvRow = [("wheelchair", "si"), ("ausili_visivi", "off"), ("supporto_uditivo", "")]
            .into_iter()
            .collect();
        let flags = row.accessibility_flags();
        assert_eq!(flags.wheelchair, TriState::Yes);
        assert_eq!(flags.visual_aids, TriState::No);
        assert_eq!(flags.hearing_support, TriState::Unknown);
    }
}
