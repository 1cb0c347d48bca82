use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Minimum width of the sequence segment; wider values are never truncated.
const SEQUENCE_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberingError {
    #[error("malformed document number: {0:?}")]
    MalformedDocumentNumber(String),
    #[error("invalid series code: {0:?} (must be non-empty and contain no '-')")]
    InvalidSeriesCode(String),
}

/// A series code becomes the first segment of every number, so it must not
/// be empty or contain the segment separator.
pub fn validate_series_code(code: &str) -> Result<(), NumberingError> {
    if code.is_empty() || code.contains('-') {
        return Err(NumberingError::InvalidSeriesCode(code.to_string()));
    }
    Ok(())
}

fn all_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Document kinds that carry their own serial numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentSeries {
    #[serde(rename = "MC")]
    MedicalCertificate,
    #[serde(rename = "REC")]
    Receipt,
}

impl DocumentSeries {
    pub fn code(self) -> &'static str {
        match self {
            DocumentSeries::MedicalCertificate => "MC",
            DocumentSeries::Receipt => "REC",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "MC" => Some(DocumentSeries::MedicalCertificate),
            "REC" => Some(DocumentSeries::Receipt),
            _ => None,
        }
    }
}

/// How the stored counter for a series is keyed.
///
/// `Continuous` keeps one counter per series, so the sequence keeps counting
/// across year boundaries even though the year segment changes.
/// `YearlyReset` keeps one counter per series and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    Continuous,
    YearlyReset,
}

impl SequenceMode {
    /// Year column value of the counter row that serves `year`.
    pub fn counter_year(self, year: i32) -> i32 {
        match self {
            SequenceMode::Continuous => 0,
            SequenceMode::YearlyReset => year,
        }
    }
}

/// A formatted serial such as `MC-2024-0007`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNumber {
    series: String,
    year: i32,
    sequence: u64,
}

impl DocumentNumber {
    pub fn new(series: impl Into<String>, year: i32, sequence: u64) -> Self {
        Self {
            series: series.into(),
            year,
            sequence,
        }
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:0width$}",
            self.series,
            self.year,
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl FromStr for DocumentNumber {
    type Err = NumberingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || NumberingError::MalformedDocumentNumber(s.to_string());

        let parts: Vec<&str> = s.split('-').collect();
        let [series, year, seq] = parts.as_slice() else {
            return Err(malformed());
        };
        if series.is_empty() {
            return Err(malformed());
        }
        // Integer `from_str` accepts a leading sign, which is not part of the format.
        if !all_digits(year) || !all_digits(seq) {
            return Err(malformed());
        }
        let sequence = seq.parse::<u64>().map_err(|_| malformed())?;
        let year = year.parse::<i32>().map_err(|_| malformed())?;

        Ok(DocumentNumber::new(*series, year, sequence))
    }
}

/// Derives the next number of a series from the most recently issued one.
///
/// The year segment is always `current_year`; the sequence continues from
/// `previous` whatever year that number carries.
pub fn next_document_number(
    series_code: &str,
    previous: Option<&str>,
    current_year: i32,
) -> Result<DocumentNumber, NumberingError> {
    validate_series_code(series_code)?;
    let sequence = match previous {
        None => 1,
        Some(prev) => prev.parse::<DocumentNumber>()?.sequence + 1,
    };
    Ok(DocumentNumber::new(series_code, current_year, sequence))
}

/// Highest sequence among issued numbers of `series_code` that share a
/// counter with `year` under `mode`. Numbers that do not parse are ignored.
pub fn highest_sequence<'a>(
    numbers: impl IntoIterator<Item = &'a str>,
    series_code: &str,
    mode: SequenceMode,
    year: i32,
) -> u64 {
    numbers
        .into_iter()
        .filter_map(|n| n.parse::<DocumentNumber>().ok())
        .filter(|n| n.series() == series_code)
        .filter(|n| mode == SequenceMode::Continuous || n.year() == year)
        .map(|n| n.sequence())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_number_of_a_series_starts_at_one() {
        let n = next_document_number("MC", None, 2024).unwrap();
        assert_eq!(n.sequence(), 1);
        assert_eq!(n.to_string(), "MC-2024-0001");
    }

    #[test]
    fn continues_from_previous_number() {
        let n = next_document_number("MC", Some("MC-2024-0006"), 2024).unwrap();
        assert_eq!(n.to_string(), "MC-2024-0007");
    }

    #[test]
    fn wide_sequences_are_not_truncated() {
        let n = next_document_number("REC", Some("REC-2024-10022"), 2024).unwrap();
        assert_eq!(n.to_string(), "REC-2024-10023");
    }

    #[test]
    fn year_change_keeps_counting() {
        let n = next_document_number("REC", Some("REC-2024-0042"), 2025).unwrap();
        assert_eq!(n.year(), 2025);
        assert_eq!(n.sequence(), 43);
        assert_eq!(n.to_string(), "REC-2025-0043");
    }

    #[test]
    fn garbage_is_malformed() {
        let err = next_document_number("MC", Some("garbage"), 2024).unwrap_err();
        assert_eq!(
            err,
            NumberingError::MalformedDocumentNumber("garbage".to_string())
        );
    }

    #[test]
    fn rejects_wrong_segment_counts_and_bad_sequences() {
        for bad in [
            "MC-2024",
            "MC-2024-0001-X",
            "MC-2024-",
            "MC-2024-abc",
            "MC-2024--1",
            "MC-2024-+5",
            "-2024-0001",
            "MC-20x4-0001",
            "MC--0001",
            "",
        ] {
            assert!(
                bad.parse::<DocumentNumber>().is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn signed_year_is_malformed() {
        for bad in ["MC-+2024-0001", "MC--2024-0001"] {
            assert_eq!(
                bad.parse::<DocumentNumber>(),
                Err(NumberingError::MalformedDocumentNumber(bad.to_string()))
            );
        }
    }

    #[test]
    fn series_code_must_be_a_single_segment() {
        assert_eq!(
            next_document_number("", None, 2024),
            Err(NumberingError::InvalidSeriesCode(String::new()))
        );
        assert_eq!(
            next_document_number("MC-X", Some("MC-X-2024-0001"), 2024),
            Err(NumberingError::InvalidSeriesCode("MC-X".to_string()))
        );
        for s in [DocumentSeries::MedicalCertificate, DocumentSeries::Receipt] {
            assert!(validate_series_code(s.code()).is_ok());
        }
    }

    #[test]
    fn reparsing_displayed_number_keeps_sequence() {
        let parsed: DocumentNumber = "MC-2023-0099".parse().unwrap();
        let again: DocumentNumber = parsed.to_string().parse().unwrap();
        assert_eq!(again.sequence(), 99);
        assert_eq!(again, parsed);
    }

    #[test]
    fn series_codes_round_trip() {
        for s in [DocumentSeries::MedicalCertificate, DocumentSeries::Receipt] {
            assert_eq!(DocumentSeries::from_code(s.code()), Some(s));
        }
        assert_eq!(DocumentSeries::from_code("XX"), None);
    }

    #[test]
    fn series_serializes_as_its_code() {
        assert_eq!(serde_json::to_value(DocumentSeries::Receipt).unwrap(), "REC");
        assert_eq!(serde_json::to_value(DocumentSeries::MedicalCertificate).unwrap(), "MC");
    }

    #[test]
    fn highest_sequence_skips_foreign_and_malformed_numbers() {
        let issued = ["REC-2024-0009", "REC-2025-0003", "REC-legacy", "MC-2025-0050", "REC-2023-10001"];
        assert_eq!(highest_sequence(issued, "REC", SequenceMode::Continuous, 2025), 10001);
        assert_eq!(highest_sequence(issued, "REC", SequenceMode::YearlyReset, 2025), 3);
        assert_eq!(highest_sequence(issued, "REC", SequenceMode::YearlyReset, 2026), 0);
        assert_eq!(highest_sequence(std::iter::empty(), "MC", SequenceMode::Continuous, 2025), 0);
    }

    #[test]
    fn counter_year_follows_mode() {
        assert_eq!(SequenceMode::Continuous.counter_year(2024), 0);
        assert_eq!(SequenceMode::YearlyReset.counter_year(2024), 2024);
    }

    proptest! {
        #[test]
        fn next_sequence_is_previous_plus_one(
            n in 0u64..1_000_000_000,
            year in 1900i32..3000,
            next_year in 1900i32..3000,
        ) {
            let prev = DocumentNumber::new("MC", year, n).to_string();
            let next = next_document_number("MC", Some(&prev), next_year).unwrap();
            prop_assert_eq!(next.sequence(), n + 1);
            prop_assert_eq!(next.year(), next_year);
        }
    }
}
