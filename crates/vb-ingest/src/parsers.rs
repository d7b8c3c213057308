// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-format pairing extraction.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;
use vb_core::Pairing;

/// Errors raised while extracting pairings from an uploaded file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes were not valid UTF-8 text.
    #[error("content is not valid UTF-8")]
    NotUtf8,
    /// A CSV row was missing a required column or had an unparsable value.
    #[error("csv row {row}: {detail}")]
    Csv {
        /// 1-based row number (excluding header).
        row: usize,
        /// What went wrong.
        detail: String,
    },
    /// A JSONL line did not deserialize into a `Pairing`.
    #[error("jsonl line {line}: {source}")]
    Jsonl {
        /// 1-based line number.
        line: usize,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
    /// PDF text extraction failed outright.
    #[error("failed to extract text from PDF: {0}")]
    PdfExtraction(String),
    /// No registered PDF dialect could parse the extracted text.
    #[error("no PDF dialect recognized this package's layout")]
    UnrecognizedPdfDialect,
    /// Plain-text parsing produced zero recognizable pairings.
    #[error("no pairings recognized in plain-text package")]
    EmptyTextPackage,
}

/// Parse a CSV bid package.
///
/// Expected columns (header row required): `pairing_id`, `days`,
/// `credit_minutes`, `block_minutes`, `routing` (`;`-separated station
/// codes), `dates` (`;`-separated `YYYY-MM-DD`), `includes_weekend`,
/// `has_red_eye`, `equipment`. Duty-period and layover detail is not
/// representable in this flat format; candidates sourced from CSV packages
/// carry empty `duty_periods`/`layovers`, so FAR117 rest-rule evaluation
/// degrades to a warning (undefined `pairing.rest_before_minutes`) rather
/// than a hard failure.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Pairing>, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
    let mut pairings = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ParseError::Csv {
            row: idx + 1,
            detail: e.to_string(),
        })?;
        let get = |col: usize, name: &str| -> Result<&str, ParseError> {
            record.get(col).ok_or_else(|| ParseError::Csv {
                row: idx + 1,
                detail: format!("missing column '{name}'"),
            })
        };
        let parse_u32 = |s: &str, name: &str| -> Result<u32, ParseError> {
            s.trim().parse().map_err(|_| ParseError::Csv {
                row: idx + 1,
                detail: format!("column '{name}' is not a valid integer: '{s}'"),
            })
        };
        let parse_bool = |s: &str| -> bool {
            matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        };

        let pairing_id = get(0, "pairing_id")?.to_string();
        let days = parse_u32(get(1, "days")?, "days")?;
        let credit_minutes = parse_u32(get(2, "credit_minutes")?, "credit_minutes")?;
        let block_minutes = parse_u32(get(3, "block_minutes")?, "block_minutes")?;
        let routing: Vec<String> = get(4, "routing")?
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let dates: Vec<NaiveDate> = get(5, "dates")?
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ParseError::Csv {
                    row: idx + 1,
                    detail: format!("column 'dates' has unparsable date '{s}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let includes_weekend = parse_bool(get(6, "includes_weekend")?);
        let has_red_eye = parse_bool(get(7, "has_red_eye")?);
        let equipment = get(8, "equipment")?.to_string();

        pairings.push(Pairing {
            pairing_id,
            days,
            credit_minutes,
            block_minutes,
            routing,
            dates,
            includes_weekend,
            has_red_eye,
            duty_periods: Vec::new(),
            layovers: Vec::new(),
            equipment,
            raw: record.iter().collect::<Vec<_>>().join(","),
        });
    }
    Ok(pairings)
}

/// Parse a JSONL bid package: one `Pairing` per line.
pub fn parse_jsonl(bytes: &[u8]) -> Result<Vec<Pairing>, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| ParseError::Jsonl {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Parses raw text extracted from a PDF into pairings, following one
/// airline's layout conventions.
///
/// PDF bid packages vary enough between airlines (column order, trip
/// separators, duty-period notation) that no single parser covers them
/// all; each airline's layout gets its own implementation registered in
/// [`DialectRegistry`].
pub trait PdfDialect: Send + Sync {
    /// Airline code this dialect parses, e.g. `"UAL"`.
    fn airline(&self) -> &'static str;
    /// Returns `true` if `text` looks like this airline's layout.
    fn recognizes(&self, text: &str) -> bool;
    /// Parse pairings out of extracted PDF text.
    fn parse(&self, text: &str) -> Result<Vec<Pairing>, ParseError>;
}

/// United's PDF bid-package layout: one pairing per line, whitespace
/// separated, of the form
/// `PAIRING_ID DAYS CREDIT_MINUTES BLOCK_MINUTES ROUTING...`.
pub struct UalDialect;

impl PdfDialect for UalDialect {
    fn airline(&self) -> &'static str {
        "UAL"
    }

    fn recognizes(&self, text: &str) -> bool {
        text.lines().any(|l| l.trim_start().starts_with("UAL"))
            || text.contains("UNITED AIRLINES")
    }

    fn parse(&self, text: &str) -> Result<Vec<Pairing>, ParseError> {
        let mut pairings = Vec::new();
        for line in text.lines() {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                continue;
            }
            let (Ok(days), Ok(credit_minutes), Ok(block_minutes)) = (
                cols[1].parse::<u32>(),
                cols[2].parse::<u32>(),
                cols[3].parse::<u32>(),
            ) else {
                continue;
            };
            pairings.push(Pairing {
                pairing_id: cols[0].to_string(),
                days,
                credit_minutes,
                block_minutes,
                routing: cols[4..].iter().map(|s| s.to_string()).collect(),
                dates: Vec::new(),
                includes_weekend: false,
                has_red_eye: false,
                duty_periods: Vec::new(),
                layovers: Vec::new(),
                equipment: String::new(),
                raw: line.to_string(),
            });
        }
        Ok(pairings)
    }
}

/// Registry of per-airline PDF layout parsers.
#[derive(Default)]
pub struct DialectRegistry {
    dialects: HashMap<&'static str, Box<dyn PdfDialect>>,
}

impl DialectRegistry {
    /// Build the registry with every built-in dialect registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register(Box::new(UalDialect));
        registry
    }

    /// Register (or replace) a dialect.
    pub fn register(&mut self, dialect: Box<dyn PdfDialect>) {
        self.dialects.insert(dialect.airline(), dialect);
    }

    /// Find the first registered dialect that recognizes `text`.
    #[must_use]
    pub fn detect(&self, text: &str) -> Option<&dyn PdfDialect> {
        self.dialects.values().find(|d| d.recognizes(text)).map(AsRef::as_ref)
    }
}

/// Extract text from a PDF bid package and parse it with whichever
/// registered dialect recognizes its layout.
pub fn parse_pdf(bytes: &[u8], registry: &DialectRegistry) -> Result<Vec<Pairing>, ParseError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ParseError::PdfExtraction(e.to_string()))?;
    let dialect = registry
        .detect(&text)
        .ok_or(ParseError::UnrecognizedPdfDialect)?;
    dialect.parse(&text)
}

/// Parse an unstructured plain-text bid package using the same
/// whitespace-delimited heuristic as [`UalDialect`], since most PBS text
/// exports share that row shape regardless of airline.
pub fn parse_txt(bytes: &[u8]) -> Result<Vec<Pairing>, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    let pairings = UalDialect.parse(text)?;
    if pairings.is_empty() {
        return Err(ParseError::EmptyTextPackage);
    }
    Ok(pairings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_pairings() {
        let csv = "pairing_id,days,credit_minutes,block_minutes,routing,dates,includes_weekend,has_red_eye,equipment\nPR1,3,600,540,DEN;ORD;DEN,2025-09-01;2025-09-02;2025-09-03,false,false,737\n";
        let pairings = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].pairing_id, "PR1");
        assert_eq!(pairings[0].routing, vec!["DEN", "ORD", "DEN"]);
    }

    #[test]
    fn parses_jsonl_pairings() {
        let line = serde_json::json!({
            "pairing_id": "PR1",
            "days": 2,
            "credit_minutes": 400,
            "block_minutes": 350,
            "routing": ["DEN", "LAX"],
            "dates": [],
            "includes_weekend": false,
            "has_red_eye": false,
            "duty_periods": [],
            "layovers": [],
            "equipment": "737",
            "raw": ""
        });
        let bytes = format!("{line}\n");
        let pairings = parse_jsonl(bytes.as_bytes()).unwrap();
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].pairing_id, "PR1");
    }

    #[test]
    fn ual_dialect_recognizes_and_parses_lines() {
        let text = "UNITED AIRLINES SEPTEMBER BID PACKAGE\nPR100 3 600 540 DEN ORD DEN\n";
        let registry = DialectRegistry::with_builtins();
        let dialect = registry.detect(text).unwrap();
        let pairings = dialect.parse(text).unwrap();
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].pairing_id, "PR100");
    }

    #[test]
    fn unrecognized_pdf_layout_is_an_error() {
        let registry = DialectRegistry::with_builtins();
        assert!(registry.detect("some airline with no registered dialect").is_none());
    }
}
