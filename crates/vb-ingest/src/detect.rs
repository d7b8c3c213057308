// SPDX-License-Identifier: MIT OR Apache-2.0
//! Format detection for uploaded bid packages.
//!
//! Mirrors a score-per-candidate-format pattern: every known
//! [`SourceFormat`] gets a heuristic scoring function that inspects the raw
//! bytes (and, when available, the uploaded filename) and returns a
//! confidence in `[0.0, 1.0]` plus the evidence that produced it. The
//! highest-scoring format wins; ties favor the format earlier in
//! [`SourceFormat::all`].
use vb_core::SourceFormat;

/// Result of sniffing an uploaded file's format.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Most likely source format.
    pub format: SourceFormat,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Human-readable evidence strings explaining the match.
    pub evidence: Vec<String>,
}

fn all_formats() -> &'static [SourceFormat] {
    &[
        SourceFormat::Pdf,
        SourceFormat::Csv,
        SourceFormat::Jsonl,
        SourceFormat::Txt,
    ]
}

/// Sniffs the [`SourceFormat`] of raw uploaded bytes.
#[derive(Debug, Default)]
pub struct FormatDetector {
    _priv: (),
}

impl FormatDetector {
    /// Create a new detector.
    #[must_use]
    pub fn new() -> Self {
        Self { _priv: () }
    }

    /// Detect the most likely format of `bytes`, with `filename` (if known)
    /// as an additional hint. Returns `None` when no heuristic scores above
    /// zero.
    #[must_use]
    pub fn detect(&self, bytes: &[u8], filename: Option<&str>) -> Option<DetectionResult> {
        let mut best: Option<DetectionResult> = None;
        for &format in all_formats() {
            let (score, evidence) = match format {
                SourceFormat::Pdf => score_pdf(bytes, filename),
                SourceFormat::Csv => score_csv(bytes, filename),
                SourceFormat::Jsonl => score_jsonl(bytes, filename),
                SourceFormat::Txt => score_txt(bytes, filename),
            };
            if score > 0.0 && best.as_ref().is_none_or(|b| score > b.confidence) {
                best = Some(DetectionResult {
                    format,
                    confidence: score,
                    evidence,
                });
            }
        }
        best
    }

    /// Scored results for every format that matched at least one heuristic,
    /// sorted by descending confidence.
    #[must_use]
    pub fn detect_all(&self, bytes: &[u8], filename: Option<&str>) -> Vec<DetectionResult> {
        let mut results: Vec<DetectionResult> = all_formats()
            .iter()
            .filter_map(|&format| {
                let (score, evidence) = match format {
                    SourceFormat::Pdf => score_pdf(bytes, filename),
                    SourceFormat::Csv => score_csv(bytes, filename),
                    SourceFormat::Jsonl => score_jsonl(bytes, filename),
                    SourceFormat::Txt => score_txt(bytes, filename),
                };
                (score > 0.0).then_some(DetectionResult {
                    format,
                    confidence: score,
                    evidence,
                })
            })
            .collect();
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        results
    }
}

fn has_ext(filename: Option<&str>, ext: &str) -> bool {
    filename.is_some_and(|f| f.to_ascii_lowercase().ends_with(ext))
}

fn score_pdf(bytes: &[u8], filename: Option<&str>) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut evidence = Vec::new();
    if bytes.starts_with(b"%PDF-") {
        score += 0.9;
        evidence.push("starts with %PDF- magic bytes".to_string());
    }
    if has_ext(filename, ".pdf") {
        score += 0.1;
        evidence.push("filename ends with .pdf".to_string());
    }
    (score.min(1.0), evidence)
}

fn score_csv(bytes: &[u8], filename: Option<&str>) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut evidence = Vec::new();
    if has_ext(filename, ".csv") {
        score += 0.4;
        evidence.push("filename ends with .csv".to_string());
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        if let Some(first_line) = text.lines().next() {
            let commas = first_line.matches(',').count();
            if commas >= 2 {
                score += 0.5;
                evidence.push(format!("header row has {commas} comma-separated fields"));
            }
        }
        if text.lines().take(5).all(|l| l.matches(',').count() >= 2) && text.lines().count() > 1 {
            score += 0.1;
            evidence.push("first lines consistently comma-delimited".to_string());
        }
    }
    (score.min(1.0), evidence)
}

fn score_jsonl(bytes: &[u8], filename: Option<&str>) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut evidence = Vec::new();
    if has_ext(filename, ".jsonl") || has_ext(filename, ".ndjson") {
        score += 0.4;
        evidence.push("filename ends with .jsonl/.ndjson".to_string());
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        let sample: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).take(5).collect();
        if !sample.is_empty()
            && sample
                .iter()
                .all(|l| serde_json::from_str::<serde_json::Value>(l).is_ok())
        {
            score += 0.6;
            evidence.push("every sampled line parses as standalone JSON".to_string());
        }
    }
    (score.min(1.0), evidence)
}

fn score_txt(bytes: &[u8], filename: Option<&str>) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut evidence = Vec::new();
    if has_ext(filename, ".txt") {
        score += 0.3;
        evidence.push("filename ends with .txt".to_string());
    }
    if std::str::from_utf8(bytes).is_ok() {
        score += 0.15;
        evidence.push("content is valid UTF-8 text".to_string());
    }
    (score.min(1.0), evidence)
}
