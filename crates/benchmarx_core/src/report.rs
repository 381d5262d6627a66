//! CSV and JSON export of rankings and comparisons.
//!
//! CSV output follows RFC 4180: CRLF line endings, and fields containing a
//! comma, quote or line break are quoted with inner quotes doubled.

use crate::scoring::{CategoryCoverage, RankChange, RankedVendor};
use crate::service::scoring_service::{
    BenchmarkTrendPoint, ContextPerformance, HeatmapCell, VendorComparison,
};
use serde::Serialize;
use std::borrow::Cow;

/// A row type that can be written as CSV.
pub trait CsvRecord {
    fn header() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// Renders `rows` with a header line.
pub fn to_csv<T: CsvRecord>(rows: &[T]) -> String {
    let mut out = String::new();
    push_line(&mut out, T::header().iter().copied());
    for row in rows {
        let fields = row.fields();
        push_line(&mut out, fields.iter().map(String::as_str));
    }
    out
}

/// Pretty-printed JSON for any exportable value.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn push_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (index, field) in fields.enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push_str("\r\n");
}

pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn number(value: f64) -> String {
    format!("{value:.2}")
}

impl CsvRecord for RankedVendor {
    fn header() -> &'static [&'static str] {
        &[
            "rank",
            "vendor_id",
            "vendor_name",
            "vendor_type",
            "total_score",
            "max_possible_score",
            "score_percentage",
            "active_count",
            "dynamic_count",
            "no_evid_count",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            self.vendor_id.to_string(),
            self.vendor_name.clone(),
            self.vendor_type.as_str().to_string(),
            number(self.score.total_score),
            number(self.score.max_possible_score),
            number(self.score.score_percentage),
            self.score.active_count.to_string(),
            self.score.dynamic_count.to_string(),
            self.score.no_evid_count.to_string(),
        ]
    }
}

impl CsvRecord for RankChange {
    fn header() -> &'static [&'static str] {
        &[
            "vendor_name",
            "original_rank",
            "simulated_rank",
            "rank_change",
            "original_percentage",
            "simulated_percentage",
            "score_change",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.vendor_name.clone(),
            self.original_rank.to_string(),
            self.simulated_rank.to_string(),
            self.rank_change.to_string(),
            number(self.original_percentage),
            number(self.simulated_percentage),
            number(self.score_change),
        ]
    }
}

impl CsvRecord for VendorComparison {
    fn header() -> &'static [&'static str] {
        &[
            "vendor_name",
            "vendor_type",
            "total_score",
            "max_possible_score",
            "score_percentage",
            "active_count",
            "dynamic_count",
            "no_evid_count",
            "categories_fully_covered",
        ]
    }

    fn fields(&self) -> Vec<String> {
        let fully_covered = self
            .coverage
            .iter()
            .filter(|coverage| coverage.no_evidence == 0)
            .count();
        vec![
            self.vendor_name.clone(),
            self.vendor_type.as_str().to_string(),
            number(self.score.total_score),
            number(self.score.max_possible_score),
            number(self.score.score_percentage),
            self.score.active_count.to_string(),
            self.score.dynamic_count.to_string(),
            self.score.no_evid_count.to_string(),
            fully_covered.to_string(),
        ]
    }
}

impl CsvRecord for BenchmarkTrendPoint {
    fn header() -> &'static [&'static str] {
        &[
            "report_date",
            "benchmark_name",
            "source",
            "rank",
            "vendor_count",
            "total_score",
            "score_percentage",
            "score_change",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.report_date.to_string(),
            self.benchmark_name.clone(),
            self.source.clone(),
            self.rank.to_string(),
            self.vendor_count.to_string(),
            number(self.total_score),
            number(self.score_percentage),
            self.score_change.map(number).unwrap_or_default(),
        ]
    }
}

impl CsvRecord for ContextPerformance {
    fn header() -> &'static [&'static str] {
        &[
            "context_name",
            "industry",
            "company_size",
            "security_maturity",
            "rank",
            "vendor_count",
            "total_score",
            "max_possible_score",
            "score_percentage",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.context_name.clone(),
            self.industry.clone(),
            self.company_size.as_str().to_string(),
            self.security_maturity.as_str().to_string(),
            self.rank.to_string(),
            self.vendor_count.to_string(),
            number(self.total_score),
            number(self.max_possible_score),
            number(self.score_percentage),
        ]
    }
}

impl CsvRecord for CategoryCoverage {
    fn header() -> &'static [&'static str] {
        &[
            "category_name",
            "total_attacks",
            "active_detections",
            "dynamic_detections",
            "no_evidence",
            "coverage_percentage",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.category_name.clone(),
            self.total_attacks.to_string(),
            self.active_detections.to_string(),
            self.dynamic_detections.to_string(),
            self.no_evidence.to_string(),
            number(self.coverage_percentage),
        ]
    }
}

impl CsvRecord for HeatmapCell {
    fn header() -> &'static [&'static str] {
        &[
            "category_name",
            "total_attacks",
            "active_detections",
            "dynamic_detections",
            "no_evidence",
            "coverage_percentage",
            "risk_level",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.coverage.category_name.clone(),
            self.coverage.total_attacks.to_string(),
            self.coverage.active_detections.to_string(),
            self.coverage.dynamic_detections.to_string(),
            self.coverage.no_evidence.to_string(),
            number(self.coverage.coverage_percentage),
            self.risk_level.as_str().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{escape_field, to_csv, to_json};
    use crate::model::vendor::VendorType;
    use crate::scoring::{RankedVendor, ScoreBreakdown};
    use uuid::Uuid;

    fn ranked(rank: u32, name: &str, percentage: f64) -> RankedVendor {
        RankedVendor {
            rank,
            vendor_id: Uuid::new_v4(),
            vendor_name: name.to_string(),
            vendor_type: VendorType::Edr,
            score: ScoreBreakdown {
                total_score: percentage / 10.0,
                max_possible_score: 10.0,
                score_percentage: percentage,
                active_count: 3,
                dynamic_count: 1,
                no_evid_count: 1,
                categories: Vec::new(),
            },
        }
    }

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(escape_field("CrowdStrike"), "CrowdStrike");
    }

    #[test]
    fn special_fields_are_quoted_and_quotes_doubled() {
        assert_eq!(escape_field("Acme, Inc."), "\"Acme, Inc.\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn ranking_csv_has_header_and_crlf_rows() {
        let csv = to_csv(&[ranked(1, "Acme, Inc.", 87.5), ranked(2, "Bravo", 50.0)]);
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("rank,vendor_id,vendor_name"));
        assert!(lines[1].starts_with("1,"));
        assert!(lines[1].contains(",\"Acme, Inc.\",EDR,8.75,10.00,87.50,3,1,1"));
        assert!(lines[2].contains(",Bravo,EDR,5.00,10.00,50.00,"));
        assert_eq!(lines[3], "");
    }

    #[test]
    fn json_export_flattens_scores() {
        let json = to_json(&[ranked(1, "Acme", 87.5)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["rank"], 1);
        assert_eq!(value[0]["vendor_type"], "EDR");
        assert_eq!(value[0]["score_percentage"], 87.5);
    }
}
