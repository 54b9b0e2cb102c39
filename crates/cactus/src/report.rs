//! 🖨️ Report — turning buckets and bulk verdicts into words a human will read.
//!
//! Two kinds of output live here:
//! - the status line after a bulk load ("Yay" or "Oops", plus the failure detail)
//! - the monthly sales lines, `Date: 2024/01/01, Total Sales: 1234.5`
//!
//! Formatting only. No math beyond rounding, no sorting. The cluster already did the hard part. 🦆

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Deserialize;

use crate::aggregation::{BucketKey, SalesBucket};
use crate::bulk::BulkReport;
use crate::dataset::round_to_cents;

/// ✅ What a clean bulk load says.
pub const LOAD_SUCCESS_LINE: &str = "Yay, we have lots of cactus sales!";
/// 💀 What a bulk load with rejected documents says, right before the detail.
pub const LOAD_FAILURE_LINE: &str = "Oops, apparently cactus datasets are hard to create...";

/// 🎨 How the report gets printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// 📜 one `Date: ..., Total Sales: ...` line per bucket
    #[default]
    Lines,
    /// 🍽️ a comfy table with a doc count column
    Table,
}

/// 🚦 The post-load status: the success line, or the failure line followed by the detail.
pub fn status_line(report: &BulkReport) -> String {
    if report.has_failures() {
        format!("{LOAD_FAILURE_LINE}\n{}", report.failure_message())
    } else {
        LOAD_SUCCESS_LINE.to_string()
    }
}

/// 📅 `yyyy/mm/dd` for dates, the raw text for anything else.
pub fn format_period(period: &BucketKey) -> String {
    match period {
        BucketKey::Date(date) => date.format("%Y/%m/%d").to_string(),
        BucketKey::Text(text) => text.clone(),
    }
}

/// 💰 At most two decimals, no trailing zeros: `1.0` → `1`, `50.5` → `50.5`, `2.345` → `2.35`.
pub fn format_total(total: f64) -> String {
    let fixed = format!("{:.2}", round_to_cents(total));
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        // 🧹 "-0.00" rounds to "-0", which nobody wants to read on a sales report
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

pub fn format_line(bucket: &SalesBucket) -> String {
    format!(
        "Date: {}, Total Sales: {}",
        format_period(&bucket.period),
        format_total(bucket.total)
    )
}

/// 🖨️ Render every bucket, in the order given, in the requested format.
pub fn render(buckets: &[SalesBucket], format: ReportFormat) -> String {
    match format {
        ReportFormat::Lines => buckets
            .iter()
            .map(format_line)
            .collect::<Vec<_>>()
            .join("\n"),
        ReportFormat::Table => render_table(buckets),
    }
}

fn render_table(buckets: &[SalesBucket]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["📅 Date", "🌵 Sales", "💰 Total Sales"]);

    for bucket in buckets {
        table.add_row(vec![
            Cell::new(format_period(&bucket.period)),
            Cell::new(bucket.doc_count).set_alignment(CellAlignment::Right),
            Cell::new(format_total(bucket.total)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::BulkFailure;
    use chrono::NaiveDate;

    fn bucket(y: i32, m: u32, total: f64) -> SalesBucket {
        SalesBucket {
            period: BucketKey::Date(NaiveDate::from_ymd_opt(y, m, 1).expect("💀 real month")),
            doc_count: 1,
            total,
        }
    }

    #[test]
    fn the_one_where_two_months_print_two_lines() {
        let rendered = render(&[bucket(2024, 1, 1.0), bucket(2024, 2, 50.0)], ReportFormat::Lines);
        assert_eq!(
            rendered,
            "Date: 2024/01/01, Total Sales: 1\nDate: 2024/02/01, Total Sales: 50"
        );
    }

    #[test]
    fn the_one_where_totals_keep_at_most_two_decimals() {
        assert_eq!(format_total(1.0), "1");
        assert_eq!(format_total(50.5), "50.5");
        assert_eq!(format_total(2.345_000_1), "2.35");
        assert_eq!(format_total(123456.789), "123456.79");
        assert_eq!(format_total(0.0), "0");
        assert_eq!(format_total(0.004), "0");
    }

    #[test]
    fn the_one_where_text_keys_print_as_is() {
        assert_eq!(format_period(&BucketKey::Text("someday".to_string())), "someday");
    }

    #[test]
    fn the_one_where_the_table_has_every_month() {
        let rendered = render(&[bucket(2024, 1, 1.0), bucket(2024, 2, 50.0)], ReportFormat::Table);
        assert!(rendered.contains("2024/01/01"));
        assert!(rendered.contains("2024/02/01"));
        assert!(rendered.contains("Total Sales"));
    }

    #[test]
    fn the_one_where_status_lines_tell_yay_from_oops() {
        let clean = BulkReport {
            submitted: 2,
            indexed: 2,
            failures: vec![],
            errors_flagged: false,
            took_ms: 1,
        };
        assert_eq!(status_line(&clean), LOAD_SUCCESS_LINE);

        let bumpy = BulkReport {
            submitted: 2,
            indexed: 1,
            failures: vec![BulkFailure {
                position: 0,
                index: "cactus".to_string(),
                id: "x".to_string(),
                status: 400,
                reason: "mapper_parsing_exception: nope".to_string(),
            }],
            errors_flagged: true,
            took_ms: 1,
        };
        let line = status_line(&bumpy);
        assert!(line.starts_with(LOAD_FAILURE_LINE));
        assert!(line.contains("mapper_parsing_exception: nope"));
    }
}
