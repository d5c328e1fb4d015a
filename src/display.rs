use crate::aggregation::FileReport;
use chrono::DateTime;

fn format_second(second: Option<i64>) -> String {
    second
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y%m%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Print a per-input summary of a batch run
pub fn display_reports(reports: &[FileReport]) {
    if reports.is_empty() {
        println!("No inputs processed");
        return;
    }

    println!("\n{}", "=".repeat(120));
    println!("                                    BATCH SUMMARY");
    println!("{}", "=".repeat(120));

    println!(
        "{:<32} {:>10} {:>10} {:>10} {:>10} {:>20} {:>20}",
        "Input", "Records", "Rejected", "Seconds", "Dropped", "First", "Last"
    );
    println!("{}", "-".repeat(120));

    for report in reports {
        let name = report
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| report.input.display().to_string());
        let summary = &report.summary;
        let dropped = summary.dropped.map(|d| d.records).unwrap_or(0);

        println!(
            "{:<32} {:>10} {:>10} {:>10} {:>10} {:>20} {:>20}",
            name,
            summary.records,
            summary.rejected,
            summary.seconds_emitted,
            dropped,
            format_second(summary.first_second),
            format_second(summary.last_second)
        );
    }

    println!("{}", "=".repeat(120));

    let total_records: u64 = reports.iter().map(|r| r.summary.records).sum();
    let total_rejected: u64 = reports.iter().map(|r| r.summary.rejected).sum();
    let total_seconds: u64 = reports.iter().map(|r| r.summary.seconds_emitted).sum();

    println!("Inputs: {}", reports.len());
    println!("Total records: {}", total_records);
    if total_records > 0 {
        println!(
            "Rejected: {} ({:.2}%)",
            total_rejected,
            100.0 * total_rejected as f64 / total_records as f64
        );
    }
    println!("Seconds written: {}", total_seconds);
    println!("{}", "=".repeat(120));
}
