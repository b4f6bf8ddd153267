use super::{Formatter, iso8601_timestamp, report_kind};
use crate::processing::Report;

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, report: &Report) -> String {
        let ts = iso8601_timestamp();
        let kind = report_kind(report);
        match report {
            Report::Fit { board, fit } => format!(
                "{},{},{},{:.1},{:.1},{:.4},{:.4},,,,,",
                ts, kind, board, fit.peak.angle, fit.peak.signal, fit.quality.r2, fit.quality.mse
            ),
            Report::Triangulation { result, .. } => format!(
                "{},{},,,,,,{:.3},{:.3},{:.3},{:.3},",
                ts, kind, result.source_x, result.source_y, result.distance_a, result.distance_b
            ),
            Report::FitFailed { board, error } => {
                format!("{},{},{},,,,,,,,,{}", ts, kind, board, quote(&error.to_string()))
            }
            Report::TriangulationFailed { error } => {
                format!("{},{},,,,,,,,,,{}", ts, kind, quote(&error.to_string()))
            }
            Report::Command { board, command } => {
                format!("{},{},{},,,,,,,,,{}", ts, kind, board, command)
            }
        }
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,kind,board,peak_angle,peak_rssi,r2,mse,source_x,source_y,distance_a,distance_b,message")
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
