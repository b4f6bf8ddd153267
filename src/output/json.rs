use serde_json::{Value, json};

use super::{Formatter, beam_width, iso8601_timestamp, report_kind};
use crate::processing::Report;

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &Report) -> String {
        let body = match report {
            Report::Fit { board, fit } => json!({
                "board": board,
                "model": fit.model.to_string(),
                "peak_angle": fit.peak.angle,
                "peak_rssi": fit.peak.signal,
                "r2": fit.quality.r2,
                "mse": fit.quality.mse,
                "beam_width": beam_width(&fit.parameters),
                "parameters": fit.parameters,
            }),
            Report::FitFailed { board, error } => json!({
                "board": board,
                "error": error.to_string(),
            }),
            Report::Triangulation {
                bearing_a,
                bearing_b,
                result,
            } => json!({
                "bearing_a": bearing_a.angle,
                "bearing_b": bearing_b.angle,
                "result": result,
            }),
            Report::TriangulationFailed { error } => json!({ "error": error.to_string() }),
            Report::Command { board, command } => json!({
                "board": board,
                "command": command,
            }),
        };

        let mut out = json!({
            "ts": iso8601_timestamp(),
            "kind": report_kind(report),
        });
        if let (Value::Object(out), Value::Object(body)) = (&mut out, body) {
            out.extend(body);
        }
        out.to_string()
    }
}
