mod csv;
mod json;
mod text;

use chrono::Utc;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

use crate::fitting::FitParameters;
use crate::processing::Report;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

pub trait Formatter: Send {
    fn format(&self, report: &Report) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Short name of the report variant, used as the `kind` column/field
pub fn report_kind(report: &Report) -> &'static str {
    match report {
        Report::Fit { .. } => "fit",
        Report::FitFailed { .. } => "fit_failed",
        Report::Triangulation { .. } => "triangulation",
        Report::TriangulationFailed { .. } => "triangulation_failed",
        Report::Command { .. } => "command",
    }
}

/// Beamwidth (FWHM) for models that define one
pub fn beam_width(parameters: &FitParameters) -> Option<f64> {
    match parameters {
        FitParameters::Gaussian(p) => Some(p.beam_width()),
        _ => None,
    }
}
