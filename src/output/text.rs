use super::{Formatter, beam_width};
use crate::processing::Report;

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, report: &Report) -> String {
        match report {
            Report::Fit { board, fit } => {
                let mut line = format!(
                    "{}: peak {:>6.1}° @ {:>6.1} dBm ({}, R² {:.3})",
                    board, fit.peak.angle, fit.peak.signal, fit.model, fit.quality.r2
                );
                if self.verbose {
                    let width = beam_width(&fit.parameters)
                        .map_or("-".to_string(), |w| format!("{:.1}°", w));
                    line.push_str(&format!(
                        " [MSE: {:.3}, beamwidth: {}, curve: {} pts]",
                        fit.quality.mse,
                        width,
                        fit.curve.len()
                    ));
                }
                line
            }
            Report::FitFailed { board, error } => format!("{}: no fit ({})", board, error),
            Report::Triangulation {
                bearing_a,
                bearing_b,
                result,
            } => {
                let mut line = format!(
                    "Source: ({:.2}, {:.2}) m, distances {:.2} / {:.2} m",
                    result.source_x, result.source_y, result.distance_a, result.distance_b
                );
                if self.verbose {
                    let [at_a, at_b, at_source] = result.interior_angles;
                    line.push_str(&format!(
                        " [bearings: {:.1}° / {:.1}°, angles: {:.1}° {:.1}° {:.1}°, baseline: {:.2} m]",
                        bearing_a.angle, bearing_b.angle, at_a, at_b, at_source, result.baseline
                    ));
                }
                line
            }
            Report::TriangulationFailed { error } => format!("Triangulation failed: {}", error),
            Report::Command { board, command } => format!("{}: {}", board, command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_reports;

    #[test]
    fn test_fit_line() {
        let line = TextFormatter::new(false).format(&test_reports::fit_report());
        assert!(line.starts_with("board1: peak   90.0°"), "{}", line);
        assert!(line.contains("gaussian"));
        assert!(!line.contains("MSE"));
    }

    #[test]
    fn test_verbose_adds_details() {
        let f = TextFormatter::new(true);
        assert!(f.format(&test_reports::fit_report()).contains("beamwidth"));
        let line = f.format(&test_reports::triangulation_report());
        assert!(line.contains("Source: (5.00, 5.00) m"), "{}", line);
        assert!(line.contains("baseline: 10.00 m"));
    }

    #[test]
    fn test_every_report_renders() {
        let f = TextFormatter::new(false);
        let lines: Vec<String> = test_reports::all().iter().map(|r| f.format(r)).collect();
        assert!(lines[1].contains("no fit"));
        assert!(lines[3].contains("parallel"));
        assert_eq!(lines[4], "board2: start");
    }
}
