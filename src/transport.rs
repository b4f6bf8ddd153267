//! JSON-lines wire format shared by the boards and the tools
//!
//! One object per line, addressed by `board` and tagged by `topic`:
//!
//! ```text
//! {"board":"board1","topic":"data","angle":30,"rssi":-72.5,"snr":7.25}
//! {"board":"board1","topic":"rotation_complete","best_angle":90,"best_rssi":-50}
//! {"board":"board1","topic":"all_angles","angles":[0,2,4],"rssi":[-80,-79,-78]}
//! {"board":"board1","topic":"start"}
//! ```
//!
//! Firmware revisions disagree on field names, so the common spellings are
//! accepted here and nowhere else. Samples carrying the no-signal RSSI are
//! dropped before they reach a session.

use serde::{Deserialize, Serialize};

use crate::constants::NO_SIGNAL_RSSI;
use crate::error::{DfError, Result};
use crate::observation::{Observation, PeakEstimate};
use crate::processing::BoardMessage;
use crate::series::SamplePoint;
use crate::session::{Command, SweepEvent};

/// One line on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub board: String,
    #[serde(flatten)]
    pub payload: WirePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum WirePayload {
    #[serde(alias = "lora/data")]
    Data {
        #[serde(alias = "current_angle", alias = "servo_angle")]
        angle: f64,
        #[serde(alias = "RSSI", alias = "signal_strength")]
        rssi: f64,
        #[serde(default, alias = "SNR", skip_serializing_if = "Option::is_none")]
        snr: Option<f64>,
    },
    #[serde(alias = "rotation/complete")]
    RotationComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        best_angle: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        best_rssi: Option<f64>,
    },
    #[serde(alias = "all/angles")]
    AllAngles {
        angles: Vec<f64>,
        #[serde(alias = "RSSI", alias = "signal_strength")]
        rssi: Vec<f64>,
    },
    Start,
    Stop,
    Reset,
}

impl WireMessage {
    pub fn observation(board: impl Into<String>, obs: &Observation) -> Self {
        Self {
            board: board.into(),
            payload: WirePayload::Data {
                angle: obs.angle,
                rssi: obs.rssi,
                snr: obs.snr,
            },
        }
    }

    pub fn rotation_complete(board: impl Into<String>, best: Option<PeakEstimate>) -> Self {
        Self {
            board: board.into(),
            payload: WirePayload::RotationComplete {
                best_angle: best.map(|p| p.angle),
                best_rssi: best.map(|p| p.signal),
            },
        }
    }

    pub fn all_angles(board: impl Into<String>, points: &[SamplePoint]) -> Self {
        Self {
            board: board.into(),
            payload: WirePayload::AllAngles {
                angles: points.iter().map(|p| p.angle).collect(),
                rssi: points.iter().map(|p| p.rssi).collect(),
            },
        }
    }

    pub fn command(board: impl Into<String>, command: Command) -> Self {
        let payload = match command {
            Command::Start => WirePayload::Start,
            Command::Stop => WirePayload::Stop,
            Command::Reset => WirePayload::Reset,
        };
        Self {
            board: board.into(),
            payload,
        }
    }

    /// Convert to the canonical event shape
    ///
    /// Returns `Ok(None)` for a data sample without signal.
    pub fn into_board_message(self) -> Result<Option<BoardMessage>> {
        let event = match self.payload {
            WirePayload::Data { angle, rssi, snr } => {
                if is_no_signal(rssi) {
                    log::debug!("[{}] No signal at {:.1}°", self.board, angle);
                    return Ok(None);
                }
                let obs = Observation::new(angle, rssi);
                SweepEvent::Observation(match snr {
                    Some(snr) => obs.with_snr(snr),
                    None => obs,
                })
            }
            WirePayload::RotationComplete {
                best_angle,
                best_rssi,
            } => {
                let summary = best_angle
                    .zip(best_rssi)
                    .filter(|&(_, rssi)| !is_no_signal(rssi))
                    .map(|(angle, signal)| PeakEstimate { angle, signal });
                SweepEvent::RotationComplete(summary)
            }
            WirePayload::AllAngles { angles, rssi } => {
                if angles.len() != rssi.len() {
                    return Err(DfError::Message(format!(
                        "all_angles from {}: {} angles but {} rssi values",
                        self.board,
                        angles.len(),
                        rssi.len()
                    )));
                }
                let points = angles
                    .into_iter()
                    .zip(rssi)
                    .filter(|&(_, r)| !is_no_signal(r))
                    .map(|(a, r)| SamplePoint::new(a, r))
                    .collect();
                SweepEvent::FinalSweep(points)
            }
            WirePayload::Start => SweepEvent::Command(Command::Start),
            WirePayload::Stop => SweepEvent::Command(Command::Stop),
            WirePayload::Reset => SweepEvent::Command(Command::Reset),
        };
        Ok(Some(BoardMessage::new(self.board, event)))
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| DfError::Message(e.to_string()))
    }
}

fn is_no_signal(rssi: f64) -> bool {
    rssi <= NO_SIGNAL_RSSI
}

/// Parse one line of the wire log
///
/// Blank lines and no-signal samples yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<BoardMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let message: WireMessage =
        serde_json::from_str(line).map_err(|e| DfError::Message(e.to_string()))?;
    message.into_board_message()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> BoardMessage {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_data() {
        let msg = parse(r#"{"board":"board1","topic":"data","angle":30,"rssi":-72.5,"snr":7.25}"#);
        assert_eq!(msg.board, "board1");
        assert_eq!(
            msg.event,
            SweepEvent::Observation(Observation::new(30.0, -72.5).with_snr(7.25))
        );
    }

    #[test]
    fn test_field_aliases() {
        let msg = parse(
            r#"{"board":"board2","topic":"lora/data","servo_angle":12,"signal_strength":-60,"SNR":3}"#,
        );
        assert_eq!(
            msg.event,
            SweepEvent::Observation(Observation::new(12.0, -60.0).with_snr(3.0))
        );

        let msg = parse(r#"{"board":"board2","topic":"data","current_angle":14,"RSSI":-61}"#);
        assert_eq!(
            msg.event,
            SweepEvent::Observation(Observation::new(14.0, -61.0))
        );
    }

    #[test]
    fn test_no_signal_dropped() {
        let line = r#"{"board":"board1","topic":"data","angle":30,"rssi":-999}"#;
        assert_eq!(parse_line(line).unwrap(), None);
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn test_rotation_complete() {
        let msg = parse(r#"{"board":"board1","topic":"rotation/complete","best_angle":90,"best_rssi":-50}"#);
        assert_eq!(
            msg.event,
            SweepEvent::RotationComplete(Some(PeakEstimate {
                angle: 90.0,
                signal: -50.0
            }))
        );

        let msg = parse(r#"{"board":"board1","topic":"rotation_complete"}"#);
        assert_eq!(msg.event, SweepEvent::RotationComplete(None));
    }

    #[test]
    fn test_all_angles() {
        let msg = parse(
            r#"{"board":"board1","topic":"all/angles","angles":[0,2,4],"rssi":[-80,-999,-78]}"#,
        );
        assert_eq!(
            msg.event,
            SweepEvent::FinalSweep(vec![
                SamplePoint::new(0.0, -80.0),
                SamplePoint::new(4.0, -78.0)
            ])
        );
    }

    #[test]
    fn test_all_angles_length_mismatch() {
        let line = r#"{"board":"board1","topic":"all_angles","angles":[0,2],"rssi":[-80]}"#;
        assert!(matches!(parse_line(line), Err(DfError::Message(_))));
    }

    #[test]
    fn test_commands() {
        for (topic, command) in [
            ("start", Command::Start),
            ("stop", Command::Stop),
            ("reset", Command::Reset),
        ] {
            let msg = parse(&format!(r#"{{"board":"board2","topic":"{}"}}"#, topic));
            assert_eq!(msg.event, SweepEvent::Command(command));
        }
    }

    #[test]
    fn test_malformed() {
        assert!(parse_line("not json").is_err());
        assert!(parse_line(r#"{"board":"board1","topic":"weather"}"#).is_err());
        assert!(parse_line(r#"{"topic":"data","angle":1,"rssi":-70}"#).is_err());
        assert!(parse_line(r#"{"board":"board1","topic":"data","angle":1}"#).is_err());
    }

    #[test]
    fn test_encode_uses_canonical_names() {
        let line = WireMessage::observation("board1", &Observation::new(30.0, -72.5))
            .encode()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["topic"], "data");
        assert_eq!(value["board"], "board1");
        assert_eq!(value["rssi"], -72.5);
        assert!(value.get("snr").is_none());

        let line = WireMessage::command("board2", Command::Reset).encode().unwrap();
        assert_eq!(parse(&line).event, SweepEvent::Command(Command::Reset));
    }
}
