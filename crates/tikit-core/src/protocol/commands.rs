//! Protocol commands
//!
//! Payloads understood by the kit board firmware. The driver itself treats
//! frames as opaque bytes; these types are for callers that want to build or
//! recognise the well-known ones.

use serde::{Deserialize, Serialize};

/// Commands the host sends to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardCommand {
    /// Switch the light on ("light_on")
    LightOn,

    /// Switch the light off ("light_off")
    LightOff,

    /// Abort a running timer ("cancel_timer")
    CancelTimer,

    /// Start or update the timer ("timer=<milliseconds>")
    SetTimer(u64),

    /// Stop using the ambient light sensor ("ignore_ambient_light")
    IgnoreAmbientLight,

    /// Take ambient light into account ("factor_ambient_light")
    FactorAmbientLight,
}

impl BoardCommand {
    /// Light command for the wanted state
    pub fn light(on: bool) -> Self {
        if on {
            BoardCommand::LightOn
        } else {
            BoardCommand::LightOff
        }
    }

    /// Frame payload, without terminator
    pub fn to_payload(&self) -> Vec<u8> {
        match self {
            BoardCommand::LightOn => b"light_on".to_vec(),
            BoardCommand::LightOff => b"light_off".to_vec(),
            BoardCommand::CancelTimer => b"cancel_timer".to_vec(),
            BoardCommand::SetTimer(ms) => format!("timer={}", ms).into_bytes(),
            BoardCommand::IgnoreAmbientLight => b"ignore_ambient_light".to_vec(),
            BoardCommand::FactorAmbientLight => b"factor_ambient_light".to_vec(),
        }
    }
}

/// Frames the board pushes to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// Board asks for the stored timer length ("load_timer_data")
    LoadTimerData,

    /// Timer ran out ("timer_finished")
    TimerFinished,

    /// Current timer value reported by the board ("timer=<value>")
    Timer(u64),

    /// Anything else, kept verbatim
    Unknown(Vec<u8>),
}

impl BoardEvent {
    /// Classify a received payload (terminator already stripped)
    pub fn parse(payload: &[u8]) -> Self {
        match payload {
            b"load_timer_data" => BoardEvent::LoadTimerData,
            b"timer_finished" => BoardEvent::TimerFinished,
            _ => payload
                .strip_prefix(b"timer=")
                .and_then(|v| std::str::from_utf8(v).ok())
                .and_then(|v| v.parse().ok())
                .map(BoardEvent::Timer)
                .unwrap_or_else(|| BoardEvent::Unknown(payload.to_vec())),
        }
    }
}

/// Convert fractional hours to whole milliseconds, truncating
pub fn hours_to_millis(hours: f64) -> u64 {
    (hours * 60.0 * 60.0 * 1000.0) as u64
}

/// Convert an hours/minutes/seconds duration to milliseconds
pub fn hms_to_millis(hours: u32, minutes: u32, seconds: u32) -> u64 {
    let total_seconds = u64::from(hours) * 3600 + u64::from(minutes) * 60 + u64::from(seconds);
    total_seconds * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_payloads() {
        assert_eq!(BoardCommand::LightOn.to_payload(), b"light_on".to_vec());
        assert_eq!(BoardCommand::light(false).to_payload(), b"light_off".to_vec());
        assert_eq!(
            BoardCommand::SetTimer(21_600_000).to_payload(),
            b"timer=21600000".to_vec()
        );
        assert_eq!(
            BoardCommand::FactorAmbientLight.to_payload(),
            b"factor_ambient_light".to_vec()
        );
    }

    #[test]
    fn test_event_parse() {
        assert_eq!(BoardEvent::parse(b"load_timer_data"), BoardEvent::LoadTimerData);
        assert_eq!(BoardEvent::parse(b"timer_finished"), BoardEvent::TimerFinished);
        assert_eq!(BoardEvent::parse(b"timer=5000"), BoardEvent::Timer(5000));
    }

    #[test]
    fn test_event_parse_unknown() {
        assert_eq!(
            BoardEvent::parse(b"timer=soon"),
            BoardEvent::Unknown(b"timer=soon".to_vec())
        );
        assert_eq!(BoardEvent::parse(b""), BoardEvent::Unknown(Vec::new()));
    }

    #[test]
    fn test_duration_helpers() {
        assert_eq!(hours_to_millis(6.0), 21_600_000);
        assert_eq!(hours_to_millis(0.5), 1_800_000);
        assert_eq!(hms_to_millis(6, 0, 0), 21_600_000);
        assert_eq!(hms_to_millis(0, 1, 30), 90_000);
    }
}
