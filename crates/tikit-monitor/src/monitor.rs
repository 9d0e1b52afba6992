//! Polling loop body
//!
//! One call to [`tick`] per second keeps the board connected and answers its
//! requests for the stored timer length.

use tikit_core::protocol::{BoardCommand, BoardEvent};
use tikit_core::storage::TIMER_LENGTH_KEY;
use tikit_core::BoardDriver;

/// Timer length used when nothing is stored yet (six hours)
pub const DEFAULT_TIMER_MS: u64 = 6 * 60 * 60 * 1000;

/// What happened during one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// Board absent; a single reconnect attempt was made
    Disconnected {
        /// Whether that attempt succeeded
        reconnected: bool,
    },
    /// Connected, nothing received
    Idle,
    /// Connected and a frame was handled
    Received(BoardEvent),
}

/// Store the default timer length unless one is already stored
pub fn seed_defaults(driver: &mut BoardDriver) {
    if driver.get_value(TIMER_LENGTH_KEY).is_none() {
        driver.set_value(TIMER_LENGTH_KEY, DEFAULT_TIMER_MS);
    }
}

/// Run one polling step
pub fn tick(driver: &mut BoardDriver) -> TickReport {
    if !driver.is_board_connected() {
        let reconnected = driver.connect_with_retries(Some(1)).is_connected();
        if reconnected {
            seed_defaults(driver);
        }
        return TickReport::Disconnected { reconnected };
    }

    let Some(frame) = driver.read() else {
        return TickReport::Idle;
    };

    let event = BoardEvent::parse(&frame);
    match &event {
        BoardEvent::LoadTimerData => {
            let timer_ms = driver
                .get_value_as::<u64>(TIMER_LENGTH_KEY)
                .unwrap_or(DEFAULT_TIMER_MS);
            tracing::info!("Board requested timer data, sending {}ms", timer_ms);
            driver.send(&BoardCommand::SetTimer(timer_ms).to_payload());
        }
        BoardEvent::TimerFinished => tracing::info!("Board timer finished"),
        BoardEvent::Timer(ms) => tracing::info!("Board timer at {}ms", ms),
        BoardEvent::Unknown(raw) => {
            tracing::debug!("Ignoring frame {:?}", String::from_utf8_lossy(raw))
        }
    }
    TickReport::Received(event)
}
