//! Maps `Box<dyn Error>` from trait boundaries to typed `TrackerError`.
//!
//! The traits in `linebot_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `linebot_hardware::HwError`.

use crate::error::TrackerError;

/// Map a trait-boundary error to a typed `TrackerError`.
///
/// Known hardware error types are downcast first; anything else becomes
/// `TrackerError::Hardware` carrying the display text.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TrackerError {
    #[cfg(feature = "hardware-errors")]
    {
        use linebot_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Gpio(_) | HwError::Pwm(_) => TrackerError::HardwareFault(hw.to_string()),
                other => TrackerError::Hardware(other.to_string()),
            };
        }
    }

    TrackerError::Hardware(e.to_string())
}

/// Convenience: lift a boxed trait-boundary error into an `eyre::Report`.
pub(crate) fn report(e: Box<dyn std::error::Error + Send + Sync>) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}
