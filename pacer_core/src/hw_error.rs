//! Maps `Box<dyn Error>` from trait boundaries to typed `PacerError`.
//!
//! The traits in `pacer_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `pacer_hardware::HwError` downcasting.

use crate::error::PacerError;

/// Map a trait-boundary error to a typed `PacerError`.
///
/// Known hardware error types are downcast first; anything else is carried
/// as a plain hardware error with its message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PacerError {
    #[cfg(feature = "hardware-errors")]
    {
        use pacer_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Io(_) => PacerError::Hardware(hw.to_string()),
                other => PacerError::HardwareFault(other.to_string()),
            };
        }
    }

    PacerError::Hardware(e.to_string())
}

/// Convert a boxed trait-boundary error into a report carrying the typed error.
#[inline]
pub(crate) fn hw_report(e: Box<dyn std::error::Error + Send + Sync>) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_keep_message() {
        let e = std::io::Error::other("bus glitch");
        match map_hw_error(&e) {
            PacerError::Hardware(msg) => assert!(msg.contains("bus glitch")),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_faults_are_typed() {
        let e = pacer_hardware::HwError::Actuator("stalled driver".into());
        assert!(matches!(map_hw_error(&e), PacerError::HardwareFault(_)));
    }
}
