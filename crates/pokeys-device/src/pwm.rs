//! PWM channel mirror and duty conversion.

use pokeys_core::PwmChannel;
use pokeys_core::constants::PWM_CHANNEL_COUNT;
use pokeys_hardware::{HardwareError, Result};

/// Configuration for one PWM channel, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwmSpec {
    pub channel: PwmChannel,
    pub name: String,
    pub description: String,
    pub units: String,
    /// Duty at fraction 0.0, in controller clock cycles.
    pub left_duty: u32,
    /// Duty at fraction 1.0, in controller clock cycles.
    pub right_duty: u32,
    pub period: u32,
}

/// Mirror of one configured PWM channel.
///
/// Duties are stored in hardware units; the host's fraction is converted at
/// command time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwmChannelState {
    pub channel: PwmChannel,
    pub left_duty: u32,
    pub right_duty: u32,
    pub period: u32,
    pub name: String,
    pub description: String,
    pub units: String,
    /// Number of the most recent pulse started on this channel.
    pub pulse: u64,
}

impl PwmChannelState {
    pub fn new(spec: &PwmSpec) -> Self {
        Self {
            channel: spec.channel,
            left_duty: spec.left_duty,
            right_duty: spec.right_duty,
            period: spec.period,
            name: spec.name.clone(),
            description: spec.description.clone(),
            units: spec.units.clone(),
            pulse: 0,
        }
    }

    /// Duty for a fraction between the left and right bounds.
    ///
    /// The fraction is clamped to `[0.0, 1.0]`; NaN and infinities are
    /// rejected.
    ///
    /// ```
    /// use pokeys_core::PwmChannel;
    /// use pokeys_device::pwm::{PwmChannelState, PwmSpec};
    ///
    /// let state = PwmChannelState::new(&PwmSpec {
    ///     channel: PwmChannel::new(0).unwrap(),
    ///     name: "FLAPS".into(),
    ///     description: String::new(),
    ///     units: String::new(),
    ///     left_duty: 2000,
    ///     right_duty: 1000,
    ///     period: 25000,
    /// });
    /// assert_eq!(state.duty_for(0.0).unwrap(), 2000);
    /// assert_eq!(state.duty_for(0.25).unwrap(), 1750);
    /// assert_eq!(state.duty_for(1.5).unwrap(), 1000);
    /// ```
    pub fn duty_for(&self, fraction: f32) -> Result<u32> {
        if !fraction.is_finite() {
            return Err(HardwareError::invalid_value(format!(
                "PWM fraction for {} must be finite, got {fraction}",
                self.name
            )));
        }
        let fraction = f64::from(fraction).clamp(0.0, 1.0);
        let left = f64::from(self.left_duty);
        let right = f64::from(self.right_duty);
        Ok((left - (left - right) * fraction) as u32)
    }
}

/// All configured PWM channels of one device.
#[derive(Debug, Clone, Default)]
pub struct PwmBank {
    channels: [Option<PwmChannelState>; PWM_CHANNEL_COUNT],
}

impl PwmBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a channel, replacing any earlier configuration. The pulse
    /// counter carries over so turn-offs queued before still see a newer
    /// pulse.
    pub fn configure(&mut self, mut state: PwmChannelState) -> Option<PwmChannelState> {
        let index = state.channel.index();
        if let Some(previous) = &self.channels[index] {
            state.pulse = previous.pulse;
        }
        self.channels[index].replace(state)
    }

    /// Start a new pulse on `channel` and return its number.
    pub fn begin_pulse(&mut self, channel: PwmChannel) -> Option<u64> {
        let state = self.channels[channel.index()].as_mut()?;
        state.pulse += 1;
        Some(state.pulse)
    }

    /// Whether `pulse` is still the latest pulse started on `channel`.
    pub fn is_latest_pulse(&self, channel: PwmChannel, pulse: u64) -> bool {
        self.get(channel).is_some_and(|state| state.pulse == pulse)
    }

    pub fn get(&self, channel: PwmChannel) -> Option<&PwmChannelState> {
        self.channels[channel.index()].as_ref()
    }

    pub fn configured(&self) -> impl Iterator<Item = &PwmChannelState> {
        self.channels.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn state(left: u32, right: u32) -> PwmChannelState {
        PwmChannelState::new(&PwmSpec {
            channel: PwmChannel::new(2).unwrap(),
            name: "TRIM".to_string(),
            description: "trim wheel".to_string(),
            units: "percent".to_string(),
            left_duty: left,
            right_duty: right,
            period: 25_000,
        })
    }

    #[rstest]
    #[case(0.0, 3000)]
    #[case(0.5, 2000)]
    #[case(1.0, 1000)]
    #[case(-0.5, 3000)]
    #[case(7.0, 1000)]
    fn test_duty_interpolates_between_bounds(#[case] fraction: f32, #[case] expected: u32) {
        assert_eq!(state(3000, 1000).duty_for(fraction).unwrap(), expected);
    }

    #[test]
    fn test_rising_bounds() {
        assert_eq!(state(1000, 3000).duty_for(0.5).unwrap(), 2000);
    }

    #[rstest]
    #[case(f32::NAN)]
    #[case(f32::INFINITY)]
    #[case(f32::NEG_INFINITY)]
    fn test_non_finite_fraction_rejected(#[case] fraction: f32) {
        let err = state(3000, 1000).duty_for(fraction).unwrap_err();
        assert!(matches!(err, HardwareError::InvalidValue { .. }));
    }

    #[test]
    fn test_bank_replaces_channel() {
        let mut bank = PwmBank::new();
        assert!(bank.configure(state(3000, 1000)).is_none());
        let previous = bank.configure(state(4000, 1000)).unwrap();
        assert_eq!(previous.left_duty, 3000);
        assert_eq!(bank.get(PwmChannel::new(2).unwrap()).unwrap().left_duty, 4000);
        assert_eq!(bank.configured().count(), 1);
    }

    #[test]
    fn test_newer_pulse_supersedes_older() {
        let mut bank = PwmBank::new();
        let channel = PwmChannel::new(2).unwrap();
        assert_eq!(bank.begin_pulse(channel), None);

        bank.configure(state(3000, 1000));
        let first = bank.begin_pulse(channel).unwrap();
        assert!(bank.is_latest_pulse(channel, first));

        let second = bank.begin_pulse(channel).unwrap();
        assert!(!bank.is_latest_pulse(channel, first));
        assert!(bank.is_latest_pulse(channel, second));

        bank.configure(state(4000, 1000));
        assert!(!bank.is_latest_pulse(channel, first));
        assert!(bank.is_latest_pulse(channel, second));
    }
}
