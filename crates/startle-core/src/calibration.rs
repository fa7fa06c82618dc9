//! Sound level calibration.
//!
//! Output voltage is anchored to a measured point: driving the conditioning
//! speaker with [`REF_VOLTS`] produces [`REF_CONDITIONING_DB`] dB SPL, and the
//! startle speaker produces [`REF_STARTLE_DB`] dB SPL at the same voltage.
//! Every other level follows from the 20·log10 voltage law.

/// Level (dB SPL) measured on the conditioning speaker at [`REF_VOLTS`].
pub const REF_CONDITIONING_DB: f64 = 86.0;

/// Level (dB SPL) measured on the startle speaker at [`REF_VOLTS`].
pub const REF_STARTLE_DB: f64 = 100.0;

/// Drive voltage of the calibration measurement.
pub const REF_VOLTS: f64 = 2.0;

/// Which loudspeaker a stimulus is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputChannel {
    /// Channel 0: background/conditioning speaker (also carries prepulses and gaps).
    #[default]
    Conditioning,
    /// Channel 1: startle speaker.
    Startle,
}

impl OutputChannel {
    /// Map a numeric channel index; 1 is the startle speaker, anything else
    /// uses the conditioning calibration.
    pub fn from_index(index: usize) -> Self {
        if index == 1 {
            OutputChannel::Startle
        } else {
            OutputChannel::Conditioning
        }
    }

    /// Numeric channel index.
    pub fn index(self) -> usize {
        match self {
            OutputChannel::Conditioning => 0,
            OutputChannel::Startle => 1,
        }
    }
}

/// Calibration constants for both output channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Drive voltage at which the reference levels were measured.
    pub reference_volts: f64,
    /// Measured level of the conditioning speaker at `reference_volts`.
    pub conditioning_reference_db: f64,
    /// Measured level of the startle speaker at `reference_volts`.
    pub startle_reference_db: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            reference_volts: REF_VOLTS,
            conditioning_reference_db: REF_CONDITIONING_DB,
            startle_reference_db: REF_STARTLE_DB,
        }
    }
}

impl Calibration {
    /// Reference dB for a channel.
    pub fn reference_db(&self, channel: OutputChannel) -> f64 {
        match channel {
            OutputChannel::Conditioning => self.conditioning_reference_db,
            OutputChannel::Startle => self.startle_reference_db,
        }
    }

    /// Linear gain (volts per unit amplitude) that yields `level_db` on `channel`.
    ///
    /// `gain = ref_volts / 10^(ref_db/20) · 10^(level_db/20)`
    pub fn gain_for_level(&self, level_db: f64, channel: OutputChannel) -> f64 {
        let zero_ref_gain = self.reference_volts / 10f64.powf(self.reference_db(channel) / 20.0);
        zero_ref_gain * 10f64.powf(level_db / 20.0)
    }
}

/// [`Calibration::gain_for_level`] with the default calibration constants.
pub fn gain_for_level(level_db: f64, channel: OutputChannel) -> f64 {
    Calibration::default().gain_for_level(level_db, channel)
}
