//! Immutable sample buffer tagged with its sample rate.

/// An ordered sequence of samples at a fixed sample rate.
///
/// Produced by synthesis and consumed by playback and analysis. A `Waveform`
/// never changes after construction; operations that transform it return a
/// new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f64>,
    sample_rate: f64,
}

impl Waveform {
    /// Wrap a sample vector.
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A zero-filled waveform of `len` samples.
    pub fn silence(len: usize, sample_rate: f64) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Sample data.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Consume the waveform, returning the sample vector.
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the waveform holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate
    }

    /// Time of each sample in seconds, starting at zero.
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.samples.len())
            .map(|i| i as f64 / self.sample_rate)
            .collect()
    }

    /// `(time, sample)` pairs ready for a plotting collaborator.
    pub fn plot_points(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as f64 / self.sample_rate, s))
            .collect()
    }

    /// Largest absolute sample value (0 for an empty waveform).
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }

    /// Return a copy zero-padded at the end to at least `len` samples.
    pub fn padded_to(&self, len: usize) -> Self {
        let mut samples = self.samples.clone();
        if samples.len() < len {
            samples.resize(len, 0.0);
        }
        Self::new(samples, self.sample_rate)
    }

    /// Sample-wise sum of two waveforms; the shorter one is zero-padded.
    pub fn mix(&self, other: &Waveform) -> Self {
        let len = self.len().max(other.len());
        let mut samples = vec![0.0; len];
        for (out, s) in samples.iter_mut().zip(&self.samples) {
            *out += s;
        }
        for (out, s) in samples.iter_mut().zip(&other.samples) {
            *out += s;
        }
        Self::new(samples, self.sample_rate)
    }
}

impl AsRef<[f64]> for Waveform {
    fn as_ref(&self) -> &[f64] {
        &self.samples
    }
}
