//! Second-order IIR sections.
//!
//! High-order filters (the elliptic band filters used for noise shaping and
//! response analysis) are run as a cascade of biquads rather than a single
//! direct-form polynomial, which keeps a 10th-order band-pass numerically
//! stable in double precision.

use core::f64::consts::PI;

/// Second-order IIR filter section.
///
/// Implements the Direct Form I structure:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Creates a passthrough section.
    pub fn new() -> Self {
        Self::from_coefficients([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    }

    /// Creates a section from `[b0, b1, b2, a0, a1, a2]`, normalizing by `a0`.
    pub fn from_coefficients(coeffs: [f64; 6]) -> Self {
        let mut biquad = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        let [b0, b1, b2, a0, a1, a2] = coeffs;
        biquad.set_coefficients(b0, b1, b2, a0, a1, a2);
        biquad
    }

    /// Sets the coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Normalized coefficients as `[b0, b1, b2, 1, a1, a2]`.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.b0, self.b1, self.b2, 1.0, self.a1, self.a2]
    }

    /// Scale the feedforward coefficients.
    pub fn scale(&mut self, gain: f64) {
        self.b0 *= gain;
        self.b1 *= gain;
        self.b2 *= gain;
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Clears the delay lines.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Complex response `H(e^{jω})` as `(re, im)` at `omega` radians/sample.
    fn response(&self, omega: f64) -> (f64, f64) {
        // z^-1 = e^{-jω}
        let (c1, s1) = (omega.cos(), -omega.sin());
        let (c2, s2) = ((2.0 * omega).cos(), -(2.0 * omega).sin());
        let num = (self.b0 + self.b1 * c1 + self.b2 * c2, self.b1 * s1 + self.b2 * s2);
        let den = (1.0 + self.a1 * c1 + self.a2 * c2, self.a1 * s1 + self.a2 * s2);
        let den_mag = den.0 * den.0 + den.1 * den.1;
        (
            (num.0 * den.0 + num.1 * den.1) / den_mag,
            (num.1 * den.0 - num.0 * den.1) / den_mag,
        )
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// Cascade of second-order sections.
///
/// The overall gain is folded into the first section, so the cascade is
/// exactly the product of its sections.
///
/// # Example
///
/// ```rust
/// use startle_core::SosFilter;
///
/// // Two-point moving average as a single section
/// let sos = SosFilter::from_sections(&[[0.5, 0.5, 0.0, 1.0, 0.0, 0.0]]);
/// assert_eq!(sos.filter(&[1.0, 1.0, 1.0]), vec![0.5, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SosFilter {
    sections: Vec<Biquad>,
}

impl SosFilter {
    /// Builds a cascade from `[b0, b1, b2, a0, a1, a2]` rows.
    pub fn from_sections(sections: &[[f64; 6]]) -> Self {
        Self {
            sections: sections.iter().copied().map(Biquad::from_coefficients).collect(),
        }
    }

    /// Builds a cascade from existing sections.
    pub fn new(sections: Vec<Biquad>) -> Self {
        Self { sections }
    }

    /// The sections in processing order.
    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Filter order (two per section).
    pub fn order(&self) -> usize {
        self.sections.len() * 2
    }

    /// Processes one sample through every section in turn.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.sections.iter_mut().fold(input, |x, s| s.process(x))
    }

    /// Clears every section's state.
    pub fn reset(&mut self) {
        for s in &mut self.sections {
            s.clear();
        }
    }

    /// Causal forward filter of a whole buffer from zero initial state.
    ///
    /// The output has the same length as the input. `self` is left untouched.
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let mut cascade = self.clone();
        cascade.reset();
        signal.iter().map(|&x| cascade.process(x)).collect()
    }

    /// Magnitude response at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate;
        let (re, im) = self
            .sections
            .iter()
            .map(|s| s.response(omega))
            .fold((1.0, 0.0), |(ar, ai), (br, bi)| {
                (ar * br - ai * bi, ar * bi + ai * br)
            });
        (re * re + im * im).sqrt()
    }
}
