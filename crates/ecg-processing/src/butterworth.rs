//! IIR filter design in second-order sections and zero-phase application
//!
//! Butterworth filters are designed from the analog prototype in
//! zero-pole-gain form, moved to the target band, discretised with a
//! pre-warped bilinear transform and split into biquad sections. Running a
//! high order filter as a cascade of biquads keeps it numerically stable.

use ecg_core::{SqiError, SqiResult};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Sample rate used by the normalised bilinear transform (Nyquist = 1)
const NORMALIZED_FS: f64 = 2.0;

/// Poles closer than this to the real axis are treated as real
const REAL_POLE_TOLERANCE: f64 = 1e-12;

/// Relative distance from the band centre below which an analog band-pass
/// pole is taken to sit on it
const CENTRE_TOLERANCE: f64 = 1e-9;

/// Digital zero locations of Butterworth filters
const DC_ZERO: f64 = 1.0;
const NYQUIST_ZERO: f64 = -1.0;

/// Band shape for Butterworth design
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandShape {
    Lowpass { cutoff: f64 },
    Highpass { cutoff: f64 },
    Bandpass { low: f64, high: f64 },
}

/// Single second-order section
///
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadSection {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadSection {
    /// Section from two zeros and two poles (a first-order section passes `None`)
    fn from_roots(zeros: (f64, Option<f64>), poles: (Complex64, Option<Complex64>)) -> Self {
        let (b1, b2) = match zeros {
            (z1, Some(z2)) => (-(z1 + z2), z1 * z2),
            (z1, None) => (-z1, 0.0),
        };
        let (a1, a2) = match poles {
            (p1, Some(p2)) => (-(p1 + p2).re, (p1 * p2).re),
            (p1, None) => (-p1.re, 0.0),
        };
        BiquadSection { b0: 1.0, b1, b2, a1, a2 }
    }

    /// Complex transfer function value at point `z` of the z-plane
    pub fn response_at(&self, z: Complex64) -> Complex64 {
        let z1 = z.inv();
        let z2 = z1 * z1;
        let num = Complex64::new(self.b0, 0.0) + z1 * self.b1 + z2 * self.b2;
        let den = Complex64::new(1.0, 0.0) + z1 * self.a1 + z2 * self.a2;
        num / den
    }

    fn scale_numerator(&mut self, gain: f64) {
        self.b0 *= gain;
        self.b1 *= gain;
        self.b2 *= gain;
    }

    /// Steady-state transposed direct form II state for a unit step input
    fn step_state(&self) -> [f64; 2] {
        let dc_den = 1.0 + self.a1 + self.a2;
        let rhs1 = self.b1 - self.a1 * self.b0;
        let rhs2 = self.b2 - self.a2 * self.b0;
        let z1 = (rhs1 + rhs2) / dc_den;
        let z2 = rhs2 - self.a2 * z1;
        [z1, z2]
    }

    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// Cascade of biquad sections
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<BiquadSection>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadSection>) -> Self {
        SosFilter { sections }
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Effective filter order (first-order sections count once)
    pub fn order(&self) -> usize {
        self.sections
            .iter()
            .map(|s| if s.a2 == 0.0 && s.b2 == 0.0 { 1 } else { 2 })
            .sum()
    }

    /// Magnitude response at `freq_hz` for sampling rate `fs`
    pub fn magnitude_response(&self, freq_hz: f64, fs: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / fs;
        let z = Complex64::from_polar(1.0, omega);
        self.sections
            .iter()
            .map(|s| s.response_at(z))
            .fold(Complex64::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }

    /// Causal filtering with optional per-section initial state
    pub fn filter(&self, input: &[f64], initial: Option<&[[f64; 2]]>) -> Vec<f64> {
        let mut output = input.to_vec();

        for (idx, section) in self.sections.iter().enumerate() {
            let [mut z1, mut z2] = initial.and_then(|state| state.get(idx).copied()).unwrap_or([0.0, 0.0]);

            for sample in output.iter_mut() {
                let x = *sample;
                let y = section.b0 * x + z1;
                z1 = section.b1 * x - section.a1 * y + z2;
                z2 = section.b2 * x - section.a2 * y;
                *sample = y;
            }
        }

        output
    }

    /// Steady-state initial conditions for a unit step, per section
    pub fn step_initial_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|section| {
                let [z1, z2] = section.step_state();
                let state = [z1 * scale, z2 * scale];
                scale *= section.dc_gain();
                state
            })
            .collect()
    }

    /// Edge padding used by forward-backward filtering
    pub fn default_padlen(&self) -> usize {
        let b2_zeros = self.sections.iter().filter(|s| s.b2 == 0.0).count();
        let a2_zeros = self.sections.iter().filter(|s| s.a2 == 0.0).count();
        let taps = 2 * self.sections.len() + 1 - b2_zeros.min(a2_zeros);
        3 * taps
    }

    /// Zero-phase forward-backward filtering with odd edge extension
    ///
    /// The pad length is clamped to `len - 1` so short records are still
    /// filtered instead of rejected.
    pub fn filtfilt(&self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        if n < 2 || self.sections.is_empty() {
            return input.to_vec();
        }

        let padlen = self.default_padlen().min(n - 1);
        let extended = odd_extension(input, padlen);
        let zi = self.step_initial_state();

        let scaled = |x0: f64| -> Vec<[f64; 2]> {
            zi.iter().map(|[a, b]| [a * x0, b * x0]).collect()
        };

        let forward = self.filter(&extended, Some(&scaled(extended[0])));
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let backward_state = scaled(reversed[0]);
        reversed = self.filter(&reversed, Some(&backward_state));
        reversed.reverse();

        reversed[padlen..padlen + n].to_vec()
    }
}

fn odd_extension(input: &[f64], padlen: usize) -> Vec<f64> {
    let n = input.len();
    let first = input[0];
    let last = input[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * padlen);
    extended.extend((1..=padlen).rev().map(|i| 2.0 * first - input[i]));
    extended.extend_from_slice(input);
    extended.extend((1..=padlen).map(|i| 2.0 * last - input[n - 1 - i]));
    extended
}

/// Analog Butterworth prototype poles (unit cutoff)
fn prototype_poles(order: usize) -> Vec<Complex64> {
    (0..order)
        .map(|k| {
            let m = 2.0 * k as f64 - (order as f64 - 1.0);
            -Complex64::from_polar(1.0, PI * m / (2.0 * order as f64))
        })
        .collect()
}

/// Pre-warp a cutoff given as a fraction of Nyquist
fn prewarp(normalized: f64) -> f64 {
    2.0 * NORMALIZED_FS * (PI * normalized / NORMALIZED_FS).tan()
}

fn normalized_cutoff(freq: f64, fs: f64) -> SqiResult<f64> {
    let nyquist = fs / 2.0;
    if !freq.is_finite() || freq <= 0.0 {
        return Err(SqiError::FilterDesign {
            reason: format!("cutoff {} Hz must be strictly positive", freq),
        });
    }
    if freq >= nyquist {
        return Err(SqiError::FilterDesign {
            reason: format!("cutoff {} Hz must be below Nyquist ({} Hz)", freq, nyquist),
        });
    }
    Ok(freq / nyquist)
}

fn bilinear(s: Complex64) -> Complex64 {
    let fs2 = Complex64::new(2.0 * NORMALIZED_FS, 0.0);
    (fs2 + s) / (fs2 - s)
}

/// Design a digital Butterworth filter as second-order sections
pub fn butterworth(order: usize, shape: BandShape, fs: f64) -> SqiResult<SosFilter> {
    if order == 0 {
        return Err(SqiError::FilterDesign {
            reason: "filter order must be at least 1".to_string(),
        });
    }
    if !fs.is_finite() || fs <= 0.0 {
        return Err(SqiError::not_positive("sampling_rate", fs));
    }

    let prototype = prototype_poles(order);
    let mut groups = Vec::with_capacity(order);

    // Reference is a point of the passband where |H| = 1
    let reference = match shape {
        BandShape::Lowpass { cutoff } => {
            let warped = prewarp(normalized_cutoff(cutoff, fs)?);
            let poles: Vec<Complex64> = prototype.iter().map(|p| bilinear(*p * warped)).collect();
            if let Some(odd) = group_band(&poles, NYQUIST_ZERO, &mut groups) {
                groups.push(RootGroup::first_order(odd, NYQUIST_ZERO));
            }
            Complex64::new(1.0, 0.0)
        }
        BandShape::Highpass { cutoff } => {
            let warped = prewarp(normalized_cutoff(cutoff, fs)?);
            let poles: Vec<Complex64> = prototype.iter().map(|p| bilinear(warped / *p)).collect();
            if let Some(odd) = group_band(&poles, DC_ZERO, &mut groups) {
                groups.push(RootGroup::first_order(odd, DC_ZERO));
            }
            Complex64::new(-1.0, 0.0)
        }
        BandShape::Bandpass { low, high } => {
            if low >= high {
                return Err(SqiError::FilterDesign {
                    reason: format!("low cutoff {} Hz must be below high cutoff {} Hz", low, high),
                });
            }
            let warped_low = prewarp(normalized_cutoff(low, fs)?);
            let warped_high = prewarp(normalized_cutoff(high, fs)?);
            let bandwidth = warped_high - warped_low;
            let center = (warped_low * warped_high).sqrt();

            // Each prototype pole splits into a pole below and a pole above the
            // band centre (their product is centre^2). The lower poles form the
            // high-pass half and take the zeros at DC, the upper poles take the
            // zeros at Nyquist.
            let mut below = Vec::with_capacity(order);
            let mut above = Vec::with_capacity(order);
            let mut on_centre = Vec::new();
            for p in &prototype {
                let scaled = *p * (bandwidth / 2.0);
                let offset = (scaled * scaled - center * center).sqrt();
                for analog in [scaled + offset, scaled - offset] {
                    let ratio = analog.norm() / center;
                    let digital = bilinear(analog);
                    if (ratio - 1.0).abs() < CENTRE_TOLERANCE {
                        on_centre.push(digital);
                    } else if ratio < 1.0 {
                        below.push(digital);
                    } else {
                        above.push(digital);
                    }
                }
            }

            let mut mixed: Vec<(Complex64, f64)> = Vec::new();
            if let Some(odd) = group_band(&below, DC_ZERO, &mut groups) {
                mixed.push((odd, DC_ZERO));
            }
            if let Some(odd) = group_band(&above, NYQUIST_ZERO, &mut groups) {
                mixed.push((odd, NYQUIST_ZERO));
            }
            for p in on_centre.iter().filter(|p| p.im > REAL_POLE_TOLERANCE) {
                groups.push(RootGroup {
                    poles: (*p, Some(p.conj())),
                    zeros: (DC_ZERO, Some(NYQUIST_ZERO)),
                });
            }
            let centre_real = on_centre.iter().filter(|p| p.im.abs() <= REAL_POLE_TOLERANCE);
            for (i, p) in centre_real.enumerate() {
                mixed.push((*p, if i % 2 == 0 { DC_ZERO } else { NYQUIST_ZERO }));
            }
            for chunk in mixed.chunks(2) {
                groups.push(RootGroup {
                    poles: (chunk[0].0, chunk.get(1).map(|second| second.0)),
                    zeros: (chunk[0].1, chunk.get(1).map(|second| second.1)),
                });
            }

            bilinear(Complex64::new(0.0, center))
        }
    };

    Ok(SosFilter::new(assemble_sections(groups, reference)))
}

/// Poles of one section together with the zeros placed next to them
#[derive(Debug, Clone, Copy)]
struct RootGroup {
    poles: (Complex64, Option<Complex64>),
    zeros: (f64, Option<f64>),
}

impl RootGroup {
    fn first_order(pole: Complex64, zero: f64) -> Self {
        RootGroup { poles: (pole, None), zeros: (zero, None) }
    }

    fn radius(&self) -> f64 {
        self.poles.1.map_or(self.poles.0.norm(), |second| self.poles.0.norm().max(second.norm()))
    }

    /// Where this section alone has unit gain: Nyquist for a DC-blocking
    /// section, DC for a Nyquist-blocking one, otherwise the filter reference
    fn unit_gain_point(&self, reference: Complex64) -> Complex64 {
        let zeros = [Some(self.zeros.0), self.zeros.1];
        let mut present = zeros.iter().flatten();
        if present.clone().all(|&z| z == DC_ZERO) {
            Complex64::new(-1.0, 0.0)
        } else if present.all(|&z| z == NYQUIST_ZERO) {
            Complex64::new(1.0, 0.0)
        } else {
            reference
        }
    }
}

/// Conjugate pairs and pairs of real poles sharing one zero location; an
/// unpaired real pole is handed back to the caller
fn group_band(poles: &[Complex64], zero: f64, groups: &mut Vec<RootGroup>) -> Option<Complex64> {
    for p in poles.iter().filter(|p| p.im > REAL_POLE_TOLERANCE) {
        groups.push(RootGroup {
            poles: (*p, Some(p.conj())),
            zeros: (zero, Some(zero)),
        });
    }

    let mut real: Vec<f64> = poles
        .iter()
        .filter(|p| p.im.abs() <= REAL_POLE_TOLERANCE)
        .map(|p| p.re)
        .collect();
    real.sort_by(|a, b| a.abs().total_cmp(&b.abs()));

    let mut pairs = real.chunks_exact(2);
    for pair in &mut pairs {
        groups.push(RootGroup {
            poles: (Complex64::new(pair[0], 0.0), Some(Complex64::new(pair[1], 0.0))),
            zeros: (zero, Some(zero)),
        });
    }
    pairs.remainder().first().map(|r| Complex64::new(*r, 0.0))
}

/// Build the cascade: poles closest to the unit circle go last, each
/// section is scaled to unit gain on its own and the residual gain at the
/// reference point is spread evenly over all sections
fn assemble_sections(mut groups: Vec<RootGroup>, reference: Complex64) -> Vec<BiquadSection> {
    groups.sort_by(|a, b| a.radius().total_cmp(&b.radius()));

    let mut sections: Vec<BiquadSection> = groups
        .iter()
        .map(|group| {
            let mut section = BiquadSection::from_roots(group.zeros, group.poles);
            let gain = section.response_at(group.unit_gain_point(reference)).norm();
            if gain > 0.0 && gain.is_finite() {
                section.scale_numerator(1.0 / gain);
            }
            section
        })
        .collect();

    let total = sections
        .iter()
        .map(|s| s.response_at(reference).norm())
        .product::<f64>();
    if total > 0.0 && total.is_finite() && !sections.is_empty() {
        let share = total.powf(-1.0 / sections.len() as f64);
        for section in &mut sections {
            section.scale_numerator(share);
        }
    }
    sections
}

/// Second-order IIR notch centred on `freq` with quality factor `q`
pub fn iir_notch(freq: f64, q: f64, fs: f64) -> SqiResult<SosFilter> {
    if !freq.is_finite() || freq <= 0.0 {
        return Err(SqiError::not_positive("notch_frequency", freq));
    }
    if !q.is_finite() || q <= 0.0 {
        return Err(SqiError::not_positive("notch_q", q));
    }
    normalized_cutoff(freq, fs)?;

    let omega = 2.0 * PI * freq / fs;
    let alpha = omega.sin() / (2.0 * q);
    let cos_omega = omega.cos();
    let a0 = 1.0 + alpha;

    Ok(SosFilter::new(vec![BiquadSection {
        b0: 1.0 / a0,
        b1: -2.0 * cos_omega / a0,
        b2: 1.0 / a0,
        a1: -2.0 * cos_omega / a0,
        a2: (1.0 - alpha) / a0,
    }]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highpass_section_layout() {
        let sos = butterworth(75, BandShape::Highpass { cutoff: 0.67 }, 200.0).unwrap();
        assert_eq!(sos.section_count(), 38);
        assert_eq!(sos.order(), 75);
    }

    #[test]
    fn test_bandpass_section_layout() {
        let sos = butterworth(75, BandShape::Bandpass { low: 0.67, high: 100.0 }, 500.0).unwrap();
        assert_eq!(sos.section_count(), 75);
        assert_eq!(sos.order(), 150);
    }

    #[test]
    fn test_lowpass_response() {
        let sos = butterworth(4, BandShape::Lowpass { cutoff: 40.0 }, 500.0).unwrap();
        assert!((sos.magnitude_response(0.0, 500.0) - 1.0).abs() < 1e-9);
        // -3 dB at the cutoff
        assert!((sos.magnitude_response(40.0, 500.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!(sos.magnitude_response(200.0, 500.0) < 1e-3);
    }

    #[test]
    fn test_highpass_response() {
        let sos = butterworth(75, BandShape::Highpass { cutoff: 0.67 }, 200.0).unwrap();
        assert!((sos.magnitude_response(10.0, 200.0) - 1.0).abs() < 1e-6);
        assert!((sos.magnitude_response(0.67, 200.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-4);
        assert!(sos.magnitude_response(0.3, 200.0) < 1e-6);
    }

    #[test]
    fn test_bandpass_response() {
        let sos = butterworth(75, BandShape::Bandpass { low: 0.67, high: 100.0 }, 500.0).unwrap();
        assert!((sos.magnitude_response(10.0, 500.0) - 1.0).abs() < 1e-6);
        assert!(sos.magnitude_response(0.3, 500.0) < 1e-6);
        assert!(sos.magnitude_response(150.0, 500.0) < 1e-6);
    }

    fn sine(freq: f64, fs: f64, seconds: f64) -> Vec<f64> {
        (0..(seconds * fs) as usize)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_bandpass_zeros_follow_their_poles() {
        let sos = butterworth(75, BandShape::Bandpass { low: 0.67, high: 100.0 }, 500.0).unwrap();
        let dc_blocking = sos.sections().iter().filter(|s| (s.b1 / s.b0 + 2.0).abs() < 1e-9).count();
        let nyquist_blocking = sos.sections().iter().filter(|s| (s.b1 / s.b0 - 2.0).abs() < 1e-9).count();
        // 37 sections per band edge plus the one holding both odd poles
        assert_eq!(dc_blocking, 37);
        assert_eq!(nyquist_blocking, 37);
    }

    #[test]
    fn test_bandpass_cascade_stays_bounded() {
        for fs in [250.0, 360.0, 500.0, 1000.0] {
            let sos = butterworth(75, BandShape::Bandpass { low: 0.67, high: 100.0 }, fs).unwrap();
            let mut stage = sine(10.0, fs, 20.0);
            for section in sos.sections() {
                stage = SosFilter::new(vec![*section]).filter(&stage, None);
                let peak = stage.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
                assert!(peak.is_finite() && peak < 1e3, "fs {} stage peak {}", fs, peak);
            }
        }
    }

    #[test]
    fn test_bandpass_filtfilt_passes_in_band_tone() {
        for fs in [250.0, 360.0, 500.0, 1000.0] {
            let sos = butterworth(75, BandShape::Bandpass { low: 0.67, high: 100.0 }, fs).unwrap();
            assert!((sos.magnitude_response(10.0, fs) - 1.0).abs() < 1e-6);

            let input = sine(10.0, fs, 20.0);
            let output = sos.filtfilt(&input);
            assert!(output.iter().all(|v| v.is_finite()));

            let n = input.len();
            let error = (n / 4..3 * n / 4)
                .map(|i| (output[i] - input[i]).abs())
                .fold(0.0_f64, f64::max);
            assert!(error < 0.1, "fs {} mid-record error {}", fs, error);
        }
    }

    #[test]
    fn test_design_rejects_bad_cutoffs() {
        assert!(matches!(
            butterworth(4, BandShape::Lowpass { cutoff: 300.0 }, 500.0),
            Err(SqiError::FilterDesign { .. })
        ));
        assert!(matches!(
            butterworth(4, BandShape::Bandpass { low: 40.0, high: 10.0 }, 500.0),
            Err(SqiError::FilterDesign { .. })
        ));
        assert!(butterworth(0, BandShape::Highpass { cutoff: 1.0 }, 500.0).is_err());
    }

    #[test]
    fn test_filtfilt_removes_offset() {
        let sos = butterworth(4, BandShape::Highpass { cutoff: 1.0 }, 250.0).unwrap();
        let input = vec![3.5; 2000];
        let output = sos.filtfilt(&input);

        assert_eq!(output.len(), input.len());
        assert!(output.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_filtfilt_is_zero_phase() {
        // An in-band sinusoid passes through with no shift
        let fs = 250.0;
        let sos = butterworth(4, BandShape::Bandpass { low: 1.0, high: 40.0 }, fs).unwrap();
        let input: Vec<f64> = (0..2500)
            .map(|i| (2.0 * PI * 8.0 * i as f64 / fs).sin())
            .collect();
        let output = sos.filtfilt(&input);

        for i in 500..2000 {
            assert!((output[i] - input[i]).abs() < 1e-2, "sample {} drifted", i);
        }
    }

    #[test]
    fn test_filtfilt_short_input() {
        let sos = butterworth(75, BandShape::Highpass { cutoff: 0.67 }, 200.0).unwrap();
        assert_eq!(sos.filtfilt(&[1.0]).len(), 1);
        assert_eq!(sos.filtfilt(&[1.0, 2.0, 3.0]).len(), 3);
    }

    #[test]
    fn test_notch_attenuates_target() {
        let sos = iir_notch(50.0, 30.0, 500.0).unwrap();
        assert!(sos.magnitude_response(50.0, 500.0) < 1e-9);
        assert!((sos.magnitude_response(10.0, 500.0) - 1.0).abs() < 1e-2);

        assert!(matches!(
            iir_notch(0.0, 30.0, 500.0),
            Err(SqiError::InvalidParameter { .. })
        ));
        assert!(matches!(
            iir_notch(300.0, 30.0, 500.0),
            Err(SqiError::FilterDesign { .. })
        ));
    }
}
