//! Elliptic (Cauer) band-pass design.
//!
//! Design runs in the zero/pole/gain domain:
//!
//! 1. [`ellipord_bandpass`] picks the minimum analog prototype order that meets
//!    the ripple and attenuation targets for the given digital band edges.
//! 2. [`ellip_prototype`] builds the normalized low-pass prototype from Jacobi
//!    elliptic functions.
//! 3. The prototype is shifted to a band-pass around the pre-warped edges and
//!    mapped to the z-plane with the bilinear transform.
//! 4. Roots are grouped into conjugate pairs and emitted as second-order
//!    sections.
//!
//! Band edges are normalized so that 1.0 is the Nyquist frequency.

use rustfft::num_complex::Complex;
use startle_core::{Biquad, DspError, Result, SosFilter};
use std::f64::consts::PI;

type C64 = Complex<f64>;

const MACHEP: f64 = 1.11022302462515654042e-16;
const ROOT_EPS: f64 = 2e-16;
const ARC_JAC_SN_MAXITER: usize = 10;

/// Zeros, poles and gain of a transfer function.
#[derive(Debug, Clone, PartialEq)]
pub struct Zpk {
    /// Zeros.
    pub zeros: Vec<C64>,
    /// Poles.
    pub poles: Vec<C64>,
    /// Overall gain.
    pub gain: f64,
}

// ---------------------------------------------------------------------------
// Elliptic integrals and functions
// ---------------------------------------------------------------------------

fn agm(mut a: f64, mut b: f64) -> f64 {
    for _ in 0..64 {
        if (a - b).abs() <= f64::EPSILON * a.abs() {
            break;
        }
        let next = (a + b) / 2.0;
        b = (a * b).sqrt();
        a = next;
    }
    (a + b) / 2.0
}

/// Complete elliptic integral of the first kind, parameter `m = k²`.
pub fn ellipk(m: f64) -> f64 {
    if m >= 1.0 {
        return f64::INFINITY;
    }
    PI / (2.0 * agm(1.0, (1.0 - m).sqrt()))
}

/// `K(1 - p)`, accurate for small `p`.
pub fn ellipkm1(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::INFINITY;
    }
    PI / (2.0 * agm(1.0, p.sqrt()))
}

/// Jacobi elliptic functions `(sn, cn, dn)` of real argument `u`, parameter `m`.
pub fn ellipj(u: f64, m: f64) -> (f64, f64, f64) {
    if !(0.0..=1.0).contains(&m) || m.is_nan() {
        return (f64::NAN, f64::NAN, f64::NAN);
    }

    if m < 1e-9 {
        let t = u.sin();
        let b = u.cos();
        let ai = 0.25 * m * (u - t * b);
        return (t - ai * b, b + ai * t, 1.0 - 0.5 * m * t * t);
    }

    if m >= 0.9999999999 {
        let mut ai = 0.25 * (1.0 - m);
        let b = u.cosh();
        let t = u.tanh();
        let phi = 1.0 / b;
        let twon = b * u.sinh();
        let sn = t + ai * (twon - u) / (b * b);
        ai *= t * phi;
        let cn = phi - ai * (twon - u);
        let dn = phi + ai * (twon + u);
        return (sn, cn, dn);
    }

    // Arithmetic-geometric mean descent
    let mut a = [0.0; 9];
    let mut c = [0.0; 9];
    a[0] = 1.0;
    let mut b = (1.0 - m).sqrt();
    c[0] = m.sqrt();
    let mut twon = 1.0;
    let mut i = 0;

    while (c[i] / a[i]).abs() > MACHEP {
        if i > 7 {
            break;
        }
        let ai = a[i];
        i += 1;
        c[i] = (ai - b) / 2.0;
        let t = (ai * b).sqrt();
        a[i] = (ai + b) / 2.0;
        b = t;
        twon *= 2.0;
    }

    // Backward recurrence
    let mut phi = twon * a[i] * u;
    let mut prev = phi;
    while i > 0 {
        let t = c[i] * phi.sin() / a[i];
        prev = phi;
        phi = (t.asin() + phi) / 2.0;
        i -= 1;
    }

    let sn = phi.sin();
    let cn = phi.cos();
    let dn = cn / (phi - prev).cos();
    (sn, cn, dn)
}

/// Solve the degree equation: the modulus `m` such that an order-`n` filter
/// with selectivity parameter `m1` is exactly realizable.
fn ellipdeg(n: usize, m1: f64) -> f64 {
    let k1 = ellipk(m1);
    let k1p = ellipkm1(m1);
    let q1 = (-PI * k1p / k1).exp();
    let q = q1.powf(1.0 / n as f64);

    let num: f64 = (0..=7).map(|m: i32| q.powi(m * (m + 1))).sum();
    let den: f64 = 1.0 + 2.0 * (1..=8).map(|m: i32| q.powi(m * m)).sum::<f64>();
    16.0 * q * (num / den).powi(4)
}

fn complement(k: C64) -> C64 {
    ((C64::new(1.0, 0.0) - k) * (C64::new(1.0, 0.0) + k)).sqrt()
}

/// Inverse Jacobi `sn` for complex argument, by descending Landen transform.
fn arc_jac_sn(w: C64, m: f64) -> Result<C64> {
    let k = m.sqrt();
    if k > 1.0 || k.is_nan() {
        return Err(DspError::filter_spec(format!("elliptic modulus {m} out of range")));
    }
    if k == 1.0 {
        return Ok(w.atanh());
    }

    let mut ks = vec![k];
    while *ks.last().unwrap_or(&0.0) != 0.0 {
        if ks.len() > ARC_JAC_SN_MAXITER {
            return Err(DspError::filter_spec("Landen sequence did not converge"));
        }
        let kn = ks[ks.len() - 1];
        let kp = complement(C64::new(kn, 0.0)).re;
        ks.push((1.0 - kp) / (1.0 + kp));
    }

    let capk: f64 = ks[1..].iter().map(|kn| 1.0 + kn).product::<f64>() * PI / 2.0;

    let mut wn = w;
    for pair in ks.windows(2) {
        let (kn, knext) = (pair[0], pair[1]);
        wn = wn * 2.0 / ((1.0 + knext) * (C64::new(1.0, 0.0) + complement(wn * kn)));
    }

    Ok(wn.asin() * (2.0 / PI) * capk)
}

/// Real inverse of `sc(w, m)`, the Jacobi `sn/cn`, via `sn(i·w)`.
fn arc_jac_sc1(w: f64, m: f64) -> Result<f64> {
    let z = arc_jac_sn(C64::new(0.0, w), m)?;
    if z.re.abs() > 1e-14 {
        return Err(DspError::filter_spec("inverse sc did not land on the imaginary axis"));
    }
    Ok(z.im)
}

fn pow10m1(x: f64) -> f64 {
    // 10^x - 1 without cancellation for small x
    (x * std::f64::consts::LN_10).exp_m1()
}

// ---------------------------------------------------------------------------
// Order selection and prototype
// ---------------------------------------------------------------------------

/// Minimum elliptic order for a digital band-pass.
///
/// # Arguments
///
/// * `wp` - Passband edges `[low, high]`, normalized to Nyquist
/// * `ws` - Stopband edges `[low, high]`, normalized to Nyquist, enclosing `wp`
/// * `gpass` - Maximum passband loss in dB
/// * `gstop` - Minimum stopband attenuation in dB
pub fn ellipord_bandpass(wp: [f64; 2], ws: [f64; 2], gpass: f64, gstop: f64) -> Result<usize> {
    validate_edges(wp, ws)?;
    if gpass <= 0.0 || gstop <= gpass {
        return Err(DspError::filter_spec(format!(
            "ripple {gpass} dB / attenuation {gstop} dB are not a valid pair"
        )));
    }

    let passb = [(PI * wp[0] / 2.0).tan(), (PI * wp[1] / 2.0).tan()];
    let stopb = [(PI * ws[0] / 2.0).tan(), (PI * ws[1] / 2.0).tan()];

    let nat = stopb
        .iter()
        .map(|&s| ((s * s - passb[0] * passb[1]) / (s * (passb[0] - passb[1]))).abs())
        .fold(f64::INFINITY, f64::min);

    let arg1_sq = pow10m1(0.1 * gpass) / pow10m1(0.1 * gstop);
    let arg0 = 1.0 / nat;
    let arg0_sq = arg0 * arg0;

    let ratio = ellipk(arg0_sq) * ellipkm1(arg1_sq) / (ellipkm1(arg0_sq) * ellipk(arg1_sq));
    if !ratio.is_finite() {
        return Err(DspError::filter_spec("band edges leave no transition band"));
    }
    Ok((ratio.ceil() as usize).max(1))
}

/// Normalized analog elliptic low-pass prototype.
///
/// Passband edge at 1 rad/s, `rp` dB ripple, `rs` dB minimum stopband attenuation.
pub fn ellip_prototype(order: usize, rp: f64, rs: f64) -> Result<Zpk> {
    if order == 0 {
        return Ok(Zpk {
            zeros: Vec::new(),
            poles: Vec::new(),
            gain: 10f64.powf(-rp / 20.0),
        });
    }
    if order == 1 {
        let p = -(1.0 / pow10m1(0.1 * rp)).sqrt();
        return Ok(Zpk {
            zeros: Vec::new(),
            poles: vec![C64::new(p, 0.0)],
            gain: -p,
        });
    }

    let n = order as f64;
    let eps_sq = pow10m1(0.1 * rp);
    let eps = eps_sq.sqrt();
    let ck1_sq = eps_sq / pow10m1(0.1 * rs);
    if ck1_sq == 0.0 {
        return Err(DspError::filter_spec("cannot design a filter with the given rp and rs"));
    }

    let val0 = ellipk(ck1_sq);
    let m = ellipdeg(order, ck1_sq);
    let capk = ellipk(m);

    let js: Vec<f64> = ((1 - order % 2)..order).step_by(2).map(|j| j as f64).collect();
    let jacobi: Vec<(f64, f64, f64)> = js.iter().map(|&j| ellipj(j * capk / n, m)).collect();

    let mut zeros: Vec<C64> = jacobi
        .iter()
        .filter(|(s, _, _)| s.abs() > ROOT_EPS)
        .map(|(s, _, _)| C64::new(0.0, 1.0 / (m.sqrt() * s)))
        .collect();
    let conj: Vec<C64> = zeros.iter().map(|z| z.conj()).collect();
    zeros.extend(conj);

    let r = arc_jac_sc1(1.0 / eps, ck1_sq)?;
    let v0 = capk * r / (n * val0);
    let (sv, cv, dv) = ellipj(v0, 1.0 - m);

    let mut poles: Vec<C64> = jacobi
        .iter()
        .map(|&(s, c, d)| {
            let num = C64::new(c * d * sv * cv, s * dv);
            -num / (1.0 - (d * sv).powi(2))
        })
        .collect();

    if order % 2 == 1 {
        let norm = poles.iter().map(|p| p.norm_sqr()).sum::<f64>().sqrt();
        let extra: Vec<C64> = poles
            .iter()
            .filter(|p| p.im.abs() > ROOT_EPS * norm)
            .map(|p| p.conj())
            .collect();
        poles.extend(extra);
    } else {
        let extra: Vec<C64> = poles.iter().map(|p| p.conj()).collect();
        poles.extend(extra);
    }

    let prod_p: C64 = poles.iter().map(|&p| -p).product();
    let prod_z: C64 = zeros.iter().map(|&z| -z).product();
    let mut gain = (prod_p / prod_z).re;
    if order % 2 == 0 {
        gain /= (1.0 + eps_sq).sqrt();
    }

    Ok(Zpk { zeros, poles, gain })
}

// ---------------------------------------------------------------------------
// Frequency transforms
// ---------------------------------------------------------------------------

/// Low-pass to band-pass transform with centre `wo` and bandwidth `bw` (rad/s).
pub fn lp_to_bp(proto: &Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = proto.poles.len().saturating_sub(proto.zeros.len());
    let split = |roots: &[C64]| -> Vec<C64> {
        let scaled: Vec<C64> = roots.iter().map(|&r| r * (bw / 2.0)).collect();
        let plus = scaled.iter().map(|&r| r + (r * r - wo * wo).sqrt());
        let minus = scaled.iter().map(|&r| r - (r * r - wo * wo).sqrt());
        plus.chain(minus).collect()
    };

    let mut zeros = split(&proto.zeros);
    zeros.extend(std::iter::repeat_n(C64::new(0.0, 0.0), degree));
    Zpk {
        zeros,
        poles: split(&proto.poles),
        gain: proto.gain * bw.powi(degree as i32),
    }
}

/// Bilinear transform with `fs = 2` (so that 1.0 maps to Nyquist).
pub fn bilinear(analog: &Zpk) -> Zpk {
    const FS2: f64 = 4.0;
    let degree = analog.poles.len().saturating_sub(analog.zeros.len());
    let map = |&r: &C64| (FS2 + r) / (FS2 - r);

    let mut zeros: Vec<C64> = analog.zeros.iter().map(map).collect();
    zeros.extend(std::iter::repeat_n(C64::new(-1.0, 0.0), degree));
    let poles = analog.poles.iter().map(map).collect();

    let num: C64 = analog.zeros.iter().map(|&z| FS2 - z).product();
    let den: C64 = analog.poles.iter().map(|&p| FS2 - p).product();
    Zpk {
        zeros,
        poles,
        gain: analog.gain * (num / den).re,
    }
}

// ---------------------------------------------------------------------------
// Second-order sections
// ---------------------------------------------------------------------------

/// A real quadratic factor and one representative root for distance matching.
#[derive(Debug, Clone, Copy)]
struct Factor {
    coeffs: [f64; 3],
    roots: [C64; 2],
}

fn is_real(r: C64) -> bool {
    r.im.abs() <= 1e-10 * r.norm().max(1.0)
}

fn quadratic_factors(roots: &[C64]) -> Vec<Factor> {
    let mut factors = Vec::new();

    for r in roots.iter().filter(|r| !is_real(**r) && r.im > 0.0) {
        factors.push(Factor {
            coeffs: [1.0, -2.0 * r.re, r.norm_sqr()],
            roots: [*r, r.conj()],
        });
    }

    let mut reals: Vec<f64> = roots.iter().filter(|r| is_real(**r)).map(|r| r.re).collect();
    reals.sort_by(f64::total_cmp);
    for pair in reals.chunks(2) {
        match *pair {
            [a, b] => factors.push(Factor {
                coeffs: [1.0, -(a + b), a * b],
                roots: [C64::new(a, 0.0), C64::new(b, 0.0)],
            }),
            [a] => factors.push(Factor {
                coeffs: [1.0, -a, 0.0],
                roots: [C64::new(a, 0.0), C64::new(0.0, 0.0)],
            }),
            _ => {}
        }
    }

    factors
}

fn identity_factor() -> Factor {
    Factor {
        coeffs: [1.0, 0.0, 0.0],
        roots: [C64::new(0.0, 0.0); 2],
    }
}

/// Group a digital ZPK into second-order sections.
///
/// Each pole pair, starting with the one closest to the unit circle, is
/// matched with the nearest remaining zero pair. Sections are emitted with the
/// most resonant pair last and the overall gain folded into the first.
pub fn zpk_to_sos(zpk: &Zpk) -> SosFilter {
    let mut poles = quadratic_factors(&zpk.poles);
    let mut zeros = quadratic_factors(&zpk.zeros);

    let n_sections = poles.len().max(zeros.len()).max(1);
    poles.resize(n_sections, identity_factor());
    zeros.resize(n_sections, identity_factor());

    // Most resonant first for matching
    poles.sort_by(|a, b| {
        let da = 1.0 - a.roots[0].norm();
        let db = 1.0 - b.roots[0].norm();
        da.abs().total_cmp(&db.abs())
    });

    let mut pairs: Vec<(Factor, Factor)> = Vec::with_capacity(n_sections);
    for pole in poles {
        let target = pole.roots[0];
        let best = zeros
            .iter()
            .enumerate()
            .map(|(i, z)| {
                let d = (z.roots[0] - target).norm().min((z.roots[1] - target).norm());
                (i, d)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(i, _)| i);
        let zero = zeros.swap_remove(best);
        pairs.push((pole, zero));
    }
    pairs.reverse();

    let sections: Vec<Biquad> = pairs
        .iter()
        .enumerate()
        .map(|(i, (pole, zero))| {
            let g = if i == 0 { zpk.gain } else { 1.0 };
            let [b0, b1, b2] = zero.coeffs;
            let [a0, a1, a2] = pole.coeffs;
            Biquad::from_coefficients([g * b0, g * b1, g * b2, a0, a1, a2])
        })
        .collect();

    SosFilter::new(sections)
}

// ---------------------------------------------------------------------------
// Public design entry point
// ---------------------------------------------------------------------------

pub(crate) fn validate_edges(wp: [f64; 2], ws: [f64; 2]) -> Result<()> {
    let in_range = |w: f64| w > 0.0 && w < 1.0;
    if !wp.iter().chain(ws.iter()).all(|&w| in_range(w)) {
        return Err(DspError::filter_spec(format!(
            "band edges must lie strictly between 0 and Nyquist (passband {:?}, stopband {:?})",
            wp, ws
        )));
    }
    if wp[0] >= wp[1] {
        return Err(DspError::filter_spec(format!(
            "passband low edge {} is not below high edge {}",
            wp[0], wp[1]
        )));
    }
    if ws[0] >= wp[0] || ws[1] <= wp[1] {
        return Err(DspError::filter_spec(format!(
            "stopband {:?} does not enclose passband {:?}",
            ws, wp
        )));
    }
    Ok(())
}

/// Digital elliptic band-pass of prototype order `order`.
pub fn ellip_bandpass(order: usize, rp: f64, rs: f64, wn: [f64; 2]) -> Result<SosFilter> {
    let proto = ellip_prototype(order, rp, rs)?;
    let warped = [4.0 * (PI * wn[0] / 2.0).tan(), 4.0 * (PI * wn[1] / 2.0).tan()];
    let bw = warped[1] - warped[0];
    let wo = (warped[0] * warped[1]).sqrt();
    let digital = bilinear(&lp_to_bp(&proto, wo, bw));
    Ok(zpk_to_sos(&digital))
}

/// Design the minimum-order elliptic band-pass meeting the given edges.
///
/// Returns the cascade together with the prototype order (the band-pass has
/// twice as many poles).
pub fn design_bandpass(
    wp: [f64; 2],
    ws: [f64; 2],
    gpass: f64,
    gstop: f64,
) -> Result<(SosFilter, usize)> {
    let order = ellipord_bandpass(wp, ws, gpass, gstop)?;
    let sos = ellip_bandpass(order, gpass, gstop, wp)?;
    tracing::debug!(order, ?wp, ?ws, "elliptic band-pass designed");
    Ok((sos, order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_integral_known_values() {
        assert!((ellipk(0.0) - PI / 2.0).abs() < 1e-14);
        // K(0.5) = 1.8540746773013719
        assert!((ellipk(0.5) - 1.8540746773013719).abs() < 1e-12);
        assert!((ellipkm1(0.5) - ellipk(0.5)).abs() < 1e-12);
        assert!(ellipk(1.0).is_infinite());
    }

    #[test]
    fn jacobi_identities() {
        for &m in &[1e-12, 0.1, 0.5, 0.9, 0.99999999999] {
            for &u in &[0.0, 0.3, 1.0, 2.0] {
                let (sn, cn, dn) = ellipj(u, m);
                assert!((sn * sn + cn * cn - 1.0).abs() < 1e-7, "m={m} u={u}");
                assert!((dn * dn + m * sn * sn - 1.0).abs() < 1e-7, "m={m} u={u}");
            }
        }
    }

    #[test]
    fn jacobi_quarter_period() {
        let m = 0.7;
        let (sn, cn, _) = ellipj(ellipk(m), m);
        assert!((sn - 1.0).abs() < 1e-9);
        assert!(cn.abs() < 1e-6);
    }

    #[test]
    fn arc_sn_inverts_sn() {
        let m = 0.4;
        let u = 0.8;
        let (sn, _, _) = ellipj(u, m);
        let z = arc_jac_sn(C64::new(sn, 0.0), m).unwrap();
        assert!((z.re - u).abs() < 1e-9);
    }

    #[test]
    fn order_selection() {
        // Response analysis convention: 50-1000 Hz at 24414 Hz, stopband 25-2000 Hz
        let nyq = 24414.0625 / 2.0;
        let wp = [50.0 / nyq, 1000.0 / nyq];
        let ws = [25.0 / nyq, 2000.0 / nyq];
        let order = ellipord_bandpass(wp, ws, 1.0, 60.0).unwrap();
        assert!((3..=6).contains(&order), "order {order}");
    }

    #[test]
    fn prototype_passband_gain() {
        // Even order: DC gain is -rp dB; odd order: DC gain is 0 dB
        for order in 2..=5 {
            let proto = ellip_prototype(order, 1.0, 60.0).unwrap();
            assert_eq!(proto.poles.len(), order);
            let s = C64::new(0.0, 0.0);
            let num: C64 = proto.zeros.iter().map(|&z| s - z).product();
            let den: C64 = proto.poles.iter().map(|&p| s - p).product();
            let h = (num / den * proto.gain).norm();
            let expected = if order % 2 == 0 { 10f64.powf(-1.0 / 20.0) } else { 1.0 };
            assert!((h - expected).abs() < 1e-6, "order {order}: {h}");
            assert!(proto.poles.iter().all(|p| p.re < 0.0));
        }
    }

    #[test]
    fn bandpass_meets_targets() {
        let wp = [0.2, 0.4];
        let ws = [0.15, 0.5];
        let (sos, order) = design_bandpass(wp, ws, 1.0, 60.0).unwrap();
        assert_eq!(sos.order(), 2 * order);

        let sr = 2.0;
        for f in [0.21, 0.25, 0.3, 0.35, 0.39] {
            let mag_db = 20.0 * sos.magnitude_at(f / 2.0 * sr, sr).log10();
            assert!(mag_db > -1.05 && mag_db < 0.05, "passband {f}: {mag_db} dB");
        }
        for f in [0.05, 0.1, 0.14, 0.55, 0.7, 0.9] {
            let mag_db = 20.0 * sos.magnitude_at(f / 2.0 * sr, sr).log10();
            assert!(mag_db < -59.0, "stopband {f}: {mag_db} dB");
        }
    }

    #[test]
    fn poles_inside_unit_circle() {
        let (sos, _) = design_bandpass([0.01, 0.1], [0.005, 0.2], 1.0, 60.0).unwrap();
        for s in sos.sections() {
            let [_, _, _, _, a1, a2] = s.coefficients();
            // Stability triangle for a second-order denominator
            assert!(a2.abs() < 1.0 && a1.abs() < 1.0 + a2, "a1={a1} a2={a2}");
        }
    }

    #[test]
    fn rejects_bad_edges() {
        assert!(matches!(
            ellipord_bandpass([0.4, 0.2], [0.1, 0.5], 1.0, 60.0),
            Err(DspError::InvalidFilterSpec(_))
        ));
        assert!(matches!(
            ellipord_bandpass([0.2, 0.4], [0.1, 1.2], 1.0, 60.0),
            Err(DspError::InvalidFilterSpec(_))
        ));
        assert!(matches!(
            ellipord_bandpass([0.2, 0.4], [0.25, 0.5], 1.0, 60.0),
            Err(DspError::InvalidFilterSpec(_))
        ));
    }
}
