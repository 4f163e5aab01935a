//! Gamma function helpers for discrete Gamma rate categories.

/// Natural log of the Gamma function (Lanczos approximation, g = 7).
pub(crate) fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEFFS[0];
    let t = x + 7.5;
    for (i, &c) in COEFFS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Regularized lower incomplete gamma `P(a, x)`.
pub(crate) fn lower_regularized_gamma(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        1.0 - gamma_continued_fraction(a, x)
    }
}

const MAX_ITER: usize = 500;
const EPS: f64 = 1e-15;

fn gamma_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut del = sum;
    for _ in 0..MAX_ITER {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

/// Upper regularized gamma `Q(a, x)` by Lentz's continued fraction.
fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    const TINY: f64 = 1e-300;
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..MAX_ITER {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Quantile of a Gamma distribution with the given shape and rate = shape
/// (mean one), found by bisection.
pub(crate) fn gamma_quantile(shape: f64, p: f64) -> f64 {
    if p <= 0.0 {
        return 0.0;
    }
    let cdf = |x: f64| lower_regularized_gamma(shape, shape * x);
    let mut hi = 1.0;
    while cdf(hi) < p && hi < 1e12 {
        hi *= 2.0;
    }
    let mut lo = 0.0;
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-14 * hi.max(1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Mean rate of each of `categories` equal-probability classes of a
/// mean-one Gamma(`shape`) distribution.
///
/// The class means are rescaled to average exactly one.
pub(crate) fn discrete_gamma_rates(shape: f64, categories: usize) -> Vec<f64> {
    if categories == 1 {
        return vec![1.0];
    }
    let k = categories as f64;
    let cuts: Vec<f64> = (1..categories)
        .map(|i| gamma_quantile(shape, i as f64 / k))
        .collect();

    // E[r; a < r < b] for Gamma(shape, rate shape) is P(shape+1, shape·b) - P(shape+1, shape·a).
    let cum = |x: f64| lower_regularized_gamma(shape + 1.0, shape * x);
    let mut rates = Vec::with_capacity(categories);
    let mut prev = 0.0;
    for cut in cuts.iter().copied().chain(std::iter::once(f64::INFINITY)) {
        let upper = if cut.is_finite() { cum(cut) } else { 1.0 };
        rates.push((upper - prev) * k);
        prev = upper;
    }
    let mean = rates.iter().sum::<f64>() / k;
    rates.iter_mut().for_each(|r| *r /= mean);
    rates
}
