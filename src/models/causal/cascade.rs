//! Cascade arithmetic: convolutions and the occupancy recurrence.
//!
//! With `c` the daily cases, `d` the admission-delay pmf and `s` the
//! length-of-stay pmf:
//!
//! - admissions `a[t] = p · Σₖ c[t−k] d[k]`
//! - releases `r[t] = Σⱼ a[t−1−j] s[j]` (a patient admitted on day `u` with a
//!   stay of `j` days occupies `[u, u+j]` and is released on `u+j+1`)
//! - occupancy `o[t] = max(0, o[t−1] + a[t] − r[t])`
//!
//! Indices before the start of the inputs contribute nothing.

/// Admissions per unit hospitalization rate: `Σₖ c[t−k] d[k]`.
pub fn unit_admissions(cases: &[f64], delay: &[f64]) -> Vec<f64> {
    convolve(cases, delay, 0)
}

/// Releases implied by an admissions series.
pub fn releases(admissions: &[f64], stay: &[f64]) -> Vec<f64> {
    convolve(admissions, stay, 1)
}

/// `out[t] = Σⱼ x[t − shift − j] · kernel[j]`.
fn convolve(x: &[f64], kernel: &[f64], shift: usize) -> Vec<f64> {
    let mut out = vec![0.0; x.len()];
    for (t, slot) in out.iter_mut().enumerate().skip(shift) {
        let base = t - shift;
        let reach = kernel.len().min(base + 1);
        let mut acc = 0.0;
        for (j, &w) in kernel.iter().take(reach).enumerate() {
            acc += x[base - j] * w;
        }
        *slot = acc;
    }
    out
}

/// Outcome of running the recurrence with the non-negativity guard.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulated {
    pub occupancy: Vec<f64>,
    /// Index into `occupancy` of the first clamped day.
    pub first_clamped: Option<usize>,
    pub clamped_days: usize,
}

/// Run `o[t] = max(0, o[t−1] + net[t])` from `seed`. `occupancy[0]` is the
/// first day after the seed.
pub fn accumulate(seed: f64, net: &[f64]) -> Accumulated {
    let mut occupancy = Vec::with_capacity(net.len());
    let mut first_clamped = None;
    let mut clamped_days = 0;
    let mut level = seed;
    for (i, &delta) in net.iter().enumerate() {
        level += delta;
        if level < 0.0 {
            level = 0.0;
            clamped_days += 1;
            first_clamped.get_or_insert(i);
        }
        occupancy.push(level);
    }
    Accumulated { occupancy, first_clamped, clamped_days }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    // Purpose
    // -------
    // Convolutions follow the documented index conventions.
    //
    // Given
    // -----
    // - A unit case pulse on day 0, delay pmf [0.5, 0.5], stay pmf [0, 1].
    //
    // Expect
    // ------
    // - Admissions 0.5 on days 0 and 1.
    // - Each admission released two days later (stay of 1 day plus the
    //   one-day shift): releases 0.5 on days 2 and 3.
    fn convolutions_respect_delay_and_release_shift() {
        // Arrange
        let cases = [1.0, 0.0, 0.0, 0.0, 0.0];

        // Act
        let adm = unit_admissions(&cases, &[0.5, 0.5]);
        let rel = releases(&adm, &[0.0, 1.0]);

        // Assert
        assert_eq!(adm, vec![0.5, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(rel, vec![0.0, 0.0, 0.5, 0.5, 0.0]);
    }

    #[test]
    // Purpose
    // -------
    // The recurrence never emits a negative level and reports clamping.
    //
    // Given
    // -----
    // - Seed 2 and net flows [+1, −5, +1, −0.5].
    //
    // Expect
    // ------
    // - Levels [3, 0, 1, 0.5], first clamp at index 1, one clamped day.
    fn accumulate_clamps_at_zero() {
        // Arrange
        let net = [1.0, -5.0, 1.0, -0.5];

        // Act
        let acc = accumulate(2.0, &net);

        // Assert
        assert_eq!(acc.first_clamped, Some(1));
        assert_eq!(acc.clamped_days, 1);
        for (got, want) in acc.occupancy.iter().zip([3.0, 0.0, 1.0, 0.5]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }
}
