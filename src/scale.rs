use anyhow::{bail, Result};
use crate::aggregate::DerivedRecord;
use crate::palette;
use plotters::style::RGBColor;

/// Interpolation family of a continuous scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleKind {
    Linear,
    Log,
    Sqrt,
}

/// A pure mapping from a numeric domain onto a pixel range
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousScale {
    pub kind: ScaleKind,
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl ContinuousScale {
    pub fn linear(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { kind: ScaleKind::Linear, domain, range }
    }

    pub fn sqrt(domain: (f64, f64), range: (f64, f64)) -> Result<Self> {
        if domain.0 < 0.0 || domain.1 < 0.0 {
            bail!("sqrt scale domain must be non-negative, got [{}, {}]", domain.0, domain.1);
        }
        Ok(Self { kind: ScaleKind::Sqrt, domain, range })
    }

    /// Logarithmic scale. Both domain bounds must be strictly positive.
    pub fn log(domain: (f64, f64), range: (f64, f64)) -> Result<Self> {
        if !(domain.0 > 0.0 && domain.1 > 0.0) {
            bail!("log scale domain must be strictly positive, got [{}, {}]", domain.0, domain.1);
        }
        Ok(Self { kind: ScaleKind::Log, domain, range })
    }

    fn transform(&self, v: f64) -> f64 {
        match self.kind {
            ScaleKind::Linear => v,
            ScaleKind::Log => v.ln(),
            ScaleKind::Sqrt => v.sqrt(),
        }
    }

    /// Map a domain value to the range. Values outside the domain extrapolate.
    pub fn map(&self, v: f64) -> f64 {
        let d0 = self.transform(self.domain.0);
        let d1 = self.transform(self.domain.1);
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (self.transform(v) - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Extend the domain to round values
    pub fn nice(mut self) -> Self {
        self.domain = match self.kind {
            ScaleKind::Log => (
                10f64.powf(self.domain.0.log10().floor()),
                10f64.powf(self.domain.1.log10().ceil()),
            ),
            ScaleKind::Linear | ScaleKind::Sqrt => nice_linear(self.domain.0, self.domain.1, 10),
        };
        self
    }

    /// Tick values inside the domain, about `count` of them
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = ordered(self.domain);
        match self.kind {
            ScaleKind::Log => log_ticks(lo, hi, count),
            ScaleKind::Linear | ScaleKind::Sqrt => linear_ticks(lo, hi, count),
        }
    }

    /// Formatted labels for `ticks(count)`
    pub fn tick_labels(&self, count: usize, format: TickFormat) -> Vec<(f64, String)> {
        let ticks = self.ticks(count);
        let (lo, hi) = ordered(self.domain);
        let step = tick_step(lo, hi, count).abs();
        ticks
            .into_iter()
            .filter(|t| format != TickFormat::Integer || t.fract() == 0.0)
            .map(|t| {
                let label = match format {
                    TickFormat::Integer => format!("{}", t.round() as i64),
                    TickFormat::Si => format_si(t),
                    TickFormat::Auto => format_fixed(t, precision_for_step(step)),
                };
                (t, label)
            })
            .collect()
    }
}

/// How axis tick values are written
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickFormat {
    /// Fixed precision derived from the tick step, with thousands separators
    Auto,
    /// Whole numbers without separators (years); fractional ticks are dropped
    Integer,
    /// SI prefix notation (`100k`, `1M`)
    Si,
}

/// Fixed-domain colour scale onto the plasma ramp. Values are clamped, so
/// colours stay comparable across frames whatever the data range.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialScale {
    pub domain: (f64, f64),
}

impl SequentialScale {
    pub fn new(domain: (f64, f64)) -> Self {
        Self { domain }
    }

    pub fn map(&self, v: f64) -> RGBColor {
        let (d0, d1) = self.domain;
        let t = if d1 == d0 { 0.0 } else { (v - d0) / (d1 - d0) };
        palette::plasma(t)
    }
}

fn ordered(d: (f64, f64)) -> (f64, f64) {
    if d.0 <= d.1 {
        d
    } else {
        (d.1, d.0)
    }
}

// =============================================================================
// Domain helpers
// =============================================================================

fn finite_values<'a>(
    records: &'a [DerivedRecord],
    field: &'a str,
) -> impl Iterator<Item = f64> + 'a {
    records.iter().map(move |r| r.get(field)).filter(|v| v.is_finite())
}

/// `[min, max]` of a field over the finite values, `None` if there are none
pub fn extent(records: &[DerivedRecord], field: &str) -> Option<(f64, f64)> {
    finite_values(records, field).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// `[0, max]` of a field
pub fn zero_to_max(records: &[DerivedRecord], field: &str) -> Option<(f64, f64)> {
    extent(records, field).map(|(_, hi)| (0.0, hi))
}

/// Extent of the strictly positive values only, for log scales. Non-positive
/// values are excluded, never clamped. With a `floor`, the lower bound is at
/// most the floor.
pub fn positive_extent(
    records: &[DerivedRecord],
    field: &str,
    floor: Option<f64>,
) -> Option<(f64, f64)> {
    let (lo, hi) = finite_values(records, field)
        .filter(|v| *v > 0.0)
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let lo = match floor {
        Some(f) if f > 0.0 => lo.min(f),
        _ => lo,
    };
    Some((lo, hi))
}

// =============================================================================
// Tick arithmetic (d3-array tickIncrement semantics)
// =============================================================================

/// Step between about `count` round ticks covering [start, stop]
pub fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let count = count.max(1) as f64;
    let raw = (stop - start).abs() / count;
    if raw == 0.0 || !raw.is_finite() {
        return 0.0;
    }
    let power = raw.log10().floor();
    let error = raw / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * 10f64.powf(power)
}

/// Snap `v` onto a multiple of `step`, rounding with `f`. Steps below one are
/// handled through their inverse to avoid accumulating float error.
fn snap(v: f64, step: f64, f: fn(f64) -> f64) -> f64 {
    if step >= 1.0 {
        f(v / step) * step
    } else {
        let inv = (1.0 / step).round();
        f(v * inv) / inv
    }
}

fn nice_linear(start: f64, stop: f64, count: usize) -> (f64, f64) {
    let (mut lo, mut hi) = ordered((start, stop));
    let mut previous = f64::NAN;
    for _ in 0..10 {
        let step = tick_step(lo, hi, count);
        if step == 0.0 || step == previous {
            break;
        }
        lo = snap(lo, step, f64::floor);
        hi = snap(hi, step, f64::ceil);
        previous = step;
    }
    if start <= stop {
        (lo, hi)
    } else {
        (hi, lo)
    }
}

fn linear_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if lo == hi {
        return vec![lo];
    }
    let step = tick_step(lo, hi, count);
    if step == 0.0 {
        return Vec::new();
    }
    if step >= 1.0 {
        let i0 = (lo / step).ceil() as i64;
        let i1 = (hi / step).floor() as i64;
        (i0..=i1).map(|i| i as f64 * step).collect()
    } else {
        let inv = (1.0 / step).round();
        let i0 = (lo * inv).ceil() as i64;
        let i1 = (hi * inv).floor() as i64;
        (i0..=i1).map(|i| i as f64 / inv).collect()
    }
}

fn log_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if !(lo > 0.0) || !hi.is_finite() {
        return Vec::new();
    }
    let first = lo.log10().floor() as i32;
    let last = hi.log10().ceil() as i32;
    let decades = (last - first).max(1) as usize;
    // Dense domains get 1-2-5 subdivisions, wide ones only powers of ten
    let multiples: &[f64] = if decades * 3 <= count { &[1.0, 2.0, 5.0] } else { &[1.0] };
    let within = |v: f64| v >= lo * (1.0 - 1e-12) && v <= hi * (1.0 + 1e-12);
    (first..=last)
        .flat_map(|e| multiples.iter().map(move |m| m * 10f64.powi(e)))
        .filter(|v| within(*v))
        .collect()
}

fn precision_for_step(step: f64) -> usize {
    if step <= 0.0 || !step.is_finite() {
        return 0;
    }
    (-step.log10().floor()).max(0.0) as usize
}

/// Fixed-point with `,` thousands separators
pub fn format_fixed(v: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, v.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text, None),
    };
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let negative = v < 0.0 && grouped.chars().any(|c| c != '0' && c != ',')
        || v < 0.0 && frac_part.as_deref().is_some_and(|f| f.chars().any(|c| c != '0'));
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(&f);
    }
    out
}

/// SI notation with at most three significant digits: `100k`, `2.5M`, `1G`
pub fn format_si(v: f64) -> String {
    const PREFIXES: [(f64, &str); 5] = [
        (1e12, "T"),
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "k"),
        (1.0, ""),
    ];
    let magnitude = v.abs();
    for (factor, suffix) in PREFIXES {
        if magnitude >= factor {
            let scaled = v / factor;
            let text = format!("{:.2}", scaled);
            let text = text.trim_end_matches('0').trim_end_matches('.');
            return format!("{}{}", text, suffix);
        }
    }
    format_fixed(v, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Key;

    fn records(field: &'static str, values: &[f64]) -> Vec<DerivedRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DerivedRecord::new(Key::Year(i as i32)).with(field, *v))
            .collect()
    }

    #[test]
    fn test_integer_labels_skip_fractional_ticks() {
        let years = ContinuousScale::linear((2015.0, 2016.0), (0.0, 100.0));
        let labels: Vec<String> = years
            .tick_labels(6, TickFormat::Integer)
            .into_iter()
            .map(|(_, l)| l)
            .collect();
        assert_eq!(labels, vec!["2015", "2016"]);
    }

    #[test]
    fn test_linear_map() {
        let s = ContinuousScale::linear((0.0, 10.0), (0.0, 100.0));
        assert_eq!(s.map(5.0), 50.0);
        let inverted = ContinuousScale::linear((0.0, 10.0), (100.0, 0.0));
        assert_eq!(inverted.map(2.5), 75.0);
    }

    #[test]
    fn test_nice_keeps_round_domain() {
        let s = ContinuousScale::linear((0.0, 5.0), (0.0, 1.0)).nice();
        assert_eq!(s.domain, (0.0, 5.0));
    }

    #[test]
    fn test_nice_rounds_outward() {
        let s = ContinuousScale::linear((0.0, 97.3), (0.0, 1.0)).nice();
        assert_eq!(s.domain, (0.0, 100.0));
        let s = ContinuousScale::linear((0.0, 113_000.0), (0.0, 1.0)).nice();
        assert_eq!(s.domain, (0.0, 120_000.0));
        let s = ContinuousScale::linear((0.13, 0.87), (0.0, 1.0)).nice();
        assert_eq!(s.domain, (0.1, 0.9));
    }

    #[test]
    fn test_linear_ticks() {
        let s = ContinuousScale::linear((0.0, 100.0), (0.0, 1.0));
        assert_eq!(
            s.ticks(10),
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
        );
        let s = ContinuousScale::linear((2.1, 3.0), (0.0, 1.0));
        assert_eq!(s.ticks(5), vec![2.2, 2.4, 2.6, 2.8, 3.0]);
    }

    #[test]
    fn test_log_rejects_non_positive_domain() {
        assert!(ContinuousScale::log((0.0, 10.0), (0.0, 1.0)).is_err());
        assert!(ContinuousScale::log((-5.0, 10.0), (0.0, 1.0)).is_err());
        assert!(ContinuousScale::log((1e5, 1e9), (0.0, 1.0)).is_ok());
    }

    #[test]
    fn test_log_map_and_ticks() {
        let s = ContinuousScale::log((1e5, 1e9), (0.0, 400.0)).unwrap();
        assert!((s.map(1e7) - 200.0).abs() < 1e-9);
        assert_eq!(s.ticks(10), vec![1e5, 1e6, 1e7, 1e8, 1e9]);
        let labels: Vec<String> = s.tick_labels(10, TickFormat::Si).into_iter().map(|t| t.1).collect();
        assert_eq!(labels, vec!["100k", "1M", "10M", "100M", "1G"]);
    }

    #[test]
    fn test_log_nice_to_powers_of_ten() {
        let s = ContinuousScale::log((3e5, 4.2e9), (0.0, 1.0)).unwrap().nice();
        assert_eq!(s.domain, (1e5, 1e10));
    }

    #[test]
    fn test_sqrt_map() {
        let s = ContinuousScale::sqrt((0.0, 100.0), (3.0, 15.0)).unwrap();
        assert_eq!(s.map(0.0), 3.0);
        assert_eq!(s.map(25.0), 9.0);
        assert_eq!(s.map(100.0), 15.0);
    }

    #[test]
    fn test_degenerate_domain_maps_to_middle() {
        let s = ContinuousScale::linear((4.0, 4.0), (0.0, 10.0));
        assert_eq!(s.map(4.0), 5.0);
    }

    #[test]
    fn test_sequential_scale_is_fixed_and_clamped() {
        let s = SequentialScale::new((0.0, 100.0));
        assert_eq!(s.map(0.0), palette::plasma(0.0));
        assert_eq!(s.map(100.0), palette::plasma(1.0));
        assert_eq!(s.map(250.0), palette::plasma(1.0));
    }

    #[test]
    fn test_domain_helpers_skip_missing() {
        let rs = records("v", &[3.0, f64::NAN, -2.0, 8.0]);
        assert_eq!(extent(&rs, "v"), Some((-2.0, 8.0)));
        assert_eq!(zero_to_max(&rs, "v"), Some((0.0, 8.0)));
        assert_eq!(positive_extent(&rs, "v", None), Some((3.0, 8.0)));
        assert_eq!(positive_extent(&rs, "v", Some(1.0)), Some((1.0, 8.0)));
        assert_eq!(positive_extent(&rs, "v", Some(5.0)), Some((3.0, 8.0)));
        assert_eq!(extent(&records("v", &[f64::NAN]), "v"), None);
        assert_eq!(positive_extent(&records("v", &[0.0, -1.0]), "v", Some(1e5)), None);
    }

    #[test]
    fn test_format_fixed_grouping() {
        assert_eq!(format_fixed(1234567.0, 0), "1,234,567");
        assert_eq!(format_fixed(-1234.5, 1), "-1,234.5");
        assert_eq!(format_fixed(999.0, 0), "999");
        assert_eq!(format_fixed(0.25, 2), "0.25");
    }

    #[test]
    fn test_auto_tick_labels_use_step_precision() {
        let s = ContinuousScale::linear((0.0, 1.0), (0.0, 1.0));
        let labels: Vec<String> = s.tick_labels(5, TickFormat::Auto).into_iter().map(|t| t.1).collect();
        assert_eq!(labels, vec!["0.0", "0.2", "0.4", "0.6", "0.8", "1.0"]);
    }

    #[test]
    fn test_format_si() {
        assert_eq!(format_si(250_000.0), "250k");
        assert_eq!(format_si(2_500_000.0), "2.5M");
        assert_eq!(format_si(12.0), "12");
    }
}
