//! Monotone cubic interpolation in x (Steffen's method), flattened into a
//! polyline because the render backends only draw straight segments.

/// Segments between two input points are subdivided into this many pieces
pub const DEFAULT_SAMPLES: usize = 8;

fn sign(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else if v > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Safe slope `dy / dx`; a zero `dx` takes the sign of the neighbouring step
fn slope(dy: f64, dx: f64, other_dx: f64) -> f64 {
    if dx != 0.0 {
        dy / dx
    } else if other_dx < 0.0 {
        dy / -0.0
    } else {
        dy / 0.0
    }
}

/// Tangent at an interior point from its two neighbours
fn interior_tangent(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let h0 = p1.0 - p0.0;
    let h1 = p2.0 - p1.0;
    let s0 = slope(p1.1 - p0.1, h0, h1);
    let s1 = slope(p2.1 - p1.1, h1, h0);
    // a repeated point has an undefined slope and a flat tangent
    if s0.is_nan() || s1.is_nan() {
        return 0.0;
    }
    let p = (s0 * h1 + s1 * h0) / (h0 + h1);
    let t = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
    if t.is_finite() {
        t
    } else {
        0.0
    }
}

/// One-sided tangent at an end point, given the tangent of its neighbour
fn end_tangent(p0: (f64, f64), p1: (f64, f64), neighbour: f64) -> f64 {
    let h = p1.0 - p0.0;
    if h != 0.0 {
        (3.0 * (p1.1 - p0.1) / h - neighbour) / 2.0
    } else {
        neighbour
    }
}

fn cubic(a: f64, b: f64, c: f64, d: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * a + 3.0 * mt * mt * t * b + 3.0 * mt * t * t * c + t * t * t * d
}

/// Interpolate `points` with a monotone-in-x cubic and return a polyline that
/// passes through every input point. Fewer than three points come back as a
/// straight polyline.
pub fn monotone_x(points: &[(f64, f64)], samples: usize) -> Vec<(f64, f64)> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let samples = samples.max(1);

    let mut tangents = vec![0.0; n];
    for i in 1..n - 1 {
        tangents[i] = interior_tangent(points[i - 1], points[i], points[i + 1]);
    }
    tangents[0] = end_tangent(points[0], points[1], tangents[1]);
    tangents[n - 1] = end_tangent(points[n - 2], points[n - 1], tangents[n - 2]);

    let mut out = Vec::with_capacity((n - 1) * samples + 1);
    out.push(points[0]);
    for i in 0..n - 1 {
        let (x0, y0) = points[i];
        let (x1, y1) = points[i + 1];
        let dx = (x1 - x0) / 3.0;
        let c1 = (x0 + dx, y0 + dx * tangents[i]);
        let c2 = (x1 - dx, y1 - dx * tangents[i + 1]);
        for s in 1..=samples {
            let t = s as f64 / samples as f64;
            out.push((cubic(x0, c1.0, c2.0, x1, t), cubic(y0, c1.1, c2.1, y1, t)));
        }
    }
    out
}
