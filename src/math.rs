//! Pure computation helpers extracted for testability.
//!
//! Easing curves, Bézier arcs and the seeded PRNG used for procedural
//! overlays. Nothing in here touches the scene or the scheduler.

use bevy::math::Vec2;

/// Clamps animation progress into `[0, 1]`.
///
/// Non-finite input (a zero-length duration divided out) counts as finished.
pub fn clamp_progress(t: f32) -> f32 {
    if t.is_nan() {
        return 1.0;
    }
    t.clamp(0.0, 1.0)
}

/// Cosine ease-in-out: slow start, slow finish. Input is clamped first.
///
/// # Examples
/// ```
/// # use hex_battlefield::math::ease_in_out_cosine;
/// assert_eq!(ease_in_out_cosine(0.0), 0.0);
/// assert!((ease_in_out_cosine(0.5) - 0.5).abs() < 1e-6);
/// assert!((ease_in_out_cosine(1.0) - 1.0).abs() < 1e-6);
/// ```
pub fn ease_in_out_cosine(t: f32) -> f32 {
    let t = clamp_progress(t);
    0.5 - 0.5 * (std::f32::consts::PI * t).cos()
}

/// Cubic ease-out curve: fast start, gentle deceleration.
///
/// Used for bursts that should pop and then settle.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - clamp_progress(t)).powi(3)
}

/// Point on a quadratic Bézier curve at `t`.
pub fn quadratic_bezier(from: Vec2, control: Vec2, to: Vec2, t: f32) -> Vec2 {
    let t = clamp_progress(t);
    let u = 1.0 - t;
    from * (u * u) + control * (2.0 * u * t) + to * (t * t)
}

/// Control point for a lobbed arc between two points.
///
/// Sits above the chord midpoint, offset perpendicular to the chord by
/// `height_factor × distance`. "Above" means toward negative screen y so
/// shells always arc upward regardless of firing direction.
pub fn arc_control_point(from: Vec2, to: Vec2, height_factor: f32) -> Vec2 {
    let mid = (from + to) / 2.0;
    let chord = to - from;
    let dist = chord.length();
    if dist <= f32::EPSILON {
        return mid - Vec2::Y * height_factor;
    }
    let mut normal = Vec2::new(-chord.y, chord.x) / dist;
    if normal.y > 0.0 {
        normal = -normal;
    }
    mid + normal * dist * height_factor
}

/// Position along a polyline at overall progress `t`, weighted by leg length.
pub fn polyline_point(points: &[Vec2], t: f32) -> Option<Vec2> {
    let (&first, rest) = points.split_first()?;
    if rest.is_empty() {
        return Some(first);
    }
    let total: f32 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    if total <= f32::EPSILON {
        return points.last().copied();
    }
    let mut remaining = clamp_progress(t) * total;
    for w in points.windows(2) {
        let leg = w[0].distance(w[1]);
        if remaining <= leg {
            let local = if leg > 0.0 { remaining / leg } else { 1.0 };
            return Some(w[0].lerp(w[1], local));
        }
        remaining -= leg;
    }
    points.last().copied()
}

/// Damped oscillation used for hit shake: amplitude decays to zero at `t = 1`.
pub fn damped_shake(t: f32, amplitude: f32, cycles: f32) -> f32 {
    let t = clamp_progress(t);
    let decay = 1.0 - t;
    amplitude * decay * (t * cycles * std::f32::consts::TAU).sin()
}

/// Xorshift32 generator for stable procedural visuals.
///
/// The same seed always yields the same sequence, so overlays generated from a
/// hex key look identical across re-renders.
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// Creates a generator; a zero seed is remapped (xorshift has no zero orbit).
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9e37_79b9 } else { seed },
        }
    }

    /// Next raw value.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform float in `[min, max)`.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── easing ──────────────────────────────────────────────────────

    #[test]
    fn cosine_ease_hits_endpoints() {
        assert_eq!(ease_in_out_cosine(0.0), 0.0);
        assert!((ease_in_out_cosine(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_ease_clamps_out_of_range_progress() {
        assert_eq!(ease_in_out_cosine(-3.0), 0.0);
        assert!((ease_in_out_cosine(7.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_ease_is_symmetric() {
        for i in 0..=50 {
            let t = i as f32 / 100.0;
            let a = ease_in_out_cosine(t);
            let b = 1.0 - ease_in_out_cosine(1.0 - t);
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn nan_progress_counts_as_finished() {
        assert_eq!(clamp_progress(f32::NAN), 1.0);
    }

    #[test]
    fn ease_out_is_monotonically_increasing() {
        let steps: Vec<f32> = (0..=100).map(|i| ease_out_cubic(i as f32 / 100.0)).collect();
        for w in steps.windows(2) {
            assert!(w[1] >= w[0], "ease_out_cubic must be non-decreasing");
        }
    }

    // ── arcs ────────────────────────────────────────────────────────

    #[test]
    fn bezier_passes_through_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let c = Vec2::new(50.0, -40.0);
        let b = Vec2::new(100.0, 0.0);
        assert!((quadratic_bezier(a, c, b, 0.0) - a).length() < 1e-5);
        assert!((quadratic_bezier(a, c, b, 1.0) - b).length() < 1e-5);
    }

    #[test]
    fn arc_control_is_above_chord_and_proportional() {
        let from = Vec2::new(0.0, 100.0);
        let to = Vec2::new(200.0, 100.0);
        let control = arc_control_point(from, to, 0.3);
        assert!((control.x - 100.0).abs() < 1e-4);
        assert!((control.y - (100.0 - 60.0)).abs() < 1e-4);

        // Reversed direction still arcs upward.
        let reversed = arc_control_point(to, from, 0.3);
        assert!(reversed.y < 100.0);
    }

    #[test]
    fn polyline_is_length_weighted() {
        let pts = [Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(10.0, 30.0)];
        let quarter = polyline_point(&pts, 0.25).unwrap();
        assert!((quarter - Vec2::new(10.0, 0.0)).length() < 1e-4);
        assert!(polyline_point(&[], 0.5).is_none());
    }

    #[test]
    fn shake_settles_at_end() {
        assert!(damped_shake(1.0, 5.0, 4.0).abs() < 1e-5);
        assert_eq!(damped_shake(0.0, 5.0, 4.0), 0.0);
    }

    // ── prng ────────────────────────────────────────────────────────

    #[test]
    fn xorshift_is_deterministic() {
        let mut a = XorShift32::new(1234);
        let mut b = XorShift32::new(1234);
        for _ in 0..32 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn xorshift_zero_seed_does_not_stick() {
        let mut rng = XorShift32::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn xorshift_floats_stay_in_range() {
        let mut rng = XorShift32::new(77);
        for _ in 0..1000 {
            let v = rng.range(-2.0, 3.0);
            assert!((-2.0..3.0).contains(&v));
        }
    }
}
