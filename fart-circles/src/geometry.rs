//! Orbit layout math, lifted from
//! `original_source/backend/interactions/circles.py::_create_circles_image`'s
//! `_CIRCLES_DISTANCES`/`_CIRCLES_RADIUSES` tables and `_fib` helper. Kept
//! free of any image I/O so it can be unit tested directly.

/// `_fib` in the source uses the closed-form Binet formula; an iterative
/// count is equivalent for the small `n` this module ever calls with (6, 7)
/// and avoids floating-point rounding at the edges.
pub fn fib(n: u32) -> u32 {
    let (mut a, mut b) = (0u32, 1u32);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    a
}

/// One ring of avatars around the main picture.
#[derive(Debug, Clone, Copy)]
pub struct Orbit {
    pub count: u32,
    /// Distance from center, as a fraction of `image_size`.
    pub distance: f64,
    /// Avatar radius, as a fraction of `image_size`.
    pub radius: f64,
    /// Degrees of rotational offset applied to this orbit's start angle.
    pub angle_offset_deg: f64,
}

/// Fixed two-orbit layout (`_CIRCLES_OPTIONS["orbits"] = 2` in the source;
/// the option was never exercised with any other value there).
pub const ORBIT_COUNT: usize = 2;

/// `_CIRCLES_DISTANCES[2]` / `_CIRCLES_RADIUSES[2]`, indices 1 and 2 (index 0
/// is the main picture's own radius, handled separately below).
const DISTANCES: [f64; ORBIT_COUNT] = [0.23, 0.38];
const RADIUSES: [f64; ORBIT_COUNT] = [0.07, 0.06];

/// `_CIRCLES_RADIUSES[2][0]`: the main (center) avatar's radius fraction.
pub const MAIN_RADIUS_FRACTION: f64 = 0.13;

pub fn orbits() -> [Orbit; ORBIT_COUNT] {
    std::array::from_fn(|i| Orbit {
        count: fib(i as u32 + 6),
        distance: DISTANCES[i],
        radius: RADIUSES[i],
        angle_offset_deg: i as f64 * 30.0,
    })
}

/// Total avatar slots across all orbits — how many counterparty pictures
/// `render` can actually place.
pub fn capacity() -> u32 {
    orbits().iter().map(|o| o.count).sum()
}

/// Position (as a fraction of `image_size`, center-relative) of slot `index`
/// within `orbit`.
pub fn slot_position(orbit: &Orbit, index: u32) -> (f64, f64) {
    let angle_step = 360.0 / orbit.count as f64;
    let theta = (index as f64 * angle_step + orbit.angle_offset_deg).to_radians();
    (theta.cos() * orbit.distance, theta.sin() * orbit.distance)
}
