//! Obstruction evaluation over the latched sensor facts.

/// Decides whether the latched sensor facts describe an obstructed door.
///
/// Returns true when either
/// * both endpoint sensors read true at once (physically impossible, a sensor fault), or
/// * neither endpoint sensor reads true while the door is not running (the door stopped
///   mid-travel without satisfying either endpoint).
///
/// This function has no side effects; callers decide how to act on the result.
pub fn evaluate(is_open: bool, is_closed: bool, running: bool) -> bool {
    (is_open && is_closed) || (!running && !is_open && !is_closed)
}
