//! Per-instance seeds derived from positional magnitude.

use crate::coords::Position;

/// Seed for a node: global seed plus the magnitudes of its parent's and its
/// own coordinates, truncated toward zero (saturating at the i32 range).
///
/// Sign and argument order do not matter. Changing the formula changes every
/// generated field.
pub fn node_seed(global_seed: i32, parent: Position, own: Position) -> i32 {
    (global_seed as f64 + parent.magnitude() + own.magnitude()) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_formula() {
        // 3-4-5 triangle plus 6-8-10 triangle
        let seed = node_seed(100, Position::filament(3, 4), Position::sector(6, 8));
        assert_eq!(seed, 115);
    }

    #[test]
    fn test_seed_truncates() {
        // sqrt(2) + sqrt(2) = 2.83
        let seed = node_seed(0, Position::filament(1, 1), Position::sector(-1, 1));
        assert_eq!(seed, 2);
        let seed = node_seed(-10, Position::filament(0, 0), Position::sector(1, 1));
        assert_eq!(seed, -8);
    }

    #[test]
    fn test_seed_ignores_sign_and_order() {
        let a = node_seed(7, Position::sector(2, 5), Position::region(-5, 2));
        let b = node_seed(7, Position::sector(-5, -2), Position::region(2, -5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_saturates() {
        let seed = node_seed(i32::MAX, Position::sector(i32::MAX, i32::MAX), Position::region(1, 1));
        assert_eq!(seed, i32::MAX);
    }
}
