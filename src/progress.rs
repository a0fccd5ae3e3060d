/// Horizontal offset of the car sprite, in columns from the destination.
///
/// The car starts at the far end of the lane and drives linearly towards the
/// destination as time elapses. Outside a running session, with a zero total,
/// or before the lane has a usable width the offset collapses to zero.
pub fn car_offset(
    remaining_secs: u32,
    total_secs: u32,
    running: bool,
    lane_width: u16,
    sprite_width: u16,
) -> u16 {
    if !running || total_secs == 0 || lane_width <= sprite_width {
        return 0;
    }
    let fraction = (remaining_secs.min(total_secs) as f64) / (total_secs as f64);
    let travel = (lane_width - sprite_width) as f64;
    (fraction * travel).round() as u16
}

/// Elapsed share of the session in 0.0..=1.0
pub fn elapsed_fraction(remaining_secs: u32, total_secs: u32) -> f64 {
    if total_secs == 0 {
        return 0.0;
    }
    1.0 - (remaining_secs.min(total_secs) as f64) / (total_secs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_far_end() {
        assert_eq!(car_offset(60, 60, true, 42, 2), 40);
    }

    #[test]
    fn arrives_at_destination() {
        assert_eq!(car_offset(0, 60, true, 42, 2), 0);
    }

    #[test]
    fn halfway_is_linear() {
        assert_eq!(car_offset(30, 60, true, 42, 2), 20);
    }

    #[test]
    fn collapses_when_not_running() {
        assert_eq!(car_offset(30, 60, false, 42, 2), 0);
    }

    #[test]
    fn collapses_on_zero_total() {
        assert_eq!(car_offset(0, 0, true, 42, 2), 0);
    }

    #[test]
    fn collapses_on_unknown_width() {
        assert_eq!(car_offset(30, 60, true, 0, 2), 0);
        assert_eq!(car_offset(30, 60, true, 2, 2), 0);
    }

    #[test]
    fn remaining_above_total_is_clamped() {
        assert_eq!(car_offset(90, 60, true, 42, 2), 40);
    }

    #[test]
    fn elapsed_fraction_bounds() {
        assert_eq!(elapsed_fraction(60, 60), 0.0);
        assert_eq!(elapsed_fraction(0, 60), 1.0);
        assert_eq!(elapsed_fraction(15, 60), 0.75);
        assert_eq!(elapsed_fraction(5, 0), 0.0);
    }
}
