// SPDX-License-Identifier: MPL-2.0

//! Where and when the animation shows up.

use std::time::Duration;

use rand::Rng;
use visitor_gag_config::{DelayRange, Margin};

use crate::{
    error::{Error, Result},
    geometry::{Point, Rect, Size},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Uniformly random, fully inside the output.
    Random,
    /// Fixed offset from the output's top right corner.
    Demo(Margin),
}

/// Pick the top left corner for a box of `footprint` inside `bounds`.
///
/// Random placement draws each axis uniformly from
/// `[left, right - width]` and `[top, bottom - height]`, both ends inclusive.
pub fn choose_position<R: Rng>(
    bounds: Rect,
    footprint: Size,
    mode: PlacementMode,
    rng: &mut R,
) -> Result<Point> {
    if !bounds.fits(footprint) {
        return Err(Error::FootprintTooLarge { footprint, bounds });
    }

    // `fits` guarantees both maxima are at least `left`/`top`.
    let max_x = (i64::from(bounds.right) - i64::from(footprint.width)) as i32;
    let max_y = (i64::from(bounds.bottom) - i64::from(footprint.height)) as i32;

    let position = match mode {
        PlacementMode::Random => Point::new(
            rng.random_range(bounds.left..=max_x),
            rng.random_range(bounds.top..=max_y),
        ),
        PlacementMode::Demo(margin) => Point::new(
            max_x.saturating_sub(margin.right).clamp(bounds.left, max_x),
            bounds.top.saturating_add(margin.top).clamp(bounds.top, max_y),
        ),
    };
    Ok(position)
}

/// Draw the pause before the next appearance.
pub fn rerun_delay<R: Rng>(range: DelayRange, rng: &mut R) -> Duration {
    let millis = if range.min >= range.max {
        range.min
    } else {
        rng.random_range(range.min..=range.max)
    };
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn random_positions_stay_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = Rect::new(-1920, 100, 0, 1180);
        let footprint = Size::new(320, 240);
        let (mut min_x, mut max_x) = (i32::MAX, i32::MIN);

        for _ in 0..5_000 {
            let p = choose_position(bounds, footprint, PlacementMode::Random, &mut rng).unwrap();
            assert!(p.x >= bounds.left && p.x + 320 <= bounds.right, "{p:?}");
            assert!(p.y >= bounds.top && p.y + 240 <= bounds.bottom, "{p:?}");
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
        }

        assert!(min_x < bounds.left + 100);
        assert!(max_x > bounds.right - 320 - 100);
    }

    #[test]
    fn exact_fit_has_one_position() {
        let mut rng = StdRng::seed_from_u64(1);
        let bounds = Rect::new(10, 20, 110, 70);
        let p = choose_position(bounds, Size::new(100, 50), PlacementMode::Random, &mut rng)
            .unwrap();
        assert_eq!(p, Point::new(10, 20));
    }

    #[test]
    fn oversized_footprint_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let bounds = Rect::new(0, 0, 100, 100);
        assert!(matches!(
            choose_position(bounds, Size::new(101, 10), PlacementMode::Random, &mut rng),
            Err(Error::FootprintTooLarge { .. })
        ));
    }

    #[test]
    fn demo_sits_near_top_right() {
        let mut rng = StdRng::seed_from_u64(1);
        let bounds = Rect::new(0, 0, 1920, 1080);
        let mode = PlacementMode::Demo(Margin { right: 100, top: 100 });
        let p = choose_position(bounds, Size::new(200, 150), mode, &mut rng).unwrap();
        assert_eq!(p, Point::new(1920 - 200 - 100, 100));

        let tight = Rect::new(0, 0, 250, 200);
        let p = choose_position(tight, Size::new(200, 150), mode, &mut rng).unwrap();
        assert_eq!(p, Point::new(0, 50));
    }

    #[test]
    fn rerun_delay_within_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = DelayRange { min: 5_000, max: 30_000 };
        for _ in 0..1_000 {
            let delay = rerun_delay(range, &mut rng);
            assert!(delay >= Duration::from_secs(5) && delay <= Duration::from_secs(30));
        }
        let fixed = DelayRange { min: 42, max: 42 };
        assert_eq!(rerun_delay(fixed, &mut rng), Duration::from_millis(42));
    }
}
