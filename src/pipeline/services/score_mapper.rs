/// Maps the smoothed 0..1 signal onto the 1..10 scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreMapper;

impl ScoreMapper {
    pub const MIN_SCORE: u8 = 1;
    pub const MAX_SCORE: u8 = 10;

    pub fn map(&self, smoothed: f32) -> u8 {
        let value = if smoothed.is_nan() {
            0.0
        } else {
            smoothed.clamp(0.0, 1.0)
        };
        (value * 9.0).round() as u8 + Self::MIN_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!(ScoreMapper.map(0.0), 1);
        assert_eq!(ScoreMapper.map(1.0), 10);
        assert_eq!(ScoreMapper.map(-3.0), 1);
        assert_eq!(ScoreMapper.map(7.5), 10);
        assert_eq!(ScoreMapper.map(f32::NAN), 1);
    }

    #[test]
    fn rounds_to_nearest_step() {
        assert_eq!(ScoreMapper.map(0.6984), 7);
        assert_eq!(ScoreMapper.map(0.5), 6);
    }

    #[test]
    fn always_in_range() {
        for i in -50..=150 {
            let score = ScoreMapper.map(i as f32 / 100.0);
            assert!((ScoreMapper::MIN_SCORE..=ScoreMapper::MAX_SCORE).contains(&score));
        }
    }
}
