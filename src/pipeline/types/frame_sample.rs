/// Per-frame color and luminance statistics, all channels normalised to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub luminance: f32,
    pub luminance_variance: f32,
}

const EPSILON: f32 = 1e-6;

impl FrameSample {
    pub fn new(r: f32, g: f32, b: f32, luminance: f32, luminance_variance: f32) -> Self {
        Self {
            r,
            g,
            b,
            luminance,
            luminance_variance,
        }
    }

    /// Fraction of the channel sum attributable to green.
    pub fn green_dominance(&self) -> f32 {
        self.g / (self.r + self.g + self.b + EPSILON)
    }

    pub fn balance_penalty(&self) -> f32 {
        (self.r - self.b).abs() * 0.15
    }

    pub fn raw_score(&self) -> f32 {
        (self.green_dominance() - self.balance_penalty()).max(0.0)
    }

    /// Root mean square of the pairwise channel differences.
    pub fn chroma_spread(&self) -> f32 {
        let rg = self.r - self.g;
        let gb = self.g - self.b;
        let rb = self.r - self.b;
        ((rg * rg + gb * gb + rb * rb) / 3.0).sqrt()
    }
}
