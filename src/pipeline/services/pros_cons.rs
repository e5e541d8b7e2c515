use crate::pipeline::types::{FrameSample, Lighting};

pub const MAX_ENTRIES: usize = 6;

/// Builds the local pros/cons text from the same signals that drive the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProsConsComposer;

impl ProsConsComposer {
    pub fn compose(
        &self,
        score: u8,
        sample: &FrameSample,
        lighting: Lighting,
    ) -> (Vec<String>, Vec<String>) {
        let mut pros = Vec::new();
        let mut cons = Vec::new();
        let chroma = sample.chroma_spread();
        let green_leads = sample.g >= sample.r && sample.g >= sample.b;

        if score >= 7 {
            pros.push("Strong green presence".to_string());
        }
        if green_leads && score >= 5 {
            pros.push("Leafy tones dominate the frame".to_string());
        }
        if chroma >= 0.25 {
            pros.push("Vivid, varied colors".to_string());
        }

        if score <= 4 {
            cons.push("Little green content detected".to_string());
        }
        if sample.r > sample.g && sample.r > sample.b {
            cons.push("Warm tones often mean fried or processed food".to_string());
        }
        if sample.b > sample.g && sample.b > sample.r {
            cons.push("Blue-heavy scene, may not be food".to_string());
        }
        if chroma < 0.08 {
            cons.push("Muted colors".to_string());
        }
        if lighting.is_degraded() {
            cons.push(format!("Estimate limited by lighting ({})", lighting.label()));
        }

        pros.truncate(MAX_ENTRIES);
        cons.truncate(MAX_ENTRIES);
        (pros, cons)
    }
}
