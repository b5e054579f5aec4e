use serde::{Deserialize, Serialize};

/// Aspect-ratio classification of a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Other,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
        }
    }
}

/// Classify a video by its width/height ratio.
///
/// Bounds are inclusive: 16:9 (~1.78) lands in [1.70, 1.80], 9:16 (~0.5625)
/// in [0.50, 0.60]. Everything else is `Other`.
pub fn classify(width: u32, height: u32) -> Orientation {
    let ratio = width as f64 / height as f64;

    if (1.70..=1.80).contains(&ratio) {
        Orientation::Landscape
    } else if (0.50..=0.60).contains(&ratio) {
        Orientation::Portrait
    } else {
        Orientation::Other
    }
}
