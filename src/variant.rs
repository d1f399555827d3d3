use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Layout-size label controlling how many grid cells an image card spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Small,
    Wide,
    Tall,
    Large,
    Portrait,
    Landscape,
    Square,
    Panorama,
    Vertical,
    Featured,
}

pub const ALL_VARIANTS: [Variant; 10] = [
    Variant::Small,
    Variant::Wide,
    Variant::Tall,
    Variant::Large,
    Variant::Portrait,
    Variant::Landscape,
    Variant::Square,
    Variant::Panorama,
    Variant::Vertical,
    Variant::Featured,
];

// Fixed draw weights for random_variant, in table order. Sums to 1.0.
const VARIANT_WEIGHTS: [(Variant, f64); 10] = [
    (Variant::Small, 0.20),
    (Variant::Wide, 0.15),
    (Variant::Tall, 0.15),
    (Variant::Large, 0.10),
    (Variant::Portrait, 0.10),
    (Variant::Landscape, 0.15),
    (Variant::Square, 0.05),
    (Variant::Panorama, 0.05),
    (Variant::Vertical, 0.03),
    (Variant::Featured, 0.02),
];

impl Variant {
    /// Grid footprint as (column span, row span).
    pub fn span(self) -> (u32, u32) {
        match self {
            Variant::Small => (1, 1),
            Variant::Wide => (2, 1),
            Variant::Tall => (1, 2),
            Variant::Large => (2, 2),
            Variant::Portrait => (1, 2),
            Variant::Landscape => (2, 1),
            Variant::Square => (1, 1),
            Variant::Panorama => (3, 1),
            Variant::Vertical => (1, 3),
            Variant::Featured => (2, 2),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Small => "small",
            Variant::Wide => "wide",
            Variant::Tall => "tall",
            Variant::Large => "large",
            Variant::Portrait => "portrait",
            Variant::Landscape => "landscape",
            Variant::Square => "square",
            Variant::Panorama => "panorama",
            Variant::Vertical => "vertical",
            Variant::Featured => "featured",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_VARIANTS
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown variant label: {0}")]
pub struct UnknownVariant(pub String);

/// Pick a variant from the image's pixel dimensions.
///
/// Extreme aspect ratios map deterministically; images in the default band
/// (0.7..=1.5) come out `large` with probability 0.3, otherwise `small`.
pub fn assign_variant(width: u32, height: u32) -> Variant {
    assign_variant_with(width, height, &mut rand::thread_rng())
}

pub fn assign_variant_with<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Variant {
    let ratio = width as f64 / height as f64;

    if ratio > 2.2 {
        Variant::Panorama
    } else if ratio > 1.5 {
        Variant::Landscape
    } else if ratio < 0.5 {
        Variant::Vertical
    } else if ratio < 0.7 {
        Variant::Tall
    } else if rng.gen_bool(0.3) {
        Variant::Large
    } else {
        Variant::Small
    }
}

/// Weighted draw over all ten labels, for records with no dimension
/// information at all (legacy backfill).
pub fn random_variant() -> Variant {
    random_variant_with(&mut rand::thread_rng())
}

pub fn random_variant_with<R: Rng + ?Sized>(rng: &mut R) -> Variant {
    let total: f64 = VARIANT_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut draw = rng.gen_range(0.0..total);

    for (variant, weight) in VARIANT_WEIGHTS {
        // First entry whose weight meets-or-exceeds the remaining draw wins.
        if draw <= weight {
            return variant;
        }
        draw -= weight;
    }

    // Unreachable unless float rounding lets the draw fall through the table.
    Variant::Small
}
