use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::variant::Variant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub src: String,
    pub alt: String,
    pub details: ImageDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub timestamp: DateTime<Utc>,
    // Absent on records persisted before the variant field existed;
    // backfilled once at load time, never recomputed afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
}

impl ImageRecord {
    pub fn new(id: i64, src: String, alt: String, width: u32, height: u32, variant: Variant) -> Self {
        Self {
            id,
            src,
            alt,
            details: ImageDetails {
                width,
                height,
                aspect_ratio: width as f64 / height as f64,
                timestamp: Utc::now(),
                variant: Some(variant),
            },
        }
    }
}
