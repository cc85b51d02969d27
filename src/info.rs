use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Output template asking yt-dlp for exactly these four fields as compact JSON.
pub(crate) const INFO_TEMPLATE: &str = "%(.{id,title,thumbnail,duration})#j";

/// Metadata for a single video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VideoInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnail: String,
    /// Length in whole seconds.
    #[serde(default, deserialize_with = "seconds")]
    pub duration: u64,
}

impl VideoInfo {
    /// Decode the single JSON object yt-dlp printed.
    pub fn from_json(stdout: &str) -> Result<Self> {
        serde_json::from_str(stdout.trim()).map_err(Error::Decode)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// yt-dlp reports durations as integers for most extractors but as floats for some.
fn seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Number>::deserialize(deserializer)? {
        None => Ok(0),
        Some(n) => {
            if let Some(secs) = n.as_u64() {
                Ok(secs)
            } else if let Some(secs) = n.as_f64().filter(|f| *f >= 0.0) {
                Ok(secs as u64)
            } else {
                Err(<D::Error as serde::de::Error>::custom(format!(
                    "invalid duration: {n}"
                )))
            }
        }
    }
}
