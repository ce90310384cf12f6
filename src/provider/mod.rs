use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod dir;
pub mod error;
pub mod tz;

pub use dir::{DirectoryLibrary, ImageThumbnailer};
pub use error::{Error, ErrorKind};
pub use tz::Tz;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Display, From, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A photo as handed out by a library. Never modified after fetching.
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoAsset {
    id: AssetId,
    captured: Option<DateTime<Utc>>,
    location: PathBuf,
}

pub type AssetRef = Arc<PhotoAsset>;

impl PhotoAsset {
    pub fn new(id: AssetId, captured: Option<DateTime<Utc>>, location: PathBuf) -> Self {
        PhotoAsset {
            id,
            captured,
            location,
        }
    }

    pub fn id(&self) -> &AssetId {
        &self.id
    }

    pub fn captured(&self) -> Option<&DateTime<Utc>> {
        self.captured.as_ref()
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
    Limited,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }

    /// Whether at least part of the library can be read.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            AuthorizationStatus::Authorized | AuthorizationStatus::Limited
        )
    }
}

impl Default for AuthorizationStatus {
    fn default() -> Self {
        AuthorizationStatus::NotDetermined
    }
}

/// Permission and fetch side of a photo store.
pub trait PhotoLibrary: Send + Sync {
    fn name(&self) -> &str;

    fn authorization_status(&self) -> AuthorizationStatus;

    /// May block, e.g. while the user answers a prompt.
    fn request_access(&self) -> AuthorizationStatus;

    /// All image assets, newest first. Assets without a capture date come last.
    fn fetch_all_image_assets(&self) -> Result<Vec<PhotoAsset>>;
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ContentMode {
    AspectFill,
    AspectFit,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    Fast,
    HighQuality,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThumbnailRequest {
    pub width: u32,
    pub height: u32,
    pub content_mode: ContentMode,
    pub delivery_mode: DeliveryMode,
    pub network_allowed: bool,
}

impl Default for ThumbnailRequest {
    fn default() -> Self {
        ThumbnailRequest {
            width: 200,
            height: 200,
            content_mode: ContentMode::AspectFill,
            delivery_mode: DeliveryMode::HighQuality,
            network_allowed: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 3]>,
}

impl Thumbnail {
    pub fn average_color(&self) -> Option<[u8; 3]> {
        if self.pixels.is_empty() {
            return None;
        }

        let sums = self.pixels.iter().fold([0u64; 3], |mut acc, px| {
            acc.iter_mut().zip(px.iter()).for_each(|(a, &c)| *a += c as u64);
            acc
        });
        let n = self.pixels.len() as u64;

        Some([(sums[0] / n) as u8, (sums[1] / n) as u8, (sums[2] / n) as u8])
    }
}

pub trait ThumbnailService: Send + Sync {
    /// Resolves to `None` on any failure.
    fn request_image(&self, asset: &PhotoAsset, request: &ThumbnailRequest) -> Option<Thumbnail>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_color_of_thumbnail() {
        let thumbnail = Thumbnail {
            width: 2,
            height: 1,
            pixels: vec![[200, 0, 10], [100, 50, 30]],
        };
        assert_eq!(thumbnail.average_color(), Some([150, 25, 20]));

        let empty = Thumbnail {
            width: 0,
            height: 0,
            pixels: vec![],
        };
        assert_eq!(empty.average_color(), None);
    }

    #[test]
    fn content_mode_names() {
        #[derive(Deserialize)]
        struct Modes {
            content: ContentMode,
            delivery: DeliveryMode,
        }

        let modes: Modes =
            toml::from_str("content = \"aspect-fit\"\ndelivery = \"fast\"").unwrap();
        assert_eq!(modes.content, ContentMode::AspectFit);
        assert_eq!(modes.delivery, DeliveryMode::Fast);
    }
}
