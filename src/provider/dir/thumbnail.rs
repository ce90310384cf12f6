use image::imageops::FilterType;
use image::DynamicImage;

use crate::provider::{
    ContentMode, DeliveryMode, PhotoAsset, Result, Thumbnail, ThumbnailRequest, ThumbnailService,
};

/// Decodes image files from disk and scales them down.
#[derive(Debug, Default, Clone)]
pub struct ImageThumbnailer;

impl ImageThumbnailer {
    pub fn new() -> Self {
        ImageThumbnailer
    }

    fn filter_for(mode: DeliveryMode) -> FilterType {
        match mode {
            DeliveryMode::Fast => FilterType::Nearest,
            DeliveryMode::HighQuality => FilterType::Lanczos3,
        }
    }

    fn scale(img: &DynamicImage, request: &ThumbnailRequest) -> DynamicImage {
        let filter = Self::filter_for(request.delivery_mode);
        match request.content_mode {
            ContentMode::AspectFill => img.resize_to_fill(request.width, request.height, filter),
            ContentMode::AspectFit => img.resize(request.width, request.height, filter),
        }
    }

    fn load(&self, asset: &PhotoAsset, request: &ThumbnailRequest) -> Result<Thumbnail> {
        let img = image::open(asset.location())?;
        let rgb = Self::scale(&img, request).to_rgb8();

        Ok(Thumbnail {
            width: rgb.width(),
            height: rgb.height(),
            pixels: rgb.pixels().map(|px| px.0).collect(),
        })
    }
}

impl ThumbnailService for ImageThumbnailer {
    fn request_image(&self, asset: &PhotoAsset, request: &ThumbnailRequest) -> Option<Thumbnail> {
        if request.width == 0 || request.height == 0 {
            return None;
        }

        // Local files never need the network.
        log::trace!(
            "Thumbnail for '{}' ({}x{}, network allowed: {})",
            asset.id(),
            request.width,
            request.height,
            request.network_allowed
        );

        match self.load(asset, request) {
            Ok(thumbnail) => Some(thumbnail),
            Err(e) => {
                log::debug!("No thumbnail for '{}': {}", asset.id(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::dir::tests::scratch_dir;
    use crate::provider::AssetId;
    use image::{Rgb, RgbImage};
    use std::fs;

    fn asset_at(path: &std::path::Path) -> PhotoAsset {
        PhotoAsset::new(AssetId::from("asset".to_owned()), None, path.to_owned())
    }

    #[test]
    fn aspect_fill_matches_target_size() {
        let root = scratch_dir("thumb-fill");
        fs::create_dir_all(&root).unwrap();
        let path = root.join("red.png");
        RgbImage::from_pixel(40, 20, Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();

        let thumbnail = ImageThumbnailer::new()
            .request_image(
                &asset_at(&path),
                &ThumbnailRequest {
                    width: 10,
                    height: 10,
                    delivery_mode: DeliveryMode::Fast,
                    ..ThumbnailRequest::default()
                },
            )
            .unwrap();

        assert_eq!((thumbnail.width, thumbnail.height), (10, 10));
        assert_eq!(thumbnail.pixels.len(), 100);
        assert_eq!(thumbnail.average_color(), Some([255, 0, 0]));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn aspect_fit_keeps_ratio() {
        let root = scratch_dir("thumb-fit");
        fs::create_dir_all(&root).unwrap();
        let path = root.join("blue.png");
        RgbImage::from_pixel(40, 20, Rgb([0, 0, 255]))
            .save(&path)
            .unwrap();

        let thumbnail = ImageThumbnailer::new()
            .request_image(
                &asset_at(&path),
                &ThumbnailRequest {
                    width: 10,
                    height: 10,
                    content_mode: ContentMode::AspectFit,
                    delivery_mode: DeliveryMode::Fast,
                    network_allowed: false,
                },
            )
            .unwrap();

        assert_eq!((thumbnail.width, thumbnail.height), (10, 5));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn undecodable_file_resolves_to_none() {
        let root = scratch_dir("thumb-broken");
        fs::create_dir_all(&root).unwrap();
        let path = root.join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        let thumbnailer = ImageThumbnailer::new();
        assert!(thumbnailer
            .request_image(&asset_at(&path), &ThumbnailRequest::default())
            .is_none());
        assert!(thumbnailer
            .request_image(&asset_at(&root.join("gone.png")), &ThumbnailRequest::default())
            .is_none());

        fs::remove_dir_all(&root).unwrap();
    }
}
