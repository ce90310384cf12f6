mod metadata;
mod thumbnail;

pub use thumbnail::ImageThumbnailer;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use walkdir::WalkDir;

use crate::config::LibraryConfig;
use crate::provider::{AssetId, AuthorizationStatus, PhotoAsset, PhotoLibrary, Tz};

use super::{Error, ErrorKind, Result};

/// A photo library backed by a directory tree of image files.
pub struct DirectoryLibrary {
    root: PathBuf,
    name: String,
    create_missing: bool,
    extensions: Vec<String>,
    mtime_fallback: bool,
    tz: Tz,
    partial_scan: AtomicBool,
}

impl DirectoryLibrary {
    /// EXIF capture times without an offset are read as wall clock times
    /// in `tz`.
    pub fn from_config(config: &LibraryConfig, tz: Tz) -> Self {
        let name = config
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.path.to_string_lossy().into_owned());

        DirectoryLibrary {
            root: config.path.clone(),
            name,
            create_missing: config.create_missing,
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            mtime_fallback: config.mtime_fallback,
            tz,
            partial_scan: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_image(&self, path: &Path) -> bool {
        is_image(&self.extensions, path)
    }

    fn asset_for(&self, path: &Path, stat: &fs::Metadata) -> PhotoAsset {
        let id = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();

        let captured = match metadata::exif_capture_time(path, &self.tz) {
            Ok(captured) => captured,
            Err(e) => {
                log::trace!("No EXIF capture time in '{}': {}", path.display(), e);
                None
            }
        }
        .or_else(|| {
            if self.mtime_fallback {
                stat.modified().ok().map(DateTime::<Utc>::from)
            } else {
                None
            }
        });
        if captured.is_none() {
            log::debug!("No capture date available for '{}'", path.display());
        }

        PhotoAsset::new(AssetId::from(id), captured, path.to_owned())
    }

    /// Installs a watcher which reports changes to image files and folders
    /// below the library root as `Event::ExternalModification`.
    #[must_use = "the library is only watched while the watcher is alive"]
    pub fn watch(
        &self,
        event_sink: mpsc::Sender<crate::events::Event>,
    ) -> Result<notify::RecommendedWatcher> {
        use notify::{RecursiveMode, Watcher};

        let extensions = self.extensions.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if relevant_modification(&extensions, &event) {
                        log::debug!("Library modified: {:?}", event.paths);
                        let _ = event_sink.send(crate::events::Event::ExternalModification);
                    }
                }
                Err(e) => log::error!("watch error: {:?}", e),
            })?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }
}

fn is_image(extensions: &[String], path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map_or(false, |ext| extensions.iter().any(|e| e == &ext))
}

/// Removed or renamed-away folders can no longer be inspected, so paths
/// without an extension count as folders.
fn may_hold_images(extensions: &[String], path: &Path) -> bool {
    is_image(extensions, path) || path.is_dir() || path.extension().is_none()
}

fn relevant_modification(extensions: &[String], event: &notify::Event) -> bool {
    use notify::event::*;
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            event.paths.iter().any(|p| may_hold_images(extensions, p))
        }
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => {
            event.paths.iter().any(|p| is_image(extensions, p))
        }
        _ => false,
    }
}

impl PhotoLibrary for DirectoryLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        match fs::read_dir(&self.root) {
            Ok(_) if self.partial_scan.load(Ordering::Relaxed) => AuthorizationStatus::Limited,
            Ok(_) => AuthorizationStatus::Authorized,
            Err(e) if e.kind() == io::ErrorKind::NotFound => AuthorizationStatus::NotDetermined,
            Err(e) => {
                log::debug!("Library '{}' not readable: {}", self.root.display(), e);
                AuthorizationStatus::Denied
            }
        }
    }

    fn request_access(&self) -> AuthorizationStatus {
        if self.create_missing && !self.root.exists() {
            match fs::create_dir_all(&self.root) {
                Ok(()) => log::info!("Created photo library at '{}'", self.root.display()),
                Err(e) => {
                    log::warn!(
                        "Could not create photo library '{}': {}",
                        self.root.display(),
                        e
                    );
                    return AuthorizationStatus::Denied;
                }
            }
        }

        match self.authorization_status() {
            AuthorizationStatus::NotDetermined => AuthorizationStatus::Denied,
            status => status,
        }
    }

    fn fetch_all_image_assets(&self) -> Result<Vec<PhotoAsset>> {
        if !self.root.is_dir() {
            return Err(Error::new(
                ErrorKind::LibraryAccess,
                &format!("'{}' is not a directory", self.root.display()),
            ));
        }

        let mut partial = false;
        let assets = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("{}", e);
                    partial = true;
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.is_image(entry.path()))
            .filter_map(|entry| match entry.metadata() {
                Ok(metadata) => Some(self.asset_for(entry.path(), &metadata)),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            })
            .sorted_by(|a, b| b.captured().cmp(&a.captured()))
            .collect_vec();

        self.partial_scan.store(partial, Ordering::Relaxed);
        log::info!(
            "Fetched {} assets from library '{}'",
            assets.len(),
            self.name
        );

        Ok(assets)
    }
}
