use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::calendar::{DayKey, YearMonth};
use crate::events::Event;
use crate::provider::{AssetId, AssetRef, Thumbnail, ThumbnailRequest, ThumbnailService};

struct Job {
    day: DayKey,
    asset: AssetRef,
}

fn spawn_workers(
    workers: usize,
    service: Arc<dyn ThumbnailService>,
    request: ThumbnailRequest,
    event_sink: mpsc::Sender<Event>,
) -> mpsc::Sender<Job> {
    let (tx, rx) = mpsc::channel::<Job>();
    let rx = Arc::new(Mutex::new(rx));

    for _ in 0..workers.max(1) {
        let rx = rx.clone();
        let service = service.clone();
        let sink = event_sink.clone();
        thread::spawn(move || loop {
            // the lock is released before decoding starts
            let job = match rx.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => return,
            };
            let Job { day, asset } = match job {
                Ok(job) => job,
                Err(_) => return,
            };

            let image = service.request_image(&asset, &request);
            let loaded = Event::ThumbnailLoaded {
                day,
                asset: asset.id().clone(),
                image,
            };
            if sink.send(loaded).is_err() {
                return;
            }
        });
    }

    tx
}

/// Lazily resolves one thumbnail per day cell, always for the cell's first
/// photo. At most one request per day is outstanding.
///
/// Requests are decoded by a fixed pool of worker threads which exit once
/// the loader is dropped.
pub struct ThumbnailLoader {
    jobs: mpsc::Sender<Job>,
    in_flight: HashMap<DayKey, AssetId>,
    resolved: HashMap<DayKey, (AssetId, Option<Thumbnail>)>,
}

impl ThumbnailLoader {
    pub fn new(
        service: Arc<dyn ThumbnailService>,
        request: ThumbnailRequest,
        workers: usize,
        event_sink: mpsc::Sender<Event>,
    ) -> Self {
        ThumbnailLoader {
            jobs: spawn_workers(workers, service, request, event_sink),
            in_flight: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// Returns `true` if a new request was queued.
    pub fn request(&mut self, day: &DayKey, photos: &[AssetRef]) -> bool {
        let first = match photos.first() {
            Some(first) => first,
            None => return false,
        };

        if self.in_flight.contains_key(day) {
            return false;
        }
        if let Some((asset, _)) = self.resolved.get(day) {
            if asset == first.id() {
                return false;
            }
        }

        let job = Job {
            day: *day,
            asset: first.clone(),
        };
        if self.jobs.send(job).is_err() {
            log::warn!("Thumbnail workers are gone, not loading {}", day);
            return false;
        }

        self.in_flight.insert(*day, first.id().clone());
        true
    }

    /// Stores a finished request. A later result for the same day replaces
    /// an earlier one.
    pub fn complete(&mut self, day: DayKey, asset: AssetId, image: Option<Thumbnail>) {
        if image.is_none() {
            log::debug!("No thumbnail for {} ({})", day, asset);
        }
        self.in_flight.remove(&day);
        self.resolved.insert(day, (asset, image));
    }

    pub fn get(&self, day: &DayKey) -> Option<&Thumbnail> {
        self.resolved.get(day).and_then(|(_, image)| image.as_ref())
    }

    pub fn num_pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn num_resolved(&self) -> usize {
        self.resolved.len()
    }

    /// Drops resolved thumbnails of days outside `month`.
    pub fn retain_month(&mut self, month: &YearMonth) {
        self.resolved.retain(|day, _| month.contains(day));
    }

    /// Forgets resolved thumbnails. Outstanding requests still complete.
    pub fn invalidate(&mut self) {
        self.resolved.clear();
    }
}
