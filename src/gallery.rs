use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::calendar::LocalCalendar;
use crate::events::Event;
use crate::index::AssetDateIndex;
use crate::provider::{AuthorizationStatus, PhotoLibrary};
use crate::state::CalendarState;

/// Drives authorization and fetching for one photo library and keeps the
/// resulting state. Background results come back as events and are only
/// applied through [`Gallery::handle`].
pub struct Gallery {
    library: Arc<dyn PhotoLibrary>,
    state: CalendarState,
    event_sink: mpsc::Sender<Event>,
    requesting: bool,
    fetching: bool,
    refetch_pending: bool,
}

impl Gallery {
    pub fn new(
        library: Arc<dyn PhotoLibrary>,
        state: CalendarState,
        event_sink: mpsc::Sender<Event>,
    ) -> Self {
        Gallery {
            library,
            state,
            event_sink,
            requesting: false,
            fetching: false,
            refetch_pending: false,
        }
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CalendarState {
        &mut self.state
    }

    pub fn library(&self) -> &dyn PhotoLibrary {
        self.library.as_ref()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// Whether a background request or fetch is still outstanding.
    pub fn is_busy(&self) -> bool {
        self.requesting || self.fetching
    }

    pub fn check_authorization(&mut self) {
        let status = self.library.authorization_status();
        log::info!(
            "Authorization status of library '{}': {:?}",
            self.library.name(),
            status
        );
        self.state.set_authorization_status(status);

        match status {
            AuthorizationStatus::NotDetermined => self.request_access(),
            AuthorizationStatus::Authorized => self.fetch_photos(),
            AuthorizationStatus::Denied | AuthorizationStatus::Limited => {}
        }
    }

    fn request_access(&mut self) {
        if self.requesting {
            return;
        }
        self.requesting = true;

        let library = self.library.clone();
        let sink = self.event_sink.clone();
        thread::spawn(move || {
            let status = library.request_access();
            let _ = sink.send(Event::AuthorizationChanged(status));
        });
    }

    /// Starts a fetch unless one is running already, in which case another
    /// fetch follows once it finished.
    pub fn fetch_photos(&mut self) {
        if self.fetching {
            self.refetch_pending = true;
            return;
        }
        self.fetching = true;

        let library = self.library.clone();
        let sink = self.event_sink.clone();
        let calendar: LocalCalendar = self.state.calendar().clone();
        thread::spawn(move || {
            let index = library.fetch_all_image_assets().map(|assets| {
                AssetDateIndex::build(assets.into_iter().map(Arc::new), &calendar)
            });
            // a scan may have found parts of the library unreadable
            let status = library.authorization_status();
            let _ = sink.send(Event::AssetsFetched { index, status });
        });
    }

    /// Fetches again if the library was readable so far, otherwise checks
    /// access first.
    pub fn refresh(&mut self) {
        if self.state.authorization_status().has_access() {
            self.fetch_photos();
        } else {
            self.check_authorization();
        }
    }

    /// Applies gallery events. Everything else is handed back.
    pub fn handle(&mut self, event: Event) -> Option<Event> {
        match event {
            Event::AuthorizationChanged(status) => {
                log::info!("Authorization changed: {:?}", status);
                self.requesting = false;
                self.state.set_authorization_status(status);
                if status.is_authorized() {
                    self.fetch_photos();
                }
                None
            }
            Event::AssetsFetched { index, status } => {
                self.fetching = false;
                self.state.set_authorization_status(status);
                match index {
                    Ok(index) => {
                        self.state.publish_index(index);
                    }
                    Err(e) => log::error!("Could not fetch photos: {}", e),
                }
                if std::mem::take(&mut self.refetch_pending) {
                    self.fetch_photos();
                }
                None
            }
            Event::ExternalModification => {
                if self.state.authorization_status().has_access() {
                    self.fetch_photos();
                }
                None
            }
            other => Some(other),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::calendar::{DayKey, YearMonth};
    use crate::events::Dispatcher;
    use crate::provider::{AssetId, Error, ErrorKind, PhotoAsset, Result, Tz};
    use chrono::{TimeZone, Utc, Weekday};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory library with a scripted authorization flow.
    pub(crate) struct FixtureLibrary {
        pub status: Mutex<AuthorizationStatus>,
        pub grant: AuthorizationStatus,
        /// Status left behind by each successive fetch.
        pub after_fetch: Mutex<VecDeque<AuthorizationStatus>>,
        pub assets: Vec<PhotoAsset>,
        pub fail: bool,
    }

    impl FixtureLibrary {
        pub(crate) fn new(
            status: AuthorizationStatus,
            grant: AuthorizationStatus,
            assets: Vec<PhotoAsset>,
        ) -> Self {
            FixtureLibrary {
                status: Mutex::new(status),
                grant,
                after_fetch: Mutex::new(VecDeque::new()),
                assets,
                fail: false,
            }
        }

        pub(crate) fn authorized(assets: Vec<PhotoAsset>) -> Self {
            Self::new(
                AuthorizationStatus::Authorized,
                AuthorizationStatus::Authorized,
                assets,
            )
        }
    }

    impl PhotoLibrary for FixtureLibrary {
        fn name(&self) -> &str {
            "fixture"
        }

        fn authorization_status(&self) -> AuthorizationStatus {
            *self.status.lock().unwrap()
        }

        fn request_access(&self) -> AuthorizationStatus {
            *self.status.lock().unwrap() = self.grant;
            self.grant
        }

        fn fetch_all_image_assets(&self) -> Result<Vec<PhotoAsset>> {
            if let Some(status) = self.after_fetch.lock().unwrap().pop_front() {
                *self.status.lock().unwrap() = status;
            }
            if self.fail {
                Err(Error::new(ErrorKind::LibraryAccess, "fixture failure"))
            } else {
                Ok(self.assets.clone())
            }
        }
    }

    pub(crate) fn photo(id: &str, day: u32) -> PhotoAsset {
        PhotoAsset::new(
            AssetId::from(id.to_owned()),
            Some(Utc.with_ymd_and_hms(2024, 2, day, 12, 0, 0).unwrap()),
            PathBuf::from(id),
        )
    }

    fn gallery_for(library: FixtureLibrary, dispatcher: &Dispatcher) -> Gallery {
        let state = CalendarState::with_month(
            LocalCalendar::new(Tz::utc(), Weekday::Sun),
            YearMonth::new(2024, 2).unwrap(),
        );
        Gallery::new(Arc::new(library), state, dispatcher.event_sink().clone())
    }

    /// Feeds queued events back into the gallery until no fetch is running.
    fn drain(gallery: &mut Gallery, dispatcher: &Dispatcher) {
        while gallery.is_fetching() {
            let event = dispatcher.next().unwrap();
            assert!(gallery.handle(event).is_none());
        }
    }

    #[test]
    fn authorized_library_is_fetched() {
        let dispatcher = Dispatcher::detached();
        let mut gallery = gallery_for(
            FixtureLibrary::authorized(vec![photo("a", 3), photo("b", 3), photo("c", 9)]),
            &dispatcher,
        );

        gallery.check_authorization();
        assert!(gallery.is_fetching());
        drain(&mut gallery, &dispatcher);

        let state = gallery.state();
        assert_eq!(state.authorization_status(), AuthorizationStatus::Authorized);
        assert_eq!(state.index_generation(), 1);
        assert_eq!(state.asset_index().num_assets(), 3);
        assert_eq!(
            state
                .asset_index()
                .lookup(&DayKey::from_ymd(2024, 2, 3).unwrap())
                .len(),
            2
        );
    }

    #[test]
    fn access_is_requested_then_fetched() {
        let dispatcher = Dispatcher::detached();
        let library = FixtureLibrary::new(AuthorizationStatus::NotDetermined, AuthorizationStatus::Authorized, vec![photo("a", 1)]);
        let mut gallery = gallery_for(library, &dispatcher);

        gallery.check_authorization();
        assert!(!gallery.is_fetching());
        assert!(gallery.is_busy());

        let event = dispatcher.next().unwrap();
        assert!(matches!(
            event,
            Event::AuthorizationChanged(AuthorizationStatus::Authorized)
        ));
        assert!(gallery.handle(event).is_none());
        assert!(gallery.is_fetching());
        drain(&mut gallery, &dispatcher);

        assert_eq!(gallery.state().asset_index().num_assets(), 1);
    }

    #[test]
    fn denied_access_never_fetches() {
        let dispatcher = Dispatcher::detached();
        let library = FixtureLibrary::new(AuthorizationStatus::NotDetermined, AuthorizationStatus::Denied, vec![photo("a", 1)]);
        let mut gallery = gallery_for(library, &dispatcher);

        gallery.check_authorization();
        let event = dispatcher.next().unwrap();
        assert!(gallery.handle(event).is_none());

        assert_eq!(
            gallery.state().authorization_status(),
            AuthorizationStatus::Denied
        );
        assert!(!gallery.is_busy());

        gallery.handle(Event::ExternalModification);
        assert!(!gallery.is_fetching());
        assert_eq!(gallery.state().index_generation(), 0);
    }

    #[test]
    fn limited_access_does_not_fetch() {
        let dispatcher = Dispatcher::detached();
        let library = FixtureLibrary::new(AuthorizationStatus::Limited, AuthorizationStatus::Limited, vec![photo("a", 1)]);
        let mut gallery = gallery_for(library, &dispatcher);

        gallery.check_authorization();
        assert!(!gallery.is_fetching());
        assert!(dispatcher.try_next().is_none());
    }

    #[test]
    fn failed_fetch_keeps_previous_index() {
        let dispatcher = Dispatcher::detached();
        let mut library = FixtureLibrary::authorized(vec![photo("a", 1)]);
        library.fail = true;
        let mut gallery = gallery_for(library, &dispatcher);

        gallery.check_authorization();
        drain(&mut gallery, &dispatcher);

        assert!(!gallery.is_fetching());
        assert_eq!(gallery.state().index_generation(), 0);
    }

    #[test]
    fn overlapping_refresh_is_queued() {
        let dispatcher = Dispatcher::detached();
        let mut gallery = gallery_for(FixtureLibrary::authorized(vec![photo("a", 1)]), &dispatcher);

        gallery.check_authorization();
        gallery.refresh();
        gallery.handle(Event::ExternalModification);
        drain(&mut gallery, &dispatcher);

        // one running fetch plus a single follow-up
        assert_eq!(gallery.state().index_generation(), 2);
    }

    #[test]
    fn status_after_fetch_is_published() {
        let dispatcher = Dispatcher::detached();
        let library = FixtureLibrary::authorized(vec![photo("a", 1)]);
        library.after_fetch.lock().unwrap().extend(vec![
            AuthorizationStatus::Limited,
            AuthorizationStatus::Authorized,
        ]);
        let mut gallery = gallery_for(library, &dispatcher);

        gallery.check_authorization();
        drain(&mut gallery, &dispatcher);
        assert_eq!(
            gallery.state().authorization_status(),
            AuthorizationStatus::Limited
        );
        assert_eq!(gallery.state().index_generation(), 1);

        // partial access still refetches, and a complete scan clears it
        gallery.refresh();
        assert!(gallery.is_fetching());
        drain(&mut gallery, &dispatcher);
        assert_eq!(
            gallery.state().authorization_status(),
            AuthorizationStatus::Authorized
        );
        assert_eq!(gallery.state().index_generation(), 2);

        gallery.handle(Event::ExternalModification);
        assert!(gallery.is_fetching());
        drain(&mut gallery, &dispatcher);
        assert_eq!(gallery.state().index_generation(), 3);
    }

    #[test]
    fn foreign_events_are_returned() {
        let dispatcher = Dispatcher::detached();
        let mut gallery = gallery_for(FixtureLibrary::authorized(vec![]), &dispatcher);

        assert!(matches!(gallery.handle(Event::Update), Some(Event::Update)));
    }
}
