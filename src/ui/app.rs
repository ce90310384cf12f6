use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;

use unsegen::base::style::StyleModifier;
use unsegen::base::Terminal;
use unsegen::input::{Input, Key, Navigatable, NavigateBehavior, OperationResult};
use unsegen::widget::*;

use crate::calendar::DayKey;
use crate::config::Config;
use crate::events::{Dispatcher, Event};
use crate::gallery::Gallery;
use crate::grid::{GridCache, MonthGridCell};
use crate::provider::{AuthorizationStatus, PhotoLibrary, Result, ThumbnailService};
use crate::state::{CalendarState, StateChange};

use super::{MonthPane, StatusBar, Theme, ThumbnailLoader};

const KEY_HELP: &str = "[h] prev  [l] next  [t] today  [r] refresh  [q] quit";

pub struct App {
    gallery: Gallery,
    grid_cache: GridCache,
    thumbnails: ThumbnailLoader,
    theme: Theme,
    today: DayKey,
    dirty: Rc<Cell<bool>>,
    index_changed: Rc<Cell<bool>>,
}

impl App {
    pub fn new(
        config: &Config,
        library: Arc<dyn PhotoLibrary>,
        thumbnailer: Arc<dyn ThumbnailService>,
        dispatcher: &Dispatcher,
    ) -> App {
        let mut state = CalendarState::new(config.calendar.clone());

        let dirty = Rc::new(Cell::new(true));
        let index_changed = Rc::new(Cell::new(false));
        {
            let dirty = dirty.clone();
            let index_changed = index_changed.clone();
            state.subscribe(move |change, _| {
                dirty.set(true);
                if let StateChange::Index { .. } = change {
                    index_changed.set(true);
                }
            });
        }

        let sink = dispatcher.event_sink().clone();
        App {
            gallery: Gallery::new(library, state, sink.clone()),
            grid_cache: GridCache::new(),
            thumbnails: ThumbnailLoader::new(
                thumbnailer,
                config.thumbnail.request(),
                config.thumbnail.workers,
                sink,
            ),
            theme: Theme::default(),
            today: config.calendar.today(),
            dirty,
            index_changed,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn state_mut(&mut self) -> &mut CalendarState {
        self.gallery.state_mut()
    }

    /// Returns `false` once the user asked to quit.
    fn handle_input(&mut self, input: Input) -> bool {
        let mut run = true;
        let mut today = false;
        let mut refresh = false;

        input
            .chain((Key::Char('q'), || run = false))
            .chain((Key::Ctrl('c'), || run = false))
            .chain((Key::Esc, || run = false))
            .chain((Key::Char('t'), || today = true))
            .chain((Key::Char('r'), || refresh = true))
            .chain(
                NavigateBehavior::new(&mut MonthBehaviour(self.gallery.state_mut()))
                    .left_on(Key::Char('h'))
                    .right_on(Key::Char('l')),
            )
            .chain(
                NavigateBehavior::new(&mut MonthBehaviour(self.gallery.state_mut()))
                    .left_on(Key::Left)
                    .right_on(Key::Right),
            )
            .finish();

        if today {
            self.gallery.state_mut().show_today();
        }
        if refresh {
            self.gallery.refresh();
        }
        run
    }

    fn handle(&mut self, event: Event) -> bool {
        match self.gallery.handle(event) {
            Some(Event::Input(input)) => return self.handle_input(input),
            Some(Event::ThumbnailLoaded { day, asset, image }) => {
                self.thumbnails.complete(day, asset, image);
                self.dirty.set(true);
            }
            Some(Event::Resize) => self.dirty.set(true),
            Some(Event::Update) => {
                let today = self.gallery.state().calendar().today();
                if today != self.today {
                    self.today = today;
                    self.dirty.set(true);
                }
            }
            _ => {}
        }

        if self.index_changed.replace(false) {
            self.thumbnails.invalidate();
        }
        true
    }

    fn status_line(&self) -> String {
        let state = self.gallery.state();
        let name = self.gallery.library().name();
        match state.authorization_status() {
            AuthorizationStatus::NotDetermined => {
                format!("Waiting for access to '{}'...", name)
            }
            AuthorizationStatus::Denied => format!(
                "Access to '{}' denied. Grant read access and press 'r' to retry.",
                name
            ),
            AuthorizationStatus::Limited => format!(
                "Only limited access to '{}'. Press 'r' to retry.",
                name
            ),
            AuthorizationStatus::Authorized if self.gallery.is_fetching() => {
                format!("Loading photos from '{}'...", name)
            }
            AuthorizationStatus::Authorized => {
                let index = state.asset_index();
                format!(
                    "{} photos on {} days in '{}'",
                    index.num_assets(),
                    index.num_days(),
                    name
                )
            }
        }
    }

    /// Lays out the current month into the grid cache. With
    /// `load_thumbnails` set, thumbnails of other months are dropped and
    /// visible cells with photos are requested.
    fn layout_month(&mut self, load_thumbnails: bool) -> Result<()> {
        let state = self.gallery.state();
        let grid = match self.grid_cache.get(
            state.current_month(),
            state.asset_index(),
            state.index_generation(),
            state.calendar(),
        ) {
            Ok(grid) => grid,
            Err(e) => {
                self.grid_cache.invalidate();
                return Err(e);
            }
        };

        if load_thumbnails {
            self.thumbnails.retain_month(&grid.month());
            for cell in grid.cells() {
                if let MonthGridCell::Day { day, photos } = cell {
                    self.thumbnails.request(day, photos);
                }
            }
        }

        Ok(())
    }

    fn draw(&mut self, term: &mut Terminal) {
        let status = match self.layout_month(true) {
            Ok(()) => self.status_line(),
            Err(e) => {
                log::error!("{}", e);
                e.to_string()
            }
        };

        let root = term.create_root_window();

        let mut layout = VLayout::new();
        if let Some(grid) = self.grid_cache.current() {
            layout = layout.widget(
                MonthPane::new(
                    grid,
                    self.gallery.state().calendar(),
                    &self.theme,
                    &self.today,
                )
                .thumbnails(&self.thumbnails),
            );
        }
        layout
            .widget(StatusBar::new(&status, self.theme.status_style))
            .widget(StatusBar::new(KEY_HELP, StyleModifier::default()))
            .draw(root, RenderingHints::new());

        term.present();
    }

    pub fn run(&mut self, dispatcher: Dispatcher, mut term: Terminal) -> io::Result<()> {
        self.gallery.check_authorization();

        let mut run = true;
        while run {
            if self.dirty.replace(false) {
                self.draw(&mut term);
            }

            match dispatcher.next() {
                Ok(event) => run = self.handle(event),
                Err(_) => break,
            }

            // Apply everything already queued before drawing again.
            while run {
                match dispatcher.try_next() {
                    Some(event) => run = self.handle(event),
                    None => break,
                }
            }
        }

        Ok(())
    }

    /// Loads the library once and prints the month without thumbnails.
    pub fn show<W: Write>(&mut self, dispatcher: &Dispatcher, out: &mut W) -> io::Result<()> {
        self.gallery.check_authorization();
        while self.gallery.is_busy() {
            match dispatcher.next() {
                Ok(event) => {
                    self.gallery.handle(event);
                }
                Err(_) => break,
            }
        }

        let mut lines = match self.layout_month(false) {
            Ok(()) => match self.grid_cache.current() {
                Some(grid) => MonthPane::new(
                    grid,
                    self.gallery.state().calendar(),
                    &self.theme,
                    &self.today,
                )
                .lines(),
                None => Vec::new(),
            },
            Err(e) => vec![e.to_string()],
        };
        lines.push(String::new());
        lines.push(self.status_line());

        for line in lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()
    }
}

/// Moves the displayed month. There is no vertical navigation.
struct MonthBehaviour<'a>(&'a mut CalendarState);

impl Navigatable for MonthBehaviour<'_> {
    fn move_up(&mut self) -> OperationResult {
        Err(())
    }

    fn move_down(&mut self) -> OperationResult {
        Err(())
    }

    fn move_left(&mut self) -> OperationResult {
        self.0.prev_month().map_err(|e| log::warn!("{}", e))
    }

    fn move_right(&mut self) -> OperationResult {
        self.0.next_month().map_err(|e| log::warn!("{}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{LocalCalendar, YearMonth};
    use crate::gallery::tests::{photo, FixtureLibrary};
    use crate::provider::{PhotoAsset, Thumbnail, ThumbnailRequest, Tz};
    use chrono::Weekday;
    use unsegen::input::Event as InputEvent;

    struct SolidThumbnails;

    impl ThumbnailService for SolidThumbnails {
        fn request_image(&self, _: &PhotoAsset, _: &ThumbnailRequest) -> Option<Thumbnail> {
            Some(Thumbnail {
                width: 1,
                height: 1,
                pixels: vec![[0, 128, 0]],
            })
        }
    }

    fn app_for(library: FixtureLibrary, dispatcher: &Dispatcher) -> App {
        let config = Config {
            calendar: LocalCalendar::new(Tz::utc(), Weekday::Sun),
            ..Config::default()
        };
        let mut app = App::new(
            &config,
            Arc::new(library),
            Arc::new(SolidThumbnails),
            dispatcher,
        )
        .with_theme(Theme::plain());
        app.state_mut()
            .set_current_month(YearMonth::new(2024, 2).unwrap());
        app
    }

    #[test]
    fn show_prints_month_with_badges() {
        let dispatcher = Dispatcher::detached();
        let mut app = app_for(
            FixtureLibrary::authorized(vec![photo("a", 14), photo("b", 14)]),
            &dispatcher,
        );

        let mut out = Vec::new();
        app.show(&dispatcher, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("February 2024\n"));
        assert!(text.contains("  14   ·2"));
        assert!(text.contains("2 photos on 1 days in 'fixture'"));
    }

    #[test]
    fn denied_library_shows_prompt() {
        let dispatcher = Dispatcher::detached();
        let library = FixtureLibrary::new(
            AuthorizationStatus::Denied,
            AuthorizationStatus::Denied,
            vec![photo("a", 1)],
        );
        let mut app = app_for(library, &dispatcher);

        let mut out = Vec::new();
        app.show(&dispatcher, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Access to 'fixture' denied"));
        assert!(!text.contains('·'));
    }

    fn key(key: Key) -> Event {
        Event::Input(Input {
            event: InputEvent::Key(key),
            raw: Vec::new(),
        })
    }

    #[test]
    fn keys_navigate_months() {
        let dispatcher = Dispatcher::detached();
        let mut app = app_for(FixtureLibrary::authorized(vec![]), &dispatcher);

        assert!(app.handle(key(Key::Char('l'))));
        assert_eq!(
            app.gallery.state().current_month(),
            YearMonth::new(2024, 3).unwrap()
        );
        assert!(app.handle(key(Key::Left)));
        assert!(app.handle(key(Key::Char('h'))));
        assert_eq!(
            app.gallery.state().current_month(),
            YearMonth::new(2024, 1).unwrap()
        );
        assert!(app.handle(key(Key::Right)));
        assert_eq!(
            app.gallery.state().current_month(),
            YearMonth::new(2024, 2).unwrap()
        );
        assert!(!app.handle(key(Key::Char('q'))));
        assert!(!app.handle(key(Key::Esc)));
    }

    #[test]
    fn vertical_keys_keep_the_month() {
        let dispatcher = Dispatcher::detached();
        let mut app = app_for(FixtureLibrary::authorized(vec![]), &dispatcher);
        let february = YearMonth::new(2024, 2).unwrap();

        for k in vec![Key::Char('j'), Key::Char('k'), Key::Up, Key::Down] {
            assert!(app.handle(key(k)));
            assert_eq!(app.gallery.state().current_month(), february);
        }
    }

    #[test]
    fn resize_requests_redraw() {
        let dispatcher = Dispatcher::detached();
        let mut app = app_for(FixtureLibrary::authorized(vec![]), &dispatcher);

        app.dirty.set(false);
        assert!(app.handle(Event::Resize));
        assert!(app.dirty.get());
    }

    #[test]
    fn thumbnails_are_requested_for_photo_cells() {
        let dispatcher = Dispatcher::detached();
        let mut app = app_for(
            FixtureLibrary::authorized(vec![photo("a", 3), photo("b", 3), photo("c", 20)]),
            &dispatcher,
        );

        app.gallery.check_authorization();
        while app.gallery.is_busy() {
            let event = dispatcher.next().unwrap();
            assert!(app.handle(event));
        }

        app.layout_month(true).unwrap();
        assert_eq!(app.thumbnails.num_pending(), 2);

        while app.thumbnails.num_pending() > 0 {
            let event = dispatcher.next().unwrap();
            assert!(app.handle(event));
        }

        let third = crate::calendar::DayKey::from_ymd(2024, 2, 3).unwrap();
        assert_eq!(
            app.thumbnails.get(&third).and_then(|t| t.average_color()),
            Some([0, 128, 0])
        );

        // resolved cells are not requested again
        app.layout_month(true).unwrap();
        assert_eq!(app.thumbnails.num_pending(), 0);

        // moving on drops thumbnails of the previous month
        assert!(app.handle(key(Key::Char('l'))));
        app.layout_month(true).unwrap();
        assert_eq!(app.thumbnails.num_resolved(), 0);
        assert!(app.thumbnails.get(&third).is_none());
    }
}
