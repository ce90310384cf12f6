use std::fmt::{Display, Write};

use chrono::Weekday;
use unsegen::base::style::*;
use unsegen::base::*;
use unsegen::widget::*;

use crate::calendar::{DayKey, LocalCalendar};
use crate::grid::{MonthGrid, MonthGridCell};

use super::ThumbnailLoader;

#[derive(Clone, Debug)]
pub struct Theme {
    pub day_style: StyleModifier,
    pub day_text_style: TextFormatModifier,
    pub weekend_style: StyleModifier,
    pub swatch_style: StyleModifier,
    pub today_day_style: StyleModifier,
    pub today_day_text_style: TextFormatModifier,
    pub today_day_char: Option<char>,
    pub month_header_style: StyleModifier,
    pub month_header_text_style: TextFormatModifier,
    pub status_style: StyleModifier,
    pub swatches: bool,
    pub badge_char: char,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            day_style: StyleModifier::default(),
            day_text_style: TextFormatModifier::default(),
            weekend_style: StyleModifier::default().fg_color(Color::Red),
            swatch_style: StyleModifier::default().fg_color(Color::White),
            today_day_style: StyleModifier::default().invert(true),
            today_day_text_style: TextFormatModifier::default().italic(true),
            today_day_char: Some('*'),
            month_header_style: StyleModifier::default().fg_color(Color::Yellow),
            month_header_text_style: TextFormatModifier::default().bold(true),
            status_style: StyleModifier::default().invert(true),
            swatches: true,
            badge_char: '·',
        }
    }
}

impl Theme {
    /// No colors and no thumbnail swatches.
    pub fn plain() -> Self {
        Theme {
            day_style: StyleModifier::default(),
            day_text_style: TextFormatModifier::default(),
            weekend_style: StyleModifier::default(),
            swatch_style: StyleModifier::default(),
            today_day_style: StyleModifier::default(),
            today_day_text_style: TextFormatModifier::default(),
            month_header_style: StyleModifier::default(),
            month_header_text_style: TextFormatModifier::default(),
            status_style: StyleModifier::default(),
            swatches: false,
            ..Theme::default()
        }
    }
}

pub struct DayCell<'a> {
    day: &'a DayKey,
    count: usize,
    is_today: bool,
    swatch: Option<[u8; 3]>,
    theme: &'a Theme,
}

impl<'a> DayCell<'a> {
    pub const CELL_HEIGHT: usize = 1;
    pub const CELL_WIDTH: usize = 8;

    fn new(day: &'a DayKey, count: usize, theme: &'a Theme) -> Self {
        DayCell {
            day,
            count,
            is_today: false,
            swatch: None,
            theme,
        }
    }

    fn today(mut self, is_today: bool) -> Self {
        self.is_today = is_today;
        self
    }

    fn swatch(mut self, swatch: Option<[u8; 3]>) -> Self {
        self.swatch = swatch;
        self
    }

    fn badge(&self) -> String {
        match self.count {
            0 => String::new(),
            n if n > 999 => format!("{}999", self.theme.badge_char),
            n => format!("{}{}", self.theme.badge_char, n),
        }
    }

    /// Style of the whole cell. A swatch replaces the weekend coloring and
    /// today's marker style goes on top of either.
    fn style(&self) -> StyleModifier {
        let theme = self.theme;
        let mut style = theme.day_style.format(theme.day_text_style);

        match self.swatch {
            Some([r, g, b]) if theme.swatches => {
                style = theme
                    .swatch_style
                    .bg_color(Color::Rgb { r, g, b })
                    .on_top_of(style);
            }
            _ if self.day.is_weekend() => style = theme.weekend_style.on_top_of(style),
            _ => {}
        }

        if self.is_today {
            style = theme
                .today_day_style
                .format(theme.today_day_text_style)
                .on_top_of(style);
        }
        style
    }
}

impl Display for DayCell<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = match (self.is_today, self.theme.today_day_char) {
            (true, Some(c)) => c,
            _ => ' ',
        };
        write!(f, "{}{:>2}{:>5}", marker, self.day.day(), self.badge())
    }
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// One month grid, either as a widget or as plain text lines.
pub struct MonthPane<'a> {
    grid: &'a MonthGrid,
    calendar: &'a LocalCalendar,
    theme: &'a Theme,
    thumbnails: Option<&'a ThumbnailLoader>,
    today: &'a DayKey,
}

impl<'a> MonthPane<'a> {
    const HEADER_ROWS: usize = 2;

    pub fn new(
        grid: &'a MonthGrid,
        calendar: &'a LocalCalendar,
        theme: &'a Theme,
        today: &'a DayKey,
    ) -> Self {
        MonthPane {
            grid,
            calendar,
            theme,
            thumbnails: None,
            today,
        }
    }

    /// Color cells by the average of their thumbnail.
    pub fn thumbnails(mut self, thumbnails: &'a ThumbnailLoader) -> Self {
        self.thumbnails = Some(thumbnails);
        self
    }

    pub fn width() -> usize {
        MonthGrid::COLUMNS * DayCell::CELL_WIDTH
    }

    fn title(&self) -> String {
        let month = self.grid.month();
        format!("{} {}", month.month().name(), month.year())
    }

    fn weekday_label(weekday: Weekday) -> String {
        format!("{:>width$}", weekday.to_string(), width = DayCell::CELL_WIDTH)
    }

    fn day_cell(&self, day: &'a DayKey, photos: usize) -> DayCell<'a> {
        let swatch = self
            .thumbnails
            .and_then(|t| t.get(day))
            .and_then(|thumbnail| thumbnail.average_color());
        DayCell::new(day, photos, self.theme)
            .today(day == self.today)
            .swatch(swatch)
    }

    /// Title, weekday header and one line per week, without styling.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.title()];
        lines.push(
            self.calendar
                .weekdays()
                .map(Self::weekday_label)
                .collect::<String>(),
        );

        for week in self.grid.weeks() {
            let mut line = String::new();
            for cell in week {
                match cell {
                    MonthGridCell::Empty => {
                        line.push_str(&" ".repeat(DayCell::CELL_WIDTH));
                    }
                    MonthGridCell::Day { day, photos } => {
                        let _ = write!(line, "{}", self.day_cell(day, photos.len()));
                    }
                }
            }
            lines.push(line.trim_end().to_owned());
        }

        lines
    }
}

impl Widget for MonthPane<'_> {
    fn space_demand(&self) -> Demand2D {
        Demand2D {
            width: ColDemand::exact(Self::width()),
            height: RowDemand::exact(Self::HEADER_ROWS + MonthGrid::ROWS * DayCell::CELL_HEIGHT),
        }
    }

    fn draw(&self, mut window: Window, _hints: RenderingHints) {
        let theme = self.theme;
        let header_style = theme
            .month_header_style
            .format(theme.month_header_text_style);

        let mut cursor = Cursor::new(&mut window)
            .wrapping_mode(WrappingMode::Wrap)
            .style_modifier(header_style);

        let _ = write!(&mut cursor, "{}", self.title());

        for (column, weekday) in self.calendar.weekdays().enumerate() {
            cursor.move_to(
                ColIndex::new((column * DayCell::CELL_WIDTH) as i32),
                RowIndex::new(1),
            );
            if is_weekend(weekday) {
                cursor.set_style_modifier(theme.weekend_style.on_top_of(header_style));
            } else {
                cursor.set_style_modifier(header_style);
            }
            let _ = write!(&mut cursor, "{}", Self::weekday_label(weekday));
        }

        for (row, week) in self.grid.weeks().enumerate() {
            for (column, cell) in week.iter().enumerate() {
                if let MonthGridCell::Day { day, photos } = cell {
                    let cell = self.day_cell(day, photos.len());
                    cursor.move_to(
                        ColIndex::new((column * DayCell::CELL_WIDTH) as i32),
                        RowIndex::new((Self::HEADER_ROWS + row * DayCell::CELL_HEIGHT) as i32),
                    );
                    cursor.set_style_modifier(cell.style());
                    let _ = write!(&mut cursor, "{}", cell);
                }
            }
        }
    }
}

/// One line of text across the full width, e.g. the status or key help.
pub struct StatusBar<'a> {
    text: &'a str,
    style: StyleModifier,
}

impl<'a> StatusBar<'a> {
    pub fn new(text: &'a str, style: StyleModifier) -> Self {
        StatusBar { text, style }
    }
}

impl Widget for StatusBar<'_> {
    fn space_demand(&self) -> Demand2D {
        Demand2D {
            width: ColDemand::at_least(self.text.chars().count()),
            height: RowDemand::exact(1),
        }
    }

    fn draw(&self, mut window: Window, _hints: RenderingHints) {
        let mut cursor = Cursor::new(&mut window).style_modifier(self.style);
        let _ = write!(&mut cursor, "{}", self.text);
    }
}
