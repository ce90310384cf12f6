use crate::calendar::{DayKey, LocalCalendar, YearMonth};
use crate::index::AssetDateIndex;
use crate::provider::{AssetRef, Error, ErrorKind, Result};

/// One slot of the month grid.
#[derive(Clone, Debug, PartialEq)]
pub enum MonthGridCell {
    Empty,
    Day { day: DayKey, photos: Vec<AssetRef> },
}

impl MonthGridCell {
    pub fn day(&self) -> Option<&DayKey> {
        match self {
            MonthGridCell::Empty => None,
            MonthGridCell::Day { day, .. } => Some(day),
        }
    }

    pub fn photos(&self) -> &[AssetRef] {
        match self {
            MonthGridCell::Empty => &[],
            MonthGridCell::Day { photos, .. } => photos.as_slice(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MonthGridCell::Empty)
    }
}

/// Six full weeks of cells for one month.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthGrid {
    month: YearMonth,
    cells: Vec<MonthGridCell>,
}

impl MonthGrid {
    pub const COLUMNS: usize = 7;
    pub const ROWS: usize = 6;
    pub const CELLS: usize = Self::COLUMNS * Self::ROWS;

    /// Lays out `month`: empty cells up to the weekday of the 1st, one cell
    /// per day, then empty cells up to 42.
    pub fn layout(
        month: YearMonth,
        index: &AssetDateIndex,
        calendar: &LocalCalendar,
    ) -> Result<Self> {
        let first = month.first_day()?;
        let num_days = month.num_days()?;
        let offset = calendar.weekday_offset(&first) as usize;

        let mut cells = Vec::with_capacity(Self::CELLS);
        cells.resize(offset, MonthGridCell::Empty);

        for i in 0..num_days {
            let day = calendar
                .date_after(&first, i)
                .map(DayKey::from)
                .ok_or_else(|| Error::new(ErrorKind::InvalidMonth, &month.to_string()))?;

            cells.push(MonthGridCell::Day {
                day,
                photos: index.lookup(&day).to_vec(),
            });
        }

        cells.resize(Self::CELLS, MonthGridCell::Empty);

        Ok(MonthGrid { month, cells })
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn cells(&self) -> &[MonthGridCell] {
        &self.cells
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[MonthGridCell]> {
        self.cells.chunks(Self::COLUMNS)
    }

    pub fn cell_of(&self, day: &DayKey) -> Option<&MonthGridCell> {
        self.cells.iter().find(|cell| cell.day() == Some(day))
    }
}

/// Keeps the last laid out grid until the month or the index changes.
#[derive(Debug, Default)]
pub struct GridCache {
    key: Option<(YearMonth, u64)>,
    grid: Option<MonthGrid>,
}

impl GridCache {
    pub fn new() -> Self {
        GridCache::default()
    }

    /// `generation` identifies the contents of `index`.
    pub fn get(
        &mut self,
        month: YearMonth,
        index: &AssetDateIndex,
        generation: u64,
        calendar: &LocalCalendar,
    ) -> Result<&MonthGrid> {
        let key = (month, generation);
        if self.key != Some(key) || self.grid.is_none() {
            log::trace!("Laying out {} (index generation {})", month, generation);
            self.grid = Some(MonthGrid::layout(month, index, calendar)?);
            self.key = Some(key);
        }

        self.grid
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::InvalidMonth, &month.to_string()))
    }

    /// Grid of the last successful `get`.
    pub fn current(&self) -> Option<&MonthGrid> {
        self.grid.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.grid = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AssetId, PhotoAsset, Tz};
    use chrono::{Datelike, NaiveDate, TimeZone, Utc, Weekday};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn sunday_first() -> LocalCalendar {
        LocalCalendar::new(Tz::utc(), Weekday::Sun)
    }

    fn leading_empty(grid: &MonthGrid) -> usize {
        grid.cells().iter().take_while(|c| c.is_empty()).count()
    }

    fn day_cells(grid: &MonthGrid) -> usize {
        grid.cells().iter().filter(|c| !c.is_empty()).count()
    }

    #[test]
    fn february_2024() {
        let month = YearMonth::new(2024, 2).unwrap();
        let grid = MonthGrid::layout(month, &AssetDateIndex::default(), &sunday_first()).unwrap();

        assert_eq!(grid.cells().len(), 42);
        assert_eq!(leading_empty(&grid), 4);
        assert_eq!(day_cells(&grid), 29);
        assert_eq!(
            grid.cells().iter().rev().take_while(|c| c.is_empty()).count(),
            9
        );
        assert_eq!(
            grid.cells()[4].day(),
            Some(&DayKey::from_ymd(2024, 2, 1).unwrap())
        );
        assert_eq!(grid.weeks().count(), 6);
    }

    #[test]
    fn always_42_cells() {
        for calendar in &[
            LocalCalendar::new(Tz::utc(), Weekday::Sun),
            LocalCalendar::new(Tz::utc(), Weekday::Mon),
            LocalCalendar::new(Tz::utc(), Weekday::Sat),
        ] {
            let mut month = YearMonth::new(1999, 1).unwrap();
            for _ in 0..(12 * 30) {
                let grid = MonthGrid::layout(month, &AssetDateIndex::default(), calendar).unwrap();
                let first = month.first_day().unwrap();

                assert_eq!(grid.cells().len(), MonthGrid::CELLS);
                assert_eq!(day_cells(&grid) as u32, month.num_days().unwrap());
                assert_eq!(
                    leading_empty(&grid) as u32,
                    calendar.weekday_offset(&first)
                );
                assert_eq!(
                    grid.cells()[leading_empty(&grid)].day().unwrap().weekday(),
                    first.weekday()
                );

                month = month.succ().unwrap();
            }
        }
    }

    #[test]
    fn days_are_consecutive() {
        let month = YearMonth::new(2023, 12).unwrap();
        let grid = MonthGrid::layout(month, &AssetDateIndex::default(), &sunday_first()).unwrap();
        let days: Vec<u32> = grid.cells().iter().filter_map(|c| c.day()).map(|d| d.day()).collect();

        assert_eq!(days, (1..=31).collect::<Vec<_>>());
        assert!(grid
            .cells()
            .iter()
            .filter_map(|c| c.day())
            .all(|d| month.contains(d)));
    }

    #[test]
    fn cells_carry_photos() {
        let calendar = sunday_first();
        let asset = Arc::new(PhotoAsset::new(
            AssetId::from("beach.jpg".to_owned()),
            Some(Utc.with_ymd_and_hms(2024, 2, 14, 10, 0, 0).unwrap()),
            PathBuf::from("beach.jpg"),
        ));
        let index = AssetDateIndex::build(vec![asset.clone()], &calendar);

        let grid = MonthGrid::layout(YearMonth::new(2024, 2).unwrap(), &index, &calendar).unwrap();

        let valentines = DayKey::from(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
        assert_eq!(grid.cell_of(&valentines).unwrap().photos(), &[asset][..]);
        assert!(grid
            .cell_of(&DayKey::from_ymd(2024, 2, 15).unwrap())
            .unwrap()
            .photos()
            .is_empty());
        assert!(grid.cells()[0].photos().is_empty());
    }

    #[test]
    fn cache_relayouts_on_change() {
        let calendar = sunday_first();
        let index = AssetDateIndex::default();
        let feb = YearMonth::new(2024, 2).unwrap();
        let mar = YearMonth::new(2024, 3).unwrap();
        let mut cache = GridCache::new();

        assert_eq!(cache.get(feb, &index, 0, &calendar).unwrap().month(), feb);
        assert_eq!(cache.key, Some((feb, 0)));

        assert_eq!(cache.get(mar, &index, 0, &calendar).unwrap().month(), mar);
        assert_eq!(cache.key, Some((mar, 0)));

        cache.get(mar, &index, 1, &calendar).unwrap();
        assert_eq!(cache.key, Some((mar, 1)));

        assert_eq!(cache.current().map(MonthGrid::month), Some(mar));
        cache.invalidate();
        assert!(cache.current().is_none());
    }

    #[test]
    fn cache_reuses_grid_for_same_generation() {
        let calendar = sunday_first();
        let feb = YearMonth::new(2024, 2).unwrap();
        let mut cache = GridCache::new();

        let asset = Arc::new(PhotoAsset::new(
            AssetId::from("a.jpg".to_owned()),
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()),
            PathBuf::from("a.jpg"),
        ));
        let filled = AssetDateIndex::build(vec![asset], &calendar);

        cache.get(feb, &AssetDateIndex::default(), 7, &calendar).unwrap();
        // Same generation: contents of the new index are not looked at.
        let grid = cache.get(feb, &filled, 7, &calendar).unwrap();
        assert!(grid.cells().iter().all(|c| c.photos().is_empty()));

        let grid = cache.get(feb, &filled, 8, &calendar).unwrap();
        assert_eq!(grid.cells().iter().map(|c| c.photos().len()).sum::<usize>(), 1);
    }
}
