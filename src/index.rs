use std::collections::BTreeMap;

use crate::calendar::{DayKey, LocalCalendar};
use crate::provider::AssetRef;

/// Photos grouped by the local day they were captured on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetDateIndex {
    days: BTreeMap<DayKey, Vec<AssetRef>>,
    num_assets: usize,
}

impl AssetDateIndex {
    /// Buckets `assets` by local capture day. Order within a day follows
    /// input order; assets without a capture date are skipped.
    pub fn build<I>(assets: I, calendar: &LocalCalendar) -> Self
    where
        I: IntoIterator<Item = AssetRef>,
    {
        let mut index = AssetDateIndex::default();

        for asset in assets {
            let day = match asset.captured() {
                Some(captured) => calendar.day_key(captured),
                None => continue,
            };

            index.days.entry(day).or_insert_with(Vec::new).push(asset);
            index.num_assets += 1;
        }

        log::debug!(
            "Indexed {} assets on {} days",
            index.num_assets,
            index.days.len()
        );

        index
    }

    /// Photos of `day`, empty if there are none.
    pub fn lookup(&self, day: &DayKey) -> &[AssetRef] {
        self.days.get(day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_assets(&self) -> usize {
        self.num_assets
    }

    pub fn num_days(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DayKey, &[AssetRef])> {
        self.days.iter().map(|(day, assets)| (day, assets.as_slice()))
    }
}
