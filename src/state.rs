use std::sync::Arc;
use uuid::Uuid;

use crate::calendar::{LocalCalendar, YearMonth};
use crate::index::AssetDateIndex;
use crate::provider::{AuthorizationStatus, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    Authorization(AuthorizationStatus),
    Index { generation: u64 },
    Month(YearMonth),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

type Subscriber = Box<dyn FnMut(&StateChange, &CalendarSnapshot)>;

/// Read-only view handed to subscribers.
#[derive(Clone, Debug)]
pub struct CalendarSnapshot {
    pub authorization_status: AuthorizationStatus,
    pub asset_index: Arc<AssetDateIndex>,
    pub index_generation: u64,
    pub current_month: YearMonth,
}

/// Everything the calendar view renders from. Only touched on the UI thread.
pub struct CalendarState {
    calendar: LocalCalendar,
    snapshot: CalendarSnapshot,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
}

impl CalendarState {
    pub fn new(calendar: LocalCalendar) -> Self {
        let current_month = calendar.current_month();
        Self::with_month(calendar, current_month)
    }

    pub fn with_month(calendar: LocalCalendar, current_month: YearMonth) -> Self {
        CalendarState {
            calendar,
            snapshot: CalendarSnapshot {
                authorization_status: AuthorizationStatus::NotDetermined,
                asset_index: Arc::new(AssetDateIndex::default()),
                index_generation: 0,
                current_month,
            },
            subscribers: Vec::new(),
        }
    }

    pub fn calendar(&self) -> &LocalCalendar {
        &self.calendar
    }

    pub fn snapshot(&self) -> &CalendarSnapshot {
        &self.snapshot
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.snapshot.authorization_status
    }

    pub fn asset_index(&self) -> &Arc<AssetDateIndex> {
        &self.snapshot.asset_index
    }

    pub fn index_generation(&self) -> u64 {
        self.snapshot.index_generation
    }

    pub fn current_month(&self) -> YearMonth {
        self.snapshot.current_month
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&StateChange, &CalendarSnapshot) + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        before != self.subscribers.len()
    }

    fn notify(&mut self, change: StateChange) {
        log::debug!("State change: {:?}", change);
        let snapshot = &self.snapshot;
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&change, snapshot);
        }
    }

    pub fn set_authorization_status(&mut self, status: AuthorizationStatus) {
        if self.snapshot.authorization_status != status {
            self.snapshot.authorization_status = status;
            self.notify(StateChange::Authorization(status));
        }
    }

    /// Publishes a freshly built index and returns its generation.
    pub fn publish_index(&mut self, index: AssetDateIndex) -> u64 {
        self.snapshot.asset_index = Arc::new(index);
        self.snapshot.index_generation += 1;

        let generation = self.snapshot.index_generation;
        self.notify(StateChange::Index { generation });
        generation
    }

    pub fn set_current_month(&mut self, month: YearMonth) {
        if self.snapshot.current_month != month {
            self.snapshot.current_month = month;
            self.notify(StateChange::Month(month));
        }
    }

    pub fn next_month(&mut self) -> Result<()> {
        let month = self.current_month().succ()?;
        self.set_current_month(month);
        Ok(())
    }

    pub fn prev_month(&mut self) -> Result<()> {
        let month = self.current_month().pred()?;
        self.set_current_month(month);
        Ok(())
    }

    pub fn show_today(&mut self) {
        let month = self.calendar.current_month();
        self.set_current_month(month);
    }
}
