//! Monthly query windows.

use chrono::{DateTime, TimeDelta, Utc};

use crate::store::YearMonth;

/// Minutes added past the end of each month so boundary clips are not lost.
pub const WINDOW_OVERLAP_MINUTES: i64 = 5;

/// One calendar month of clip creation times, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    month: YearMonth,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl MonthWindow {
    /// Window for `month`; `None` outside chrono's date range.
    #[must_use]
    pub fn new(month: YearMonth) -> Option<Self> {
        let start = month.first_instant()?;
        let end = month.succ().first_instant()? + TimeDelta::minutes(WINDOW_OVERLAP_MINUTES);
        Some(Self { month, start, end })
    }

    #[must_use]
    pub fn month(&self) -> YearMonth {
        self.month
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Months to walk, from `start` through `until` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestPlan {
    start: YearMonth,
    until: YearMonth,
}

impl HarvestPlan {
    #[must_use]
    pub fn new(start: YearMonth, until: YearMonth) -> Self {
        Self { start, until }
    }

    /// From `start` through the current UTC month.
    #[must_use]
    pub fn through_now(start: YearMonth) -> Self {
        Self::new(start, YearMonth::of(&Utc::now()))
    }

    #[must_use]
    pub fn start(&self) -> YearMonth {
        self.start
    }

    #[must_use]
    pub fn until(&self) -> YearMonth {
        self.until
    }

    /// Windows in chronological order; empty when `start` is after `until`.
    pub fn windows(&self) -> impl Iterator<Item = MonthWindow> + use<> {
        let until = self.until;
        std::iter::successors(Some(self.start), |month| Some(month.succ()))
            .take_while(move |month| *month <= until)
            .map_while(MonthWindow::new)
    }
}
