use std::collections::BTreeMap;

use crate::JobEvent;

/// Dimension along which progress is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    Bytes,
    Files,
    Directories,
    Items,
    /// Job specific unit.
    Other(u16),
}

/// Truncating percentage; `0` when nothing is expected.
pub fn percent_of(processed: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (u128::from(processed) * 100 / u128::from(total)) as u64
}

/// Processed and total amounts per unit plus the derived percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    progress_unit: Unit,
    processed: BTreeMap<Unit, u64>,
    total: BTreeMap<Unit, u64>,
    percent: u64,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(Unit::Bytes)
    }
}

impl ProgressState {
    pub fn new(progress_unit: Unit) -> Self {
        Self {
            progress_unit,
            processed: BTreeMap::new(),
            total: BTreeMap::new(),
            percent: 0,
        }
    }

    pub fn progress_unit(&self) -> Unit {
        self.progress_unit
    }

    pub fn set_progress_unit(&mut self, unit: Unit) {
        self.progress_unit = unit;
    }

    pub fn processed_amount(&self, unit: Unit) -> u64 {
        self.processed.get(&unit).copied().unwrap_or(0)
    }

    pub fn total_amount(&self, unit: Unit) -> u64 {
        self.total.get(&unit).copied().unwrap_or(0)
    }

    pub fn percent(&self) -> u64 {
        self.percent
    }

    pub fn set_processed_amount(&mut self, unit: Unit, amount: u64) -> Vec<JobEvent> {
        let previous = self.processed.insert(unit, amount).unwrap_or(0);
        if previous == amount {
            return Vec::new();
        }

        let mut events = vec![JobEvent::ProcessedAmount { unit, amount }];
        if unit == self.progress_unit {
            events.push(JobEvent::ProcessedSize(amount));
            events.extend(self.recompute_percent());
        }
        events
    }

    pub fn set_total_amount(&mut self, unit: Unit, amount: u64) -> Vec<JobEvent> {
        let previous = self.total.insert(unit, amount).unwrap_or(0);
        if previous == amount {
            return Vec::new();
        }

        let mut events = vec![JobEvent::TotalAmount { unit, amount }];
        if unit == self.progress_unit {
            events.push(JobEvent::TotalSize(amount));
            events.extend(self.recompute_percent());
        }
        events
    }

    pub fn set_percent(&mut self, percent: u64) -> Option<JobEvent> {
        if self.percent == percent {
            return None;
        }
        self.percent = percent;
        Some(JobEvent::Percent(percent))
    }

    // A zero total leaves the last reported percentage untouched.
    fn recompute_percent(&mut self) -> Option<JobEvent> {
        let total = self.total_amount(self.progress_unit);
        if total == 0 {
            return None;
        }
        let processed = self.processed_amount(self.progress_unit);
        self.set_percent(percent_of(processed, total))
    }
}
