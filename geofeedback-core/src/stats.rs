use geofeedback_loader::{Category, Facility, RiskLevel};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts per risk level over a set of facilities.
///
/// `total == high + medium + low + no_data` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RiskStatistics {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub no_data: usize,
}

impl RiskStatistics {
    pub fn from_facilities<'a, I>(facilities: I) -> Self
    where
        I: IntoIterator<Item = &'a Facility>,
    {
        let mut stats = Self::default();
        for facility in facilities {
            stats.record(facility.risk_level);
        }
        stats
    }

    pub fn record(&mut self, level: RiskLevel) {
        self.total += 1;
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::NoData => self.no_data += 1,
        }
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
            RiskLevel::NoData => self.no_data,
        }
    }

    /// Share of `level` in the total, 0.0 when empty.
    pub fn percentage(&self, level: RiskLevel) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(level) as f64 * 100.0 / self.total as f64
        }
    }
}

/// The four counters shown to the user. Level 0 only contributes to `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatisticsPanel {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl StatisticsPanel {
    pub fn update(&mut self, stats: &RiskStatistics) {
        self.total = stats.total;
        self.high = stats.high;
        self.medium = stats.medium;
        self.low = stats.low;
    }
}

impl From<&RiskStatistics> for StatisticsPanel {
    fn from(stats: &RiskStatistics) -> Self {
        let mut panel = Self::default();
        panel.update(stats);
        panel
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub category: Category,
    pub stats: RiskStatistics,
}

/// Per-category risk counts, largest categories first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategoryBreakdown {
    pub rows: Vec<CategoryCounts>,
}

impl CategoryBreakdown {
    pub fn from_facilities<'a, I>(facilities: I) -> Self
    where
        I: IntoIterator<Item = &'a Facility>,
    {
        let mut by_category: BTreeMap<Category, RiskStatistics> = BTreeMap::new();
        for facility in facilities {
            by_category
                .entry(facility.category.clone())
                .or_default()
                .record(facility.risk_level);
        }

        let mut rows: Vec<CategoryCounts> = by_category
            .into_iter()
            .map(|(category, stats)| CategoryCounts { category, stats })
            .collect();
        // stable sort keeps category order for equal totals
        rows.sort_by(|a, b| b.stats.total.cmp(&a.stats.total));

        Self { rows }
    }

    pub fn get(&self, category: &Category) -> Option<&RiskStatistics> {
        self.rows
            .iter()
            .find(|row| &row.category == category)
            .map(|row| &row.stats)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
