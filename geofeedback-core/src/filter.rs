use geofeedback_loader::{Category, Dataset, Facility, RiskLevel};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RiskFilter {
    #[default]
    All,
    Level(RiskLevel),
}

impl RiskFilter {
    pub fn matches(&self, facility: &Facility) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::Level(level) => facility.risk_level == *level,
        }
    }

    /// Selector order: all, high, medium, low, no data.
    pub fn next(self) -> Self {
        match self {
            RiskFilter::All => RiskFilter::Level(RiskLevel::High),
            RiskFilter::Level(RiskLevel::High) => RiskFilter::Level(RiskLevel::Medium),
            RiskFilter::Level(RiskLevel::Medium) => RiskFilter::Level(RiskLevel::Low),
            RiskFilter::Level(RiskLevel::Low) => RiskFilter::Level(RiskLevel::NoData),
            RiskFilter::Level(RiskLevel::NoData) => RiskFilter::All,
        }
    }
}

impl FromStr for RiskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(RiskFilter::All);
        }
        match trimmed.parse::<u8>() {
            Ok(v @ 0..=3) => Ok(RiskFilter::Level(RiskLevel::from_value(v as i64))),
            _ => Err(format!("invalid risk level '{}': expected all, 0, 1, 2 or 3", trimmed)),
        }
    }
}

impl fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFilter::All => f.write_str("all"),
            RiskFilter::Level(level) => write!(f, "{}", level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, facility: &Facility) -> bool {
        match self {
            CategoryFilter::All => true,
            // names outside the known set compare case-insensitively
            CategoryFilter::Only(Category::Other(name)) => match &facility.category {
                Category::Other(other) => other.to_lowercase() == name.to_lowercase(),
                _ => false,
            },
            CategoryFilter::Only(category) => &facility.category == category,
        }
    }

    /// Cycles through the known categories; an unknown category returns to `All`.
    pub fn next(&self) -> Self {
        match self {
            CategoryFilter::All => CategoryFilter::Only(Category::KNOWN[0].clone()),
            CategoryFilter::Only(current) => Category::KNOWN
                .iter()
                .position(|c| c == current)
                .and_then(|pos| Category::KNOWN.get(pos + 1))
                .map(|c| CategoryFilter::Only(c.clone()))
                .unwrap_or(CategoryFilter::All),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(Category::from_name(trimmed)))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => write!(f, "{}", category),
        }
    }
}

/// Conjunction of the two selectors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterState {
    pub risk: RiskFilter,
    pub category: CategoryFilter,
}

impl FilterState {
    pub fn new(risk: RiskFilter, category: CategoryFilter) -> Self {
        Self { risk, category }
    }

    pub fn matches(&self, facility: &Facility) -> bool {
        self.risk.matches(facility) && self.category.matches(facility)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.risk == RiskFilter::All && self.category == CategoryFilter::All
    }

    /// Dataset positions passing both selectors, in dataset order.
    ///
    /// A risk selection walks only that level's index.
    pub fn apply(&self, dataset: &Dataset) -> Vec<usize> {
        match self.risk {
            RiskFilter::Level(level) => dataset
                .positions_with_risk(level)
                .iter()
                .copied()
                .filter(|&idx| dataset.get(idx).is_some_and(|f| self.category.matches(f)))
                .collect(),
            RiskFilter::All => dataset
                .iter()
                .enumerate()
                .filter(|(_, f)| self.category.matches(f))
                .map(|(idx, _)| idx)
                .collect(),
        }
    }
}
