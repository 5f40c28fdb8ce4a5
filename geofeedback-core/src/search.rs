use crate::style::risk_style;
use geofeedback_loader::{Coordinates, Dataset};
use serde::Serialize;

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_RESULTS: usize = 10;
pub const NO_RESULTS_TEXT: &str = "No se encontraron resultados";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Position in the dataset.
    pub index: usize,
    pub name: String,
    /// `"{category} - {risk label}"`
    pub subtitle: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchRow {
    Hit(SearchHit),
    /// Shown alone when nothing matched. Not selectable.
    Placeholder,
}

impl SearchRow {
    pub fn as_hit(&self) -> Option<&SearchHit> {
        match self {
            SearchRow::Hit(hit) => Some(hit),
            SearchRow::Placeholder => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            SearchRow::Hit(hit) => format!("{} ({})", hit.name, hit.subtitle),
            SearchRow::Placeholder => NO_RESULTS_TEXT.to_string(),
        }
    }
}

/// Query text plus the results panel it produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub query: String,
    pub rows: Vec<SearchRow>,
    pub visible: bool,
}

impl SearchState {
    pub fn clear(&mut self) {
        self.query.clear();
        self.rows.clear();
        self.visible = false;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn hits(&self) -> impl Iterator<Item = &SearchHit> + '_ {
        self.rows.iter().filter_map(SearchRow::as_hit)
    }
}

/// Trimmed, lower-cased form used for matching.
pub fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Case-insensitive substring search over name or category of the whole
/// dataset, ignoring active filters.
///
/// Returns `None` for queries shorter than two characters. A query with no
/// matches yields exactly one placeholder row.
pub fn search(dataset: &Dataset, text: &str) -> Option<Vec<SearchRow>> {
    let query = normalize_query(text);
    if query.chars().count() < MIN_QUERY_LEN {
        return None;
    }

    let rows: Vec<SearchRow> = dataset
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            f.name.to_lowercase().contains(&query) || f.category.as_str().to_lowercase().contains(&query)
        })
        .take(MAX_RESULTS)
        .map(|(index, f)| {
            SearchRow::Hit(SearchHit {
                index,
                name: f.name.clone(),
                subtitle: format!("{} - {}", f.category, risk_style(f.risk_level).label),
                coordinates: f.coordinates,
            })
        })
        .collect();

    if rows.is_empty() {
        Some(vec![SearchRow::Placeholder])
    } else {
        Some(rows)
    }
}
