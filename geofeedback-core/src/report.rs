// Risk report over the (filtered) dataset

use crate::filter::FilterState;
use crate::stats::{CategoryBreakdown, RiskStatistics};
use crate::style::risk_style;
use geofeedback_loader::{DataOrigin, Dataset, RiskLevel};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilitySummary {
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskGroup {
    pub level: RiskLevel,
    pub label: String,
    pub count: usize,
    pub facilities: Vec<FacilitySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<DataOrigin>,
    pub risk_filter: String,
    pub category_filter: String,
    pub statistics: RiskStatistics,
    /// Ordered high, medium, low, no data.
    pub risk_distribution: Vec<RiskGroup>,
    pub categories: CategoryBreakdown,
}

impl ReportData {
    pub fn with_origin(mut self, origin: DataOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    fn origin_label(&self) -> &str {
        self.origin.as_ref().map(DataOrigin::as_str).unwrap_or("unknown")
    }

    /// Every facility in the report, highest risk first.
    fn rows(&self) -> impl Iterator<Item = (&RiskGroup, &FacilitySummary)> + '_ {
        self.risk_distribution
            .iter()
            .flat_map(|group| group.facilities.iter().map(move |f| (group, f)))
    }
}

pub fn gather_report_data(dataset: &Dataset, filters: &FilterState) -> ReportData {
    let positions = filters.apply(dataset);
    let subset: Vec<_> = positions.iter().filter_map(|&idx| dataset.get(idx)).collect();

    let risk_distribution = RiskLevel::ALL
        .iter()
        .rev()
        .map(|&level| {
            let facilities: Vec<FacilitySummary> = subset
                .iter()
                .filter(|f| f.risk_level == level)
                .map(|f| FacilitySummary {
                    name: f.name.clone(),
                    category: f.category.to_string(),
                    address: f.address.clone(),
                    lat: f.coordinates.lat,
                    lon: f.coordinates.lon,
                })
                .collect();
            RiskGroup {
                level,
                label: risk_style(level).label.to_string(),
                count: facilities.len(),
                facilities,
            }
        })
        .collect();

    ReportData {
        generated_at: chrono::Utc::now().to_rfc3339(),
        origin: None,
        risk_filter: filters.risk.to_string(),
        category_filter: filters.category.to_string(),
        statistics: RiskStatistics::from_facilities(subset.iter().copied()),
        risk_distribution,
        categories: CategoryBreakdown::from_facilities(subset.iter().copied()),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();
    let stats = &data.statistics;

    report.push_str(HEAVY_RULE);
    report.push_str("                  GEOFEEDBACK INFRASTRUCTURE RISK REPORT\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    report.push_str(&format!("Generated:    {}\n", data.generated_at));
    report.push_str(&format!("Data source:  {}\n", data.origin_label()));
    report.push_str(&format!(
        "Filters:      risk={} category={}\n",
        data.risk_filter, data.category_filter
    ));
    report.push('\n');

    report.push_str(HEAVY_RULE);
    report.push_str("SUMMARY\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    report.push_str(&format!("Total facilities: {}\n\n", stats.total));
    for level in RiskLevel::ALL.iter().rev() {
        let label = format!("[{}]", risk_style(*level).label.to_uppercase());
        report.push_str(&format!(
            "  {:<12} {:>4}  ({:.1}%)\n",
            label,
            stats.count(*level),
            stats.percentage(*level)
        ));
    }
    report.push('\n');

    report.push_str(HEAVY_RULE);
    report.push_str("RISK DISTRIBUTION\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    for group in &data.risk_distribution {
        report.push_str(&format!("Nivel {} - {} ({})\n", group.level, group.label, group.count));
        if group.facilities.is_empty() {
            report.push_str("  (none)\n");
        }
        for facility in &group.facilities {
            report.push_str(&format!("  • {} [{}]", facility.name, facility.category));
            if !facility.address.is_empty() {
                report.push_str(&format!(" - {}", facility.address));
            }
            report.push('\n');
        }
        report.push('\n');
    }

    if !data.categories.is_empty() {
        report.push_str(HEAVY_RULE);
        report.push_str("BY CATEGORY\n");
        report.push_str(HEAVY_RULE);
        report.push('\n');

        report.push_str(&format!(
            "  {:<16} {:>6} {:>6} {:>6} {:>6} {:>9}\n",
            "Category", "Total", "Alto", "Medio", "Bajo", "Sin Datos"
        ));
        for row in &data.categories.rows {
            report.push_str(&format!(
                "  {:<16} {:>6} {:>6} {:>6} {:>6} {:>9}\n",
                row.category.as_str(),
                row.stats.total,
                row.stats.high,
                row.stats.medium,
                row.stats.low,
                row.stats.no_data
            ));
        }
        report.push('\n');
    }

    report.push_str(HEAVY_RULE);
    report.push_str("                             End of Report\n");
    report.push_str(HEAVY_RULE);
    report.push_str(&format!("\nGenerated by GeoFeedback {}\n", env!("CARGO_PKG_VERSION")));

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "GeoFeedback",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": data.generated_at,
                "format": "json",
                "data_origin": data.origin,
            },
            "filters": {
                "risk": data.risk_filter,
                "category": data.category_filter,
            },
            "summary": data.statistics,
            "risk_distribution": data.risk_distribution,
            "categories": data.categories.rows,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let stats = &data.statistics;
    let mut report = String::new();

    report.push_str("# GeoFeedback Infrastructure Risk Report\n\n");
    report.push_str(&format!("- **Generated:** {}\n", data.generated_at));
    report.push_str(&format!("- **Data source:** {}\n", data.origin_label()));
    report.push_str(&format!(
        "- **Filters:** risk=`{}` category=`{}`\n\n",
        data.risk_filter, data.category_filter
    ));

    report.push_str("## Summary\n\n");
    report.push_str("| Nivel | Facilities | % |\n|---|---:|---:|\n");
    for level in RiskLevel::ALL.iter().rev() {
        report.push_str(&format!(
            "| {} | {} | {:.1} |\n",
            risk_style(*level).label,
            stats.count(*level),
            stats.percentage(*level)
        ));
    }
    report.push_str(&format!("| **Total** | **{}** | |\n\n", stats.total));

    report.push_str("## Risk distribution\n\n");
    for group in &data.risk_distribution {
        report.push_str(&format!("### Nivel {}: {} ({})\n\n", group.level, group.label, group.count));
        for facility in &group.facilities {
            report.push_str(&format!("- {} _({})_\n", escape_markdown(&facility.name), facility.category));
        }
        if !group.facilities.is_empty() {
            report.push('\n');
        }
    }

    if !data.categories.is_empty() {
        report.push_str("## By category\n\n");
        report.push_str("| Category | Total | Alto | Medio | Bajo | Sin Datos |\n");
        report.push_str("|---|---:|---:|---:|---:|---:|\n");
        for row in &data.categories.rows {
            report.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                row.category.as_str(),
                row.stats.total,
                row.stats.high,
                row.stats.medium,
                row.stats.low,
                row.stats.no_data
            ));
        }
    }

    report
}

#[derive(Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    category: &'a str,
    risk_level: RiskLevel,
    risk_label: &'a str,
    lat: f64,
    lon: f64,
    address: &'a str,
}

/// One row per facility, with a header.
pub fn generate_csv_report(data: &ReportData) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (group, facility) in data.rows() {
        writer.serialize(CsvRow {
            name: &facility.name,
            category: &facility.category,
            risk_level: group.level,
            risk_label: &group.label,
            lat: facility.lat,
            lon: facility.lon,
            address: &facility.address,
        })?;
    }
    // an empty report still carries the header
    if data.statistics.total == 0 {
        writer.write_record(["name", "category", "risk_level", "risk_label", "lat", "lon", "address"])?;
    }

    let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> anyhow::Result<String> {
    Ok(match format {
        ReportFormat::Text => generate_text_report(data),
        ReportFormat::Json => generate_json_report(data)?,
        ReportFormat::Csv => generate_csv_report(data)?,
        ReportFormat::Markdown => generate_markdown_report(data),
    })
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace('_', "\\_").replace('*', "\\*")
}
