use crate::cluster::{ClusterGroup, ClusterOptions};
use crate::style::{
    CategoryStyle, Rgb, ZONE_FILL_OPACITY, ZONE_STROKE_OPACITY, ZONE_STROKE_WEIGHT, category_style,
    risk_style,
};
use crate::zones::RiskZone;
use geofeedback_loader::{Coordinates, Facility};
use serde::Serialize;
use tracing::info;

/// Popup content: a title line followed by detail lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

impl Popup {
    pub fn to_text(&self) -> String {
        let mut text = self.title.clone();
        for line in &self.lines {
            text.push('\n');
            text.push_str(line);
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneShape {
    pub zone: RiskZone,
    pub fill_color: Rgb,
    pub stroke_color: Rgb,
    pub fill_opacity: f64,
    pub stroke_weight: u8,
    pub stroke_opacity: f64,
    pub popup: Popup,
}

impl ZoneShape {
    pub fn from_zone(zone: &RiskZone) -> Self {
        let style = risk_style(zone.level);
        Self {
            zone: zone.clone(),
            fill_color: style.color,
            stroke_color: style.color,
            fill_opacity: ZONE_FILL_OPACITY,
            stroke_weight: ZONE_STROKE_WEIGHT,
            stroke_opacity: ZONE_STROKE_OPACITY,
            popup: Popup {
                title: format!("Zona de Riesgo {}", style.label),
                lines: vec![format!("Nivel: {}", zone.level)],
            },
        }
    }
}

/// Filled circles for the flood-risk zones. Never filtered.
#[derive(Debug, Clone, Default)]
pub struct RiskLayer {
    shapes: Vec<ZoneShape>,
}

impl RiskLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, zones: &[RiskZone]) {
        self.shapes.clear();
        self.shapes.extend(zones.iter().map(ZoneShape::from_zone));
    }

    pub fn shapes(&self) -> &[ZoneShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Position of the facility in the loaded dataset.
    pub index: usize,
    pub facility: Facility,
    pub coordinates: Coordinates,
    pub style: CategoryStyle,
    pub border_color: Rgb,
    pub popup: Popup,
}

impl Marker {
    pub fn from_facility(index: usize, facility: &Facility) -> Self {
        let risk = risk_style(facility.risk_level);

        let mut lines = vec![
            facility.category.to_string(),
            format!("Nivel de Riesgo: {}", risk.label),
        ];
        if facility.has_address() {
            lines.push(facility.address.clone());
        }

        Self {
            index,
            facility: facility.clone(),
            coordinates: facility.coordinates,
            style: category_style(&facility.category),
            border_color: risk.color,
            popup: Popup {
                title: facility.name.clone(),
                lines,
            },
        }
    }
}

/// Category-styled facility markers held in one cluster container.
#[derive(Debug, Clone, Default)]
pub struct InfrastructureLayer {
    group: ClusterGroup,
}

impl InfrastructureLayer {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            group: ClusterGroup::new(options),
        }
    }

    /// Clear the container and add one marker per `(dataset index, facility)`.
    pub fn rebuild<'a, I>(&mut self, facilities: I)
    where
        I: IntoIterator<Item = (usize, &'a Facility)>,
    {
        self.group.clear_layers();
        for (index, facility) in facilities {
            self.group.add_layer(Marker::from_facility(index, facility));
        }
    }

    pub fn group(&self) -> &ClusterGroup {
        &self.group
    }

    pub fn markers(&self) -> &[Marker] {
        self.group.markers()
    }

    pub fn len(&self) -> usize {
        self.group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    /// Marker click: log the facility attributes and hand back the popup.
    pub fn click(&self, marker: usize) -> Option<&Popup> {
        let marker = self.group.markers().get(marker)?;
        let f = &marker.facility;
        info!(
            name = %f.name,
            category = %f.category,
            risk_level = f.risk_level.as_u8(),
            address = %f.address,
            lon = f.coordinates.lon,
            lat = f.coordinates.lat,
            "Facility details"
        );
        Some(&marker.popup)
    }
}
