// Application state: owns the map, the dataset, the layers and the UI state

use crate::cluster::Cluster;
use crate::config::AppConfig;
use crate::filter::{CategoryFilter, FilterState, RiskFilter};
use crate::layers::{InfrastructureLayer, Popup, RiskLayer};
use crate::map::{LayerId, MapView, Point, Viewport};
use crate::search::{SearchRow, SearchState, search};
use crate::stats::{RiskStatistics, StatisticsPanel};
use crate::zones::RiskZone;
use geofeedback_loader::{Dataset, DataOrigin, Facility};
use tracing::{debug, info};

pub struct MapController {
    map: MapView,
    dataset: Dataset,
    origin: Option<DataOrigin>,
    zones: Vec<RiskZone>,
    risk_layer: RiskLayer,
    infrastructure_layer: InfrastructureLayer,
    stats: RiskStatistics,
    panel: StatisticsPanel,
    filters: FilterState,
    search: SearchState,
    visible: Vec<usize>,
    popup: Option<Popup>,
    focus_zoom: u8,
}

impl MapController {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            map: MapView::new(&config.map),
            dataset: Dataset::default(),
            origin: None,
            zones: config.risk_zones.clone(),
            risk_layer: RiskLayer::new(),
            infrastructure_layer: InfrastructureLayer::new(config.cluster),
            stats: RiskStatistics::default(),
            panel: StatisticsPanel::default(),
            filters: FilterState::default(),
            search: SearchState::default(),
            visible: Vec::new(),
            popup: None,
            focus_zoom: config.map.focus_zoom,
        }
    }

    /// Install a freshly loaded dataset, replacing any previous one.
    ///
    /// The first load builds the risk layer and puts both overlays on the
    /// map; later loads keep the user's layer toggles.
    pub fn set_dataset(&mut self, dataset: Dataset, origin: DataOrigin) {
        let first_load = self.origin.is_none();
        info!("Installing {} facilities ({})", dataset.len(), origin.as_str());

        self.dataset = dataset;
        self.origin = Some(origin);
        self.risk_layer.rebuild(&self.zones);

        if first_load {
            self.map.add_layer(LayerId::Risk);
            self.map.add_layer(LayerId::Infrastructure);
        }

        self.search.clear();
        self.popup = None;
        self.apply_filters();
    }

    pub fn is_loaded(&self) -> bool {
        self.origin.is_some()
    }

    pub fn set_layer_visible(&mut self, layer: LayerId, visible: bool) {
        if visible {
            self.map.add_layer(layer);
        } else {
            self.map.remove_layer(layer);
        }
    }

    pub fn toggle_layer(&mut self, layer: LayerId) {
        let visible = self.map.has_layer(layer);
        self.set_layer_visible(layer, !visible);
    }

    pub fn layer_visible(&self, layer: LayerId) -> bool {
        self.map.has_layer(layer)
    }

    pub fn set_risk_filter(&mut self, risk: RiskFilter) {
        self.filters.risk = risk;
        self.apply_filters();
    }

    pub fn set_category_filter(&mut self, category: CategoryFilter) {
        self.filters.category = category;
        self.apply_filters();
    }

    /// Rebuild the marker container and statistics from the filtered subset.
    pub fn apply_filters(&mut self) {
        self.visible = self.filters.apply(&self.dataset);

        let dataset = &self.dataset;
        let subset = self
            .visible
            .iter()
            .filter_map(|&idx| dataset.get(idx).map(|f| (idx, f)));
        self.infrastructure_layer.rebuild(subset);

        self.stats = RiskStatistics::from_facilities(self.visible_facilities());
        self.panel.update(&self.stats);

        debug!(
            "Filters risk={} category={} -> {} facilities",
            self.filters.risk,
            self.filters.category,
            self.visible.len()
        );
    }

    pub fn search_input(&mut self, text: &str) {
        self.search.query = text.to_string();
        match search(&self.dataset, text) {
            Some(rows) => {
                self.search.rows = rows;
                self.search.visible = true;
            }
            None => {
                self.search.rows.clear();
                self.search.visible = false;
            }
        }
    }

    /// Jump to a result row. Returns false for the placeholder or an out-of-range row.
    pub fn select_search_result(&mut self, row: usize) -> bool {
        let Some(SearchRow::Hit(hit)) = self.search.rows.get(row) else {
            return false;
        };
        let coordinates = hit.coordinates;
        debug!("Search result selected: {}", hit.name);

        self.map.set_view(coordinates, self.focus_zoom);
        self.search.clear();
        true
    }

    pub fn dismiss_search(&mut self) {
        self.search.hide();
    }

    /// Open the popup of one marker in the infrastructure container.
    pub fn click_marker(&mut self, marker: usize) -> Option<&Popup> {
        self.popup = self.infrastructure_layer.click(marker).cloned();
        self.popup.as_ref()
    }

    /// A single-member cluster behaves like its marker; a group zooms the
    /// map to its bounds, at least one level further in.
    pub fn click_cluster(&mut self, cluster: &Cluster, viewport: Viewport) -> Option<&Popup> {
        if cluster.is_single() {
            return self.click_marker(cluster.members[0]);
        }

        if self.infrastructure_layer.group().options().zoom_to_bounds_on_click {
            let current = self.map.zoom();
            self.map.fit_bounds(&cluster.bounds, viewport);
            if self.map.zoom() <= current {
                self.map.set_zoom(current.saturating_add(1));
            }
        }
        self.popup = None;
        None
    }

    /// Popup of the risk zone under a screen point, nearest center first.
    pub fn click_zone_at(&mut self, point: Point, viewport: Viewport) -> Option<&Popup> {
        if !self.map.has_layer(LayerId::Risk) {
            return None;
        }
        let coords = self.map.from_screen(point, viewport);
        self.popup = self
            .risk_layer
            .shapes()
            .iter()
            .filter(|shape| shape.zone.contains(coords))
            .min_by(|a, b| a.zone.distance_to(coords).total_cmp(&b.zone.distance_to(coords)))
            .map(|shape| shape.popup.clone());
        self.popup.as_ref()
    }

    pub fn clusters(&self, viewport: Viewport) -> Vec<Cluster> {
        self.infrastructure_layer.group().clusters(&self.map, viewport)
    }

    /// Cluster drawn closest to a screen point, within the cluster radius.
    pub fn cluster_at(&self, point: Point, viewport: Viewport) -> Option<Cluster> {
        let radius = self.infrastructure_layer.group().options().max_cluster_radius;
        self.clusters(viewport)
            .into_iter()
            .map(|c| (self.map.to_screen(c.center, viewport).distance_to(point), c))
            .filter(|(d, _)| *d <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapView {
        &mut self.map
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn origin(&self) -> Option<DataOrigin> {
        self.origin
    }

    pub fn zones(&self) -> &[RiskZone] {
        &self.zones
    }

    pub fn risk_layer(&self) -> &RiskLayer {
        &self.risk_layer
    }

    pub fn infrastructure_layer(&self) -> &InfrastructureLayer {
        &self.infrastructure_layer
    }

    pub fn statistics(&self) -> &RiskStatistics {
        &self.stats
    }

    pub fn panel(&self) -> &StatisticsPanel {
        &self.panel
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    /// Facilities passing the current filters, in dataset order.
    pub fn visible_facilities(&self) -> impl Iterator<Item = &Facility> + '_ {
        self.visible.iter().filter_map(|&idx| self.dataset.get(idx))
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Filtered facilities inside the part of the map on screen.
    pub fn in_view_count(&self, viewport: Viewport) -> usize {
        let bounds = self.map.visible_bounds(viewport);
        self.visible_facilities()
            .filter(|facility| bounds.contains(facility.coordinates))
            .count()
    }
}
