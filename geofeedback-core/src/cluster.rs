// Marker clustering in projected pixel space

use crate::layers::Marker;
use crate::map::{Bounds, MapView, Point, Viewport, project};
use geofeedback_loader::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_MAX_CLUSTER_RADIUS: f64 = 50.0;

/// Cluster container behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Markers closer than this many pixels at the current zoom merge.
    pub max_cluster_radius: f64,
    /// Clicking a cluster zooms the map to its bounds.
    pub zoom_to_bounds_on_click: bool,
    /// At maximum zoom markers are laid out individually instead of merged.
    pub spiderfy_on_max_zoom: bool,
    pub show_coverage_on_hover: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_cluster_radius: DEFAULT_MAX_CLUSTER_RADIUS,
            zoom_to_bounds_on_click: true,
            spiderfy_on_max_zoom: true,
            show_coverage_on_hover: false,
        }
    }
}

/// One rendered item of the cluster container: a single marker or a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Positions into the group's marker list.
    pub members: Vec<usize>,
    pub center: Coordinates,
    pub bounds: Bounds,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterGroup {
    options: ClusterOptions,
    markers: Vec<Marker>,
}

impl ClusterGroup {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            options,
            markers: Vec::new(),
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn add_layer(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn clear_layers(&mut self) {
        self.markers.clear();
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Group markers at the map's current zoom and keep those near the viewport.
    ///
    /// Markers are visited in insertion order; each joins the first existing
    /// cluster whose anchor lies within `max_cluster_radius` pixels, otherwise
    /// it anchors a new one. At the map's maximum zoom nothing merges.
    pub fn clusters(&self, map: &MapView, viewport: Viewport) -> Vec<Cluster> {
        let zoom = map.zoom() as f64;
        let radius = self.options.max_cluster_radius.max(0.0);
        let at_max_zoom = self.options.spiderfy_on_max_zoom && map.zoom() >= map.max_zoom();

        let mut anchors: Vec<Point> = Vec::new();
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();

        for (idx, marker) in self.markers.iter().enumerate() {
            let point = project(marker.coordinates, zoom);

            let found = if at_max_zoom || radius == 0.0 {
                None
            } else {
                let cell = grid_cell(point, radius);
                neighbor_cells(cell)
                    .filter_map(|c| grid.get(&c))
                    .flatten()
                    .copied()
                    .filter(|&ci| anchors[ci].distance_to(point) <= radius)
                    .min()
            };

            match found {
                Some(ci) => {
                    let cluster = &mut clusters[ci];
                    cluster.members.push(idx);
                    cluster.bounds.extend(marker.coordinates);
                }
                None => {
                    let ci = clusters.len();
                    anchors.push(point);
                    if radius > 0.0 {
                        grid.entry(grid_cell(point, radius)).or_default().push(ci);
                    }
                    clusters.push(Cluster {
                        members: vec![idx],
                        center: marker.coordinates,
                        bounds: Bounds::from_point(marker.coordinates),
                    });
                }
            }
        }

        for cluster in clusters.iter_mut().filter(|c| c.len() > 1) {
            let n = cluster.members.len() as f64;
            let (lon, lat) = cluster
                .members
                .iter()
                .map(|&i| self.markers[i].coordinates)
                .fold((0.0, 0.0), |(lon, lat), c| (lon + c.lon, lat + c.lat));
            cluster.center = Coordinates::new(lon / n, lat / n);
        }

        clusters
            .into_iter()
            .filter(|c| {
                let p = map.to_screen(c.center, viewport);
                p.x >= -radius
                    && p.y >= -radius
                    && p.x <= viewport.width + radius
                    && p.y <= viewport.height + radius
            })
            .collect()
    }
}

fn grid_cell(point: Point, size: f64) -> (i64, i64) {
    ((point.x / size).floor() as i64, (point.y / size).floor() as i64)
}

fn neighbor_cells((cx, cy): (i64, i64)) -> impl Iterator<Item = (i64, i64)> {
    (-1..=1).flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
}
