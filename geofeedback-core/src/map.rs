// Map view model: viewport state, layer set and Web-Mercator projection

use crate::config::MapConfig;
use geofeedback_loader::Coordinates;
use serde::Serialize;
use std::collections::BTreeSet;

pub const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;
const SCALE_MAX_WIDTH: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LayerId {
    Base,
    Risk,
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleControl {
    pub position: ControlPosition,
}

/// Screen-space size of the area the map is drawn into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Projected pixel position (world pixels or screen pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn from_point(point: Coordinates) -> Self {
        Self {
            south: point.lat,
            west: point.lon,
            north: point.lat,
            east: point.lon,
        }
    }

    pub fn from_points<I: IntoIterator<Item = Coordinates>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bounds = Self::from_point(iter.next()?);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: Coordinates) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lon);
        self.east = self.east.max(point.lon);
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        point.lat >= self.south && point.lat <= self.north && point.lon >= self.west && point.lon <= self.east
    }
}

/// Project to world pixel coordinates at `zoom` (origin top-left, y down).
pub fn project(coords: Coordinates, zoom: f64) -> Point {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lat = coords.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (coords.lon + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * scale;
    Point::new(x, y)
}

pub fn unproject(point: Point, zoom: f64) -> Coordinates {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lon = point.x / scale * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * point.y / scale);
    let lat = n.sinh().atan().to_degrees();
    Coordinates::new(lon, lat)
}

/// Ground resolution at `lat`.
pub fn meters_per_pixel(lat: f64, zoom: f64) -> f64 {
    EARTH_CIRCUMFERENCE_M * lat.to_radians().cos() / (TILE_SIZE * 2f64.powf(zoom))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub meters: f64,
    pub width_px: f64,
    pub label: String,
}

/// Largest 1/2/3/5 x 10^n value not above `value`.
fn round_number(value: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    let pow10 = 10f64.powf(value.log10().floor());
    let d = value / pow10;
    let d = if d >= 10.0 {
        10.0
    } else if d >= 5.0 {
        5.0
    } else if d >= 3.0 {
        3.0
    } else if d >= 2.0 {
        2.0
    } else {
        1.0
    };
    pow10 * d
}

#[derive(Debug, Clone)]
pub struct MapView {
    center: Coordinates,
    zoom: u8,
    base: TileLayer,
    scale: ScaleControl,
    layers: BTreeSet<LayerId>,
}

impl MapView {
    pub fn new(config: &MapConfig) -> Self {
        let mut layers = BTreeSet::new();
        layers.insert(LayerId::Base);

        Self {
            center: Coordinates::new(config.center[1], config.center[0]),
            zoom: config.zoom.min(config.max_zoom),
            base: TileLayer {
                url_template: config.tile_url.clone(),
                attribution: config.attribution.clone(),
                max_zoom: config.max_zoom,
            },
            scale: ScaleControl {
                position: ControlPosition::BottomRight,
            },
            layers,
        }
    }

    pub fn center(&self) -> Coordinates {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.base.max_zoom
    }

    pub fn base_layer(&self) -> &TileLayer {
        &self.base
    }

    pub fn scale_control(&self) -> ScaleControl {
        self.scale
    }

    pub fn set_view(&mut self, center: Coordinates, zoom: u8) {
        self.center = center;
        self.zoom = zoom.min(self.base.max_zoom);
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.min(self.base.max_zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom.saturating_add(1));
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom.saturating_sub(1));
    }

    /// Shift the center by a screen-pixel offset.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let z = self.zoom as f64;
        let p = project(self.center, z);
        self.center = unproject(Point::new(p.x + dx, p.y + dy), z);
    }

    pub fn add_layer(&mut self, layer: LayerId) {
        self.layers.insert(layer);
    }

    pub fn remove_layer(&mut self, layer: LayerId) {
        self.layers.remove(&layer);
    }

    pub fn has_layer(&self, layer: LayerId) -> bool {
        self.layers.contains(&layer)
    }

    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.iter().copied()
    }

    /// Screen position of `coords` inside `viewport`, origin top-left.
    pub fn to_screen(&self, coords: Coordinates, viewport: Viewport) -> Point {
        let z = self.zoom as f64;
        let p = project(coords, z);
        let c = project(self.center, z);
        Point::new(p.x - c.x + viewport.width / 2.0, p.y - c.y + viewport.height / 2.0)
    }

    pub fn from_screen(&self, point: Point, viewport: Viewport) -> Coordinates {
        let z = self.zoom as f64;
        let c = project(self.center, z);
        unproject(
            Point::new(point.x - viewport.width / 2.0 + c.x, point.y - viewport.height / 2.0 + c.y),
            z,
        )
    }

    /// Geographic area currently visible.
    pub fn visible_bounds(&self, viewport: Viewport) -> Bounds {
        let nw = self.from_screen(Point::new(0.0, 0.0), viewport);
        let se = self.from_screen(Point::new(viewport.width, viewport.height), viewport);
        Bounds {
            south: se.lat,
            west: nw.lon,
            north: nw.lat,
            east: se.lon,
        }
    }

    /// Highest zoom at which `bounds` fits inside `viewport`.
    pub fn bounds_zoom(&self, bounds: &Bounds, viewport: Viewport) -> u8 {
        let max = self.base.max_zoom;
        for zoom in (0..=max).rev() {
            let z = zoom as f64;
            let nw = project(Coordinates::new(bounds.west, bounds.north), z);
            let se = project(Coordinates::new(bounds.east, bounds.south), z);
            if se.x - nw.x <= viewport.width && se.y - nw.y <= viewport.height {
                return zoom;
            }
        }
        0
    }

    pub fn fit_bounds(&mut self, bounds: &Bounds, viewport: Viewport) {
        let zoom = self.bounds_zoom(bounds, viewport);
        self.set_view(bounds.center(), zoom);
    }

    pub fn meters_per_pixel(&self) -> f64 {
        meters_per_pixel(self.center.lat, self.zoom as f64)
    }

    /// Scale bar for a viewport `viewport_width` pixels wide, at most 100 px long.
    pub fn scale_bar(&self, viewport_width: f64) -> ScaleBar {
        let max_width = viewport_width.clamp(0.0, SCALE_MAX_WIDTH);
        let mpp = self.meters_per_pixel();
        let meters = round_number(mpp * max_width);
        let width_px = if mpp > 0.0 { meters / mpp } else { 0.0 };
        let label = if meters >= 1000.0 {
            format!("{} km", meters / 1000.0)
        } else {
            format!("{} m", meters)
        };
        ScaleBar {
            meters,
            width_px,
            label,
        }
    }
}
