use crate::error::LoadError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Facility category. Records without a category fall into `Comercio`,
/// names outside the known set are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Category {
    Educacion,
    Salud,
    Emergencias,
    Gobierno,
    #[default]
    Comercio,
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 5] = [
        Category::Educacion,
        Category::Salud,
        Category::Emergencias,
        Category::Gobierno,
        Category::Comercio,
    ];

    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Category::default();
        }

        match trimmed.to_lowercase().as_str() {
            "educación" | "educacion" => Category::Educacion,
            "salud" => Category::Salud,
            "emergencias" => Category::Emergencias,
            "gobierno" => Category::Gobierno,
            "comercio" => Category::Comercio,
            _ => Category::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Educacion => "Educación",
            Category::Salud => "Salud",
            Category::Emergencias => "Emergencias",
            Category::Gobierno => "Gobierno",
            Category::Comercio => "Comercio",
            Category::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.map(|n| Category::from_name(&n)).unwrap_or_default())
    }
}

/// Flood-risk severity: 0 = no data, 1 = low, 2 = medium, 3 = high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RiskLevel {
    #[default]
    NoData,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::NoData,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
    ];

    /// Anything outside 1..=3 is treated as "no data".
    pub fn from_value(value: i64) -> Self {
        match value {
            1 => RiskLevel::Low,
            2 => RiskLevel::Medium,
            3 => RiskLevel::High,
            _ => RiskLevel::NoData,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            RiskLevel::NoData => 0,
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }

    pub fn index(self) -> usize {
        self.as_u8() as usize
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level = match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                // 2.0 is a level, 2.9 is not
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(RiskLevel::from_value)
                .unwrap_or_default(),
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(RiskLevel::from_value)
                .unwrap_or_default(),
            _ => RiskLevel::NoData,
        };
        Ok(level)
    }
}

/// WGS84 position, serialized GeoJSON-style as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinates {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl TryFrom<Vec<f64>> for Coordinates {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        // A third (altitude) value is allowed and ignored
        if values.len() < 2 {
            return Err(format!(
                "expected [lon, lat] coordinates, got {} value(s)",
                values.len()
            ));
        }
        let (lon, lat) = (values[0], values[1]);
        if !lon.is_finite() || !lat.is_finite() {
            return Err("coordinates must be finite numbers".to_string());
        }
        Ok(Self { lon, lat })
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lon, c.lat]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type", default = "point_kind")]
    pub kind: String,
    pub coordinates: Coordinates,
}

fn point_kind() -> String {
    "Point".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One record of the `/infrastructure` API response.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub category: Category,
    pub geometry: PointGeometry,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub risk_name: Option<String>,
    #[serde(default)]
    pub risk_color: Option<String>,
    #[serde(default)]
    pub distance_to_risk: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfrastructureResponse {
    pub facilities: Vec<FacilityRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureProperties {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub addr_street: Option<String>,
    #[serde(default)]
    pub addr_number: Option<serde_json::Value>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub risk_name: Option<String>,
    #[serde(default)]
    pub risk_color: Option<String>,
    #[serde(default)]
    pub distance_to_risk: Option<f64>,
}

impl FeatureProperties {
    /// Explicit `address` wins; otherwise street and number are joined.
    fn resolved_address(&self) -> String {
        if let Some(address) = self.address.as_deref().map(str::trim)
            && !address.is_empty()
        {
            return address.to_string();
        }

        let street = self.addr_street.as_deref().map(str::trim).unwrap_or("");
        if street.is_empty() {
            return String::new();
        }

        let number = match &self.addr_number {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        format!("{} {}", street, number).trim().to_string()
    }
}

/// A civil-infrastructure point, normalized from either wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub address: String,
    pub risk_level: RiskLevel,
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_risk: Option<f64>,
}

impl Facility {
    pub fn new(name: impl Into<String>, category: Category, risk_level: RiskLevel, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            category,
            address: String::new(),
            risk_level,
            coordinates,
            risk_name: None,
            risk_color: None,
            distance_to_risk: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

impl From<FacilityRecord> for Facility {
    fn from(record: FacilityRecord) -> Self {
        Self {
            name: record.name,
            category: record.category,
            address: record.address.unwrap_or_default(),
            risk_level: record.risk_level,
            coordinates: record.geometry.coordinates,
            risk_name: record.risk_name,
            risk_color: record.risk_color,
            distance_to_risk: record.distance_to_risk,
        }
    }
}

impl TryFrom<geojson::Feature> for Facility {
    type Error = LoadError;

    /// Point features only; properties are read leniently.
    fn try_from(feature: geojson::Feature) -> Result<Self, Self::Error> {
        let coordinates = match feature.geometry.map(|geometry| geometry.value) {
            Some(geojson::Value::Point(position)) => {
                Coordinates::try_from(position).map_err(LoadError::Format)?
            }
            Some(_) => return Err(LoadError::Format("expected a Point geometry".to_string())),
            None => return Err(LoadError::Format("feature has no geometry".to_string())),
        };

        let props: FeatureProperties = match feature.properties {
            Some(properties) => serde_json::from_value(serde_json::Value::Object(properties))?,
            None => FeatureProperties::default(),
        };
        let address = props.resolved_address();

        Ok(Self {
            name: props.name,
            category: props.category,
            address,
            risk_level: props.risk_level,
            coordinates,
            risk_name: props.risk_name,
            risk_color: props.risk_color,
            distance_to_risk: props.distance_to_risk,
        })
    }
}

/// The in-memory feature collection. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    facilities: Vec<Facility>,
    // positions grouped by risk level index
    by_risk: [Vec<usize>; 4],
}

impl Dataset {
    pub fn new(facilities: Vec<Facility>) -> Self {
        let mut by_risk: [Vec<usize>; 4] = Default::default();
        for (idx, facility) in facilities.iter().enumerate() {
            by_risk[facility.risk_level.index()].push(idx);
        }
        Self { facilities, by_risk }
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Facility> {
        self.facilities.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Facility> {
        self.facilities.iter()
    }

    pub fn as_slice(&self) -> &[Facility] {
        &self.facilities
    }

    /// Facilities at one risk level, in dataset order, without a full scan.
    pub fn with_risk(&self, level: RiskLevel) -> impl Iterator<Item = &Facility> + '_ {
        self.by_risk[level.index()]
            .iter()
            .map(move |&idx| &self.facilities[idx])
    }

    pub fn positions_with_risk(&self, level: RiskLevel) -> &[usize] {
        &self.by_risk[level.index()]
    }

    pub fn count_with_risk(&self, level: RiskLevel) -> usize {
        self.by_risk[level.index()].len()
    }
}

impl FromIterator<Facility> for Dataset {
    fn from_iter<I: IntoIterator<Item = Facility>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Facility;
    type IntoIter = std::slice::Iter<'a, Facility>;

    fn into_iter(self) -> Self::IntoIter {
        self.facilities.iter()
    }
}

impl From<InfrastructureResponse> for Dataset {
    fn from(response: InfrastructureResponse) -> Self {
        response.facilities.into_iter().map(Facility::from).collect()
    }
}
