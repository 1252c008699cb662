use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::projection::LonLat;
use crate::{RenderError, StatusOr};

/// Zones keyed by `curb_zone_id`, built once before any area is read
pub type ZoneTable = HashMap<String, Arc<Zone>>;

/// GeoJSON LineString geometry of a curb zone
#[derive(Debug, Clone, Deserialize)]
pub struct LineGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<f64>>,
}

/// GeoJSON geometry of a curb area. Only `Polygon` areas are rendered.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum AreaGeometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

impl AreaGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            AreaGeometry::Polygon(_) => "Polygon",
            AreaGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// A curb zone: one curb segment and its descriptive attributes
#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    #[serde(rename = "curb_zone_id")]
    pub id: String,
    pub geometry: LineGeometry,
    #[serde(default)]
    pub published_date: Option<i64>,
    #[serde(default)]
    pub last_updated_date: Option<i64>,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location_references: Vec<serde_json::Value>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub cross_street_start_name: Option<String>,
    #[serde(default)]
    pub cross_street_end_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub curb_policy_ids: Vec<String>,
    #[serde(default)]
    pub parking_angle: Option<String>,
    #[serde(default)]
    pub num_spaces: Option<i64>,
}

impl Zone {
    /// Vertices of the zone line in input order
    pub fn positions(&self) -> StatusOr<Vec<LonLat>> {
        positions(&self.geometry.coordinates)
            .map_err(|reason| RenderError::MalformedGeometry(format!("zone {}: {}", self.id, reason)))
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated_date.and_then(from_epoch_millis)
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published_date.and_then(from_epoch_millis)
    }
}

/// A curb area polygon together with the zones it references
#[derive(Debug, Clone, Deserialize)]
pub struct Area {
    #[serde(rename = "curb_area_id")]
    pub id: String,
    pub geometry: AreaGeometry,
    #[serde(default)]
    pub published_date: Option<i64>,
    #[serde(default)]
    pub last_updated_date: Option<i64>,
    #[serde(rename = "curb_zone_ids", default, deserialize_with = "null_as_empty")]
    pub zone_ids: Vec<String>,
    /// Resolved from `zone_ids` by [`Area::with_zones`]
    #[serde(skip)]
    pub zones: Vec<Arc<Zone>>,
}

impl Area {
    /// Attaches the zones referenced by `zone_ids`, in reference order.
    /// Identifiers missing from the table are dropped.
    pub fn with_zones(mut self, table: &ZoneTable) -> Self {
        self.zones = self
            .zone_ids
            .iter()
            .filter_map(|id| table.get(id).cloned())
            .collect();
        self
    }

    /// Number of referenced zone ids absent from the resolved list
    pub fn unresolved_zone_count(&self) -> usize {
        self.zone_ids.len().saturating_sub(self.zones.len())
    }

    /// Vertices of the first polygon ring
    pub fn ring(&self) -> StatusOr<Vec<LonLat>> {
        match &self.geometry {
            AreaGeometry::Polygon(rings) => {
                let ring = rings.first().ok_or_else(|| {
                    RenderError::MalformedGeometry(format!("area {}: polygon has no rings", self.id))
                })?;
                positions(ring).map_err(|reason| {
                    RenderError::MalformedGeometry(format!("area {}: {}", self.id, reason))
                })
            }
            other => Err(RenderError::UnsupportedGeometry(format!(
                "area {} has {} geometry",
                self.id,
                other.kind()
            ))),
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated_date.and_then(from_epoch_millis)
    }
}

fn positions(coordinates: &[Vec<f64>]) -> Result<Vec<LonLat>, String> {
    if coordinates.is_empty() {
        return Err("geometry has no vertices".to_string());
    }
    coordinates
        .iter()
        .enumerate()
        .map(|(i, position)| match position.as_slice() {
            [lon, lat, ..] if on_globe(*lon, *lat) => Ok((*lon, *lat)),
            [lon, lat, ..] => Err(format!("vertex {} at ({}, {}) is not on the globe", i, lon, lat)),
            _ => Err(format!("vertex {} has {} of 2 coordinates", i, position.len())),
        })
        .collect()
}

// Poles have no tile row
fn on_globe(lon: f64, lat: f64) -> bool {
    lon.is_finite() && lat.is_finite() && lon.abs() <= 180.0 && lat.abs() < 90.0
}

/// `null` reads as an empty list
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
