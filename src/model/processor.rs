use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use crate::model::{Area, StreamStats, Zone, ZoneTable};

/// Read every zone from a `{"zones": [...]}` document into a lookup table
pub fn process_zones<R: Read>(reader: R) -> Result<(ZoneTable, StreamStats)> {
    let mut zones = ZoneTable::new();
    let mut stats = StreamStats::default();

    let found = stream_records(reader, "zones", |value| match serde_json::from_value::<Zone>(value) {
        Ok(zone) => {
            debug!("Loaded zone {} with {} vertices", zone.id, zone.geometry.coordinates.len());
            stats.records += 1;
            stats.observe_update(zone.last_updated());
            if zones.insert(zone.id.clone(), Arc::new(zone)).is_some() {
                stats.duplicates += 1;
            }
        }
        Err(e) => {
            warn!("Skipping malformed zone record: {}", e);
            stats.malformed += 1;
        }
    })
    .context("Failed to read zone stream")?;

    if !found {
        warn!("No \"zones\" array found in zone stream");
    }
    Ok((zones, stats))
}

/// Stream areas from an `{"areas": [...]}` document, attaching their zones, one at a time
pub fn process_areas<R, F>(reader: R, zones: &ZoneTable, mut on_area: F) -> Result<StreamStats>
where
    R: Read,
    F: FnMut(Area),
{
    let mut stats = StreamStats::default();

    let found = stream_records(reader, "areas", |value| match serde_json::from_value::<Area>(value) {
        Ok(area) => {
            let area = area.with_zones(zones);
            let unresolved = area.unresolved_zone_count();
            if unresolved > 0 {
                debug!("Area {} references {} unknown zones", area.id, unresolved);
            }
            stats.records += 1;
            stats.unresolved_references += unresolved;
            stats.observe_update(area.last_updated());
            on_area(area);
        }
        Err(e) => {
            warn!("Skipping malformed area record: {}", e);
            stats.malformed += 1;
        }
    })
    .context("Failed to read area stream")?;

    if !found {
        warn!("No \"areas\" array found in area stream");
    }
    Ok(stats)
}

pub fn process_zones_file<P: AsRef<Path>>(path: P) -> Result<(ZoneTable, StreamStats)> {
    let path = path.as_ref();
    info!("Reading zones from {}", path.display());
    let file = File::open(path).with_context(|| format!("Failed to open zone file: {:?}", path))?;
    process_zones(BufReader::new(file))
}

/// Walk the top-level object of a JSON document and hand each element of the array under
/// `field` to `on_record` without buffering the whole array. Returns whether the field was
/// present.
fn stream_records<R, F>(reader: R, field: &str, mut on_record: F) -> Result<bool>
where
    R: Read,
    F: FnMut(Value),
{
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let found = deserializer.deserialize_map(RecordDocument { field, on_record: &mut on_record })?;
    deserializer.end()?;
    Ok(found)
}

struct RecordDocument<'a, F> {
    field: &'a str,
    on_record: &'a mut F,
}

impl<'de, F: FnMut(Value)> Visitor<'de> for RecordDocument<'_, F> {
    type Value = bool;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object with a \"{}\" array", self.field)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<bool, A::Error> {
        let mut found = false;
        while let Some(key) = map.next_key::<String>()? {
            if key == self.field && !found {
                map.next_value_seed(RecordArray { on_record: &mut *self.on_record })?;
                found = true;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}

struct RecordArray<'a, F> {
    on_record: &'a mut F,
}

impl<'de, F: FnMut(Value)> DeserializeSeed<'de> for RecordArray<'_, F> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, F: FnMut(Value)> Visitor<'de> for RecordArray<'_, F> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of records")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(value) = seq.next_element::<Value>()? {
            (self.on_record)(value);
        }
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        // `null` in place of the array holds no records
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONES: &str = r#"{
        "version": "1.0",
        "metadata": {"areas": ["not", "these"]},
        "zones": [
            {"curb_zone_id": "z1", "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [0.001, 0.0]]},
             "last_updated_date": 1600000000000},
            {"curb_zone_id": "z2", "geometry": {"type": "LineString", "coordinates": [[0.001, 0.0], [0.002, 0.0]]},
             "last_updated_date": 1700000000000, "num_spaces": 3},
            {"curb_zone_id": "bad"},
            {"curb_zone_id": "z1", "geometry": {"type": "LineString", "coordinates": [[5.0, 5.0], [5.001, 5.0]]}}
        ],
        "trailer": true
    }"#;

    fn zone_table() -> ZoneTable {
        process_zones(ZONES.as_bytes()).unwrap().0
    }

    #[test]
    fn test_zones_are_streamed_into_table() {
        let (zones, stats) = process_zones(ZONES.as_bytes()).unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.newest_update.unwrap().timestamp(), 1_700_000_000);
        // Last record with a repeated id wins
        assert_eq!(zones["z1"].positions().unwrap()[0], (5.0, 5.0));
        assert_eq!(zones["z2"].num_spaces, Some(3));
    }

    #[test]
    fn test_areas_are_joined_and_handed_over_one_by_one() {
        let zones = zone_table();
        let areas = r#"{"areas": [
            {"curb_area_id": "a1", "curb_zone_ids": ["z2", "zX", "z1"],
             "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [0.002, 0.0], [0.002, 0.002], [0.0, 0.0]]]}},
            {"curb_area_id": "a2", "geometry": {"type": "Triangle", "coordinates": []}},
            {"curb_area_id": "a3", "curb_zone_ids": [],
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]]}}
        ]}"#;

        let mut seen = Vec::new();
        let stats = process_areas(areas.as_bytes(), &zones, |area| {
            seen.push((area.id.clone(), area.zones.iter().map(|z| z.id.clone()).collect::<Vec<_>>()));
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                ("a1".to_string(), vec!["z2".to_string(), "z1".to_string()]),
                ("a3".to_string(), vec![]),
            ]
        );
        assert_eq!(stats.records, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.unresolved_references, 1);
    }

    #[test]
    fn test_missing_or_null_array_yields_nothing() {
        let zones = ZoneTable::new();
        let mut count = 0;
        let stats = process_areas(r#"{"zones": []}"#.as_bytes(), &zones, |_| count += 1).unwrap();
        assert_eq!(stats.records, 0);

        let stats = process_areas(r#"{"areas": null}"#.as_bytes(), &zones, |_| count += 1).unwrap();
        assert_eq!(stats.records, 0);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_unparseable_stream_is_fatal() {
        assert!(process_zones("{\"zones\": [".as_bytes()).is_err());
        assert!(process_zones("[1, 2, 3]".as_bytes()).is_err());
        assert!(process_zones("{\"zones\": []} trailing".as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = process_zones_file("definitely/not/here.json").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open zone file"));
    }
}
