use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;

use math_util::{Rect, Unit};
use serde::{Deserialize, Serialize};

use crate::board::{in_coordinate_domain, COORDINATE_LIMIT};
use crate::catalog::{Catalog, ComponentId};
use crate::error::{PlacementError, Result};
use crate::pose::{Pose, Rotation};

/// An assignment of poses to components. A placement is complete once every catalog component has a pose.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Placement {
    poses: BTreeMap<ComponentId, Pose>,
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: ComponentId, pose: Pose) -> Self {
        self.set(id, pose);
        self
    }

    pub fn set(&mut self, id: ComponentId, pose: Pose) {
        self.poses.insert(id, pose);
    }

    pub fn get(&self, id: ComponentId) -> Option<&Pose> {
        self.poses.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &Pose)> {
        self.poses.iter().map(|(id, pose)| (*id, pose))
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Catalog components without a pose.
    pub fn missing(&self, catalog: &Catalog) -> Vec<ComponentId> {
        catalog.ids().filter(|id| !self.poses.contains_key(id)).collect()
    }

    pub fn is_complete(&self, catalog: &Catalog) -> bool {
        self.missing(catalog).is_empty()
    }

    /// Occupied rectangle of one component, if it is both placed and in the catalog.
    pub fn rect_of(&self, catalog: &Catalog, id: ComponentId) -> Option<Rect> {
        let component = catalog.get(id)?;
        self.get(id).map(|pose| pose.rect(&component.footprint))
    }

    /// Rectangles of the placed catalog components, in catalog order.
    pub fn rects(&self, catalog: &Catalog) -> Vec<(ComponentId, Rect)> {
        catalog
            .ids()
            .filter_map(|id| self.rect_of(catalog, id).map(|rect| (id, rect)))
            .collect()
    }

    pub fn to_record(&self, catalog: &Catalog) -> PlacementRecord {
        let components = self
            .iter()
            .filter_map(|(id, pose)| {
                let component = catalog.get(id)?;
                let (w, h) = component.footprint.oriented(pose.rotation);
                Some((
                    id,
                    PoseRecord {
                        x: pose.x,
                        y: pose.y,
                        rotation: Some(pose.rotation),
                        w: Some(w),
                        h: Some(h),
                    },
                ))
            })
            .collect();
        PlacementRecord(components)
    }

    /// Reads a record back. Records without a rotation but with `w` and `h` get the rotation those dimensions imply.
    pub fn from_record(record: &PlacementRecord, catalog: &Catalog) -> Result<Placement> {
        let mut placement = Placement::new();
        for (id, pose) in &record.0 {
            let component = catalog
                .get(*id)
                .ok_or_else(|| PlacementError::invalid(format!("{} is not in the catalog", id)))?;
            if !in_coordinate_domain(pose.x) || !in_coordinate_domain(pose.y) {
                return Err(PlacementError::invalid(format!(
                    "{} at ({}, {}) lies outside the coordinate range of +/-{}",
                    id, pose.x, pose.y, COORDINATE_LIMIT
                )));
            }
            let rotation = match (pose.rotation, pose.w, pose.h) {
                (Some(rotation), _, _) => rotation,
                (None, Some(w), Some(h)) => component
                    .rotations()
                    .iter()
                    .copied()
                    .find(|rotation| component.footprint.oriented(*rotation) == (w, h))
                    .ok_or_else(|| {
                        PlacementError::invalid(format!(
                            "{} recorded as {} x {} which matches no rotation of its footprint",
                            id, w, h
                        ))
                    })?,
                (None, _, _) => Rotation::R0,
            };
            if !component.allows_rotation(rotation) {
                return Err(PlacementError::invalid(format!(
                    "{} may not be rotated but is recorded at {} degrees",
                    id,
                    rotation.degrees()
                )));
            }
            if let (Some(w), Some(h)) = (pose.w, pose.h) {
                if component.footprint.oriented(rotation) != (w, h) {
                    return Err(PlacementError::invalid(format!(
                        "{} recorded as {} x {} but rotation {} gives {:?}",
                        id,
                        w,
                        h,
                        rotation,
                        component.footprint.oriented(rotation)
                    )));
                }
            }
            placement.set(*id, Pose { x: pose.x, y: pose.y, rotation });
        }
        Ok(placement)
    }

    pub fn to_json(&self, catalog: &Catalog) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_record(catalog))?)
    }

    pub fn from_json(json: &str, catalog: &Catalog) -> Result<Placement> {
        let record: PlacementRecord = serde_json::from_str(json)?;
        Placement::from_record(&record, catalog)
    }

    pub fn write_json_file<P: AsRef<Path>>(&self, path: P, catalog: &Catalog) -> Result<()> {
        std::fs::write(path, self.to_json(catalog)?)?;
        Ok(())
    }

    pub fn read_json_file<P: AsRef<Path>>(path: P, catalog: &Catalog) -> Result<Placement> {
        let json = std::fs::read_to_string(path)?;
        Placement::from_json(&json, catalog)
    }
}

impl Debug for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (id, pose) in self.iter() {
            map.entry(
                &id.name(),
                &format_args!("({}, {}) r{}", pose.x, pose.y, pose.rotation),
            );
        }
        map.finish()
    }
}

/// Persisted form of one pose. Rotation and dimensions are optional on input so that plain `{x, y, w, h}` records
/// are accepted too.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub x: Unit,
    pub y: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<Unit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<Unit>,
}

/// Persisted placement: a JSON object keyed by component name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementRecord(pub BTreeMap<ComponentId, PoseRecord>);

#[cfg(test)]
mod placement_tests {
    use super::*;

    fn sample() -> Placement {
        Placement::new()
            .with(ComponentId::UsbConnector, Pose::new(0, 0, Rotation::R0))
            .with(ComponentId::MikroBus1, Pose::new(0, 10, Rotation::R0))
            .with(ComponentId::MikroBus2, Pose::new(35, 10, Rotation::R90))
    }

    #[test]
    fn missing_components_are_reported_in_catalog_order() {
        let catalog = Catalog::default();
        assert_eq!(
            sample().missing(&catalog),
            vec![ComponentId::Microcontroller, ComponentId::Crystal]
        );
        assert!(!sample().is_complete(&catalog));
    }

    #[test]
    fn json_keys_are_component_names() {
        let catalog = Catalog::default();
        let json = sample().to_json(&catalog).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let mb2 = &value["MIKROBUS_CONNECTOR_2"];
        assert_eq!(mb2["x"], 35.0);
        assert_eq!(mb2["rotation"], 90);
        assert_eq!(mb2["w"], 15.0);
        assert_eq!(mb2["h"], 5.0);
        assert_eq!(Placement::from_json(&json, &catalog).unwrap(), sample());
    }

    #[test]
    fn rotation_is_inferred_from_dimensions() {
        let catalog = Catalog::default();
        let json = r#"{
            "MIKROBUS_CONNECTOR_1": {"x": 0, "y": 15, "w": 5, "h": 15},
            "MIKROBUS_CONNECTOR_2": {"x": 10, "y": 45, "w": 15, "h": 5},
            "CRYSTAL": {"x": 25, "y": 14}
        }"#;
        let placement = Placement::from_json(json, &catalog).unwrap();
        assert_eq!(placement.get(ComponentId::MikroBus1).unwrap().rotation, Rotation::R0);
        assert_eq!(placement.get(ComponentId::MikroBus2).unwrap().rotation, Rotation::R90);
        assert_eq!(placement.get(ComponentId::Crystal).unwrap().rotation, Rotation::R0);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let catalog = Catalog::default();
        let json = r#"{"MIKROBUS_CONNECTOR_1": {"x": 0, "y": 15, "w": 5, "h": 10}}"#;
        assert!(matches!(
            Placement::from_json(json, &catalog),
            Err(PlacementError::InvalidInput(_))
        ));
        let json = r#"{"MIKROBUS_CONNECTOR_1": {"x": 0, "y": 15, "rotation": 90, "w": 5, "h": 15}}"#;
        assert!(Placement::from_json(json, &catalog).is_err());
    }

    #[test]
    fn rotation_of_fixed_part_is_rejected() {
        let components = Catalog::default()
            .components()
            .iter()
            .cloned()
            .map(|component| match component.id {
                ComponentId::MikroBus1 => component.with_fixed_orientation(),
                _ => component,
            })
            .collect();
        let catalog = Catalog::new(components);
        let json = r#"{"MIKROBUS_CONNECTOR_1": {"x": 0, "y": 45, "rotation": 90}}"#;
        assert!(matches!(
            Placement::from_json(json, &catalog),
            Err(PlacementError::InvalidInput(_))
        ));
        let json = r#"{"MIKROBUS_CONNECTOR_1": {"x": 0, "y": 45, "w": 15, "h": 5}}"#;
        assert!(Placement::from_json(json, &catalog).is_err());
        let json = r#"{"MIKROBUS_CONNECTOR_1": {"x": 0, "y": 15, "w": 5, "h": 15}}"#;
        assert!(Placement::from_json(json, &catalog).is_ok());
        let json = r#"{"MIKROBUS_CONNECTOR_2": {"x": 0, "y": 45, "rotation": 90}}"#;
        assert!(Placement::from_json(json, &catalog).is_ok());
    }

    #[test]
    fn far_off_board_coordinates_are_rejected() {
        let catalog = Catalog::default();
        let json = r#"{"CRYSTAL": {"x": 60000, "y": 14, "w": 5, "h": 5}}"#;
        assert!(matches!(
            Placement::from_json(json, &catalog),
            Err(PlacementError::InvalidInput(_))
        ));
        let json = r#"{"CRYSTAL": {"x": -200, "y": 14, "w": 5, "h": 5}}"#;
        assert!(Placement::from_json(json, &catalog).is_ok());
    }

    #[test]
    fn unknown_component_is_rejected() {
        let json = r#"{"RESISTOR": {"x": 0, "y": 0}}"#;
        assert!(matches!(
            Placement::from_json(json, &Catalog::default()),
            Err(PlacementError::Json(_))
        ));
    }
}
