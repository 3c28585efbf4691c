use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::{PlacementError, Result};
use crate::pose::{Footprint, Rotation};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    #[serde(rename = "USB_CONNECTOR")]
    UsbConnector,
    #[serde(rename = "MICROCONTROLLER")]
    Microcontroller,
    #[serde(rename = "CRYSTAL")]
    Crystal,
    #[serde(rename = "MIKROBUS_CONNECTOR_1")]
    MikroBus1,
    #[serde(rename = "MIKROBUS_CONNECTOR_2")]
    MikroBus2,
}

impl ComponentId {
    pub const ALL: [ComponentId; 5] = [
        ComponentId::UsbConnector,
        ComponentId::Microcontroller,
        ComponentId::Crystal,
        ComponentId::MikroBus1,
        ComponentId::MikroBus2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComponentId::UsbConnector => "USB_CONNECTOR",
            ComponentId::Microcontroller => "MICROCONTROLLER",
            ComponentId::Crystal => "CRYSTAL",
            ComponentId::MikroBus1 => "MIKROBUS_CONNECTOR_1",
            ComponentId::MikroBus2 => "MIKROBUS_CONNECTOR_2",
        }
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ComponentId {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self> {
        ComponentId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| PlacementError::invalid(format!("unknown component id {:?}", s)))
    }
}

/// Constraint roles. A component may hold several, e.g. an edge connector that also projects a keep-out zone.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Must sit flush with at least one board edge.
    EdgeRequired,
    /// No positional constraint beyond bounds, overlap and balance.
    Free,
    /// Center must stay within the proximity limit of the anchor's center, and the straight route between the two
    /// must avoid every keep-out zone.
    ProximityLinked { anchor: ComponentId },
    /// Must sit on the board edge opposite the partner with the same long-axis orientation.
    ParallelPairMember { partner: ComponentId },
    /// Projects a keep-out zone that proximity routes may not cross.
    KeepOutSource,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub footprint: Footprint,
    pub roles: Vec<Role>,
    /// Whether the part may be turned by 90 degrees. A part that may not always keeps its footprint as given.
    #[serde(default = "rotatable_by_default")]
    pub rotatable: bool,
}

fn rotatable_by_default() -> bool {
    true
}

impl Component {
    pub fn new(id: ComponentId, footprint: Footprint, roles: Vec<Role>) -> Self {
        Component {
            id,
            footprint,
            roles,
            rotatable: true,
        }
    }

    pub fn with_fixed_orientation(self) -> Self {
        Component {
            rotatable: false,
            ..self
        }
    }

    pub fn allows_rotation(&self, rotation: Rotation) -> bool {
        self.rotatable || rotation == Rotation::R0
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_edge_required(&self) -> bool {
        self.has_role(Role::EdgeRequired)
    }

    pub fn is_free(&self) -> bool {
        self.has_role(Role::Free)
    }

    pub fn is_keep_out_source(&self) -> bool {
        self.has_role(Role::KeepOutSource)
    }

    pub fn proximity_anchor(&self) -> Option<ComponentId> {
        self.roles.iter().find_map(|role| match role {
            Role::ProximityLinked { anchor } => Some(*anchor),
            _ => None,
        })
    }

    pub fn parallel_partner(&self) -> Option<ComponentId> {
        self.roles.iter().find_map(|role| match role {
            Role::ParallelPairMember { partner } => Some(*partner),
            _ => None,
        })
    }

    /// Allowed rotations that give distinct rectangles. Squares and fixed parts only have one.
    pub fn rotations(&self) -> &'static [Rotation] {
        if self.footprint.is_square() || !self.rotatable {
            &[Rotation::R0]
        } else {
            &[Rotation::R0, Rotation::R90]
        }
    }
}

/// The fixed set of parts to place, in a stable order.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Catalog {
    components: Vec<Component>,
}

impl Default for Catalog {
    fn default() -> Self {
        let square = Footprint::new(5, 5);
        let mikrobus = Footprint::new(5, 15);
        Catalog {
            components: vec![
                Component::new(
                    ComponentId::UsbConnector,
                    square,
                    vec![Role::EdgeRequired, Role::KeepOutSource],
                ),
                Component::new(ComponentId::Microcontroller, square, vec![Role::Free]),
                Component::new(
                    ComponentId::Crystal,
                    square,
                    vec![Role::ProximityLinked {
                        anchor: ComponentId::Microcontroller,
                    }],
                ),
                Component::new(
                    ComponentId::MikroBus1,
                    mikrobus,
                    vec![
                        Role::EdgeRequired,
                        Role::ParallelPairMember {
                            partner: ComponentId::MikroBus2,
                        },
                    ],
                ),
                Component::new(
                    ComponentId::MikroBus2,
                    mikrobus,
                    vec![
                        Role::EdgeRequired,
                        Role::ParallelPairMember {
                            partner: ComponentId::MikroBus1,
                        },
                    ],
                ),
            ],
        }
    }
}

impl Catalog {
    pub fn new(components: Vec<Component>) -> Self {
        Catalog { components }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|component| component.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().map(|component| component.id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Each parallel pair once, lower id first.
    pub fn parallel_pairs(&self) -> Vec<(ComponentId, ComponentId)> {
        self.components
            .iter()
            .filter_map(|component| {
                component
                    .parallel_partner()
                    .filter(|partner| component.id < *partner)
                    .map(|partner| (component.id, partner))
            })
            .collect()
    }

    /// (linked component, anchor) for every proximity link.
    pub fn proximity_links(&self) -> Vec<(ComponentId, ComponentId)> {
        self.components
            .iter()
            .filter_map(|component| component.proximity_anchor().map(|anchor| (component.id, anchor)))
            .collect()
    }

    pub fn keep_out_sources(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|component| component.is_keep_out_source())
            .map(|component| component.id)
            .collect()
    }

    /// Rejects catalogs the constraint model cannot reason about: duplicates, empty or oversized footprints, and role
    /// references to components that are missing or not reciprocated.
    pub fn validate(&self, board: &Board) -> Result<()> {
        if self.components.is_empty() {
            return Err(PlacementError::invalid("catalog has no components"));
        }
        let mut seen = BTreeSet::new();
        for component in &self.components {
            if !seen.insert(component.id) {
                return Err(PlacementError::invalid(format!("duplicate component {}", component.id)));
            }
        }
        for component in &self.components {
            let footprint = &component.footprint;
            if !footprint.width.is_positive() || !footprint.height.is_positive() {
                return Err(PlacementError::invalid(format!(
                    "{} has a non-positive footprint {} x {}",
                    component.id, footprint.width, footprint.height
                )));
            }
            let fits = component.rotations().iter().any(|rotation| {
                let (width, height) = footprint.oriented(*rotation);
                width <= board.width() && height <= board.height()
            });
            if !fits {
                return Err(PlacementError::invalid(format!(
                    "{} does not fit on a {} x {} board",
                    component.id,
                    board.width(),
                    board.height()
                )));
            }
            for role in &component.roles {
                match role {
                    Role::ProximityLinked { anchor } => {
                        self.check_reference(component.id, *anchor)?;
                    }
                    Role::ParallelPairMember { partner } => {
                        self.check_reference(component.id, *partner)?;
                        let reciprocated = self
                            .get(*partner)
                            .and_then(|other| other.parallel_partner())
                            .map_or(false, |back| back == component.id);
                        if !reciprocated {
                            return Err(PlacementError::invalid(format!(
                                "{} names {} as parallel partner but not the other way around",
                                component.id, partner
                            )));
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn check_reference(&self, from: ComponentId, to: ComponentId) -> Result<()> {
        if from == to {
            return Err(PlacementError::invalid(format!("{} references itself", from)));
        }
        if self.get(to).is_none() {
            return Err(PlacementError::invalid(format!(
                "{} references {} which is not in the catalog",
                from, to
            )));
        }
        Ok(())
    }
}
