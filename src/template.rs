//! Room templates and the catalog they are loaded from.
//!
//! A template fixes a room's door sockets and its floor footprint in local
//! space. The catalog maps each room type to a weighted list of template
//! variants and is validated once, at load time, so selection never has to
//! guess around a malformed table.

use crate::direction::*;
use crate::error::*;
use crate::location::*;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Room-type tag, e.g. "corridor" or "storage".
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomType(pub String);

impl RoomType {
    pub fn new(name: impl Into<String>) -> Self {
        RoomType(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomType {
    fn from(name: &str) -> Self {
        RoomType(name.to_string())
    }
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A door socket in template-local space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoorSocket {
    pub position: WorldPos,
    pub direction: Direction,
    /// Room type requested when growing through this door. Falls back to the
    /// catalog default when unset.
    #[serde(default)]
    pub leads_to: Option<RoomType>,
}

impl DoorSocket {
    pub fn new(position: WorldPos, direction: Direction) -> Self {
        DoorSocket {
            position,
            direction,
            leads_to: None,
        }
    }
}

/// Axis-aligned rectangle in template-local space. One template may carry
/// several (sub-zone probes).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FootprintRect {
    pub center: WorldPos,
    pub half_width: f32,
    pub half_depth: f32,
}

impl FootprintRect {
    pub fn new(center: WorldPos, half_width: f32, half_depth: f32) -> Self {
        FootprintRect {
            center,
            half_width,
            half_depth,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomTemplate {
    pub name: String,
    pub room_type: RoomType,
    pub doors: Vec<DoorSocket>,
    #[serde(default)]
    pub footprint: Vec<FootprintRect>,
}

impl RoomTemplate {
    pub fn new(name: impl Into<String>, room_type: impl Into<RoomType>) -> Self {
        RoomTemplate {
            name: name.into(),
            room_type: room_type.into(),
            doors: Vec::new(),
            footprint: Vec::new(),
        }
    }

    pub fn with_door(mut self, position: WorldPos, direction: Direction) -> Self {
        self.doors.push(DoorSocket::new(position, direction));
        self
    }

    pub fn with_socket(mut self, socket: DoorSocket) -> Self {
        self.doors.push(socket);
        self
    }

    pub fn with_footprint(mut self, rect: FootprintRect) -> Self {
        self.footprint.push(rect);
        self
    }

    /// A square room of side `size` centred on the origin with one door in the
    /// middle of each requested wall.
    pub fn square(
        name: impl Into<String>,
        room_type: impl Into<RoomType>,
        size: f32,
        doors: DirectionSet,
    ) -> Self {
        let half = size / 2.0;
        let mut template = RoomTemplate::new(name, room_type)
            .with_footprint(FootprintRect::new(WorldPos::ORIGIN, half, half));
        for direction in doors.directions() {
            let unit = direction.unit();
            template = template.with_door(WorldPos::new(unit.x * half, unit.z * half), direction);
        }
        template
    }

    pub fn door_directions(&self) -> DirectionSet {
        self.doors.iter().map(|d| d.direction).collect()
    }
}

/// One entry of a room type's variant table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedVariant {
    pub template: String,
    pub probability: f32,
}

impl WeightedVariant {
    pub fn new(template: impl Into<String>, probability: f32) -> Self {
        WeightedVariant {
            template: template.into(),
            probability,
        }
    }
}

/// On-disk shape of a catalog.
#[derive(Serialize, Deserialize)]
struct CatalogFile {
    default_room_type: RoomType,
    templates: Vec<RoomTemplate>,
    variants: FnvHashMap<RoomType, Vec<WeightedVariant>>,
}

#[derive(Clone, Debug)]
pub struct TemplateCatalog {
    default_room_type: RoomType,
    templates: FnvHashMap<String, RoomTemplate>,
    variants: FnvHashMap<RoomType, Vec<WeightedVariant>>,
}

impl TemplateCatalog {
    pub fn new(default_room_type: impl Into<RoomType>) -> Self {
        TemplateCatalog {
            default_room_type: default_room_type.into(),
            templates: FnvHashMap::default(),
            variants: FnvHashMap::default(),
        }
    }

    pub fn with_template(mut self, template: RoomTemplate) -> Self {
        self.add_template(template);
        self
    }

    pub fn with_variant(mut self, room_type: impl Into<RoomType>, variant: WeightedVariant) -> Self {
        self.add_variant(room_type, variant);
        self
    }

    pub fn add_template(&mut self, template: RoomTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn add_variant(&mut self, room_type: impl Into<RoomType>, variant: WeightedVariant) {
        self.variants
            .entry(room_type.into())
            .or_default()
            .push(variant);
    }

    pub fn default_room_type(&self) -> &RoomType {
        &self.default_room_type
    }

    pub fn template(&self, name: &str) -> Option<&RoomTemplate> {
        self.templates.get(name)
    }

    pub fn variants(&self, room_type: &RoomType) -> Option<&[WeightedVariant]> {
        self.variants.get(room_type).map(|v| v.as_slice())
    }

    pub fn room_types(&self) -> impl Iterator<Item = &RoomType> {
        self.variants.keys()
    }

    /// Parse and validate a catalog.
    pub fn from_json(json: &str) -> GenerationResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = TemplateCatalog::new(file.default_room_type);
        for template in file.templates {
            catalog.add_template(template);
        }
        catalog.variants = file.variants;
        catalog.validate(crate::constants::DEFAULT_PROBABILITY_EPSILON)?;
        Ok(catalog)
    }

    pub fn to_json(&self) -> GenerationResult<String> {
        let mut templates: Vec<RoomTemplate> = self.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        let file = CatalogFile {
            default_room_type: self.default_room_type.clone(),
            templates,
            variants: self.variants.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Load-time validation:
    /// - the default room type has a variant table,
    /// - every table sums to 1 within `epsilon`,
    /// - every variant names a known template with at least one door,
    /// - every `leads_to` names a room type with a variant table.
    pub fn validate(&self, epsilon: f32) -> GenerationResult<()> {
        if !self.variants.contains_key(&self.default_room_type) {
            return Err(GenerationError::MissingVariants(
                self.default_room_type.clone(),
            ));
        }

        for (room_type, variants) in &self.variants {
            crate::selector::validate_weights(room_type, variants, epsilon)?;
            for variant in variants {
                let template = self
                    .templates
                    .get(&variant.template)
                    .ok_or_else(|| GenerationError::UnknownTemplate(variant.template.clone()))?;
                if template.doors.is_empty() {
                    return Err(GenerationError::TemplateWithoutDoors(template.name.clone()));
                }
            }
        }

        for template in self.templates.values() {
            for socket in &template.doors {
                if let Some(target) = &socket.leads_to {
                    if !self.variants.contains_key(target) {
                        return Err(GenerationError::MissingVariants(target.clone()));
                    }
                }
            }
        }

        Ok(())
    }
}
