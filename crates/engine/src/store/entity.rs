use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const PLAYER_ENTITY_ID: &str = "player";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn player() -> Self {
        Self(PLAYER_ENTITY_ID.to_string())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_player(&self) -> bool {
        self.0 == PLAYER_ENTITY_ID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObstacleBehavior {
    Bounce,
    Float,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionState {
    Still,
    Moving,
}

impl ObstacleBehavior {
    pub fn motion(self) -> MotionState {
        match self {
            ObstacleBehavior::Bounce | ObstacleBehavior::Float => MotionState::Moving,
            ObstacleBehavior::Static => MotionState::Still,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            ObstacleBehavior::Bounce => "BOUNCE",
            ObstacleBehavior::Float => "FLOAT",
            ObstacleBehavior::Static => "STATIC",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BOUNCE" => Some(ObstacleBehavior::Bounce),
            "FLOAT" => Some(ObstacleBehavior::Float),
            "STATIC" => Some(ObstacleBehavior::Static),
            _ => None,
        }
    }
}

/// Closed set of entity kinds. Obstacles carry their motion behavior directly;
/// every other kind keeps the free-form `Entity::physics` tag only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Platform,
    Item,
    Obstacle { behavior: ObstacleBehavior },
}

impl EntityKind {
    pub fn type_tag(self) -> &'static str {
        match self {
            EntityKind::Player => "PLAYER",
            EntityKind::Platform => "PLATFORM",
            EntityKind::Item => "ITEM",
            EntityKind::Obstacle { .. } => "OBSTACLE",
        }
    }

    pub fn is_player(self) -> bool {
        matches!(self, EntityKind::Player)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EntityRecord", into = "EntityRecord")]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub width: f32,
    pub height: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub scale: f32,
    pub orientation: f32,
    pub flip_x: bool,
    pub title: String,
    pub sprite_url: String,
    pub sprite_width: f32,
    pub sprite_height: f32,
    pub physics: String,
    pub loaded: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, title: impl Into<String>) -> Self {
        let physics = match kind {
            EntityKind::Obstacle { behavior } => behavior.as_tag().to_string(),
            _ => "arcade".to_string(),
        };
        Self {
            id,
            kind,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 32.0,
            height: 32.0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale: 1.0,
            orientation: 0.0,
            flip_x: false,
            title: title.into(),
            sprite_url: String::new(),
            sprite_width: 0.0,
            sprite_height: 0.0,
            physics,
            loaded: false,
        }
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_sprite(mut self, sprite_url: impl Into<String>) -> Self {
        self.sprite_url = sprite_url.into();
        self
    }

    pub fn with_frame_size(mut self, sprite_width: f32, sprite_height: f32) -> Self {
        self.sprite_width = sprite_width;
        self.sprite_height = sprite_height;
        self
    }

    pub fn obstacle_behavior(&self) -> Option<ObstacleBehavior> {
        match self.kind {
            EntityKind::Obstacle { behavior } => Some(behavior),
            _ => None,
        }
    }

    /// Frame size used when slicing a spritesheet; falls back to the
    /// unscaled size when no explicit frame size is recorded.
    pub fn frame_size(&self) -> (f32, f32) {
        let width = if self.sprite_width > 0.0 {
            self.sprite_width
        } else {
            self.width
        };
        let height = if self.sprite_height > 0.0 {
            self.sprite_height
        } else {
            self.height
        };
        (width, height)
    }

    pub fn display_size(&self) -> (f32, f32) {
        (self.width * self.scale_x.abs(), self.height * self.scale_y.abs())
    }
}

/// Partial update merged by `EntityStore::update_entity_fields`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    pub kind: Option<EntityKind>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub scale: Option<f32>,
    pub orientation: Option<f32>,
    pub flip_x: Option<bool>,
    pub title: Option<String>,
    pub sprite_url: Option<String>,
    pub sprite_width: Option<f32>,
    pub sprite_height: Option<f32>,
    pub physics: Option<String>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply_to(self, entity: &mut Entity) {
        if let Some(kind) = self.kind {
            entity.kind = kind;
            if let EntityKind::Obstacle { behavior } = kind {
                entity.physics = behavior.as_tag().to_string();
            }
        }
        if let Some(physics) = self.physics {
            if let EntityKind::Obstacle { behavior } = &mut entity.kind {
                if let Some(parsed) = ObstacleBehavior::from_tag(&physics) {
                    *behavior = parsed;
                }
            }
            entity.physics = physics;
        }
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    entity.$field = value;
                })*
            };
        }
        merge!(
            x,
            y,
            z,
            width,
            height,
            scale_x,
            scale_y,
            scale,
            orientation,
            flip_x,
            title,
            sprite_url,
            sprite_width,
            sprite_height
        );
    }
}

/// Resize commit written by the Resize tool on drag end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleUpdate {
    pub width: f32,
    pub height: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub scale: f32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityRecordError {
    #[error("unknown entity type '{0}'; expected PLAYER, PLATFORM, ITEM or OBSTACLE")]
    UnknownType(String),
    #[error("obstacle '{id}' has unsupported physics '{physics}'; expected BOUNCE, FLOAT or STATIC")]
    UnknownObstaclePhysics { id: String, physics: String },
}

/// Wire shape shared by export documents and project files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default = "unit_scale")]
    pub scale_x: f32,
    #[serde(default = "unit_scale")]
    pub scale_y: f32,
    #[serde(default = "unit_scale")]
    pub scale: f32,
    #[serde(default)]
    pub orientation: f32,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sprite_url: String,
    #[serde(default)]
    pub sprite_width: f32,
    #[serde(default)]
    pub sprite_height: f32,
    #[serde(default)]
    pub physics: String,
    #[serde(default)]
    pub loaded: bool,
}

fn unit_scale() -> f32 {
    1.0
}

impl TryFrom<EntityRecord> for Entity {
    type Error = EntityRecordError;

    fn try_from(record: EntityRecord) -> Result<Self, Self::Error> {
        let kind = match record.entity_type.trim().to_ascii_uppercase().as_str() {
            "PLAYER" => EntityKind::Player,
            "PLATFORM" => EntityKind::Platform,
            "ITEM" => EntityKind::Item,
            "OBSTACLE" => {
                let behavior = ObstacleBehavior::from_tag(&record.physics).ok_or_else(|| {
                    EntityRecordError::UnknownObstaclePhysics {
                        id: record.id.clone(),
                        physics: record.physics.clone(),
                    }
                })?;
                EntityKind::Obstacle { behavior }
            }
            _ => return Err(EntityRecordError::UnknownType(record.entity_type)),
        };
        Ok(Entity {
            id: EntityId(record.id),
            kind,
            x: record.x,
            y: record.y,
            z: record.z,
            width: record.width,
            height: record.height,
            scale_x: record.scale_x,
            scale_y: record.scale_y,
            scale: record.scale,
            orientation: record.orientation,
            flip_x: record.flip_x,
            title: record.title,
            sprite_url: record.sprite_url,
            sprite_width: record.sprite_width,
            sprite_height: record.sprite_height,
            physics: record.physics,
            loaded: record.loaded,
        })
    }
}

impl From<Entity> for EntityRecord {
    fn from(entity: Entity) -> Self {
        let physics = match entity.kind {
            EntityKind::Obstacle { behavior } => behavior.as_tag().to_string(),
            _ => entity.physics,
        };
        EntityRecord {
            id: entity.id.0,
            entity_type: entity.kind.type_tag().to_string(),
            x: entity.x,
            y: entity.y,
            z: entity.z,
            width: entity.width,
            height: entity.height,
            scale_x: entity.scale_x,
            scale_y: entity.scale_y,
            scale: entity.scale,
            orientation: entity.orientation,
            flip_x: entity.flip_x,
            title: entity.title,
            sprite_url: entity.sprite_url,
            sprite_width: entity.sprite_width,
            sprite_height: entity.sprite_height,
            physics,
            loaded: entity.loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_never_player() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
        assert!(!a.is_player());
        assert!(EntityId::player().is_player());
    }

    #[test]
    fn obstacle_motion_follows_behavior() {
        assert_eq!(ObstacleBehavior::Bounce.motion(), MotionState::Moving);
        assert_eq!(ObstacleBehavior::Float.motion(), MotionState::Moving);
        assert_eq!(ObstacleBehavior::Static.motion(), MotionState::Still);
    }

    #[test]
    fn record_with_unknown_obstacle_physics_is_rejected() {
        let raw = r#"{"id":"o1","type":"OBSTACLE","x":1,"y":2,"width":8,"height":8,"physics":"SPIN"}"#;
        let error = serde_json::from_str::<Entity>(raw).expect_err("must reject");
        assert!(error.to_string().contains("SPIN"));
    }

    #[test]
    fn record_defaults_fill_missing_scale_fields() {
        let raw = r#"{"id":"p1","type":"platform","x":10,"y":20,"width":64,"height":16,"title":"ground"}"#;
        let entity: Entity = serde_json::from_str(raw).expect("entity");
        assert_eq!(entity.kind, EntityKind::Platform);
        assert_eq!(entity.scale_x, 1.0);
        assert_eq!(entity.scale_y, 1.0);
        assert!(!entity.loaded);
    }

    #[test]
    fn serialized_obstacle_carries_behavior_tag() {
        let mut entity = Entity::new(
            EntityId::new("o1"),
            EntityKind::Obstacle {
                behavior: ObstacleBehavior::Float,
            },
            "spikes",
        );
        entity.physics = "stale".to_string();
        let value = serde_json::to_value(&entity).expect("json");
        assert_eq!(value["type"], "OBSTACLE");
        assert_eq!(value["physics"], "FLOAT");
        assert_eq!(value["spriteUrl"], "");
    }

    #[test]
    fn patch_physics_updates_obstacle_behavior() {
        let mut entity = Entity::new(
            EntityId::new("o1"),
            EntityKind::Obstacle {
                behavior: ObstacleBehavior::Static,
            },
            "spikes",
        );
        EntityPatch {
            physics: Some("bounce".to_string()),
            x: Some(5.0),
            ..EntityPatch::default()
        }
        .apply_to(&mut entity);
        assert_eq!(entity.obstacle_behavior(), Some(ObstacleBehavior::Bounce));
        assert_eq!(entity.x, 5.0);
    }

    #[test]
    fn frame_size_falls_back_to_unscaled_size() {
        let entity = Entity::new(EntityId::player(), EntityKind::Player, "dude").with_size(32.0, 48.0);
        assert_eq!(entity.frame_size(), (32.0, 48.0));
        let sheet = entity.with_frame_size(16.0, 24.0);
        assert_eq!(sheet.frame_size(), (16.0, 24.0));
    }
}
