mod canvas;
mod entity;
mod entity_store;

pub use canvas::{CanvasState, DialogState, Mode, Tool, TransitionStatus, DEFAULT_BACKGROUND};
pub use entity::{
    Entity, EntityId, EntityKind, EntityPatch, EntityRecord, EntityRecordError, MotionState,
    ObstacleBehavior, ScaleUpdate, PLAYER_ENTITY_ID,
};
pub use entity_store::{EntityStore, StoreSnapshot, StoreState, Subscription};
