use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, warn};

use super::canvas::{CanvasState, DialogState, Mode, Tool, TransitionStatus};
use super::entity::{Entity, EntityId, EntityPatch, ScaleUpdate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub entities: BTreeMap<EntityId, Entity>,
    pub canvas: CanvasState,
    pub deletion: TransitionStatus,
    revision: u64,
}

impl StoreState {
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.get(&EntityId::player())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn unloaded_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|entity| !entity.loaded)
    }
}

/// Immutable point-in-time view of the store. Cheap to clone; later
/// mutations never show through an existing snapshot.
#[derive(Debug, Clone)]
pub struct StoreSnapshot(Arc<StoreState>);

impl Deref for StoreSnapshot {
    type Target = StoreState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[must_use = "dropping a subscription handle leaks the listener until the store is dropped"]
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&StoreSnapshot)>;

pub struct EntityStore {
    state: Arc<StoreState>,
    listeners: Vec<(u64, Listener)>,
    next_subscription: u64,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(StoreState::default()),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut store = Self::new();
        let state = Arc::make_mut(&mut store.state);
        for entity in entities {
            let entity = normalize_player_id(entity);
            state.entities.insert(entity.id.clone(), entity);
        }
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot(Arc::clone(&self.state))
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreSnapshot) + 'static) -> Subscription {
        let id = self.next_subscription;
        self.next_subscription = self.next_subscription.saturating_add(1);
        self.listeners.push((id, Box::new(listener)));
        Subscription(id)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription.0);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Upserts by id. Player records always land under the reserved player id.
    pub fn add_entity(&mut self, entity: Entity) {
        let entity = normalize_player_id(entity);
        debug!(entity_id = %entity.id, kind = entity.kind.type_tag(), "entity_added");
        self.commit(|state| {
            state.entities.insert(entity.id.clone(), entity);
            true
        });
    }

    /// Replaces the whole entity collection. Visuals of records that
    /// disappear are released through the deletion handshake.
    pub fn replace_entities(&mut self, entities: impl IntoIterator<Item = Entity>) {
        let replacement: BTreeMap<EntityId, Entity> = entities
            .into_iter()
            .map(normalize_player_id)
            .map(|entity| (entity.id.clone(), entity))
            .collect();
        self.commit(|state| {
            let dropped_any = state
                .entities
                .keys()
                .any(|id| !replacement.contains_key(id));
            if dropped_any {
                state.deletion = TransitionStatus::Pending;
            }
            if let Some(selected) = &state.canvas.selected {
                if !replacement.contains_key(selected) {
                    state.canvas.selected = None;
                }
            }
            state.entities = replacement;
            true
        });
    }

    pub fn update_entity_fields(&mut self, id: &EntityId, patch: EntityPatch) -> bool {
        if patch.is_empty() || !self.state.entities.contains_key(id) {
            return false;
        }
        if patch.kind.is_some_and(|kind| kind.is_player() != id.is_player()) {
            warn!(entity_id = %id, "player_kind_change_rejected");
            return false;
        }
        self.commit(|state| match state.entities.get_mut(id) {
            Some(entity) => {
                patch.apply_to(entity);
                entity.loaded = false;
                true
            }
            None => false,
        })
    }

    /// Drag commit. Leaves `loaded` untouched: the active scene only needs
    /// to move the existing visual.
    pub fn update_entity_position(&mut self, id: &EntityId, x: f32, y: f32, z: f32) -> bool {
        if !self.state.entities.contains_key(id) {
            return false;
        }
        self.commit(|state| match state.entities.get_mut(id) {
            Some(entity) => {
                entity.x = x;
                entity.y = y;
                entity.z = z;
                true
            }
            None => false,
        })
    }

    pub fn update_entity_scale(&mut self, id: &EntityId, update: ScaleUpdate) -> bool {
        if !self.state.entities.contains_key(id) {
            return false;
        }
        self.commit(|state| match state.entities.get_mut(id) {
            Some(entity) => {
                entity.width = update.width;
                entity.height = update.height;
                entity.scale_x = update.scale_x;
                entity.scale_y = update.scale_y;
                entity.scale = update.scale;
                entity.x = update.x;
                entity.y = update.y;
                entity.loaded = false;
                true
            }
            None => false,
        })
    }

    pub fn flip_entity(&mut self, id: &EntityId, flip_x: bool) -> bool {
        if !self.state.entities.contains_key(id) {
            return false;
        }
        self.commit(|state| match state.entities.get_mut(id) {
            Some(entity) => {
                entity.flip_x = flip_x;
                entity.loaded = false;
                true
            }
            None => false,
        })
    }

    pub fn mark_entity_loaded(&mut self, id: &EntityId) -> bool {
        self.set_loaded(id, true)
    }

    pub fn mark_entity_unloaded(&mut self, id: &EntityId) -> bool {
        self.set_loaded(id, false)
    }

    pub fn unload_all_entities(&mut self) -> bool {
        if self.state.entities.values().all(|entity| !entity.loaded) {
            return false;
        }
        self.commit(|state| {
            for entity in state.entities.values_mut() {
                entity.loaded = false;
            }
            true
        })
    }

    pub fn delete_entity(&mut self, id: &EntityId) -> bool {
        if !self.state.entities.contains_key(id) {
            return false;
        }
        debug!(entity_id = %id, "entity_deleted");
        self.commit(|state| {
            state.entities.remove(id);
            state.deletion = TransitionStatus::Pending;
            if state.canvas.selected.as_ref() == Some(id) {
                state.canvas.selected = None;
            }
            true
        })
    }

    pub fn acknowledge_deletion(&mut self) -> bool {
        if self.state.deletion == TransitionStatus::Idle {
            return false;
        }
        self.commit(|state| {
            state.deletion = TransitionStatus::Idle;
            true
        })
    }

    pub fn select_entity(&mut self, id: &EntityId) -> bool {
        if !self.state.entities.contains_key(id)
            || self.state.canvas.selected.as_ref() == Some(id)
        {
            return false;
        }
        self.commit(|state| {
            state.canvas.selected = Some(id.clone());
            true
        })
    }

    pub fn clear_selection(&mut self) -> bool {
        if self.state.canvas.selected.is_none() {
            return false;
        }
        self.commit(|state| {
            state.canvas.selected = None;
            true
        })
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        self.commit(|state| {
            state.canvas.mode = mode;
            state.canvas.mode_switch = TransitionStatus::Pending;
            true
        });
    }

    pub fn acknowledge_mode_switch(&mut self) -> bool {
        if self.state.canvas.mode_switch == TransitionStatus::Idle {
            return false;
        }
        self.commit(|state| {
            state.canvas.mode_switch = TransitionStatus::Idle;
            true
        })
    }

    pub fn switch_tool(&mut self, tool: Tool) -> bool {
        if self.state.canvas.tool == tool {
            return false;
        }
        self.commit(|state| {
            state.canvas.tool = tool;
            true
        })
    }

    pub fn set_background(&mut self, key: &str) -> bool {
        self.set_canvas_text(CanvasSlot::Background, key)
    }

    pub fn set_audio(&mut self, key: &str) -> bool {
        self.set_canvas_text(CanvasSlot::Audio, key)
    }

    pub fn set_effect(&mut self, key: &str) -> bool {
        self.set_canvas_text(CanvasSlot::Effect, key)
    }

    pub fn open_dialog(&mut self, dialog: DialogState) -> bool {
        if self.state.canvas.dialog == dialog {
            return false;
        }
        self.commit(|state| {
            state.canvas.dialog = dialog;
            true
        })
    }

    pub fn close_dialog(&mut self) -> bool {
        self.open_dialog(DialogState::Closed)
    }

    /// Canvas back to its initial values with a pending mode switch so the
    /// active scene re-evaluates which mode should be showing.
    pub fn reset(&mut self) {
        self.commit(|state| {
            state.canvas = CanvasState {
                mode_switch: TransitionStatus::Pending,
                ..CanvasState::default()
            };
            true
        });
    }

    fn set_loaded(&mut self, id: &EntityId, loaded: bool) -> bool {
        match self.state.entities.get(id) {
            Some(entity) if entity.loaded != loaded => {}
            _ => return false,
        }
        self.commit(|state| match state.entities.get_mut(id) {
            Some(entity) => {
                entity.loaded = loaded;
                true
            }
            None => false,
        })
    }

    fn set_canvas_text(&mut self, slot: CanvasSlot, value: &str) -> bool {
        if slot.get(&self.state.canvas) == value {
            return false;
        }
        self.commit(|state| {
            *slot.get_mut(&mut state.canvas) = value.to_string();
            true
        })
    }

    fn commit(&mut self, apply: impl FnOnce(&mut StoreState) -> bool) -> bool {
        let state = Arc::make_mut(&mut self.state);
        if !apply(state) {
            return false;
        }
        state.revision = state.revision.saturating_add(1);
        self.notify();
        true
    }

    fn notify(&mut self) {
        let snapshot = self.snapshot();
        for (_, listener) in self.listeners.iter_mut() {
            listener(&snapshot);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CanvasSlot {
    Background,
    Audio,
    Effect,
}

impl CanvasSlot {
    fn get(self, canvas: &CanvasState) -> &str {
        match self {
            CanvasSlot::Background => &canvas.background,
            CanvasSlot::Audio => &canvas.audio,
            CanvasSlot::Effect => &canvas.effect,
        }
    }

    fn get_mut(self, canvas: &mut CanvasState) -> &mut String {
        match self {
            CanvasSlot::Background => &mut canvas.background,
            CanvasSlot::Audio => &mut canvas.audio,
            CanvasSlot::Effect => &mut canvas.effect,
        }
    }
}

/// The reserved player id belongs to the player record alone: players are
/// moved onto it and anything else claiming it gets a fresh id.
fn normalize_player_id(mut entity: Entity) -> Entity {
    if entity.kind.is_player() {
        if !entity.id.is_player() {
            entity.id = EntityId::player();
        }
    } else if entity.id.is_player() {
        entity.id = EntityId::generate();
        warn!(
            entity_id = %entity.id,
            kind = entity.kind.type_tag(),
            "reserved_player_id_rekeyed"
        );
    }
    entity
}
