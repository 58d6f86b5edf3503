use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::content::CatalogCategory;
use crate::runtime::{
    AssetKind, AssetRequest, BodyKind, GroupHandle, LoadEvent, LoadOutcome, ObjectHandle, Size,
    SpriteSpec, Vec2,
};
use crate::store::{Entity, EntityId, EntityKind, Mode, StoreSnapshot, Subscription, TransitionStatus};

use super::{SceneCommand, SceneContext};

pub(crate) const BACKGROUND_DEPTH: i32 = -100;

/// Live object standing in for one store entity.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Visual {
    pub handle: ObjectHandle,
    pub texture: String,
    pub kind: EntityKind,
    pub group: Option<GroupHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadWaiter {
    Entity(EntityId),
    Background(String),
    Audio(String),
}

/// Per-key load state plus whoever is waiting on a pending key.
#[derive(Debug, Default)]
pub(crate) struct AssetTracker {
    states: HashMap<String, AssetState>,
    waiters: HashMap<String, Vec<LoadWaiter>>,
}

impl AssetTracker {
    pub fn state(&self, key: &str) -> Option<AssetState> {
        self.states.get(key).copied()
    }

    /// Ready when the runtime already holds the key; otherwise registers
    /// `waiter` and issues the load once per key.
    pub fn ensure(
        &mut self,
        ctx: &mut SceneContext<'_>,
        request: AssetRequest,
        waiter: LoadWaiter,
    ) -> AssetState {
        if ctx.runtime.asset_exists(&request.key) {
            self.states.insert(request.key, AssetState::Ready);
            return AssetState::Ready;
        }
        match self.states.get(&request.key) {
            Some(AssetState::Failed) => return AssetState::Failed,
            Some(AssetState::Pending) => {
                self.add_waiter(&request.key, waiter);
                return AssetState::Pending;
            }
            Some(AssetState::Ready) | None => {}
        }
        self.add_waiter(&request.key, waiter);
        self.states.insert(request.key.clone(), AssetState::Pending);
        debug!(key = request.key.as_str(), url = request.url.as_str(), "asset_requested");
        ctx.runtime.load_asset(request);
        AssetState::Pending
    }

    /// Records the outcome and hands back everyone that was waiting on the key.
    pub fn complete(&mut self, event: &LoadEvent) -> Vec<LoadWaiter> {
        let state = match &event.outcome {
            LoadOutcome::Loaded => AssetState::Ready,
            LoadOutcome::Failed { reason } => {
                warn!(key = event.key.as_str(), reason = reason.as_str(), "asset_unavailable");
                AssetState::Failed
            }
        };
        self.states.insert(event.key.clone(), state);
        self.waiters.remove(&event.key).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.waiters.clear();
    }

    fn add_waiter(&mut self, key: &str, waiter: LoadWaiter) {
        let waiting = self.waiters.entry(key.to_string()).or_default();
        if !waiting.contains(&waiter) {
            waiting.push(waiter);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SceneGroups {
    pub platforms: GroupHandle,
    pub items: GroupHandle,
    pub obstacles: GroupHandle,
}

impl SceneGroups {
    fn for_kind(&self, kind: EntityKind) -> Option<GroupHandle> {
        match kind {
            EntityKind::Player => None,
            EntityKind::Platform => Some(self.platforms),
            EntityKind::Item => Some(self.items),
            EntityKind::Obstacle { .. } => Some(self.obstacles),
        }
    }
}

/// Mode-specific setup layered on top of the shared materialization.
pub(crate) trait SceneHooks {
    /// Runs after an entity's visual was created (`created`) or refreshed.
    fn configure_visual(
        &mut self,
        ctx: &mut SceneContext<'_>,
        groups: SceneGroups,
        entity: &Entity,
        handle: ObjectHandle,
        created: bool,
    );

    /// Runs right before a visual is destroyed.
    fn visual_released(&mut self, _ctx: &mut SceneContext<'_>, _id: &EntityId, _handle: ObjectHandle) {}
}

/// State and reconciliation steps shared by the Edit and Play scenes.
pub(crate) struct SceneCore {
    mode: Mode,
    active: bool,
    dirty: Rc<Cell<bool>>,
    subscription: Option<Subscription>,
    pub visuals: BTreeMap<EntityId, Visual>,
    positions: HashMap<EntityId, Vec2>,
    pub assets: AssetTracker,
    groups: Option<SceneGroups>,
    background: Option<ObjectHandle>,
    background_key: Option<String>,
}

impl SceneCore {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            active: false,
            dirty: Rc::new(Cell::new(false)),
            subscription: None,
            visuals: BTreeMap::new(),
            positions: HashMap::new(),
            assets: AssetTracker::default(),
            groups: None,
            background: None,
            background_key: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn groups(&self) -> Option<SceneGroups> {
        self.groups
    }

    pub fn background(&self) -> Option<ObjectHandle> {
        self.background
    }

    pub fn take_dirty(&mut self) -> bool {
        self.dirty.replace(false)
    }

    pub fn visual_handle(&self, id: &EntityId) -> Option<ObjectHandle> {
        self.visuals.get(id).map(|visual| visual.handle)
    }

    pub fn entity_for_handle(&self, handle: ObjectHandle) -> Option<&EntityId> {
        self.visuals
            .iter()
            .find(|(_, visual)| visual.handle == handle)
            .map(|(id, _)| id)
    }

    /// Subscribes to the store and creates the scene groups. The first
    /// reconciliation pass materializes every unloaded entity.
    pub fn activate(&mut self, ctx: &mut SceneContext<'_>) -> SceneGroups {
        if let Some(subscription) = self.subscription.take() {
            ctx.store.unsubscribe(subscription);
        }
        let dirty = Rc::clone(&self.dirty);
        self.subscription = Some(ctx.store.subscribe(move |_| dirty.set(true)));

        let groups = SceneGroups {
            platforms: ctx.runtime.create_group(BodyKind::Static),
            items: ctx.runtime.create_group(BodyKind::Dynamic),
            obstacles: ctx.runtime.create_group(BodyKind::Dynamic),
        };
        self.groups = Some(groups);
        self.assets.clear();
        self.positions.clear();
        self.background_key = None;
        self.active = true;
        self.dirty.set(true);
        info!(
            mode = ?self.mode,
            entity_count = ctx.store.snapshot().entities.len(),
            "scene_activated"
        );
        groups
    }

    pub fn deactivate(&mut self, ctx: &mut SceneContext<'_>, hooks: &mut dyn SceneHooks) {
        if let Some(subscription) = self.subscription.take() {
            ctx.store.unsubscribe(subscription);
        }
        let visuals = std::mem::take(&mut self.visuals);
        for (id, visual) in visuals {
            hooks.visual_released(ctx, &id, visual.handle);
            ctx.runtime.destroy(visual.handle);
        }
        if let Some(background) = self.background.take() {
            ctx.runtime.destroy(background);
        }
        if let Some(groups) = self.groups.take() {
            for group in [groups.platforms, groups.items, groups.obstacles] {
                ctx.runtime.destroy_group(group);
            }
        }
        self.assets.clear();
        self.positions.clear();
        self.background_key = None;
        self.active = false;
        self.dirty.set(false);
        info!(mode = ?self.mode, "scene_deactivated");
    }

    /// Mode handshake. `Some` means this pass must stop and hand the command
    /// to the scene machine.
    pub fn check_mode(&self, ctx: &mut SceneContext<'_>, snapshot: &StoreSnapshot) -> Option<SceneCommand> {
        if snapshot.canvas.mode_switch != TransitionStatus::Pending {
            return None;
        }
        if snapshot.canvas.mode != self.mode {
            return Some(SceneCommand::SwitchTo(snapshot.canvas.mode));
        }
        ctx.store.acknowledge_mode_switch();
        None
    }

    pub fn sync_background(&mut self, ctx: &mut SceneContext<'_>, snapshot: &StoreSnapshot) {
        let key = snapshot.canvas.background.as_str();
        if self.background_key.as_deref() == Some(key) {
            return;
        }
        self.background_key = Some(key.to_string());
        if key.is_empty() {
            if let Some(background) = self.background.take() {
                ctx.runtime.destroy(background);
            }
            return;
        }
        let Some(entry) = ctx.catalog.get(CatalogCategory::Backgrounds, key) else {
            warn!(key, "unknown_background");
            return;
        };
        let request = AssetRequest {
            key: key.to_string(),
            url: entry.img.clone(),
            kind: AssetKind::Image,
            size_hint: Some(ctx.runtime.world_size()),
        };
        if self.assets.ensure(ctx, request, LoadWaiter::Background(key.to_string())) == AssetState::Ready {
            self.show_background(ctx, key);
        }
    }

    fn show_background(&mut self, ctx: &mut SceneContext<'_>, key: &str) {
        let world = ctx.runtime.world_size();
        let handle = match self.background {
            Some(handle) if ctx.runtime.exists(handle) => {
                ctx.runtime.set_texture(handle, key);
                handle
            }
            _ => {
                let handle = ctx.runtime.create_sprite(SpriteSpec {
                    position: Vec2::new(world.width * 0.5, world.height * 0.5),
                    texture: key.to_string(),
                    body: BodyKind::None,
                });
                ctx.runtime.set_depth(handle, BACKGROUND_DEPTH);
                self.background = Some(handle);
                handle
            }
        };
        ctx.runtime.set_display_size(handle, world);
        debug!(key, "background_applied");
    }

    /// Destroys visuals whose entity left the store and completes the
    /// deletion handshake.
    pub fn release_deleted(
        &mut self,
        ctx: &mut SceneContext<'_>,
        snapshot: &StoreSnapshot,
        hooks: &mut dyn SceneHooks,
    ) {
        if snapshot.deletion != TransitionStatus::Pending {
            return;
        }
        let gone: Vec<EntityId> = self
            .visuals
            .keys()
            .filter(|id| !snapshot.entities.contains_key(*id))
            .cloned()
            .collect();
        for id in gone {
            self.release(ctx, &id, hooks);
        }
        ctx.store.acknowledge_deletion();
    }

    fn release(&mut self, ctx: &mut SceneContext<'_>, id: &EntityId, hooks: &mut dyn SceneHooks) {
        self.positions.remove(id);
        if let Some(visual) = self.visuals.remove(id) {
            hooks.visual_released(ctx, id, visual.handle);
            ctx.runtime.destroy(visual.handle);
            debug!(entity_id = %id, "visual_destroyed");
        }
    }

    /// Moves loaded visuals whose stored position changed since they were
    /// last applied. Physics-driven motion is left alone.
    pub fn sync_positions(&mut self, ctx: &mut SceneContext<'_>, snapshot: &StoreSnapshot) {
        for (id, visual) in &self.visuals {
            let Some(entity) = snapshot.entity(id) else {
                continue;
            };
            if !entity.loaded {
                continue;
            }
            let stored = Vec2::new(entity.x, entity.y);
            if self.positions.get(id) == Some(&stored) {
                continue;
            }
            ctx.runtime.set_position(visual.handle, stored);
            if let Some(group) = visual.group {
                ctx.runtime.refresh_group(group);
            }
            self.positions.insert(id.clone(), stored);
        }
    }

    pub fn materialize_pending(
        &mut self,
        ctx: &mut SceneContext<'_>,
        snapshot: &StoreSnapshot,
        hooks: &mut dyn SceneHooks,
    ) {
        for entity in snapshot.unloaded_entities() {
            self.reconcile_one(ctx, entity, hooks);
        }
    }

    /// Routes a finished load. Entity waiters are re-read from the store so a
    /// deletion or edit during the wait wins. Waiters the core does not own
    /// are returned to the caller.
    pub fn on_load_event(
        &mut self,
        ctx: &mut SceneContext<'_>,
        event: &LoadEvent,
        hooks: &mut dyn SceneHooks,
    ) -> Vec<LoadWaiter> {
        let waiters = self.assets.complete(event);
        if event.outcome != LoadOutcome::Loaded {
            return Vec::new();
        }
        let mut unhandled = Vec::new();
        for waiter in waiters {
            match waiter {
                LoadWaiter::Entity(id) => {
                    let snapshot = ctx.store.snapshot();
                    let Some(entity) = snapshot.entity(&id) else {
                        continue;
                    };
                    if entity.loaded || self.mode.texture_key(&entity.title) != event.key {
                        continue;
                    }
                    self.reconcile_one(ctx, entity, hooks);
                }
                LoadWaiter::Background(key) => {
                    if self.background_key.as_deref() == Some(key.as_str()) {
                        self.show_background(ctx, &key);
                    }
                }
                other => unhandled.push(other),
            }
        }
        unhandled
    }

    /// Brings one unloaded entity's visual in line with its record.
    pub fn reconcile_one(&mut self, ctx: &mut SceneContext<'_>, entity: &Entity, hooks: &mut dyn SceneHooks) {
        let Some(groups) = self.groups else {
            return;
        };
        let key = self.mode.texture_key(&entity.title);

        let mut existing = self.visuals.get(&entity.id).cloned();
        let stale = existing
            .as_ref()
            .is_some_and(|visual| visual.kind != entity.kind || !ctx.runtime.exists(visual.handle));
        if stale {
            self.release(ctx, &entity.id, hooks);
            existing = None;
        }

        if let Some(visual) = &existing {
            let runtime_texture = ctx.runtime.texture_key(visual.handle);
            if visual.texture == key && runtime_texture.as_deref() == Some(key.as_str()) {
                self.apply_geometry(ctx, visual.handle, entity);
                hooks.configure_visual(ctx, groups, entity, visual.handle, false);
                self.finish(ctx, entity);
                return;
            }
        }

        let request = asset_request(self.mode, entity);
        match self.assets.ensure(ctx, request, LoadWaiter::Entity(entity.id.clone())) {
            AssetState::Ready => self.apply_texture(ctx, entity, key, existing, groups, hooks),
            AssetState::Pending => {}
            AssetState::Failed => {
                debug!(entity_id = %entity.id, key = key.as_str(), "entity_asset_failed");
            }
        }
    }

    fn apply_texture(
        &mut self,
        ctx: &mut SceneContext<'_>,
        entity: &Entity,
        key: String,
        existing: Option<Visual>,
        groups: SceneGroups,
        hooks: &mut dyn SceneHooks,
    ) {
        let group = groups.for_kind(entity.kind);
        let (handle, created) = match existing {
            Some(visual) => {
                if let Some(group) = visual.group {
                    ctx.runtime.group_remove(group, visual.handle);
                }
                ctx.runtime.set_texture(visual.handle, &key);
                (visual.handle, false)
            }
            None => {
                let handle = ctx.runtime.create_sprite(SpriteSpec {
                    position: Vec2::new(entity.x, entity.y),
                    texture: key.clone(),
                    body: body_kind(entity.kind),
                });
                (handle, true)
            }
        };
        if let Some(group) = group {
            ctx.runtime.group_add(group, handle);
        }

        self.apply_geometry(ctx, handle, entity);
        ctx.runtime
            .set_body_size(handle, Size::new(entity.width, entity.height));
        if let Some(group) = group {
            ctx.runtime.refresh_group(group);
        }
        self.visuals.insert(
            entity.id.clone(),
            Visual {
                handle,
                texture: key,
                kind: entity.kind,
                group,
            },
        );
        hooks.configure_visual(ctx, groups, entity, handle, created);
        self.finish(ctx, entity);
        debug!(entity_id = %entity.id, created, mode = ?self.mode, "entity_materialized");
    }

    fn apply_geometry(&self, ctx: &mut SceneContext<'_>, handle: ObjectHandle, entity: &Entity) {
        ctx.runtime.set_position(handle, Vec2::new(entity.x, entity.y));
        ctx.runtime.set_scale(handle, entity.scale_x, entity.scale_y);
        ctx.runtime.set_flip_x(handle, entity.flip_x);
        ctx.runtime.set_rotation(handle, entity.orientation);
        ctx.runtime.set_depth(handle, entity.z.round() as i32);
    }

    fn finish(&mut self, ctx: &mut SceneContext<'_>, entity: &Entity) {
        self.positions
            .insert(entity.id.clone(), Vec2::new(entity.x, entity.y));
        ctx.store.mark_entity_loaded(&entity.id);
    }
}

pub(crate) fn asset_request(mode: Mode, entity: &Entity) -> AssetRequest {
    let (frame_width, frame_height) = entity.frame_size();
    let kind = match entity.kind {
        EntityKind::Player => AssetKind::Spritesheet {
            frame: Size::new(frame_width, frame_height),
        },
        _ => AssetKind::Image,
    };
    AssetRequest {
        key: mode.texture_key(&entity.title),
        url: entity.sprite_url.clone(),
        kind,
        size_hint: Some(Size::new(entity.width, entity.height)),
    }
}

fn body_kind(kind: EntityKind) -> BodyKind {
    match kind {
        EntityKind::Platform => BodyKind::Static,
        EntityKind::Player | EntityKind::Item | EntityKind::Obstacle { .. } => BodyKind::Dynamic,
    }
}
