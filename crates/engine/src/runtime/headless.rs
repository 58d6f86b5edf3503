use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::content::local_asset_path;

use super::adapter::SceneRuntime;
use super::arcade::{self, Body, YoyoTween};
use super::types::{
    AnimationSpec, AssetKind, AssetRequest, BodyKind, ContactEvent, ContactTag, GroupHandle,
    InteractionEvent, LoadEvent, LoadOutcome, LoadTicket, ObjectHandle, Overlay, Rect, Size,
    SoundHandle, SpriteSpec, Target, Vec2,
};

pub const DEFAULT_TEXTURE_SIZE: Size = Size::new(32.0, 32.0);
pub const DEFAULT_WORLD_SIZE: Size = Size::new(800.0, 600.0);
pub const DEFAULT_GRAVITY_Y: f32 = 300.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Every pending request completes on the next `poll_loads`.
    #[default]
    NextPoll,
    /// Requests stay pending until `complete_load`/`fail_load` is called.
    Manual,
}

#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub world_size: Size,
    pub gravity_y: f32,
    pub load_mode: LoadMode,
    /// When set, image requests are validated against files under this root.
    pub asset_root: Option<PathBuf>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            world_size: DEFAULT_WORLD_SIZE,
            gravity_y: DEFAULT_GRAVITY_Y,
            load_mode: LoadMode::NextPoll,
            asset_root: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    Sprite,
    Marker { radius: f32 },
    Light { radius: f32 },
}

#[derive(Debug, Clone)]
pub struct RuntimeObject {
    pub kind: ObjectKind,
    pub position: Vec2,
    pub texture: Option<String>,
    pub scale: Vec2,
    pub flip_x: bool,
    pub rotation_degrees: f32,
    pub depth: i32,
    pub visible: bool,
    pub interactive: bool,
    pub draggable: bool,
    pub tint: Option<u32>,
    pub animation: Option<String>,
    pub body: Option<Body>,
    created: u64,
    tween: Option<YoyoTween>,
}

impl RuntimeObject {
    fn new(kind: ObjectKind, position: Vec2, texture: Option<String>, created: u64) -> Self {
        Self {
            kind,
            position,
            texture,
            scale: Vec2::new(1.0, 1.0),
            flip_x: false,
            rotation_degrees: 0.0,
            depth: 0,
            visible: true,
            interactive: false,
            draggable: false,
            tint: None,
            animation: None,
            body: None,
            created,
            tween: None,
        }
    }

    pub fn has_tween(&self) -> bool {
        self.tween.is_some()
    }
}

/// Where a loaded texture came from. `frame` is set for spritesheets.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSource {
    pub url: String,
    pub frame: Option<Size>,
}

#[derive(Debug, Clone)]
struct GroupState {
    kind: BodyKind,
    members: Vec<ObjectHandle>,
}

#[derive(Debug, Clone)]
struct ContactRule {
    first: Target,
    second: Target,
    solid: bool,
    tag: Option<ContactTag>,
}

#[derive(Debug, Clone)]
struct PendingLoad {
    ticket: LoadTicket,
    request: AssetRequest,
}

#[derive(Debug, Clone, Copy)]
struct PointerPress {
    target: ObjectHandle,
    start: Vec2,
    origin: Vec2,
    last_drag: Option<Vec2>,
}

/// In-memory runtime: owns objects, resolves asset loads on demand and runs a
/// small arcade physics step. Drives the preview window and the test suite.
#[derive(Debug)]
pub struct HeadlessRuntime {
    config: HeadlessConfig,
    objects: BTreeMap<ObjectHandle, RuntimeObject>,
    next_object: u64,
    textures: HashMap<String, Size>,
    texture_sources: HashMap<String, TextureSource>,
    audio: HashSet<String>,
    pending_loads: Vec<PendingLoad>,
    completed_loads: Vec<LoadEvent>,
    next_ticket: u64,
    load_requests: Vec<String>,
    groups: HashMap<GroupHandle, GroupState>,
    next_group: u64,
    contact_rules: Vec<ContactRule>,
    contacts: Vec<ContactEvent>,
    interactions: VecDeque<InteractionEvent>,
    pointer: Option<PointerPress>,
    physics_paused: bool,
    animations: HashMap<String, AnimationSpec>,
    outline: Option<ObjectHandle>,
    hud_text: Option<String>,
    overlay: Option<Overlay>,
    sounds: BTreeMap<SoundHandle, (String, bool)>,
    next_sound: u64,
}

impl Default for HeadlessRuntime {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl HeadlessRuntime {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            objects: BTreeMap::new(),
            next_object: 1,
            textures: HashMap::new(),
            texture_sources: HashMap::new(),
            audio: HashSet::new(),
            pending_loads: Vec::new(),
            completed_loads: Vec::new(),
            next_ticket: 1,
            load_requests: Vec::new(),
            groups: HashMap::new(),
            next_group: 1,
            contact_rules: Vec::new(),
            contacts: Vec::new(),
            interactions: VecDeque::new(),
            pointer: None,
            physics_paused: false,
            animations: HashMap::new(),
            outline: None,
            hud_text: None,
            overlay: None,
            sounds: BTreeMap::new(),
            next_sound: 1,
        }
    }

    pub fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    pub fn register_texture(&mut self, key: impl Into<String>, size: Size) {
        self.textures.insert(key.into(), size);
    }

    pub fn texture_size(&self, key: &str) -> Option<Size> {
        self.textures.get(key).copied()
    }

    pub fn texture_source(&self, key: &str) -> Option<&TextureSource> {
        self.texture_sources.get(key)
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&RuntimeObject> {
        self.objects.get(&handle)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &RuntimeObject)> {
        self.objects.iter().map(|(handle, object)| (*handle, object))
    }

    /// Objects in draw order: depth first, then creation order.
    pub fn draw_order(&self) -> Vec<ObjectHandle> {
        let mut handles: Vec<_> = self.objects.keys().copied().collect();
        handles.sort_by_key(|handle| {
            let object = &self.objects[handle];
            (object.depth, object.created)
        });
        handles
    }

    pub fn sprite_count(&self) -> usize {
        self.objects
            .values()
            .filter(|object| object.kind == ObjectKind::Sprite)
            .count()
    }

    pub fn objects_with_texture(&self, key: &str) -> usize {
        self.objects
            .values()
            .filter(|object| object.texture.as_deref() == Some(key))
            .count()
    }

    /// Every key passed to `load_asset`, including deduplicated repeats.
    pub fn load_requests(&self) -> &[String] {
        &self.load_requests
    }

    pub fn pending_load_keys(&self) -> Vec<String> {
        self.pending_loads
            .iter()
            .map(|pending| pending.request.key.clone())
            .collect()
    }

    pub fn complete_load(&mut self, key: &str) -> bool {
        let Some(index) = self
            .pending_loads
            .iter()
            .position(|pending| pending.request.key == key)
        else {
            return false;
        };
        let pending = self.pending_loads.remove(index);
        let event = self.finish_load(pending);
        self.completed_loads.push(event);
        true
    }

    pub fn fail_load(&mut self, key: &str, reason: &str) -> bool {
        let Some(index) = self
            .pending_loads
            .iter()
            .position(|pending| pending.request.key == key)
        else {
            return false;
        };
        let pending = self.pending_loads.remove(index);
        self.completed_loads.push(LoadEvent {
            ticket: pending.ticket,
            key: pending.request.key,
            outcome: LoadOutcome::Failed {
                reason: reason.to_string(),
            },
        });
        true
    }

    pub fn push_interaction(&mut self, event: InteractionEvent) {
        self.interactions.push_back(event);
    }

    /// Starts a press on the topmost interactive object under `position`.
    pub fn pointer_down(&mut self, position: Vec2) -> Option<ObjectHandle> {
        if self.overlay.is_some() {
            self.interactions.push_back(InteractionEvent::OverlayAction);
            return None;
        }
        let target = self.hit_test(position)?;
        let origin = self.objects.get(&target)?.position;
        self.interactions
            .push_back(InteractionEvent::PointerDown { target, position });
        self.pointer = Some(PointerPress {
            target,
            start: position,
            origin,
            last_drag: None,
        });
        Some(target)
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        let Some(mut press) = self.pointer else {
            return;
        };
        let draggable = self
            .objects
            .get(&press.target)
            .map(|object| object.interactive && object.draggable)
            .unwrap_or(false);
        if !draggable {
            return;
        }
        if press.last_drag.is_none() {
            self.interactions.push_back(InteractionEvent::DragStart {
                target: press.target,
                position: press.origin,
            });
        }
        let drag_to = Vec2::new(
            press.origin.x + (position.x - press.start.x),
            press.origin.y + (position.y - press.start.y),
        );
        self.interactions.push_back(InteractionEvent::Drag {
            target: press.target,
            position: drag_to,
        });
        press.last_drag = Some(drag_to);
        self.pointer = Some(press);
    }

    pub fn pointer_up(&mut self, position: Vec2) {
        let Some(press) = self.pointer.take() else {
            return;
        };
        if let Some(drag_to) = press.last_drag {
            self.interactions.push_back(InteractionEvent::DragEnd {
                target: press.target,
                position: drag_to,
            });
        }
        if self.objects.contains_key(&press.target) {
            self.interactions.push_back(InteractionEvent::PointerUp {
                target: press.target,
                position,
            });
        }
    }

    pub fn hit_test(&self, position: Vec2) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .filter(|(_, object)| object.visible && object.interactive)
            .filter(|(handle, _)| {
                self.bounds(**handle)
                    .map(|rect| rect.contains(position))
                    .unwrap_or(false)
            })
            .max_by_key(|(_, object)| (object.depth, object.created))
            .map(|(handle, _)| *handle)
    }

    pub fn outline(&self) -> Option<ObjectHandle> {
        self.outline
    }

    pub fn hud_text(&self) -> Option<&str> {
        self.hud_text.as_deref()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn playing_sounds(&self) -> Vec<(&str, bool)> {
        self.sounds
            .values()
            .map(|(key, looped)| (key.as_str(), *looped))
            .collect()
    }

    pub fn animation(&self, key: &str) -> Option<&AnimationSpec> {
        self.animations.get(key)
    }

    pub fn contact_rule_count(&self) -> usize {
        self.contact_rules.len()
    }

    #[cfg(test)]
    pub(crate) fn force_touching_down(&mut self, handle: ObjectHandle, touching: bool) {
        if let Some(body) = self.body_mut(handle) {
            body.touching_down = touching;
        }
    }

    fn finish_load(&mut self, pending: PendingLoad) -> LoadEvent {
        let PendingLoad { ticket, request } = pending;
        let outcome = match self.resolve_request(&request) {
            Ok(Some(size)) => {
                self.textures.insert(request.key.clone(), size);
                let frame = match request.kind {
                    AssetKind::Spritesheet { frame } => Some(frame),
                    _ => None,
                };
                self.texture_sources.insert(
                    request.key.clone(),
                    TextureSource {
                        url: request.url.clone(),
                        frame,
                    },
                );
                LoadOutcome::Loaded
            }
            Ok(None) => {
                self.audio.insert(request.key.clone());
                LoadOutcome::Loaded
            }
            Err(reason) => {
                warn!(key = request.key.as_str(), url = request.url.as_str(), reason = reason.as_str(), "asset_load_failed");
                LoadOutcome::Failed { reason }
            }
        };
        debug!(key = request.key.as_str(), ticket = ticket.0, "asset_load_finished");
        LoadEvent {
            ticket,
            key: request.key,
            outcome,
        }
    }

    /// `Ok(Some(size))` for textures, `Ok(None)` for audio.
    fn resolve_request(&self, request: &AssetRequest) -> Result<Option<Size>, String> {
        let local_path = self
            .config
            .asset_root
            .as_deref()
            .and_then(|root| local_asset_path(root, &request.url));

        match request.kind {
            AssetKind::Audio => {
                if let Some(path) = local_path {
                    if !path.is_file() {
                        return Err(format!("audio file not found: {}", path.display()));
                    }
                }
                Ok(None)
            }
            AssetKind::Image | AssetKind::Spritesheet { .. } => {
                let image_size = match local_path {
                    Some(path) => {
                        let (width, height) = image::image_dimensions(&path)
                            .map_err(|error| format!("{}: {error}", path.display()))?;
                        Some(Size::new(width as f32, height as f32))
                    }
                    None => None,
                };
                let size = match request.kind {
                    AssetKind::Spritesheet { frame } if frame.width > 0.0 && frame.height > 0.0 => {
                        frame
                    }
                    _ => image_size
                        .or(request.size_hint)
                        .unwrap_or(DEFAULT_TEXTURE_SIZE),
                };
                Ok(Some(size))
            }
        }
    }

    fn allocate_object(&mut self, kind: ObjectKind, position: Vec2, texture: Option<String>) -> ObjectHandle {
        let handle = ObjectHandle(self.next_object);
        self.next_object = self.next_object.saturating_add(1);
        self.objects
            .insert(handle, RuntimeObject::new(kind, position, texture, handle.0));
        handle
    }

    fn base_size(&self, object: &RuntimeObject) -> Size {
        match object.kind {
            ObjectKind::Sprite => object
                .texture
                .as_deref()
                .and_then(|key| self.textures.get(key).copied())
                .unwrap_or(DEFAULT_TEXTURE_SIZE),
            ObjectKind::Marker { radius } | ObjectKind::Light { radius } => {
                Size::new(radius * 2.0, radius * 2.0)
            }
        }
    }

    fn body_extent(&self, object: &RuntimeObject) -> Option<Size> {
        let body = object.body.as_ref()?;
        let base = body.size.unwrap_or_else(|| self.base_size(object));
        Some(Size::new(
            base.width * object.scale.x.abs(),
            base.height * object.scale.y.abs(),
        ))
    }

    fn body_rect(&self, handle: ObjectHandle) -> Option<Rect> {
        let object = self.objects.get(&handle)?;
        let body = object.body.as_ref()?;
        if !body.enabled {
            return None;
        }
        Some(Rect::from_center(object.position, self.body_extent(object)?))
    }

    fn body_mut(&mut self, handle: ObjectHandle) -> Option<&mut Body> {
        self.objects.get_mut(&handle)?.body.as_mut()
    }

    fn expand_target(&self, target: Target) -> Vec<ObjectHandle> {
        match target {
            Target::Object(handle) => vec![handle],
            Target::Group(group) => self
                .groups
                .get(&group)
                .map(|state| state.members.clone())
                .unwrap_or_default(),
        }
    }

    fn advance_tweens(&mut self, dt: f32) {
        for object in self.objects.values_mut() {
            if let Some(tween) = object.tween.as_mut() {
                object.position.y = tween.advance(dt);
            }
        }
    }

    fn integrate_bodies(&mut self, dt: f32) {
        let handles: Vec<ObjectHandle> = self.objects.keys().copied().collect();
        for handle in handles {
            let extent = match self.objects.get(&handle) {
                Some(object) => self.body_extent(object),
                None => None,
            };
            let Some(extent) = extent else {
                continue;
            };
            let gravity_y = self.config.gravity_y;
            let world = self.config.world_size;
            if let Some(object) = self.objects.get_mut(&handle) {
                let position = &mut object.position;
                if let Some(body) = object.body.as_mut() {
                    arcade::integrate(body, position, gravity_y, dt);
                    arcade::clamp_to_world(body, position, extent, world);
                }
            }
        }
    }

    fn resolve_contacts(&mut self) {
        let rules = self.contact_rules.clone();
        let mut reported = HashSet::new();
        for rule in rules {
            let firsts = self.expand_target(rule.first);
            let seconds = self.expand_target(rule.second);
            for first in &firsts {
                for second in &seconds {
                    if first == second {
                        continue;
                    }
                    let (Some(first_rect), Some(second_rect)) =
                        (self.body_rect(*first), self.body_rect(*second))
                    else {
                        continue;
                    };
                    if !first_rect.intersects(&second_rect) {
                        continue;
                    }
                    if rule.solid {
                        self.separate_pair(*first, first_rect, *second, second_rect);
                    }
                    if let Some(tag) = rule.tag {
                        let event = ContactEvent {
                            tag,
                            first: *first,
                            second: *second,
                        };
                        if reported.insert(event) {
                            self.contacts.push(event);
                        }
                    }
                }
            }
        }
    }

    fn separate_pair(
        &mut self,
        first: ObjectHandle,
        first_rect: Rect,
        second: ObjectHandle,
        second_rect: Rect,
    ) {
        let movable = |runtime: &Self, handle: ObjectHandle| {
            runtime
                .objects
                .get(&handle)
                .and_then(|object| object.body.as_ref())
                .map(Body::is_movable)
                .unwrap_or(false)
        };
        let Some(separation) = arcade::separate(
            &first_rect,
            movable(self, first),
            &second_rect,
            movable(self, second),
        ) else {
            return;
        };
        for (handle, delta, landed) in [
            (first, separation.first_delta, separation.first_landed),
            (second, separation.second_delta, separation.second_landed),
        ] {
            if let Some(object) = self.objects.get_mut(&handle) {
                object.position.x += delta.x;
                object.position.y += delta.y;
                if let Some(body) = object.body.as_mut() {
                    arcade::respond(body, separation.axis, delta, landed);
                }
            }
        }
    }
}

impl SceneRuntime for HeadlessRuntime {
    fn asset_exists(&self, key: &str) -> bool {
        self.textures.contains_key(key) || self.audio.contains(key)
    }

    fn load_asset(&mut self, request: AssetRequest) -> LoadTicket {
        self.load_requests.push(request.key.clone());
        if let Some(pending) = self
            .pending_loads
            .iter()
            .find(|pending| pending.request.key == request.key)
        {
            return pending.ticket;
        }
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.saturating_add(1);
        debug!(key = request.key.as_str(), ticket = ticket.0, "asset_load_requested");
        self.pending_loads.push(PendingLoad { ticket, request });
        ticket
    }

    fn poll_loads(&mut self) -> Vec<LoadEvent> {
        if self.config.load_mode == LoadMode::NextPoll {
            let pending = std::mem::take(&mut self.pending_loads);
            for load in pending {
                let event = self.finish_load(load);
                self.completed_loads.push(event);
            }
        }
        std::mem::take(&mut self.completed_loads)
    }

    fn create_sprite(&mut self, spec: SpriteSpec) -> ObjectHandle {
        let handle = self.allocate_object(ObjectKind::Sprite, spec.position, Some(spec.texture));
        if spec.body != BodyKind::None {
            if let Some(object) = self.objects.get_mut(&handle) {
                object.body = Some(Body::new(spec.body));
            }
        }
        handle
    }

    fn create_marker(&mut self, position: Vec2, radius: f32) -> ObjectHandle {
        self.allocate_object(ObjectKind::Marker { radius }, position, None)
    }

    fn create_light(&mut self, position: Vec2, radius: f32) -> ObjectHandle {
        self.allocate_object(ObjectKind::Light { radius }, position, None)
    }

    fn destroy(&mut self, handle: ObjectHandle) {
        if self.objects.remove(&handle).is_none() {
            return;
        }
        for group in self.groups.values_mut() {
            group.members.retain(|member| *member != handle);
        }
        self.contact_rules.retain(|rule| {
            rule.first != Target::Object(handle) && rule.second != Target::Object(handle)
        });
        if self.outline == Some(handle) {
            self.outline = None;
        }
        if self.pointer.map(|press| press.target) == Some(handle) {
            self.pointer = None;
        }
    }

    fn exists(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    fn texture_key(&self, handle: ObjectHandle) -> Option<String> {
        self.objects.get(&handle)?.texture.clone()
    }

    fn set_texture(&mut self, handle: ObjectHandle, key: &str) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.texture = Some(key.to_string());
        }
    }

    fn position(&self, handle: ObjectHandle) -> Option<Vec2> {
        self.objects.get(&handle).map(|object| object.position)
    }

    fn set_position(&mut self, handle: ObjectHandle, position: Vec2) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.position = position;
        }
    }

    fn set_scale(&mut self, handle: ObjectHandle, scale_x: f32, scale_y: f32) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.scale = Vec2::new(scale_x, scale_y);
        }
    }

    fn set_flip_x(&mut self, handle: ObjectHandle, flip_x: bool) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.flip_x = flip_x;
        }
    }

    fn set_rotation(&mut self, handle: ObjectHandle, degrees: f32) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.rotation_degrees = degrees;
        }
    }

    fn set_depth(&mut self, handle: ObjectHandle, depth: i32) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.depth = depth;
        }
    }

    fn display_size(&self, handle: ObjectHandle) -> Option<Size> {
        let object = self.objects.get(&handle)?;
        let base = self.base_size(object);
        Some(Size::new(
            base.width * object.scale.x.abs(),
            base.height * object.scale.y.abs(),
        ))
    }

    fn source_size(&self, handle: ObjectHandle) -> Option<Size> {
        self.objects.get(&handle).map(|object| self.base_size(object))
    }

    fn set_display_size(&mut self, handle: ObjectHandle, size: Size) {
        let Some(base) = self.objects.get(&handle).map(|object| self.base_size(object)) else {
            return;
        };
        if base.width <= 0.0 || base.height <= 0.0 {
            return;
        }
        if let Some(object) = self.objects.get_mut(&handle) {
            object.scale = Vec2::new(size.width / base.width, size.height / base.height);
        }
    }

    fn set_body_size(&mut self, handle: ObjectHandle, size: Size) {
        if let Some(body) = self.body_mut(handle) {
            body.size = Some(size);
        }
    }

    fn bounds(&self, handle: ObjectHandle) -> Option<Rect> {
        let object = self.objects.get(&handle)?;
        Some(Rect::from_center(object.position, self.display_size(handle)?))
    }

    fn set_visible(&mut self, handle: ObjectHandle, visible: bool) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.visible = visible;
        }
    }

    fn set_velocity(&mut self, handle: ObjectHandle, velocity: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            body.velocity = velocity;
        }
    }

    fn set_velocity_x(&mut self, handle: ObjectHandle, vx: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.velocity.x = vx;
        }
    }

    fn set_velocity_y(&mut self, handle: ObjectHandle, vy: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.velocity.y = vy;
        }
    }

    fn velocity(&self, handle: ObjectHandle) -> Option<Vec2> {
        self.objects
            .get(&handle)?
            .body
            .as_ref()
            .map(|body| body.velocity)
    }

    fn set_bounce(&mut self, handle: ObjectHandle, bounce: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.bounce = bounce;
        }
    }

    fn set_gravity_enabled(&mut self, handle: ObjectHandle, enabled: bool) {
        if let Some(body) = self.body_mut(handle) {
            body.gravity_enabled = enabled;
        }
    }

    fn set_immovable(&mut self, handle: ObjectHandle, immovable: bool) {
        if let Some(body) = self.body_mut(handle) {
            body.immovable = immovable;
        }
    }

    fn set_collide_world_bounds(&mut self, handle: ObjectHandle, collide: bool) {
        if let Some(body) = self.body_mut(handle) {
            body.collide_world_bounds = collide;
        }
    }

    fn add_yoyo_tween(&mut self, handle: ObjectHandle, target_y: f32, duration_ms: u32) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.tween = Some(YoyoTween::new(object.position.y, target_y, duration_ms));
        }
    }

    fn set_body_enabled(&mut self, handle: ObjectHandle, enabled: bool) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.visible = enabled;
            if let Some(body) = object.body.as_mut() {
                body.enabled = enabled;
                if !enabled {
                    body.velocity = Vec2::ZERO;
                    body.touching_down = false;
                }
            }
        }
    }

    fn body_enabled(&self, handle: ObjectHandle) -> bool {
        self.objects
            .get(&handle)
            .and_then(|object| object.body.as_ref())
            .map(|body| body.enabled)
            .unwrap_or(false)
    }

    fn touching_down(&self, handle: ObjectHandle) -> bool {
        self.objects
            .get(&handle)
            .and_then(|object| object.body.as_ref())
            .map(|body| body.touching_down)
            .unwrap_or(false)
    }

    fn pause_physics(&mut self) {
        self.physics_paused = true;
    }

    fn resume_physics(&mut self) {
        self.physics_paused = false;
    }

    fn physics_paused(&self) -> bool {
        self.physics_paused
    }

    fn step(&mut self, dt_seconds: f32) {
        if self.physics_paused || dt_seconds <= 0.0 {
            return;
        }
        self.advance_tweens(dt_seconds);
        self.integrate_bodies(dt_seconds);
        self.resolve_contacts();
    }

    fn create_group(&mut self, kind: BodyKind) -> GroupHandle {
        let group = GroupHandle(self.next_group);
        self.next_group = self.next_group.saturating_add(1);
        self.groups.insert(
            group,
            GroupState {
                kind,
                members: Vec::new(),
            },
        );
        group
    }

    fn destroy_group(&mut self, group: GroupHandle) {
        self.groups.remove(&group);
        self.contact_rules
            .retain(|rule| rule.first != Target::Group(group) && rule.second != Target::Group(group));
    }

    fn group_add(&mut self, group: GroupHandle, handle: ObjectHandle) {
        let Some(state) = self.groups.get_mut(&group) else {
            return;
        };
        if !self.objects.contains_key(&handle) {
            return;
        }
        if !state.members.contains(&handle) {
            state.members.push(handle);
        }
        let kind = state.kind;
        if kind != BodyKind::None {
            if let Some(object) = self.objects.get_mut(&handle) {
                match object.body.as_mut() {
                    Some(body) => body.kind = kind,
                    None => object.body = Some(Body::new(kind)),
                }
            }
        }
    }

    fn group_remove(&mut self, group: GroupHandle, handle: ObjectHandle) {
        if let Some(state) = self.groups.get_mut(&group) {
            state.members.retain(|member| *member != handle);
        }
    }

    fn refresh_group(&mut self, group: GroupHandle) {
        // Bodies follow object positions directly; only stale members need dropping.
        let objects = &self.objects;
        if let Some(state) = self.groups.get_mut(&group) {
            state.members.retain(|member| objects.contains_key(member));
        }
    }

    fn group_members(&self, group: GroupHandle) -> Vec<ObjectHandle> {
        self.groups
            .get(&group)
            .map(|state| state.members.clone())
            .unwrap_or_default()
    }

    fn add_collider(&mut self, first: Target, second: Target, tag: Option<ContactTag>) {
        self.contact_rules.push(ContactRule {
            first,
            second,
            solid: true,
            tag,
        });
    }

    fn add_overlap(&mut self, first: Target, second: Target, tag: ContactTag) {
        self.contact_rules.push(ContactRule {
            first,
            second,
            solid: false,
            tag: Some(tag),
        });
    }

    fn clear_contact_rules(&mut self) {
        self.contact_rules.clear();
    }

    fn poll_contacts(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.contacts)
    }

    fn set_interactive(&mut self, handle: ObjectHandle, interactive: bool) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.interactive = interactive;
            if !interactive {
                object.draggable = false;
            }
        }
    }

    fn set_draggable(&mut self, handle: ObjectHandle, draggable: bool) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.draggable = draggable;
            if draggable {
                object.interactive = true;
            }
        }
    }

    fn poll_interactions(&mut self) -> Vec<InteractionEvent> {
        self.interactions.drain(..).collect()
    }

    fn set_tint(&mut self, handle: ObjectHandle, tint: Option<u32>) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.tint = tint;
        }
    }

    fn animation_exists(&self, key: &str) -> bool {
        self.animations.contains_key(key)
    }

    fn create_animation(&mut self, spec: AnimationSpec) {
        self.animations.insert(spec.key.clone(), spec);
    }

    fn play_animation(&mut self, handle: ObjectHandle, key: &str) {
        if !self.animations.contains_key(key) {
            return;
        }
        if let Some(object) = self.objects.get_mut(&handle) {
            object.animation = Some(key.to_string());
        }
    }

    fn set_outline(&mut self, handle: Option<ObjectHandle>) {
        self.outline = handle.filter(|handle| self.objects.contains_key(handle));
    }

    fn set_hud_text(&mut self, text: Option<&str>) {
        self.hud_text = text.map(ToString::to_string);
    }

    fn show_overlay(&mut self, overlay: Overlay) {
        self.overlay = Some(overlay);
    }

    fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    fn play_sound(&mut self, key: &str, looped: bool) -> SoundHandle {
        let sound = SoundHandle(self.next_sound);
        self.next_sound = self.next_sound.saturating_add(1);
        self.sounds.insert(sound, (key.to_string(), looped));
        sound
    }

    fn stop_sound(&mut self, sound: SoundHandle) {
        self.sounds.remove(&sound);
    }

    fn world_size(&self) -> Size {
        self.config.world_size
    }
}
