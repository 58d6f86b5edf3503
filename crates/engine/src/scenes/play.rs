use tracing::{info, warn};

use crate::content::{CatalogCategory, SPOTLIGHT_EFFECT};
use crate::runtime::{
    AssetKind, AssetRequest, ContactEvent, InteractionEvent, LoadEvent, ObjectHandle,
    SoundHandle, Target, Vec2,
};
use crate::store::{Entity, EntityId, EntityKind, Mode, StoreSnapshot};

use super::base::{AssetState, AssetTracker, LoadWaiter, SceneCore, SceneGroups, SceneHooks};
use super::rules::{
    animation_key, ensure_player_animations, GameplayRules, PLAYER_BOUNCE, PLAYER_COLLECT_ITEM,
    PLAYER_HIT_OBSTACLE,
};
use super::{ModeScene, PlayerInput, SceneCommand, SceneContext};

pub(crate) const SPOTLIGHT_RADIUS: f32 = 100.0;
const SPOTLIGHT_DEPTH: i32 = 900;

pub(crate) fn audio_asset_key(key: &str) -> String {
    format!("AUDIO_{key}")
}

/// Play-only state layered over the shared materialization: player wiring,
/// rules, audio and the lighting effect.
struct PlayStage {
    rules: GameplayRules,
    player: Option<ObjectHandle>,
    player_title: String,
    audio_key: Option<String>,
    sound: Option<SoundHandle>,
    effect_key: Option<String>,
    light: Option<ObjectHandle>,
}

impl PlayStage {
    fn new(seed: u64) -> Self {
        Self {
            rules: GameplayRules::new(seed),
            player: None,
            player_title: String::new(),
            audio_key: None,
            sound: None,
            effect_key: None,
            light: None,
        }
    }

    fn stop_audio(&mut self, ctx: &mut SceneContext<'_>) {
        if let Some(sound) = self.sound.take() {
            ctx.runtime.stop_sound(sound);
        }
    }

    fn sync_audio(&mut self, ctx: &mut SceneContext<'_>, assets: &mut AssetTracker, snapshot: &StoreSnapshot) {
        let key = snapshot.canvas.audio.as_str();
        if self.audio_key.as_deref() == Some(key) {
            return;
        }
        self.audio_key = Some(key.to_string());
        self.stop_audio(ctx);
        if key.is_empty() {
            return;
        }
        let Some(entry) = ctx.catalog.get(CatalogCategory::Audio, key) else {
            warn!(key, "unknown_audio");
            return;
        };
        let request = AssetRequest {
            key: audio_asset_key(key),
            url: entry.asset_url().to_string(),
            kind: AssetKind::Audio,
            size_hint: None,
        };
        if assets.ensure(ctx, request, LoadWaiter::Audio(key.to_string())) == AssetState::Ready {
            self.start_audio(ctx, key);
        }
    }

    /// Starts the looped track if `key` is still the selected one.
    fn start_audio(&mut self, ctx: &mut SceneContext<'_>, key: &str) {
        if self.audio_key.as_deref() != Some(key) {
            return;
        }
        self.stop_audio(ctx);
        self.sound = Some(ctx.runtime.play_sound(&audio_asset_key(key), true));
        info!(key, "audio_started");
    }

    fn sync_effect(&mut self, ctx: &mut SceneContext<'_>, snapshot: &StoreSnapshot) {
        let key = snapshot.canvas.effect.as_str();
        if self.effect_key.as_deref() == Some(key) {
            return;
        }
        self.effect_key = Some(key.to_string());
        if let Some(light) = self.light.take() {
            ctx.runtime.destroy(light);
        }
        if key.is_empty() {
            return;
        }
        if key != SPOTLIGHT_EFFECT || !ctx.catalog.contains(CatalogCategory::Effects, key) {
            warn!(key, "unknown_effect");
            return;
        }
        let world = ctx.runtime.world_size();
        let position = self
            .player
            .and_then(|player| ctx.runtime.position(player))
            .unwrap_or(Vec2::new(world.width * 0.5, world.height * 0.5));
        let light = ctx.runtime.create_light(position, SPOTLIGHT_RADIUS);
        ctx.runtime.set_depth(light, SPOTLIGHT_DEPTH);
        self.light = Some(light);
        info!(key, "effect_applied");
    }

    fn configure_player(
        &mut self,
        ctx: &mut SceneContext<'_>,
        groups: SceneGroups,
        entity: &Entity,
        handle: ObjectHandle,
        created: bool,
    ) {
        self.player = Some(handle);
        self.player_title = entity.title.clone();
        let frames = ctx.catalog.sprite_frames(&entity.title);
        ensure_player_animations(ctx, &entity.title, frames);
        if created {
            ctx.runtime.set_collide_world_bounds(handle, true);
            ctx.runtime.set_bounce(handle, PLAYER_BOUNCE);
            let player = Target::Object(handle);
            ctx.runtime
                .add_collider(player, Target::Group(groups.platforms), None);
            ctx.runtime
                .add_overlap(player, Target::Group(groups.items), PLAYER_COLLECT_ITEM);
            ctx.runtime.add_collider(
                player,
                Target::Group(groups.obstacles),
                Some(PLAYER_HIT_OBSTACLE),
            );
        }
        ctx.runtime
            .play_animation(handle, &animation_key("turn", &entity.title));
    }
}

impl SceneHooks for PlayStage {
    fn configure_visual(
        &mut self,
        ctx: &mut SceneContext<'_>,
        groups: SceneGroups,
        entity: &Entity,
        handle: ObjectHandle,
        created: bool,
    ) {
        match entity.kind {
            EntityKind::Player => self.configure_player(ctx, groups, entity, handle, created),
            EntityKind::Item if created => ctx.runtime.set_collide_world_bounds(handle, true),
            EntityKind::Obstacle { behavior } if created => {
                self.rules.apply_obstacle_behavior(ctx, handle, behavior);
            }
            _ => {}
        }
    }

    fn visual_released(&mut self, _ctx: &mut SceneContext<'_>, _id: &EntityId, handle: ObjectHandle) {
        if self.player == Some(handle) {
            self.player = None;
        }
        self.rules.forget_obstacle(handle);
    }
}

/// Playing controller: physics running, gameplay rules active.
pub struct PlayScene {
    core: SceneCore,
    stage: PlayStage,
}

impl PlayScene {
    pub fn new(seed: u64) -> Self {
        Self {
            core: SceneCore::new(Mode::Play),
            stage: PlayStage::new(seed),
        }
    }

    pub fn rules(&self) -> &GameplayRules {
        &self.stage.rules
    }

    pub fn player(&self) -> Option<ObjectHandle> {
        self.stage.player
    }

    pub fn visual_for(&self, id: &EntityId) -> Option<ObjectHandle> {
        self.core.visual_handle(id)
    }

    pub fn visual_count(&self) -> usize {
        self.core.visuals.len()
    }

    pub fn background(&self) -> Option<ObjectHandle> {
        self.core.background()
    }

    pub fn light(&self) -> Option<ObjectHandle> {
        self.stage.light
    }

    pub fn sound(&self) -> Option<SoundHandle> {
        self.stage.sound
    }
}

impl ModeScene for PlayScene {
    fn mode(&self) -> Mode {
        Mode::Play
    }

    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn activate(&mut self, ctx: &mut SceneContext<'_>) {
        ctx.runtime.resume_physics();
        ctx.runtime.clear_overlay();
        for clone in self.stage.rules.reset() {
            ctx.runtime.destroy(clone);
        }
        self.stage.player = None;
        self.stage.audio_key = None;
        self.stage.effect_key = None;

        let groups = self.core.activate(ctx);
        ctx.runtime.add_collider(
            Target::Group(groups.items),
            Target::Group(groups.platforms),
            None,
        );
        let text = self.stage.rules.score_text();
        ctx.runtime.set_hud_text(Some(&text));
    }

    fn deactivate(&mut self, ctx: &mut SceneContext<'_>) {
        self.stage.stop_audio(ctx);
        if let Some(light) = self.stage.light.take() {
            ctx.runtime.destroy(light);
        }
        for clone in self.stage.rules.reset() {
            ctx.runtime.destroy(clone);
        }
        ctx.runtime.set_hud_text(None);
        ctx.runtime.clear_overlay();
        self.core.deactivate(ctx, &mut self.stage);
        ctx.runtime.clear_contact_rules();
        self.stage.player = None;
        self.stage.audio_key = None;
        self.stage.effect_key = None;
    }

    fn take_dirty(&mut self) -> bool {
        self.core.take_dirty()
    }

    fn reconcile(&mut self, ctx: &mut SceneContext<'_>) -> SceneCommand {
        if !self.core.is_active() {
            return SceneCommand::None;
        }
        let snapshot = ctx.store.snapshot();
        if let Some(command) = self.core.check_mode(ctx, &snapshot) {
            return command;
        }
        self.core.sync_background(ctx, &snapshot);
        self.core.release_deleted(ctx, &snapshot, &mut self.stage);
        self.core.sync_positions(ctx, &snapshot);
        self.core.materialize_pending(ctx, &snapshot, &mut self.stage);
        self.stage.sync_audio(ctx, &mut self.core.assets, &snapshot);
        self.stage.sync_effect(ctx, &snapshot);
        SceneCommand::None
    }

    fn on_load_event(&mut self, ctx: &mut SceneContext<'_>, event: &LoadEvent) {
        let unhandled = self.core.on_load_event(ctx, event, &mut self.stage);
        for waiter in unhandled {
            if let LoadWaiter::Audio(key) = waiter {
                self.stage.start_audio(ctx, &key);
            }
        }
    }

    fn handle_interaction(&mut self, _ctx: &mut SceneContext<'_>, event: InteractionEvent) -> SceneCommand {
        match event {
            InteractionEvent::OverlayAction if self.stage.rules.is_game_over() => {
                info!("play_again_requested");
                SceneCommand::Restart
            }
            _ => SceneCommand::None,
        }
    }

    fn handle_contact(&mut self, ctx: &mut SceneContext<'_>, event: ContactEvent) -> SceneCommand {
        let Some(player) = self.stage.player else {
            return SceneCommand::None;
        };
        if event.first != player {
            return SceneCommand::None;
        }
        match event.tag {
            PLAYER_HIT_OBSTACLE => {
                self.stage
                    .rules
                    .player_hit(ctx, player, &self.stage.player_title);
            }
            PLAYER_COLLECT_ITEM => {
                if let Some(groups) = self.core.groups() {
                    self.stage.rules.item_collected(
                        ctx,
                        player,
                        event.second,
                        groups.items,
                        groups.obstacles,
                    );
                }
            }
            _ => {}
        }
        SceneCommand::None
    }

    fn update(&mut self, ctx: &mut SceneContext<'_>, _dt_seconds: f32, input: &PlayerInput) -> SceneCommand {
        if !self.core.is_active() || self.stage.rules.is_game_over() {
            return SceneCommand::None;
        }
        let Some(player) = self.stage.player else {
            return SceneCommand::None;
        };
        self.stage
            .rules
            .drive_player(ctx, player, &self.stage.player_title, input);
        if let (Some(light), Some(position)) = (self.stage.light, ctx.runtime.position(player)) {
            ctx.runtime.set_position(light, position);
        }
        SceneCommand::None
    }
}
