use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::content::SpriteFrames;
use crate::runtime::{
    AnimationSpec, BodyKind, ContactTag, GroupHandle, ObjectHandle, Overlay, SpriteSpec, Vec2,
};
use crate::store::{Mode, MotionState, ObstacleBehavior};

use super::{PlayerInput, SceneContext};

pub const PLAYER_HIT_OBSTACLE: ContactTag = ContactTag(1);
pub const PLAYER_COLLECT_ITEM: ContactTag = ContactTag(2);
pub const SCORE_PER_ITEM: u32 = 10;
pub const RUN_SPEED: f32 = 160.0;
pub const JUMP_VELOCITY: f32 = -830.0;

pub(crate) const PLAYER_BOUNCE: f32 = 0.2;
const BOUNCE_SPEED: f32 = 200.0;
const BOUNCE_START_VY: f32 = 20.0;
const FLOAT_TARGET_Y: f32 = 600.0;
const FLOAT_DURATION_MS: u32 = 3000;
const GAME_OVER_TINT: u32 = 0xff0000;
const ANIMATION_FRAME_RATE: u32 = 10;
const GAME_OVER_MESSAGE: &str = "GAME OVER!";
const PLAY_AGAIN_LABEL: &str = "PLAY AGAIN";

pub(crate) fn animation_key(prefix: &str, title: &str) -> String {
    format!("{prefix}_{title}")
}

/// Registers `left_`, `turn_` and `right_` animations for a player title once.
pub(crate) fn ensure_player_animations(ctx: &mut SceneContext<'_>, title: &str, frames: SpriteFrames) {
    let texture = Mode::Play.texture_key(title);
    let clips = [
        ("left", frames.left.0, frames.left.1, true),
        ("turn", frames.turn, frames.turn, false),
        ("right", frames.right.0, frames.right.1, true),
    ];
    for (prefix, first_frame, last_frame, repeat) in clips {
        let key = animation_key(prefix, title);
        if ctx.runtime.animation_exists(&key) {
            continue;
        }
        ctx.runtime.create_animation(AnimationSpec {
            key,
            texture: texture.clone(),
            first_frame,
            last_frame,
            frame_rate: ANIMATION_FRAME_RATE,
            repeat,
        });
    }
}

/// Score, game-over state and obstacle bookkeeping for one Play session.
#[derive(Debug)]
pub struct GameplayRules {
    game_over: bool,
    score: u32,
    rng: StdRng,
    obstacles: BTreeMap<ObjectHandle, ObstacleBehavior>,
    clones: Vec<ObjectHandle>,
}

impl GameplayRules {
    pub fn new(seed: u64) -> Self {
        Self {
            game_over: false,
            score: 0,
            rng: StdRng::seed_from_u64(seed),
            obstacles: BTreeMap::new(),
            clones: Vec::new(),
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn score_text(&self) -> String {
        format!("Score: {}", self.score)
    }

    pub fn clones(&self) -> &[ObjectHandle] {
        &self.clones
    }

    pub fn obstacle_behavior(&self, handle: ObjectHandle) -> Option<ObstacleBehavior> {
        self.obstacles.get(&handle).copied()
    }

    /// Clears per-session state. Clone handles are returned so the caller
    /// can destroy them.
    pub(crate) fn reset(&mut self) -> Vec<ObjectHandle> {
        self.game_over = false;
        self.score = 0;
        self.obstacles.clear();
        std::mem::take(&mut self.clones)
    }

    pub(crate) fn forget_obstacle(&mut self, handle: ObjectHandle) {
        self.obstacles.remove(&handle);
    }

    /// Applies the motion for `behavior` and tracks the obstacle.
    pub(crate) fn apply_obstacle_behavior(
        &mut self,
        ctx: &mut SceneContext<'_>,
        handle: ObjectHandle,
        behavior: ObstacleBehavior,
    ) {
        match behavior {
            ObstacleBehavior::Bounce => {
                let vx = random_between(&mut self.rng, -BOUNCE_SPEED, BOUNCE_SPEED);
                ctx.runtime.set_bounce(handle, 1.0);
                ctx.runtime.set_collide_world_bounds(handle, true);
                ctx.runtime.set_velocity(handle, Vec2::new(vx, BOUNCE_START_VY));
                ctx.runtime.set_gravity_enabled(handle, false);
            }
            ObstacleBehavior::Float => {
                ctx.runtime.set_gravity_enabled(handle, false);
                ctx.runtime.set_immovable(handle, true);
                ctx.runtime
                    .add_yoyo_tween(handle, FLOAT_TARGET_Y, FLOAT_DURATION_MS);
            }
            ObstacleBehavior::Static => {
                ctx.runtime.set_gravity_enabled(handle, false);
            }
        }
        self.obstacles.insert(handle, behavior);
    }

    /// Ends the round. Later hits are ignored.
    pub(crate) fn player_hit(&mut self, ctx: &mut SceneContext<'_>, player: ObjectHandle, title: &str) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        ctx.runtime.pause_physics();
        ctx.runtime.set_tint(player, Some(GAME_OVER_TINT));
        ctx.runtime.play_animation(player, &animation_key("turn", title));
        ctx.runtime.show_overlay(Overlay {
            message: GAME_OVER_MESSAGE.to_string(),
            action_label: PLAY_AGAIN_LABEL.to_string(),
        });
        info!(score = self.score, "game_over");
    }

    /// Scores a collected item. Once the last active item is gone every item
    /// respawns and one moving obstacle is cloned.
    pub(crate) fn item_collected(
        &mut self,
        ctx: &mut SceneContext<'_>,
        player: ObjectHandle,
        item: ObjectHandle,
        items: GroupHandle,
        obstacles: GroupHandle,
    ) -> bool {
        if self.game_over || !ctx.runtime.body_enabled(item) {
            return false;
        }
        ctx.runtime.set_body_enabled(item, false);
        self.score += SCORE_PER_ITEM;
        let text = self.score_text();
        ctx.runtime.set_hud_text(Some(&text));
        debug!(score = self.score, "item_collected");

        let members = ctx.runtime.group_members(items);
        if members.iter().any(|member| ctx.runtime.body_enabled(*member)) {
            return true;
        }
        self.respawn_items(ctx, &members);
        self.clone_moving_obstacle(ctx, player, obstacles);
        true
    }

    fn respawn_items(&mut self, ctx: &mut SceneContext<'_>, members: &[ObjectHandle]) {
        let world = ctx.runtime.world_size();
        for item in members {
            let size = ctx.runtime.display_size(*item).unwrap_or_default();
            let x = random_between(
                &mut self.rng,
                size.width * 0.5,
                world.width - size.width * 0.5,
            );
            let y = random_between(&mut self.rng, size.height * 0.5, world.height - size.height);
            ctx.runtime.set_body_enabled(*item, true);
            ctx.runtime.set_position(*item, Vec2::new(x, y));
            ctx.runtime.set_velocity(*item, Vec2::ZERO);
        }
        debug!(count = members.len(), "items_respawned");
    }

    fn clone_moving_obstacle(
        &mut self,
        ctx: &mut SceneContext<'_>,
        player: ObjectHandle,
        obstacles: GroupHandle,
    ) {
        // Only authored obstacles are templates; clones are never cloned again.
        let moving: Vec<(ObjectHandle, ObstacleBehavior)> = self
            .obstacles
            .iter()
            .filter(|(handle, behavior)| {
                behavior.motion() == MotionState::Moving
                    && !self.clones.contains(*handle)
                    && ctx.runtime.exists(**handle)
            })
            .map(|(handle, behavior)| (*handle, *behavior))
            .collect();
        if moving.is_empty() {
            return;
        }
        let (source, behavior) = moving[self.rng.random_range(0..moving.len())];
        let Some(texture) = ctx.runtime.texture_key(source) else {
            return;
        };

        let world = ctx.runtime.world_size();
        let half = world.width * 0.5;
        let player_x = ctx.runtime.position(player).map_or(0.0, |position| position.x);
        let x = if player_x < half {
            random_between(&mut self.rng, half, world.width)
        } else {
            random_between(&mut self.rng, 0.0, half)
        };

        let clone = ctx.runtime.create_sprite(SpriteSpec {
            position: Vec2::new(x, 0.0),
            texture,
            body: BodyKind::Dynamic,
        });
        if let Some(size) = ctx.runtime.display_size(source) {
            ctx.runtime.set_display_size(clone, size);
        }
        ctx.runtime.group_add(obstacles, clone);
        self.apply_obstacle_behavior(ctx, clone, behavior);
        self.clones.push(clone);
        info!(behavior = behavior.as_tag(), x, "obstacle_cloned");
    }

    /// Per-frame player control. Does nothing once the round is over.
    pub(crate) fn drive_player(
        &mut self,
        ctx: &mut SceneContext<'_>,
        player: ObjectHandle,
        title: &str,
        input: &PlayerInput,
    ) {
        if self.game_over {
            return;
        }
        let (vx, clip) = if input.left() {
            (-RUN_SPEED, "left")
        } else if input.right() {
            (RUN_SPEED, "right")
        } else {
            (0.0, "turn")
        };
        ctx.runtime.set_velocity_x(player, vx);
        ctx.runtime.play_animation(player, &animation_key(clip, title));
        if input.up() && ctx.runtime.touching_down(player) {
            ctx.runtime.set_velocity_y(player, JUMP_VELOCITY);
        }
    }
}

fn random_between(rng: &mut StdRng, low: f32, high: f32) -> f32 {
    if high <= low {
        return low;
    }
    rng.random_range(low..=high)
}
