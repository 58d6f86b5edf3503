mod base;
mod edit;
mod machine;
mod play;
mod rules;
mod tools;

#[cfg(test)]
mod tests;

pub use base::AssetState;
pub use edit::EditScene;
pub use machine::{SceneMachine, MAX_RECONCILE_PASSES};
pub use play::PlayScene;
pub use rules::{
    GameplayRules, JUMP_VELOCITY, PLAYER_COLLECT_ITEM, PLAYER_HIT_OBSTACLE, RUN_SPEED,
    SCORE_PER_ITEM,
};
pub use tools::{
    cancel_dialog, confirm_dialog, dialog_for_release, duplicate_entity, interactivity_for,
    resize_from_handle, Interactivity, DUPLICATE_OFFSET,
};

use crate::content::AssetCatalog;
use crate::runtime::{ContactEvent, InteractionEvent, LoadEvent, SceneRuntime};
use crate::store::{EntityStore, Mode};

/// Everything a scene may touch during one call. Scenes never keep these
/// references between calls.
pub struct SceneContext<'a> {
    pub store: &'a mut EntityStore,
    pub runtime: &'a mut dyn SceneRuntime,
    pub catalog: &'a AssetCatalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(Mode),
    Restart,
}

/// Directional intent for the player, sampled once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    left: bool,
    right: bool,
    up: bool,
}

impl PlayerInput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_left(mut self, is_down: bool) -> Self {
        self.left = is_down;
        self
    }

    pub fn with_right(mut self, is_down: bool) -> Self {
        self.right = is_down;
        self
    }

    pub fn with_up(mut self, is_down: bool) -> Self {
        self.up = is_down;
        self
    }

    pub fn left(&self) -> bool {
        self.left
    }

    pub fn right(&self) -> bool {
        self.right
    }

    pub fn up(&self) -> bool {
        self.up
    }
}

/// One of the two controllers bound to the store. Exactly one is active at
/// a time; the scene machine owns activation.
pub trait ModeScene {
    fn mode(&self) -> Mode;
    fn is_active(&self) -> bool;
    fn activate(&mut self, ctx: &mut SceneContext<'_>);
    fn deactivate(&mut self, ctx: &mut SceneContext<'_>);
    /// True when the store changed since the last call.
    fn take_dirty(&mut self) -> bool;
    /// One diff-and-apply pass against the current snapshot.
    fn reconcile(&mut self, ctx: &mut SceneContext<'_>) -> SceneCommand;
    fn on_load_event(&mut self, ctx: &mut SceneContext<'_>, event: &LoadEvent);
    fn handle_interaction(
        &mut self,
        _ctx: &mut SceneContext<'_>,
        _event: InteractionEvent,
    ) -> SceneCommand {
        SceneCommand::None
    }
    fn handle_contact(&mut self, _ctx: &mut SceneContext<'_>, _event: ContactEvent) -> SceneCommand {
        SceneCommand::None
    }
    fn update(
        &mut self,
        _ctx: &mut SceneContext<'_>,
        _dt_seconds: f32,
        _input: &PlayerInput,
    ) -> SceneCommand {
        SceneCommand::None
    }
}
