use serde::{Deserialize, Serialize};

use super::entity::EntityId;

pub const DEFAULT_BACKGROUND: &str = "bg1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Edit,
    Play,
}

impl Mode {
    pub fn other(self) -> Self {
        match self {
            Mode::Edit => Mode::Play,
            Mode::Play => Mode::Edit,
        }
    }

    pub fn texture_prefix(self) -> &'static str {
        match self {
            Mode::Edit => "EDIT",
            Mode::Play => "PLAY",
        }
    }

    /// Textures are registered per mode so the two scenes never share a key.
    pub fn texture_key(self, title: &str) -> String {
        format!("{}_{}", self.texture_prefix(), title)
    }
}

/// Two-phase flag used by both mode switching and deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStatus {
    #[default]
    Idle,
    Pending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Select,
    Delete,
    Resize,
    Flip,
    Duplicate,
    Fill,
    Rotate,
}

impl Tool {
    pub const ACTIVE: [Tool; 5] = [
        Tool::Select,
        Tool::Delete,
        Tool::Resize,
        Tool::Flip,
        Tool::Duplicate,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    #[default]
    Closed,
    ConfirmDelete,
    ConfirmDuplicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasState {
    pub mode: Mode,
    pub mode_switch: TransitionStatus,
    pub tool: Tool,
    pub background: String,
    pub audio: String,
    pub effect: String,
    pub selected: Option<EntityId>,
    pub dialog: DialogState,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            mode: Mode::Edit,
            mode_switch: TransitionStatus::Idle,
            tool: Tool::Select,
            background: DEFAULT_BACKGROUND.to_string(),
            audio: String::new(),
            effect: String::new(),
            selected: None,
            dialog: DialogState::Closed,
        }
    }
}
