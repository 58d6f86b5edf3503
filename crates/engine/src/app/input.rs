use winit::keyboard::KeyCode;

use crate::scenes::PlayerInput;
use crate::store::Tool;

/// Held keys that steer the player while Play is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
}

const ACTION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn player_input(&self) -> PlayerInput {
        PlayerInput::empty()
            .with_left(self.is_down(InputAction::MoveLeft))
            .with_right(self.is_down(InputAction::MoveRight))
            .with_up(self.is_down(InputAction::Jump))
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
        }
    }

    pub(crate) fn for_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::ArrowLeft | KeyCode::KeyA => Some(InputAction::MoveLeft),
            KeyCode::ArrowRight | KeyCode::KeyD => Some(InputAction::MoveRight),
            KeyCode::ArrowUp | KeyCode::KeyW | KeyCode::Space => Some(InputAction::Jump),
            _ => None,
        }
    }
}

/// One-shot editor commands, fired on the press edge of their key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorIntent {
    ToggleMode,
    PickTool(Tool),
    ConfirmDialog,
    CancelDialog,
    Restart,
    CycleBackground,
    FlipSelected,
    Quit,
}

impl EditorIntent {
    pub(crate) fn for_key(key: KeyCode) -> Option<Self> {
        let intent = match key {
            KeyCode::Tab => EditorIntent::ToggleMode,
            KeyCode::Digit1 => EditorIntent::PickTool(Tool::ACTIVE[0]),
            KeyCode::Digit2 => EditorIntent::PickTool(Tool::ACTIVE[1]),
            KeyCode::Digit3 => EditorIntent::PickTool(Tool::ACTIVE[2]),
            KeyCode::Digit4 => EditorIntent::PickTool(Tool::ACTIVE[3]),
            KeyCode::Digit5 => EditorIntent::PickTool(Tool::ACTIVE[4]),
            KeyCode::Enter | KeyCode::NumpadEnter => EditorIntent::ConfirmDialog,
            KeyCode::Backspace => EditorIntent::CancelDialog,
            KeyCode::KeyR => EditorIntent::Restart,
            KeyCode::KeyB => EditorIntent::CycleBackground,
            KeyCode::KeyF => EditorIntent::FlipSelected,
            KeyCode::Escape => EditorIntent::Quit,
            _ => return None,
        };
        Some(intent)
    }
}
