use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::runtime::Vec2;
use crate::scenes::PlayerInput;
use crate::session::EditorSession;
use crate::store::{DialogState, Mode};
use crate::StartupError;

use super::input::{ActionStates, EditorIntent, InputAction};
use super::metrics::MetricsAccumulator;
use super::{MetricsHandle, Renderer};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
    /// Draw the mode/tool line along the bottom of the canvas.
    pub show_status: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Game Builder".to_string(),
            window_width: 800,
            window_height: 600,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: Some(60),
            show_status: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, session: EditorSession) -> Result<(), AppError> {
    run_app_with_metrics(config, session, MetricsHandle::default())
}

/// Opens the preview window and drives `session` at a fixed tick rate until
/// the window closes or Escape is pressed.
pub fn run_app_with_metrics(
    config: LoopConfig,
    mut session: EditorSession,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(window_title(&config.window_title, session.active_mode()))
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let world = session.config().world_size;
    let asset_root = session.config().asset_root.clone();
    let mut renderer =
        Renderer::new(Arc::clone(&window), world, asset_root).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(render_cap);
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        render_fps_cap = render_cap.unwrap_or(0),
        world_width = world.width,
        world_height = world.height,
        "loop_config"
    );

    let mut input = InputCollector::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics = MetricsAccumulator::new(metrics_log_interval);
    let mut titled_mode = session.active_mode();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(size) => {
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let world_position =
                        renderer.window_to_world(position.x as f32, position.y as f32);
                    input.handle_cursor(world_position);
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input.handle_mouse(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        input.handle_key(code, event.state);
                    }
                    if input.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                    let plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..plan.ticks_to_run {
                        let tick = input.take_tick();
                        run_tick(&mut session, tick, fixed_dt_seconds);
                        metrics.record_tick();
                    }
                    accumulator = plan.remaining_accumulator;
                    if plan.dropped_backlog > Duration::ZERO {
                        metrics.record_dropped_backlog(plan.dropped_backlog);
                        warn!(
                            dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let cap_sleep = compute_cap_sleep(
                        Instant::now().saturating_duration_since(last_present_instant),
                        render_frame_target,
                    );
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let status = config.show_status.then(|| status_line(&session));
                    if let Err(error) = renderer.render(session.runtime(), status.as_deref()) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let mode = session.active_mode();
                    if mode != titled_mode {
                        window.set_title(&window_title(&config.window_title, mode));
                        titled_mode = mode;
                    }

                    metrics.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            worst_frame_ms = snapshot.worst_frame_ms,
                            sprite_count = session.runtime().sprite_count(),
                            mode = ?mode,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                session.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// One fixed step: editor intents first, then pointer events, then the
/// session frame with the held movement keys.
fn run_tick(session: &mut EditorSession, tick: TickInput, dt_seconds: f32) {
    for intent in tick.intents {
        apply_intent(session, intent);
    }
    for pointer in tick.pointer {
        match pointer {
            PointerEvent::Down(position) => {
                session.pointer_down(position);
            }
            PointerEvent::Move(position) => session.pointer_move(position),
            PointerEvent::Up(position) => session.pointer_up(position),
        }
    }
    session.frame(dt_seconds, &tick.player);
}

fn apply_intent(session: &mut EditorSession, intent: EditorIntent) {
    match intent {
        EditorIntent::ToggleMode => {
            let mode = session.toggle_mode();
            debug!(mode = ?mode, "mode_toggle_requested");
        }
        EditorIntent::PickTool(tool) => {
            session.switch_tool(tool);
        }
        EditorIntent::ConfirmDialog => {
            session.confirm_dialog();
        }
        EditorIntent::CancelDialog => {
            session.cancel_dialog();
        }
        EditorIntent::Restart => {
            session.restart();
        }
        EditorIntent::CycleBackground => {
            session.cycle_background();
        }
        EditorIntent::FlipSelected => {
            session.flip_selected();
        }
        EditorIntent::Quit => {}
    }
}

fn window_title(base: &str, mode: Mode) -> String {
    match mode {
        Mode::Edit => format!("{base} - Edit"),
        Mode::Play => format!("{base} - Play"),
    }
}

/// Bottom-of-canvas hint for the current mode, tool and dialog.
fn status_line(session: &EditorSession) -> String {
    let snapshot = session.snapshot();
    let canvas = &snapshot.canvas;
    match canvas.mode {
        Mode::Play if session.is_game_over() => "GAME OVER - R: RESTART  TAB: EDIT".to_string(),
        Mode::Play => "PLAY - ARROWS: MOVE  TAB: EDIT".to_string(),
        Mode::Edit => match canvas.dialog {
            DialogState::ConfirmDelete => "DELETE? ENTER: YES  BACKSPACE: NO".to_string(),
            DialogState::ConfirmDuplicate => "DUPLICATE? ENTER: YES  BACKSPACE: NO".to_string(),
            DialogState::Closed => format!(
                "EDIT - TOOL: {:?}  BG: {}",
                canvas.tool, canvas.background
            ),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerEvent {
    Down(Vec2),
    Move(Vec2),
    Up(Vec2),
}

#[derive(Debug, Default)]
struct TickInput {
    player: PlayerInput,
    intents: Vec<EditorIntent>,
    pointer: Vec<PointerEvent>,
}

/// Buffers window input between ticks. Intents fire once per key press and
/// pointer events are replayed in arrival order on the next tick.
#[derive(Debug, Default)]
struct InputCollector {
    actions: ActionStates,
    keys_down: HashSet<KeyCode>,
    intents: Vec<EditorIntent>,
    pointer: Vec<PointerEvent>,
    cursor: Option<Vec2>,
    left_mouse_is_down: bool,
    quit_requested: bool,
}

impl InputCollector {
    fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    fn handle_key(&mut self, code: KeyCode, state: ElementState) {
        let is_pressed = state == ElementState::Pressed;
        if let Some(action) = InputAction::for_key(code) {
            self.actions.set(action, is_pressed);
        }
        if !is_pressed {
            self.keys_down.remove(&code);
            return;
        }
        if !self.keys_down.insert(code) {
            return;
        }
        if let Some(intent) = EditorIntent::for_key(code) {
            if intent == EditorIntent::Quit {
                self.quit_requested = true;
            }
            self.intents.push(intent);
        }
    }

    fn handle_cursor(&mut self, position: Vec2) {
        self.cursor = Some(position);
        if self.left_mouse_is_down {
            self.pointer.push(PointerEvent::Move(position));
        }
    }

    fn handle_mouse(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        let Some(position) = self.cursor else {
            return;
        };
        match state {
            ElementState::Pressed if !self.left_mouse_is_down => {
                self.left_mouse_is_down = true;
                self.pointer.push(PointerEvent::Down(position));
            }
            ElementState::Released if self.left_mouse_is_down => {
                self.left_mouse_is_down = false;
                self.pointer.push(PointerEvent::Up(position));
            }
            _ => {}
        }
    }

    fn take_tick(&mut self) -> TickInput {
        TickInput {
            player: self.actions.player_input(),
            intents: std::mem::take(&mut self.intents),
            pointer: std::mem::take(&mut self.pointer),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(mut accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }
    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::AssetCatalog;
    use crate::session::SessionConfig;
    use crate::store::Tool;

    fn session() -> EditorSession {
        EditorSession::new(SessionConfig::default(), AssetCatalog::builtin())
    }

    #[test]
    fn plan_sim_steps_runs_whole_ticks_and_keeps_remainder() {
        let plan = plan_sim_steps(Duration::from_millis(40), Duration::from_millis(16), 5);
        assert_eq!(plan.ticks_to_run, 2);
        assert_eq!(plan.remaining_accumulator, Duration::from_millis(8));
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_past_the_tick_cap() {
        let plan = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::ZERO);
        assert_eq!(plan.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn frame_pacing_helpers() {
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), Duration::from_millis(250)),
            Duration::from_millis(250)
        );
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(target_frame_duration(None), None);
        let target = target_frame_duration(Some(60));
        assert_eq!(compute_cap_sleep(Duration::from_millis(20), target), Duration::ZERO);
        assert!(compute_cap_sleep(Duration::from_millis(5), target) > Duration::ZERO);
    }

    #[test]
    fn held_key_fires_its_intent_once() {
        let mut input = InputCollector::default();
        input.handle_key(KeyCode::Tab, ElementState::Pressed);
        input.handle_key(KeyCode::Tab, ElementState::Pressed);
        assert_eq!(input.take_tick().intents, vec![EditorIntent::ToggleMode]);
        assert!(input.take_tick().intents.is_empty());

        input.handle_key(KeyCode::Tab, ElementState::Released);
        input.handle_key(KeyCode::Tab, ElementState::Pressed);
        assert_eq!(input.take_tick().intents, vec![EditorIntent::ToggleMode]);
    }

    #[test]
    fn movement_keys_stay_down_across_ticks() {
        let mut input = InputCollector::default();
        input.handle_key(KeyCode::ArrowLeft, ElementState::Pressed);
        assert!(input.take_tick().player.left());
        assert!(input.take_tick().player.left());
        input.handle_key(KeyCode::ArrowLeft, ElementState::Released);
        assert!(!input.take_tick().player.left());
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        assert!(!input.quit_requested());
        input.handle_key(KeyCode::Escape, ElementState::Pressed);
        assert!(input.quit_requested());
    }

    #[test]
    fn drag_is_queued_between_press_and_release() {
        let mut input = InputCollector::default();
        input.handle_cursor(Vec2::new(10.0, 10.0));
        input.handle_mouse(MouseButton::Left, ElementState::Pressed);
        input.handle_cursor(Vec2::new(20.0, 15.0));
        input.handle_mouse(MouseButton::Left, ElementState::Released);
        input.handle_cursor(Vec2::new(30.0, 30.0));

        assert_eq!(
            input.take_tick().pointer,
            vec![
                PointerEvent::Down(Vec2::new(10.0, 10.0)),
                PointerEvent::Move(Vec2::new(20.0, 15.0)),
                PointerEvent::Up(Vec2::new(20.0, 15.0)),
            ]
        );
        assert!(input.take_tick().pointer.is_empty());
    }

    #[test]
    fn clicks_before_the_cursor_is_known_are_ignored() {
        let mut input = InputCollector::default();
        input.handle_mouse(MouseButton::Left, ElementState::Pressed);
        input.handle_mouse(MouseButton::Right, ElementState::Pressed);
        assert!(input.take_tick().pointer.is_empty());
    }

    #[test]
    fn ticks_apply_intents_to_the_session() {
        let mut session = session();
        let tick = TickInput {
            intents: vec![EditorIntent::PickTool(Tool::Resize)],
            ..TickInput::default()
        };
        run_tick(&mut session, tick, 1.0 / 60.0);
        assert_eq!(session.snapshot().canvas.tool, Tool::Resize);
        assert!(status_line(&session).contains("Resize"));

        let tick = TickInput {
            intents: vec![EditorIntent::ToggleMode],
            ..TickInput::default()
        };
        run_tick(&mut session, tick, 1.0 / 60.0);
        run_tick(&mut session, TickInput::default(), 1.0 / 60.0);
        assert_eq!(session.active_mode(), Mode::Play);
        assert!(status_line(&session).starts_with("PLAY"));
    }

    #[test]
    fn window_title_names_the_mode() {
        assert_eq!(window_title("Game Builder", Mode::Edit), "Game Builder - Edit");
        assert_eq!(window_title("Game Builder", Mode::Play), "Game Builder - Play");
    }
}
