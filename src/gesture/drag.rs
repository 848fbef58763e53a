//! Drag-to-dismiss gesture for an expanded item.
//!
//! Phases run `Idle → Pending → Dragging → {Dismissing | Resetting} → Idle`.
//! Movement under the intent threshold is ignored so taps and scrolls are not
//! hijacked. While dragging the item follows the pointer with rubber-banding
//! past the vertical bounds, shrinks toward `min_scale` and dims the
//! backdrop. On release the projected resting point picks the nearest stop:
//! the dismiss stop springs on and fires [`GestureEvent::Dismiss`] once slow
//! enough, the other springs back to rest.

use crate::config::GestureConfig;
use crate::flip::FlipDiff;

use super::physics::{
    find_nearest_number_in_array, project, range_map_clamped, rubber_band_if_out_of_bounds,
};
use super::spring::{Spring, SpringParams};

/// Phase of a dismiss gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    /// Pointer down, no intentional movement yet
    Pending,
    Dragging,
    /// Released toward the dismiss stop
    Dismissing,
    /// Released toward rest
    Resetting,
}

/// Gesture-local accumulator, captured at pointer down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragMemo {
    /// Offset of the item when the pointer went down
    pub initial: (f64, f64),
    /// Movement exceeded the intent threshold
    pub intentional: bool,
    /// The first intentional movement was predominantly vertical
    pub valid_dismiss: bool,
}

/// Animated values to render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Backdrop opacity
    pub opacity: f64,
}

impl DragState {
    pub const REST: DragState = DragState {
        x: 0.0,
        y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        opacity: 1.0,
    };

    pub fn to_diff(&self) -> FlipDiff {
        FlipDiff::new(self.x, self.y, self.scale_x, self.scale_y)
    }
}

/// Notable outcome of a pointer event or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    /// Released without moving: select the item
    Tap,
    /// Released after a drag
    Release { dismissing: bool },
    /// The dismissing item has slowed down: close it
    Dismiss,
    /// The item sprang back to rest
    Settled,
}

/// Whether a release at `y` moving at `velocity` (px/ms) ends on the dismiss
/// stop.
pub fn should_dismiss(y: f64, velocity: f64, config: &GestureConfig) -> bool {
    let (min, max) = config.bounds;
    let projected = y + project(velocity, config.deceleration_rate);
    find_nearest_number_in_array(projected, &[min, max]) == Some(max)
}

/// Dismiss gesture state for one expanded item.
#[derive(Debug, Clone)]
pub struct DismissGesture {
    config: GestureConfig,
    viewport: (f64, f64),
    phase: GesturePhase,
    memo: DragMemo,
    x: Spring,
    y: Spring,
    scale: Spring,
    opacity: Spring,
    /// Fastest vertical speed (px/ms) seen since release
    peak_speed: f64,
}

impl DismissGesture {
    /// Gesture for an item expanded to a `(width, height)` viewport.
    pub fn new(config: GestureConfig, viewport: (f64, f64)) -> Self {
        let movement = SpringParams::default();
        let ratio = SpringParams {
            precision: 0.001,
            ..SpringParams::default()
        };
        Self {
            config,
            viewport,
            phase: GesturePhase::Idle,
            memo: DragMemo::default(),
            x: Spring::at_rest(DragState::REST.x, movement),
            y: Spring::at_rest(DragState::REST.y, movement),
            scale: Spring::at_rest(DragState::REST.scale_x, ratio),
            opacity: Spring::at_rest(DragState::REST.opacity, ratio),
            peak_speed: 0.0,
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn memo(&self) -> &DragMemo {
        &self.memo
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, viewport: (f64, f64)) {
        self.viewport = viewport;
    }

    pub fn state(&self) -> DragState {
        DragState {
            x: self.x.position(),
            y: self.y.position(),
            scale_x: self.scale.position(),
            scale_y: self.scale.position(),
            opacity: self.opacity.position(),
        }
    }

    /// Whether frames need to be ticked.
    pub fn is_animating(&self) -> bool {
        matches!(
            self.phase,
            GesturePhase::Dismissing | GesturePhase::Resetting
        )
    }

    /// Pointer down. A dismissing item cannot be grabbed again.
    pub fn pointer_down(&mut self) -> bool {
        if self.phase == GesturePhase::Dismissing {
            return false;
        }
        for spring in [&mut self.x, &mut self.y, &mut self.scale, &mut self.opacity] {
            let position = spring.position();
            spring.jump_to(position);
        }
        self.memo = DragMemo {
            initial: (self.x.position(), self.y.position()),
            ..DragMemo::default()
        };
        self.phase = GesturePhase::Pending;
        true
    }

    /// Pointer moved by `movement` since pointer down.
    ///
    /// Returns the new state when the item moved.
    pub fn pointer_move(&mut self, movement: (f64, f64)) -> Option<DragState> {
        match self.phase {
            GesturePhase::Pending if !self.memo.intentional => {
                let (dx, dy) = movement;
                if dx.hypot(dy) < self.config.intent_threshold_px {
                    return None;
                }
                self.memo.intentional = true;
                self.memo.valid_dismiss = dy.abs() > dx.abs();
                if !self.memo.valid_dismiss {
                    log::trace!("horizontal drag, not a dismiss gesture");
                    return None;
                }
                self.phase = GesturePhase::Dragging;
                Some(self.follow(movement))
            }
            GesturePhase::Dragging => Some(self.follow(movement)),
            _ => None,
        }
    }

    /// Pointer released after moving by `movement` at `velocity` (px/ms).
    pub fn pointer_up(&mut self, movement: (f64, f64), velocity: (f64, f64)) -> Option<GestureEvent> {
        match self.phase {
            GesturePhase::Pending => {
                self.phase = GesturePhase::Idle;
                let (dx, dy) = movement;
                (!self.memo.intentional && dx.hypot(dy) < self.config.tap_threshold_px)
                    .then_some(GestureEvent::Tap)
            }
            GesturePhase::Dragging => {
                self.follow(movement);
                let dismissing = should_dismiss(self.y.position(), velocity.1, &self.config);
                self.release(dismissing, velocity);
                Some(GestureEvent::Release { dismissing })
            }
            _ => None,
        }
    }

    /// Advance release animations by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Option<GestureEvent> {
        match self.phase {
            GesturePhase::Dismissing => {
                self.step_all(dt);
                // A slow release accelerates toward the stop first; only a
                // speed that has risen and decayed again counts as settling.
                let speed = self.y.velocity_per_ms().abs();
                let decayed = self.peak_speed >= self.config.settle_velocity
                    && speed < self.config.settle_velocity;
                self.peak_speed = self.peak_speed.max(speed);
                if decayed || self.y.is_settled() {
                    log::debug!("dismiss settled at y={:.1}", self.y.position());
                    self.phase = GesturePhase::Idle;
                    return Some(GestureEvent::Dismiss);
                }
                None
            }
            GesturePhase::Resetting => {
                if self.step_all(dt) {
                    self.phase = GesturePhase::Idle;
                    return Some(GestureEvent::Settled);
                }
                None
            }
            _ => None,
        }
    }

    /// Return to rest immediately, e.g. once the dismissed item was closed.
    pub fn reset(&mut self) {
        self.x.jump_to(DragState::REST.x);
        self.y.jump_to(DragState::REST.y);
        self.scale.jump_to(DragState::REST.scale_x);
        self.opacity.jump_to(DragState::REST.opacity);
        self.memo = DragMemo::default();
        self.phase = GesturePhase::Idle;
    }

    fn follow(&mut self, (dx, dy): (f64, f64)) -> DragState {
        let (min, max) = self.config.bounds;
        let (initial_x, initial_y) = self.memo.initial;

        let y = rubber_band_if_out_of_bounds(
            initial_y + dy,
            min,
            max,
            self.viewport.1,
            self.config.rubber_band_constant,
        );
        let scale = range_map_clamped(y, (0.0, max), (1.0, self.config.min_scale));
        let x = initial_x + dx + self.centering_offset(scale);
        let opacity = range_map_clamped(y, (0.0, max), (1.0, 0.0));

        self.x.jump_to(x);
        self.y.jump_to(y);
        self.scale.jump_to(scale);
        self.opacity.jump_to(opacity);
        self.state()
    }

    /// Horizontal shift keeping a top-left-origin scale centered.
    fn centering_offset(&self, scale: f64) -> f64 {
        self.viewport.0 * (1.0 - scale) / 2.0
    }

    fn release(&mut self, dismissing: bool, velocity: (f64, f64)) {
        let (_, max) = self.config.bounds;
        let target = if dismissing {
            DragState {
                x: self.centering_offset(self.config.min_scale),
                y: max,
                scale_x: self.config.min_scale,
                scale_y: self.config.min_scale,
                opacity: 0.0,
            }
        } else {
            DragState::REST
        };
        log::debug!(
            "released at y={:.1} vy={:.3}px/ms, {}",
            self.y.position(),
            velocity.1,
            if dismissing { "dismissing" } else { "resetting" }
        );

        self.x.set_target(target.x);
        self.y.set_target(target.y);
        self.scale.set_target(target.scale_x);
        self.opacity.set_target(target.opacity);
        self.x.set_velocity(velocity.0 * 1000.0);
        self.y.set_velocity(velocity.1 * 1000.0);
        self.peak_speed = velocity.1.abs();
        self.phase = if dismissing {
            GesturePhase::Dismissing
        } else {
            GesturePhase::Resetting
        };
    }

    fn step_all(&mut self, dt: f64) -> bool {
        let settled = [
            self.x.step(dt),
            self.y.step(dt),
            self.scale.step(dt),
            self.opacity.step(dt),
        ];
        settled.iter().all(|s| *s)
    }
}
