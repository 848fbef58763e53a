//! Drag gestures and the physics behind them.

pub mod drag;
pub mod physics;
pub mod spring;
pub mod zindex;

pub use drag::{DismissGesture, DragMemo, DragState, GestureEvent, GesturePhase, should_dismiss};
pub use physics::{
    find_nearest_number_in_array, project, range_map, range_map_clamped, rubber_band,
    rubber_band_if_out_of_bounds,
};
pub use spring::{FrameClock, Spring, SpringParams};
pub use zindex::{BASE_Z_INDEX, ZIndexQueue};
