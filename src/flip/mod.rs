//! FLIP (First, Last, Invert, Play) transitions.
//!
//! [`FlipRegistry::before_flip`] records where an element is drawn before a
//! state change. After the change is rendered, [`FlipRegistry::flip`] measures
//! the new layout, composes the inverse transform with whatever transform an
//! interrupted animation left behind, commits it inline so the element is
//! still drawn at its old geometry, and hands the diff to a [`FlipAnimator`]
//! that springs it back to identity.
//!
//! DOM access goes through [`ElementLocator`], so the algorithm runs against
//! fakes in tests and against `data-flip-key` elements in the browser.

pub mod animator;
pub mod matrix;
pub mod rect;
pub mod registry;

pub use animator::{FlipFrame, SpringFlipAnimator};
pub use matrix::{FlipDiff, Matrix2d, TransformParseError};
pub use rect::Rect;
pub use registry::{
    ElementHandle, ElementLocator, FlipAnimator, FlipRegistry, commit_instant, flip_diff,
};
