//! Before/after measurement and the instant inverse transform.

use std::collections::HashMap;

use super::matrix::{FlipDiff, Matrix2d};
use super::rect::Rect;

/// A live, rendered element.
pub trait ElementHandle {
    /// Current on-screen bounding rectangle, including any inline transform.
    fn bounding_rect(&self) -> Rect;

    /// Inline `transform` style, if set.
    fn inline_transform(&self) -> Option<String>;

    /// Set or clear (`None`) the inline `transform` style.
    fn set_inline_transform(&self, transform: Option<&str>);
}

/// Looks up rendered elements by their flip identifier.
pub trait ElementLocator {
    type Handle: ElementHandle;

    fn locate(&self, id: &str) -> Option<Self::Handle>;
}

impl<L: ElementLocator + ?Sized> ElementLocator for &L {
    type Handle = L::Handle;

    fn locate(&self, id: &str) -> Option<Self::Handle> {
        (**self).locate(id)
    }
}

/// Drives the "play" half of a flip: animating a committed diff back to
/// identity.
pub trait FlipAnimator {
    /// Caller data forwarded from [`FlipRegistry::flip`].
    type Data;

    fn schedule_animation(&mut self, id: &str, from: FlipDiff, data: Option<Self::Data>);
}

/// Records element positions before a layout change and inverts the change
/// afterwards.
pub struct FlipRegistry<L> {
    locator: L,
    positions: HashMap<String, Rect>,
}

impl<L: ElementLocator> FlipRegistry<L> {
    pub fn new(locator: L) -> Self {
        Self {
            locator,
            positions: HashMap::new(),
        }
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Record the current rectangle of `id`. Call before the state change
    /// that moves it. A second call overwrites the first.
    ///
    /// Returns false when no element is tagged `id`.
    pub fn before_flip(&mut self, id: &str) -> bool {
        let Some(element) = self.locator.locate(id) else {
            log::warn!("before_flip: no element tagged '{}'", id);
            return false;
        };
        let rect = element.bounding_rect();
        log::trace!("before_flip '{}': {:?}", id, rect);
        self.positions.insert(id.to_string(), rect);
        true
    }

    pub fn has_position(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Drop a recorded position without flipping.
    pub fn forget(&mut self, id: &str) -> Option<Rect> {
        self.positions.remove(id)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Invert the layout change of `id` and hand the diff to `animator`.
    ///
    /// Call after the state change has been rendered. Missing elements,
    /// missing positions and zero-sized layouts are logged and leave the
    /// element where the layout put it.
    pub fn flip<A: FlipAnimator>(
        &mut self,
        id: &str,
        animator: &mut A,
        data: Option<A::Data>,
    ) -> Option<FlipDiff> {
        let diff = self.measure(id)?;
        self.commit(id, diff);
        animator.schedule_animation(id, diff, data);
        Some(diff)
    }

    /// Compute the starting diff of `id` and commit it instantly, without
    /// scheduling any animation.
    pub fn flip_instant(&mut self, id: &str) -> Option<FlipDiff> {
        let diff = self.measure(id)?;
        self.commit(id, diff);
        Some(diff)
    }

    fn measure(&mut self, id: &str) -> Option<FlipDiff> {
        let Some(element) = self.locator.locate(id) else {
            log::warn!("flip: no element tagged '{}'", id);
            return None;
        };
        let Some(before) = self.positions.remove(id) else {
            log::warn!("flip: no recorded position for '{}', call before_flip first", id);
            return None;
        };

        let residual = match element.inline_transform() {
            Some(css) => Matrix2d::parse(&css).unwrap_or_else(|e| {
                log::warn!("flip: ignoring residual transform of '{}': {}", id, e);
                Matrix2d::IDENTITY
            }),
            None => Matrix2d::IDENTITY,
        };
        element.set_inline_transform(None);

        let after = element.bounding_rect();
        if after.is_degenerate() {
            log::warn!("flip: '{}' has no area after layout, skipping", id);
            return None;
        }

        let diff = flip_diff(&residual, &before, &after);
        log::debug!("flip '{}': {:?} -> {:?} gives {:?}", id, before, after, diff);
        Some(diff)
    }

    fn commit(&self, id: &str, diff: FlipDiff) {
        if let Some(element) = self.locator.locate(id) {
            commit_instant(&element, &diff);
        }
    }

    /// Project an animation frame onto the element tagged `id`.
    ///
    /// A settled frame clears the inline transform.
    pub fn apply_frame(&self, id: &str, diff: &FlipDiff, settled: bool) {
        let Some(element) = self.locator.locate(id) else {
            log::debug!("apply_frame: '{}' is no longer rendered", id);
            return;
        };
        if settled {
            element.set_inline_transform(None);
        } else {
            commit_instant(&element, diff);
        }
    }
}

/// Starting diff: `residual · translate(before - after) · scale(before / after)`.
pub fn flip_diff(residual: &Matrix2d, before: &Rect, after: &Rect) -> FlipDiff {
    let translate = Matrix2d::translate(before.left - after.left, before.top - after.top);
    let scale = Matrix2d::scale(before.width / after.width, before.height / after.height);
    FlipDiff::from_matrix(&Matrix2d::product([residual, &translate, &scale]))
}

/// Apply `diff` as an inline transform, so the element is drawn at its old
/// geometry before the next frame.
pub fn commit_instant(element: &impl ElementHandle, diff: &FlipDiff) {
    element.set_inline_transform(Some(&diff.to_css()));
}
