//! Spring-driven playback of flip diffs.

use std::collections::BTreeMap;

use super::matrix::FlipDiff;
use super::registry::FlipAnimator;
use crate::gesture::spring::{Spring, SpringParams};

/// Transform to project onto an element for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipFrame {
    pub id: String,
    pub diff: FlipDiff,
    /// The element reached identity and its animation was dropped
    pub settled: bool,
}

#[derive(Debug, Clone)]
struct TransformSpring {
    x: Spring,
    y: Spring,
    scale_x: Spring,
    scale_y: Spring,
}

impl TransformSpring {
    fn towards_identity(from: FlipDiff, params: SpringParams) -> Self {
        let identity = FlipDiff::IDENTITY;
        Self {
            x: Spring::new(from.x, identity.x, params),
            y: Spring::new(from.y, identity.y, params),
            scale_x: Spring::new(from.scale_x, identity.scale_x, params),
            scale_y: Spring::new(from.scale_y, identity.scale_y, params),
        }
    }

    /// Returns true once every component is at rest.
    fn step(&mut self, dt: f64) -> bool {
        // Step all four, no short-circuit.
        let settled = [
            self.x.step(dt),
            self.y.step(dt),
            self.scale_x.step(dt),
            self.scale_y.step(dt),
        ];
        settled.iter().all(|s| *s)
    }

    fn is_settled(&self) -> bool {
        self.x.is_settled()
            && self.y.is_settled()
            && self.scale_x.is_settled()
            && self.scale_y.is_settled()
    }

    fn current(&self) -> FlipDiff {
        FlipDiff::new(
            self.x.position(),
            self.y.position(),
            self.scale_x.position(),
            self.scale_y.position(),
        )
    }
}

/// Animates each scheduled diff back to identity with a spring.
///
/// Scheduling an identifier that is already animating restarts it from the
/// new diff; the new diff already accounts for the interrupted transform.
#[derive(Debug, Clone, Default)]
pub struct SpringFlipAnimator {
    params: SpringParams,
    active: BTreeMap<String, TransformSpring>,
}

impl SpringFlipAnimator {
    pub fn new(params: SpringParams) -> Self {
        Self {
            params,
            active: BTreeMap::new(),
        }
    }

    pub fn is_animating(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn is_animating_id(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    /// Current transform of `id`, if it is animating.
    pub fn current(&self, id: &str) -> Option<FlipDiff> {
        self.active.get(id).map(TransformSpring::current)
    }

    /// Stop animating `id`, returning where it was.
    pub fn cancel(&mut self, id: &str) -> Option<FlipDiff> {
        self.active.remove(id).map(|spring| spring.current())
    }

    /// Advance every animation by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Vec<FlipFrame> {
        let mut frames = Vec::with_capacity(self.active.len());
        for (id, spring) in self.active.iter_mut() {
            let settled = spring.step(dt);
            frames.push(FlipFrame {
                id: id.clone(),
                diff: if settled {
                    FlipDiff::IDENTITY
                } else {
                    spring.current()
                },
                settled,
            });
        }
        self.active.retain(|_, spring| !spring.is_settled());
        frames
    }
}

impl FlipAnimator for SpringFlipAnimator {
    /// Per-animation spring override.
    type Data = SpringParams;

    fn schedule_animation(&mut self, id: &str, from: FlipDiff, data: Option<SpringParams>) {
        let params = data.unwrap_or(self.params);
        log::trace!("animating '{}' from {:?}", id, from);
        self.active
            .insert(id.to_string(), TransformSpring::towards_identity(from, params));
    }
}
