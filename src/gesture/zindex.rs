//! Stacking order for overlapping transitions.

/// Elevation of items that are not transitioning.
pub const BASE_Z_INDEX: i32 = 0;

/// Orders the items currently transitioning, most recent on top.
///
/// An item is raised when it is selected or starts animating and settles
/// back to the base elevation once its animation finishes, so an older
/// transition never occludes the current one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZIndexQueue {
    queue: Vec<String>,
}

impl ZIndexQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `id` above every other transitioning item.
    pub fn raise(&mut self, id: &str) {
        self.queue.retain(|queued| queued != id);
        self.queue.push(id.to_string());
    }

    /// Drop `id` back to the base elevation. Returns whether it was raised.
    pub fn settle(&mut self, id: &str) -> bool {
        let before = self.queue.len();
        self.queue.retain(|queued| queued != id);
        self.queue.len() != before
    }

    pub fn z_index(&self, id: &str) -> i32 {
        self.queue
            .iter()
            .position(|queued| queued == id)
            .and_then(|position| i32::try_from(position + 1).ok())
            .map_or(BASE_Z_INDEX, |level| BASE_Z_INDEX + level)
    }

    /// Most recently raised item.
    pub fn top(&self) -> Option<&str> {
        self.queue.last().map(String::as_str)
    }

    pub fn is_raised(&self, id: &str) -> bool {
        self.queue.iter().any(|queued| queued == id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_raise_is_on_top() {
        let mut queue = ZIndexQueue::new();
        queue.raise("img-1");
        queue.raise("img-2");
        assert!(queue.z_index("img-2") > queue.z_index("img-1"));
        assert_eq!(queue.top(), Some("img-2"));

        queue.raise("img-1");
        assert!(queue.z_index("img-1") > queue.z_index("img-2"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_settled_item_falls_back_to_base() {
        let mut queue = ZIndexQueue::new();
        queue.raise("img-1");
        queue.raise("img-2");

        assert!(queue.settle("img-1"));
        assert_eq!(queue.z_index("img-1"), BASE_Z_INDEX);
        assert!(queue.z_index("img-2") > BASE_Z_INDEX);
        assert!(!queue.settle("img-1"));
    }

    #[test]
    fn test_unknown_item_is_at_base() {
        let queue = ZIndexQueue::new();
        assert_eq!(queue.z_index("nope"), BASE_Z_INDEX);
        assert!(queue.is_empty());
        assert_eq!(queue.top(), None);
    }
}
