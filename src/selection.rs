//! Ordered selections with caller-defined identity.

use std::fmt;

use crate::cursor::ArrayCursor;

/// Selected items in insertion order, unique by `get_id`.
///
/// An optional `max` bounds the selection; adding beyond it is rejected.
#[derive(Clone)]
pub struct SelectionSet<T, K> {
    items: Vec<T>,
    max: Option<usize>,
    get_id: fn(&T) -> K,
}

impl<T, K: PartialEq> SelectionSet<T, K> {
    pub fn new(get_id: fn(&T) -> K) -> Self {
        Self {
            items: Vec::new(),
            max: None,
            get_id,
        }
    }

    pub fn with_max(get_id: fn(&T) -> K, max: usize) -> Self {
        Self {
            max: Some(max),
            ..Self::new(get_id)
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn ids(&self) -> Vec<K> {
        self.items.iter().map(self.get_id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.max.is_some_and(|max| self.items.len() >= max)
    }

    /// Change the bound, dropping the most recent items beyond it.
    pub fn set_max(&mut self, max: Option<usize>) {
        self.max = max;
        if let Some(max) = max {
            self.items.truncate(max);
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.contains_id(&(self.get_id)(item))
    }

    pub fn contains_id(&self, id: &K) -> bool {
        self.position_of(id).is_some()
    }

    pub fn position_of(&self, id: &K) -> Option<usize> {
        self.items.iter().position(|item| (self.get_id)(item) == *id)
    }

    /// Append `item`. Returns false when it is already selected or the
    /// selection is full.
    pub fn add(&mut self, item: T) -> bool {
        if self.is_full() || self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, item: &T) -> Option<T> {
        let id = (self.get_id)(item);
        self.remove_by_id(&id)
    }

    pub fn remove_by_id(&mut self, id: &K) -> Option<T> {
        self.position_of(id).map(|index| self.items.remove(index))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Select `item` if it is not selected, otherwise deselect it. Returns
    /// whether it is selected afterwards.
    pub fn toggle(&mut self, item: T) -> bool {
        if self.remove(&item).is_some() {
            false
        } else {
            self.add(item)
        }
    }

    /// Remove the item under `cursor`, or the last item when the cursor is
    /// nowhere, like backspace in a tag input. The cursor follows the
    /// shorter list.
    pub fn remove_at_cursor(&mut self, cursor: &mut ArrayCursor) -> Option<T> {
        let removed = match cursor.index() {
            Some(index) => self.remove_at(index),
            None => self.items.pop(),
        };
        cursor.set_len(self.items.len());
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the selection, keeping the first occurrence of each id up to
    /// `max`.
    pub fn replace(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.clear();
        for item in items {
            if self.is_full() {
                break;
            }
            self.add(item);
        }
    }
}

impl<T: fmt::Debug, K> fmt::Debug for SelectionSet<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionSet")
            .field("items", &self.items)
            .field("max", &self.max)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        id: u32,
        label: &'static str,
    }

    fn tag(id: u32, label: &'static str) -> Tag {
        Tag { id, label }
    }

    fn tags() -> SelectionSet<Tag, u32> {
        SelectionSet::new(|tag| tag.id)
    }

    #[test]
    fn test_identity_is_by_id_not_value() {
        let mut selection = tags();
        assert!(selection.add(tag(1, "cat")));
        assert!(!selection.add(tag(1, "renamed cat")));
        assert!(selection.contains(&tag(1, "anything")));
        assert_eq!(selection.items(), &[tag(1, "cat")]);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut selection = tags();
        selection.add(tag(3, "c"));
        selection.add(tag(1, "a"));
        selection.add(tag(2, "b"));
        assert_eq!(selection.ids(), vec![3, 1, 2]);
    }

    #[test]
    fn test_max_rejects_extra_items() {
        let mut selection = SelectionSet::with_max(|tag: &Tag| tag.id, 2);
        assert!(selection.add(tag(1, "a")));
        assert!(selection.add(tag(2, "b")));
        assert!(selection.is_full());
        assert!(!selection.add(tag(3, "c")));
        assert_eq!(selection.len(), 2);

        selection.set_max(Some(1));
        assert_eq!(selection.ids(), vec![1]);
        selection.set_max(None);
        assert!(selection.add(tag(3, "c")));
    }

    #[test]
    fn test_toggle() {
        let mut selection = tags();
        assert!(selection.toggle(tag(7, "x")));
        assert!(!selection.toggle(tag(7, "x")));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_remove_at_cursor_follows_cursor() {
        let mut selection = tags();
        selection.replace([tag(1, "a"), tag(2, "b"), tag(3, "c")]);
        let mut cursor = ArrayCursor::new(selection.len());

        // No cursor: remove the last tag.
        assert_eq!(selection.remove_at_cursor(&mut cursor), Some(tag(3, "c")));
        assert_eq!(cursor.len(), 2);

        cursor.select(1);
        assert_eq!(selection.remove_at_cursor(&mut cursor), Some(tag(2, "b")));
        assert_eq!(cursor.index(), Some(0));
        assert_eq!(selection.remove_at_cursor(&mut cursor), Some(tag(1, "a")));
        assert_eq!(cursor.index(), None);
        assert_eq!(selection.remove_at_cursor(&mut cursor), None);
    }

    #[test]
    fn test_replace_dedupes_and_bounds() {
        let mut selection = SelectionSet::with_max(|tag: &Tag| tag.id, 2);
        selection.replace([tag(1, "a"), tag(1, "dup"), tag(2, "b"), tag(3, "c")]);
        assert_eq!(selection.items(), &[tag(1, "a"), tag(2, "b")]);
        assert_eq!(selection.remove_by_id(&2), Some(tag(2, "b")));
        assert_eq!(selection.remove_at(5), None);
    }
}
