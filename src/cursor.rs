//! Keyboard-style navigation over a list.

/// Position within a list of `len` items, or nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayCursor {
    index: Option<usize>,
    len: usize,
    wrap: bool,
}

impl ArrayCursor {
    /// Cursor that stops at either end.
    pub fn new(len: usize) -> Self {
        Self {
            index: None,
            len,
            wrap: false,
        }
    }

    /// Cursor that wraps around at either end.
    pub fn wrapping(len: usize) -> Self {
        Self {
            wrap: true,
            ..Self::new(len)
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move forward. From nowhere, moves to the first item.
    pub fn move_next(&mut self) -> Option<usize> {
        self.index = match self.index {
            _ if self.len == 0 => None,
            None => Some(0),
            Some(i) if i + 1 < self.len => Some(i + 1),
            Some(_) if self.wrap => Some(0),
            Some(i) => Some(i),
        };
        self.index
    }

    /// Move backward. From nowhere, moves to the last item.
    pub fn move_prev(&mut self) -> Option<usize> {
        self.index = match self.index {
            _ if self.len == 0 => None,
            None => Some(self.len - 1),
            Some(i) if i > 0 => Some(i - 1),
            Some(_) if self.wrap => Some(self.len - 1),
            Some(i) => Some(i),
        };
        self.index
    }

    pub fn has_next(&self) -> bool {
        match self.index {
            None => self.len > 0,
            Some(i) => self.wrap || i + 1 < self.len,
        }
    }

    pub fn has_prev(&self) -> bool {
        match self.index {
            None => self.len > 0,
            Some(i) => self.wrap || i > 0,
        }
    }

    /// Jump to `index`. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.len {
            self.index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.index = None;
    }

    /// Follow a change in list length, keeping the cursor in range.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.index = match self.index {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => None,
        };
    }

    /// The item under the cursor.
    pub fn item<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        self.index.and_then(|i| items.get(i))
    }
}
