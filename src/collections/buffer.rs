//! Growable, index-addressed buffer.
//!
//! Backing storage for per-continent membership lists. Appends are amortized
//! O(1): when the buffer is full it reserves room for twice the new length
//! (never less than `MIN_CAPACITY` slots).

/// Smallest capacity a non-empty buffer reserves.
const MIN_CAPACITY: usize = 5;

/// A contiguous sequence that only grows at the back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowableBuffer<T> {
    items: Vec<T>,
}

impl<T> GrowableBuffer<T> {
    /// Creates an empty buffer without allocating.
    pub fn new() -> Self {
        GrowableBuffer { items: Vec::new() }
    }

    /// Appends an item, doubling the reserved storage when full.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.items.capacity() {
            let wanted = ((self.items.len() + 1) * 2).max(MIN_CAPACITY);
            self.items.reserve_exact(wanted - self.items.len());
        }
        self.items.push(item);
    }

    /// Returns the item at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of slots currently reserved.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for GrowableBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<usize> for GrowableBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a GrowableBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_index() {
        let mut buf = GrowableBuffer::new();
        for i in 0..12u8 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 12);
        assert_eq!(buf[0], 0);
        assert_eq!(buf[11], 11);
        assert_eq!(buf.get(12), None);
    }

    #[test]
    fn first_push_reserves_minimum() {
        let mut buf = GrowableBuffer::new();
        assert_eq!(buf.capacity(), 0);
        buf.push(7u8);
        assert!(buf.capacity() >= MIN_CAPACITY);
    }

    #[test]
    fn growth_doubles() {
        let mut buf = GrowableBuffer::new();
        for i in 0..5u8 {
            buf.push(i);
        }
        let before = buf.capacity();
        while buf.len() < buf.capacity() {
            buf.push(0);
        }
        buf.push(1);
        assert!(buf.capacity() >= 2 * before);
    }

    #[test]
    fn iteration_preserves_order() {
        let mut buf = GrowableBuffer::new();
        buf.push(3u8);
        buf.push(1);
        buf.push(2);
        let collected: Vec<u8> = buf.iter().copied().collect();
        assert_eq!(collected, vec![3, 1, 2]);
        assert_eq!(buf.as_slice(), &[3, 1, 2]);
    }
}
