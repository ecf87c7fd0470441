//! Fixed-capacity circular buffer used for subject replay.

/// A circular buffer holding at most `capacity` values.
///
/// Pushing into a full buffer overwrites the oldest value. Iteration yields
/// values oldest first. A buffer of capacity zero retains nothing.
///
/// # Example
///
/// ```rust
/// use undertow::RingBuffer;
///
/// let mut buffer = RingBuffer::new(2);
/// buffer.push(1);
/// buffer.push(2);
/// buffer.push(3);
///
/// assert_eq!(buffer.to_vec(), vec![2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer<A> {
    slots: Vec<Option<A>>,
    head: usize,
    len: usize,
}

impl<A> RingBuffer<A> {
    /// Create an empty buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        RingBuffer {
            slots,
            head: 0,
            len: 0,
        }
    }

    /// Maximum number of retained values.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of retained values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a value, evicting the oldest one when full.
    pub fn push(&mut self, value: A) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }
        let tail = (self.head + self.len) % capacity;
        self.slots[tail] = Some(value);
        if self.len == capacity {
            self.head = (self.head + 1) % capacity;
        } else {
            self.len += 1;
        }
    }

    /// Iterate retained values, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &A> + '_ {
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % capacity].as_ref())
    }

    /// Drop every retained value.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

impl<A: Clone> RingBuffer<A> {
    /// Copy retained values into a vector, oldest first.
    pub fn to_vec(&self) -> Vec<A> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut buffer = RingBuffer::new(0);
        buffer.push(1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.to_vec(), Vec::<i32>::new());
    }

    #[test]
    fn wraps_around_oldest_first() {
        let mut buffer = RingBuffer::new(3);
        for i in 1..=5 {
            buffer.push(i);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.to_vec(), vec![3, 4, 5]);
    }

    #[test]
    fn clear_resets() {
        let mut buffer = RingBuffer::new(2);
        buffer.push("a");
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.push("b");
        assert_eq!(buffer.to_vec(), vec!["b"]);
    }

    proptest! {
        #[test]
        fn keeps_the_last_capacity_values(values in prop::collection::vec(any::<i32>(), 0..64), capacity in 0usize..8) {
            let mut buffer = RingBuffer::new(capacity);
            for v in &values {
                buffer.push(*v);
            }
            let start = values.len().saturating_sub(capacity);
            prop_assert_eq!(buffer.to_vec(), values[start..].to_vec());
        }
    }
}
