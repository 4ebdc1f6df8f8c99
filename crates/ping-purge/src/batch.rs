/// Accumulates recent message ids for one bulk-delete call.
///
/// `push` hands the batch back the moment it is full, so the buffer never
/// holds more than `capacity` ids.
#[derive(Debug)]
pub struct BatchDeletionBuffer {
    ids: Vec<u64>,
    capacity: usize,
}

impl BatchDeletionBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add an id; returns the full batch when capacity is reached.
    pub fn push(&mut self, id: u64) -> Option<Vec<u64>> {
        self.ids.push(id);
        if self.ids.len() >= self.capacity {
            Some(self.take())
        } else {
            None
        }
    }

    /// Whatever is left, if anything.
    pub fn drain(&mut self) -> Option<Vec<u64>> {
        if self.ids.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> Vec<u64> {
        std::mem::replace(&mut self.ids, Vec::with_capacity(self.capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = BatchDeletionBuffer::new(99);
        let mut flushed = Vec::new();
        for id in 0..250 {
            if let Some(batch) = buffer.push(id) {
                flushed.push(batch.len());
            }
            assert!(buffer.len() < buffer.capacity());
        }
        assert_eq!(flushed, vec![99, 99]);
        assert_eq!(buffer.drain().map(|b| b.len()), Some(52));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_empty_is_none() {
        let mut buffer = BatchDeletionBuffer::new(10);
        assert!(buffer.drain().is_none());
    }

    #[test]
    fn test_batches_preserve_order() {
        let mut buffer = BatchDeletionBuffer::new(3);
        assert!(buffer.push(1).is_none());
        assert!(buffer.push(2).is_none());
        assert_eq!(buffer.push(3), Some(vec![1, 2, 3]));
    }
}
