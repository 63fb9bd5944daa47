use std::sync::Arc;
use ringbuf::{
    traits::{Consumer, Producer, Split, Observer},
    HeapRb,
    CachingProd,
    CachingCons,
};

/// Producer half of the mixed-output ring buffer. Owned by the mixer thread.
///
/// Lock-free single-producer single-consumer: the device callback never waits
/// on the mixer.
pub struct MixProducer {
    inner: CachingProd<Arc<HeapRb<f32>>>,
}

/// Consumer half of the mixed-output ring buffer. Owned by the device callback.
pub struct MixConsumer {
    inner: CachingCons<Arc<HeapRb<f32>>>,
}

impl MixProducer {
    /// Pushes a slice of interleaved samples.
    /// Returns the number of samples successfully pushed.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.inner.push_slice(samples)
    }

    /// Returns the number of free slots in the buffer.
    pub fn vacant_len(&self) -> usize {
        self.inner.vacant_len()
    }

    /// Total number of samples the buffer holds.
    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

impl MixConsumer {
    /// Pops a single sample, or None if the mixer has fallen behind.
    pub fn pop(&mut self) -> Option<f32> {
        self.inner.try_pop()
    }

    /// Drops everything queued, e.g. after the device format changed.
    pub fn clear(&mut self) -> usize {
        self.inner.clear()
    }
}

/// Creates the ring buffer holding `capacity` samples.
pub fn create_mix_buffer(capacity: usize) -> (MixProducer, MixConsumer) {
    let rb = HeapRb::<f32>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    (
        MixProducer { inner: prod },
        MixConsumer { inner: cons },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop() {
        let (mut prod, mut cons) = create_mix_buffer(4);
        assert_eq!(prod.push_slice(&[0.1, 0.2, 0.3, 0.4, 0.5]), 4);
        assert_eq!(prod.vacant_len(), 0);
        assert_eq!(prod.capacity(), 4);
        assert_eq!(cons.pop(), Some(0.1));
        assert_eq!(cons.pop(), Some(0.2));
        assert_eq!(cons.pop(), Some(0.3));
        assert_eq!(cons.pop(), Some(0.4));
        assert_eq!(cons.pop(), None);
        assert_eq!(prod.vacant_len(), 4);
    }

    #[test]
    fn clear_empties_buffer() {
        let (mut prod, mut cons) = create_mix_buffer(8);
        prod.push_slice(&[1.0; 6]);
        assert_eq!(cons.clear(), 6);
        assert_eq!(cons.pop(), None);
        assert_eq!(prod.vacant_len(), 8);
    }
}
