use crossbeam_channel::{bounded, Receiver, Sender};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity FIFO queue shared by one producer and many consumers.
///
/// `put` blocks while the queue is full and `take` blocks while it is empty.
/// The queue never holds more than `capacity` items and never drops one.
/// Both ends of the underlying channel are owned here, so it never
/// disconnects. Share it between threads by reference or behind an `Arc`.
#[derive(Debug)]
pub struct BoundedChannel<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    capacity: usize,
    high_water: AtomicUsize,
}

impl<T> BoundedChannel<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let (sender, receiver) = bounded(capacity.get());
        Self {
            sender,
            receiver,
            capacity: capacity.get(),
            high_water: AtomicUsize::new(0),
        }
    }

    /// Appends an item, waiting for space if the channel is full.
    pub fn put(&self, item: T) {
        if self.sender.send(item).is_ok() {
            self.record_occupancy();
        }
    }

    /// Appends an item only if there is space, handing it back otherwise.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        self.sender.try_send(item).map_err(|e| e.into_inner())?;
        self.record_occupancy();
        Ok(())
    }

    /// Removes the oldest item, waiting for one if the channel is empty.
    pub fn take(&self) -> T {
        match self.receiver.recv() {
            Ok(item) => item,
            Err(_) => unreachable!("the channel holds its own sender"),
        }
    }

    /// Removes the oldest item if there is one.
    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most items the channel has held at once since it was created
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::Acquire)
    }

    fn record_occupancy(&self) {
        self.high_water
            .fetch_max(self.receiver.len(), Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn channel<T>(capacity: usize) -> BoundedChannel<T> {
        BoundedChannel::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_fifo_order() {
        let ch = channel(4);
        for i in 0..4 {
            ch.put(i);
        }
        assert_eq!(ch.len(), 4);
        let taken: Vec<_> = (0..4).map(|_| ch.take()).collect();
        assert_eq!(taken, vec![0, 1, 2, 3]);
        assert!(ch.is_empty());
    }

    #[test]
    fn test_try_put_when_full() {
        let ch = channel(2);
        assert!(ch.try_put("a").is_ok());
        assert!(ch.try_put("b").is_ok());
        assert_eq!(ch.try_put("c"), Err("c"));
        assert_eq!(ch.try_take(), Some("a"));
        assert!(ch.try_put("c").is_ok());
        assert_eq!(ch.high_water_mark(), 2);
    }

    #[test]
    fn test_put_blocks_until_take() {
        let ch = Arc::new(channel(1));
        ch.put(1);

        let producer = {
            let ch = Arc::clone(&ch);
            thread::spawn(move || ch.put(2))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(ch.len(), 1, "second put must wait for space");
        assert_eq!(ch.take(), 1);
        producer.join().unwrap();
        assert_eq!(ch.take(), 2);
        assert_eq!(ch.high_water_mark(), 1);
    }

    #[test]
    fn test_take_blocks_until_put() {
        let ch: Arc<BoundedChannel<&str>> = Arc::new(channel(3));
        let consumer = {
            let ch = Arc::clone(&ch);
            thread::spawn(move || ch.take())
        };
        thread::sleep(Duration::from_millis(20));
        ch.put("late");
        assert_eq!(consumer.join().unwrap(), "late");
    }

    #[test]
    fn test_capacity_bound_with_random_delays() {
        const ITEMS: usize = 400;
        const CONSUMERS: usize = 4;

        for capacity in [1, 3, 10] {
            let ch = Arc::new(channel::<Option<usize>>(capacity));
            let done = Arc::new(AtomicBool::new(false));

            let watcher = {
                let ch = Arc::clone(&ch);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        assert!(ch.len() <= capacity);
                        thread::yield_now();
                    }
                })
            };

            let consumers: Vec<_> = (0..CONSUMERS)
                .map(|_| {
                    let ch = Arc::clone(&ch);
                    thread::spawn(move || {
                        let mut rng = rand::rng();
                        let mut seen = Vec::new();
                        while let Some(item) = ch.take() {
                            seen.push(item);
                            thread::sleep(Duration::from_micros(rng.random_range(0..200)));
                        }
                        seen
                    })
                })
                .collect();

            let mut rng = rand::rng();
            for i in 0..ITEMS {
                ch.put(Some(i));
                if rng.random_bool(0.3) {
                    thread::sleep(Duration::from_micros(rng.random_range(0..300)));
                }
            }
            for _ in 0..CONSUMERS {
                ch.put(None);
            }

            let mut all = HashSet::new();
            for consumer in consumers {
                for item in consumer.join().unwrap() {
                    assert!(all.insert(item), "item {} taken twice", item);
                }
            }
            done.store(true, Ordering::Relaxed);
            watcher.join().unwrap();

            assert_eq!(all.len(), ITEMS);
            assert!(ch.high_water_mark() <= capacity);
            assert!(ch.is_empty());
        }
    }
}
