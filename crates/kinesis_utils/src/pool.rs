use std::num::NonZeroU32;

/// Untyped handle for a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    pub index: u32,
    pub generation: NonZeroU32,
}

/// Generational slot storage. Values of type `T` are addressed through [`PoolHandle`]s, which
/// carry a 32-bit index and a generation used to catch accesses to freed slots.
///
/// Generations are taken from a single pool-wide counter, so a handle can never become valid
/// again once its slot has been freed, even if the index gets reused.
///
/// Panicking conditions:
///  * overflowing the 32-bit index counter
///  * overflowing the 32-bit generation counter
///  * invalid handles passed to `get` or `get_mut` (`try_*` variants exist)
///
/// ## Example
/// ```
/// # use kinesis_utils::Pool;
/// let mut pool: Pool<&str> = Pool::new();
///
/// let handle = pool.allocate("body");
/// assert_eq!(*pool.get(handle), "body");
///
/// assert_eq!(pool.deallocate(handle), Some("body"));
/// assert!(pool.try_get(handle).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool<T> {
    top_generation: NonZeroU32,
    free_indices: Vec<u32>,
    generations: Vec<Option<NonZeroU32>>,
    values: Vec<Option<T>>,
    allocated: u32,

    /// The amount of entries internal vectors grow by once all slots are taken.
    /// The default from [`Pool::new`] is 16.
    pub growth_amount: NonZeroU32,
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self::with_growth(NonZeroU32::new(16).unwrap())
    }

    /// Creates a pool that grows by `growth_amount` slots at a time.
    pub fn with_growth(growth_amount: NonZeroU32) -> Self {
        Self {
            top_generation: NonZeroU32::MIN,
            free_indices: vec![],
            generations: vec![],
            values: vec![],
            allocated: 0,
            growth_amount,
        }
    }

    /// Stores `value` in a free slot and returns its handle.
    ///
    /// ## Panics
    ///  * On 32-bit index overflow
    ///  * On 32-bit generation overflow
    pub fn allocate(&mut self, value: T) -> PoolHandle {
        if self.free_indices.is_empty() {
            self.grow();
        }

        let index = self.free_indices.pop().expect("pool grew without free slots");
        let generation = self.top_generation;
        self.top_generation = generation.checked_add(1).expect("pool generation overflow");

        self.values[index as usize] = Some(value);
        self.generations[index as usize] = Some(generation);
        self.allocated += 1;

        PoolHandle { index, generation }
    }

    /// Frees a slot and hands back the value it held. Invalid handles return [`None`].
    pub fn deallocate(&mut self, handle: PoolHandle) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }

        self.free_indices.push(handle.index);
        self.generations[handle.index as usize] = None;
        self.allocated -= 1;
        self.values[handle.index as usize].take()
    }

    /// ## Panics
    /// Panics if the handle is invalid.
    pub fn get(&self, handle: PoolHandle) -> &T {
        self.try_get(handle).expect("invalid pool handle")
    }

    pub fn try_get(&self, handle: PoolHandle) -> Option<&T> {
        if self.is_valid(handle) {
            self.values[handle.index as usize].as_ref()
        } else {
            None
        }
    }

    /// ## Panics
    /// Panics if the handle is invalid.
    pub fn get_mut(&mut self, handle: PoolHandle) -> &mut T {
        self.try_get_mut(handle).expect("invalid pool handle")
    }

    pub fn try_get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if self.is_valid(handle) {
            self.values[handle.index as usize].as_mut()
        } else {
            None
        }
    }

    #[inline]
    pub fn is_valid(&self, handle: PoolHandle) -> bool {
        self.generations
            .get(handle.index as usize)
            .map(|&generation| generation == Some(handle.generation))
            .unwrap_or(false)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.allocated as usize
    }

    pub fn is_empty(&self) -> bool {
        self.allocated == 0
    }

    /// Iterates over all occupied slots, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.generations
            .iter()
            .zip(self.values.iter())
            .enumerate()
            .filter_map(|(index, (generation, value))| {
                Some((
                    PoolHandle {
                        index: index as u32,
                        generation: (*generation)?,
                    },
                    value.as_ref()?,
                ))
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.generations
            .iter()
            .zip(self.values.iter_mut())
            .enumerate()
            .filter_map(|(index, (generation, value))| {
                Some((
                    PoolHandle {
                        index: index as u32,
                        generation: (*generation)?,
                    },
                    value.as_mut()?,
                ))
            })
    }

    fn grow(&mut self) {
        let low_index = self.generations.len() as u32;
        let high_index = low_index
            .checked_add(self.growth_amount.get())
            .expect("pool index overflow");
        let growth_range = low_index..high_index;

        // Reversed, so that pop hands out the lowest index first
        self.free_indices.extend(growth_range.clone().rev());
        self.generations.extend(growth_range.clone().map(|_| None));
        self.values.extend(growth_range.map(|_| None));
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::Pool;
    use std::num::NonZeroU32;

    #[test]
    pub fn allocate_and_free() {
        let mut pool = Pool::new();
        let a = pool.allocate(123);
        let b = pool.allocate(456);
        let c = pool.allocate(789);

        assert_eq!(pool.len(), 3);
        assert_eq!(*pool.get(a), 123);
        assert_eq!(*pool.get(b), 456);
        assert_eq!(*pool.get(c), 789);

        assert_eq!(pool.deallocate(b), Some(456));
        assert!(pool.try_get(b).is_none());
        assert_eq!(pool.deallocate(b), None);
        assert_eq!(pool.len(), 2);

        // The freed index is reused, the stale handle stays dead
        let d = pool.allocate(1000);
        assert_eq!(d.index, b.index);
        assert_ne!(d.generation, b.generation);
        assert!(pool.try_get(b).is_none());
        assert_eq!(*pool.get(d), 1000);
    }

    #[test]
    pub fn grows_past_initial_capacity() {
        let mut pool = Pool::with_growth(NonZeroU32::new(2).unwrap());
        let handles: Vec<_> = (0..5).map(|i| pool.allocate(i)).collect();

        assert_eq!(pool.len(), 5);
        let values: Vec<_> = pool.iter().map(|(_, value)| *value).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
        assert!(handles.iter().all(|&handle| pool.is_valid(handle)));
    }
}
