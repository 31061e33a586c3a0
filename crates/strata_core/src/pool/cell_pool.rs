use super::CellFactory;
use tracing::trace;

/// Where an acquired handle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    Recycled,
    Created,
}

/// Unbounded LIFO stack of inactive handles. Never shrinks on its own.
pub struct CellPool<H> {
    free: Vec<H>,
    created: usize,
    discarded: usize,
}

impl<H> CellPool<H> {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            created: 0,
            discarded: 0,
        }
    }

    /// Pop a pooled handle, or instantiate one if the pool holds none alive.
    ///
    /// Dead handles found on the way are dropped; they count as discarded.
    pub fn acquire<F>(&mut self, factory: &mut F) -> (H, Acquired)
    where
        F: CellFactory<Handle = H>,
    {
        while let Some(handle) = self.free.pop() {
            if factory.is_alive(&handle) {
                return (handle, Acquired::Recycled);
            }
            self.discarded += 1;
            trace!("dropping stale pooled cell handle");
        }
        self.created += 1;
        (factory.instantiate(), Acquired::Created)
    }

    /// Return an already deactivated handle.
    pub fn put(&mut self, handle: H) {
        self.free.push(handle);
    }

    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Handles ever instantiated through this pool.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Created handles not known to be destroyed (active + pooled).
    pub fn live(&self) -> usize {
        self.created - self.discarded
    }
}

impl<H> Default for CellPool<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::HeadlessFactory;

    #[test]
    fn test_pool_reuses_before_creating() {
        let mut factory = HeadlessFactory::new();
        let mut pool = CellPool::new();

        let (first, how) = pool.acquire(&mut factory);
        assert_eq!(how, Acquired::Created);
        let first_id = first.id;
        pool.put(first);

        let (again, how) = pool.acquire(&mut factory);
        assert_eq!(how, Acquired::Recycled);
        assert_eq!(again.id, first_id);
        assert_eq!(pool.created(), 1);
        assert_eq!(factory.instantiated(), 1);
    }

    #[test]
    fn test_stale_pooled_handles_are_skipped() {
        let mut factory = HeadlessFactory::new();
        let mut pool = CellPool::new();

        let (a, _) = pool.acquire(&mut factory);
        let (b, _) = pool.acquire(&mut factory);
        let stale_id = b.id;
        pool.put(a);
        pool.put(b);
        factory.destroy(stale_id);

        let (handle, how) = pool.acquire(&mut factory);
        assert_eq!(how, Acquired::Recycled);
        assert_ne!(handle.id, stale_id);
        assert_eq!(pool.discarded(), 1);
        assert_eq!(pool.live(), 1);
        assert_eq!(pool.pooled(), 0);
    }
}
