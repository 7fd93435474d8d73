//! Test utilities for arena-based testing.
//!
//! This module provides helpers for tests that need a node builder and
//! nodes whose destructors can be observed.

#[cfg(test)]
pub mod test {
    use super::super::node_builder::NodeBuilder;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared log of destructor calls, in the order they ran.
    #[derive(Clone, Default)]
    pub struct Probe {
        dropped: Rc<RefCell<Vec<u32>>>,
    }

    impl Probe {
        pub fn new() -> Self {
            Self::default()
        }

        /// Tags of the nodes dropped so far.
        pub fn dropped(&self) -> Vec<u32> {
            self.dropped.borrow().clone()
        }
    }

    /// Node with a non-trivial destructor that reports to a [`Probe`].
    pub struct DropCounter {
        pub tag: u32,
        probe: Probe,
    }

    impl DropCounter {
        pub fn new(probe: &Probe, tag: u32) -> Self {
            Self {
                tag,
                probe: probe.clone(),
            }
        }
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.probe.dropped.borrow_mut().push(self.tag);
        }
    }

    /// Run a test with a builder whose arenas hold `arena_size` bytes.
    ///
    /// The builder is dropped when the closure returns, so destructor
    /// effects are visible to the caller afterwards.
    pub fn with_test_builder<F, R>(arena_size: usize, f: F) -> R
    where
        F: FnOnce(&mut NodeBuilder) -> R,
    {
        let mut builder = NodeBuilder::with_arena_size(arena_size);
        f(&mut builder)
    }
}
