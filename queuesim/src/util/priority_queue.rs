//! Priority queue with insertion-ordered ties.

/// A binary heap optimized for extraction of the value with the lowest key.
///
/// Each inserted key is complemented with a unique, monotonically increasing
/// epoch, which is returned to the caller as a sequence identifier. Because
/// heap items are sorted by `(key, epoch)`, same-key elements are guaranteed to
/// be pulled in FIFO order.
///
/// Unlike `std::collections::BinaryHeap`, the queue does not require the value
/// type to be ordered and it pulls the lowest key first.
pub(crate) struct PriorityQueue<K, V>
where
    K: Copy + Ord,
{
    heap: Vec<Item<K, V>>,
    next_epoch: u64,
}

impl<K: Copy + Ord, V> PriorityQueue<K, V> {
    /// Creates an empty `PriorityQueue`.
    pub(crate) fn new() -> Self {
        Self {
            heap: Vec::new(),
            next_epoch: 0,
        }
    }

    /// Returns the number of key-value pairs in the priority queue.
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the queue contains no key-value pair.
    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts a new key-value pair and returns its sequence identifier.
    ///
    /// This operation has *O*(log(*N*)) amortized theoretical complexity.
    pub(crate) fn insert(&mut self, key: K, value: V) -> u64 {
        let epoch = self.next_epoch;
        assert_ne!(epoch, u64::MAX);
        self.next_epoch += 1;

        self.heap.push(Item {
            key: UniqueKey { key, epoch },
            value,
        });
        self.sift_up(self.heap.len() - 1);

        epoch
    }

    /// Pulls the value with the lowest key.
    ///
    /// If there are several equal lowest keys, the value which was inserted
    /// first is returned.
    ///
    /// This operation has *O*(log(*N*)) non-amortized theoretical complexity.
    pub(crate) fn pull(&mut self) -> Option<(K, V)> {
        if self.heap.is_empty() {
            return None;
        }

        // Move the last item to the top and sift it down.
        let item = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }

        Some((item.key.key, item.value))
    }

    /// Peeks a reference to the lowest key, leaving it in the queue.
    ///
    /// This operation has *O*(1) non-amortized theoretical complexity.
    pub(crate) fn peek_key(&self) -> Option<&K> {
        self.heap.first().map(|item| &item.key.key)
    }

    /// Removes all key-value pairs; the epoch counter keeps running.
    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    /// Moves the item at `heap_idx` up the heap while its parent has a larger
    /// key.
    fn sift_up(&mut self, heap_idx: usize) {
        let mut child_heap_idx = heap_idx;

        while child_heap_idx != 0 {
            let parent_heap_idx = (child_heap_idx - 1) / 2;

            // Stop when the key is larger or equal to the parent's.
            if self.heap[child_heap_idx].key >= self.heap[parent_heap_idx].key {
                break;
            }
            self.heap.swap(child_heap_idx, parent_heap_idx);
            child_heap_idx = parent_heap_idx;
        }
    }

    /// Moves the item at `heap_idx` down the heap while a child has a smaller
    /// key.
    fn sift_down(&mut self, heap_idx: usize) {
        let mut parent_heap_idx = heap_idx;

        loop {
            let mut child_heap_idx = 2 * parent_heap_idx + 1;
            if child_heap_idx >= self.heap.len() {
                break;
            }

            // If the sibling exists and has a smaller key, make it the
            // candidate for swapping.
            if let Some(other_child) = self.heap.get(child_heap_idx + 1) {
                child_heap_idx += (self.heap[child_heap_idx].key > other_child.key) as usize;
            }

            // Stop when the key is smaller or equal to the smallest child key.
            if self.heap[parent_heap_idx].key <= self.heap[child_heap_idx].key {
                break;
            }
            self.heap.swap(parent_heap_idx, child_heap_idx);
            parent_heap_idx = child_heap_idx;
        }
    }
}

/// A key-value pair stored in the heap.
struct Item<K: Copy, V> {
    key: UniqueKey<K>,
    value: V,
}

/// A unique key made of the user-provided key complemented by a unique epoch.
///
/// Implementation note: `UniqueKey` automatically derives `PartialOrd`, which
/// implies that lexicographic order between `key` and `epoch` must be preserved
/// to make sure that `key` has a higher sorting priority than `epoch`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct UniqueKey<K: Copy> {
    /// The user-provided key.
    key: K,
    /// A unique epoch that indicates the insertion date.
    epoch: u64,
}
