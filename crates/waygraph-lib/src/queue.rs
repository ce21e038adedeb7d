//! Indexed binary min-heap with decrease-key.
//!
//! Entries are dense node indices in `1..=capacity`. Slot 0 of the heap array
//! and node index 0 are never used. `position[node]` records the heap slot of
//! every queued node (0 when not queued), and every sift updates it for each
//! entry it relocates, which keeps `adjust_key` at O(log n).

/// Key of a node that has not been reached.
pub const INFINITY: u64 = u64::MAX;

#[derive(Debug, Clone)]
pub struct PriorityQueue {
    heap: Vec<usize>,
    position: Vec<usize>,
    keys: Vec<u64>,
}

impl PriorityQueue {
    /// Create an empty queue for nodes `1..=capacity`, all keys at [`INFINITY`].
    pub fn new(capacity: usize) -> Self {
        let mut heap = Vec::with_capacity(capacity + 1);
        heap.push(0);
        Self {
            heap,
            position: vec![0; capacity + 1],
            keys: vec![INFINITY; capacity + 1],
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current key of `node` (kept after extraction).
    pub fn key(&self, node: usize) -> u64 {
        self.keys[node]
    }

    /// Heap slot of `node`, 0 when not queued.
    pub fn position(&self, node: usize) -> usize {
        self.position[node]
    }

    pub fn contains(&self, node: usize) -> bool {
        self.position[node] != 0
    }

    /// Queue `node` with `key`.
    pub fn insert(&mut self, node: usize, key: u64) {
        debug_assert!(node != 0, "node index 0 is reserved");
        debug_assert!(!self.contains(node), "node {node} already queued");
        self.keys[node] = key;
        self.heap.push(node);
        let slot = self.len();
        self.position[node] = slot;
        self.upheap(slot);
    }

    /// Remove and return the node with the smallest key.
    pub fn extract_min(&mut self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let min = self.heap[1];
        let last = self.heap.pop().unwrap_or(min);
        if !self.is_empty() {
            self.heap[1] = last;
            self.position[last] = 1;
            self.downheap(1);
        }
        self.position[min] = 0;
        Some(min)
    }

    /// Change the key of a queued node and restore heap order.
    ///
    /// Returns `false` without touching anything when `node` is not queued.
    pub fn adjust_key(&mut self, node: usize, key: u64) -> bool {
        let slot = self.position[node];
        if slot == 0 {
            return false;
        }
        let old = self.keys[node];
        self.keys[node] = key;
        if key < old {
            self.upheap(slot);
        } else if key > old {
            self.downheap(slot);
        }
        true
    }

    fn upheap(&mut self, mut slot: usize) {
        let node = self.heap[slot];
        let key = self.keys[node];
        while slot > 1 {
            let parent = self.heap[slot / 2];
            if self.keys[parent] <= key {
                break;
            }
            self.heap[slot] = parent;
            self.position[parent] = slot;
            slot /= 2;
        }
        self.heap[slot] = node;
        self.position[node] = slot;
    }

    fn downheap(&mut self, mut slot: usize) {
        let size = self.len();
        let node = self.heap[slot];
        let key = self.keys[node];
        while slot <= size / 2 {
            let mut child = slot * 2;
            if child < size && self.keys[self.heap[child]] > self.keys[self.heap[child + 1]] {
                child += 1;
            }
            if key <= self.keys[self.heap[child]] {
                break;
            }
            let moved = self.heap[child];
            self.heap[slot] = moved;
            self.position[moved] = slot;
            slot = child;
        }
        self.heap[slot] = node;
        self.position[node] = slot;
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        for slot in 1..=self.len() {
            let node = self.heap[slot];
            assert_eq!(self.position[node], slot, "stale position for node {node}");
            if slot > 1 {
                let parent = self.heap[slot / 2];
                assert!(self.keys[parent] <= self.keys[node], "heap order broken");
            }
        }
    }
}
