use crate::config::{CacheConfig, ConfigError};
use crate::error::InvariantViolation;

const NIL: usize = usize::MAX;

#[derive(Debug, Copy, Clone)]
struct Node {
    tag: u64,
    prev: usize,
    next: usize,
}

/// Ends of the recency list of one set and the head of its free list.
#[derive(Debug, Copy, Clone)]
struct List {
    head: usize,
    tail: usize,
    free: usize,
    len: usize,
}

/// Recency order of the tags resident in every set, most recently used first.
///
/// Set `i` owns the nodes `i * num_lines..(i + 1) * num_lines` of one shared
/// arena. Unused nodes of a set are chained through `next` into its free list,
/// so recording an access never allocates.
#[derive(Debug, Clone)]
pub struct LruTracker {
    num_lines: usize,
    nodes: Vec<Node>,
    lists: Vec<List>,
}

impl LruTracker {
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        let num_lines = config.num_lines();
        let len = config
            .num_sets()
            .checked_mul(num_lines)
            .ok_or_else(|| config.too_large())?;

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(len).map_err(|_| config.too_large())?;
        let mut lists = Vec::new();
        lists
            .try_reserve_exact(config.num_sets())
            .map_err(|_| config.too_large())?;

        nodes.resize(
            len,
            Node {
                tag: 0,
                prev: NIL,
                next: NIL,
            },
        );
        lists.resize(
            config.num_sets(),
            List {
                head: NIL,
                tail: NIL,
                free: NIL,
                len: 0,
            },
        );

        let mut tracker = Self {
            num_lines,
            nodes,
            lists,
        };
        tracker.clear();
        Ok(tracker)
    }

    pub fn num_sets(&self) -> usize {
        self.lists.len()
    }

    pub fn capacity(&self) -> usize {
        self.num_lines
    }

    pub fn len(&self, set_index: usize) -> usize {
        self.lists[set_index].len
    }

    pub fn is_empty(&self, set_index: usize) -> bool {
        self.len(set_index) == 0
    }

    /// Tags of a set from the most to the least recently used one.
    pub fn iter(&self, set_index: usize) -> impl Iterator<Item = u64> + '_ {
        let mut cursor = self.lists[set_index].head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(cursor)?;
            cursor = node.next;
            Some(node.tag)
        })
    }

    /// Marks `tag` as the most recently used one of the set, tracking it if it is new.
    pub fn record_access(&mut self, set_index: usize, tag: u64) -> Result<(), InvariantViolation> {
        let node = match self.find(set_index, tag) {
            Some(node) => {
                self.unlink(set_index, node);
                node
            }
            None => self.allocate(set_index, tag)?,
        };

        self.push_front(set_index, node);
        Ok(())
    }

    pub fn least_recently_used_tag(&self, set_index: usize) -> Option<u64> {
        self.nodes
            .get(self.lists[set_index].tail)
            .map(|node| node.tag)
    }

    pub fn evict_least_recently_used(&mut self, set_index: usize) -> Option<u64> {
        let node = self.lists[set_index].tail;
        let tag = self.nodes.get(node)?.tag;

        self.unlink(set_index, node);
        self.nodes[node].next = self.lists[set_index].free;
        self.lists[set_index].free = node;
        Some(tag)
    }

    /// Forgets every tag and chains all nodes of each set into its free list.
    pub fn clear(&mut self) {
        for (set_index, list) in self.lists.iter_mut().enumerate() {
            let start = set_index * self.num_lines;
            let end = start + self.num_lines;

            for (index, node) in self.nodes[start..end].iter_mut().enumerate() {
                let index = start + index;
                node.prev = NIL;
                node.next = if index + 1 < end { index + 1 } else { NIL };
            }

            *list = List {
                head: NIL,
                tail: NIL,
                free: start,
                len: 0,
            };
        }
    }

    // associativity is small, a scan along the list is fine here
    fn find(&self, set_index: usize, tag: u64) -> Option<usize> {
        let mut cursor = self.lists[set_index].head;
        while let Some(node) = self.nodes.get(cursor) {
            if node.tag == tag {
                return Some(cursor);
            }
            cursor = node.next;
        }
        None
    }

    fn allocate(&mut self, set_index: usize, tag: u64) -> Result<usize, InvariantViolation> {
        let list = &mut self.lists[set_index];
        let index = list.free;
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(InvariantViolation::TrackerFull {
                capacity: self.num_lines,
                tag,
            })?;

        list.free = node.next;
        *node = Node {
            tag,
            prev: NIL,
            next: NIL,
        };
        Ok(index)
    }

    fn unlink(&mut self, set_index: usize, index: usize) {
        let Node { prev, next, .. } = self.nodes[index];
        let list = &mut self.lists[set_index];

        match prev {
            NIL => list.head = next,
            prev => self.nodes[prev].next = next,
        }
        match next {
            NIL => list.tail = prev,
            next => self.nodes[next].prev = prev,
        }

        list.len -= 1;
    }

    fn push_front(&mut self, set_index: usize, index: usize) {
        let list = &mut self.lists[set_index];
        let old_head = list.head;
        {
            let node = &mut self.nodes[index];
            node.prev = NIL;
            node.next = old_head;
        }

        match old_head {
            NIL => list.tail = index,
            old_head => self.nodes[old_head].prev = index,
        }
        list.head = index;

        list.len += 1;
    }
}
