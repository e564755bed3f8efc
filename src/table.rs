use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
    occupied: bool,
}

/// Hash-consing table: stores each distinct value once and hands out stable indices.
///
/// Index `0` is a sentinel and is never returned. Freed cells are recycled, so
/// an index stays valid until the value it names is dropped.
pub struct Table<T> {
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bitmask: u64,

    /// Indices of non-occupied cells available for reuse.
    free: Vec<usize>,
    /// Number of occupied cells.
    real_size: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with initial room for `2^bits` values.
    ///
    /// The table grows on demand.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let mut data = Vec::with_capacity(1 << bits);
        data.push(Entry {
            value: T::default(),
            next: 0,
            occupied: true,
        });

        let buckets_size = 1 << bits.clamp(4, 16);

        Self {
            data,
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
            free: Vec::new(),
            real_size: 0,
        }
    }
}

impl<T> Table<T> {
    /// Number of allocated cells, including free ones.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }
    /// Get the number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    /// Check if the cell at the given index is occupied.
    pub fn is_occupied(&self, index: usize) -> bool {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].occupied
    }

    fn alloc(&mut self, value: T) -> usize {
        self.real_size += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.data[index];
            entry.value = value;
            entry.next = 0;
            entry.occupied = true;
            index
        } else {
            self.data.push(Entry {
                value,
                next: 0,
                occupied: true,
            });
            self.data.len() - 1
        }
    }

    /// Indices of all occupied cells, in increasing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (1..self.data.len()).filter(|&i| self.data[i].occupied)
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Find the index of an equal value, if present.
    pub fn find(&self, value: &T) -> Option<usize> {
        let mut index = self.buckets[self.bucket_index(value)];
        while index != 0 {
            if &self.data[index].value == value {
                return Some(index);
            }
            index = self.data[index].next;
        }
        None
    }

    /// Put a value into the table and return its index.
    ///
    /// An equal value already present is reused.
    pub fn put(&mut self, value: T) -> usize {
        if let Some(index) = self.find(&value) {
            return index;
        }
        if self.real_size >= 2 * self.buckets.len() && self.buckets.len() < (1 << 24) {
            self.rehash(self.buckets.len() * 2);
        }
        let bucket = self.bucket_index(&value);
        let index = self.alloc(value);
        self.data[index].next = self.buckets[bucket];
        self.buckets[bucket] = index;
        index
    }

    /// Drop every value for which `keep` returns false.
    ///
    /// Indices of kept values do not change.
    pub fn retain(&mut self, mut keep: impl FnMut(usize, &T) -> bool) -> usize {
        let mut dropped = 0;
        for index in 1..self.data.len() {
            if self.data[index].occupied && !keep(index, &self.data[index].value) {
                self.data[index].occupied = false;
                self.free.push(index);
                self.real_size -= 1;
                dropped += 1;
            }
        }
        // Reuse low indices first.
        self.free.sort_unstable_by(|a, b| b.cmp(a));
        self.rehash(self.buckets.len());
        dropped
    }

    fn rehash(&mut self, num_buckets: usize) {
        self.buckets = vec![0; num_buckets];
        self.bitmask = (num_buckets - 1) as u64;
        for index in 1..self.data.len() {
            if self.data[index].occupied {
                let bucket = self.bucket_index(&self.data[index].value);
                self.data[index].next = self.buckets[bucket];
                self.buckets[bucket] = index;
            }
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
