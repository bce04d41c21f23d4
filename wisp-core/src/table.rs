//! Open-addressed hash table with linear probing and tombstones.
//!
//! Used by [`crate::pool::StringPool`] to intern strings (structural probe
//! on byte content) and generically usable as an identity-keyed table (a
//! future global-variables table would reuse this unchanged).

use crate::object::Obj;
use crate::value::Value;

const INITIAL_CAPACITY: usize = 8;

enum Slot {
    Free,
    Tombstone,
    Live { key: *const Obj, value: Value },
}

enum Probe {
    Found(usize),
    Insert(usize),
}

/// Entries are `count` = live + tombstone; `entries.len() == 0 ||
/// count + 1 < entries.len()` always holds after a successful `set`, so a
/// probe always terminates.
pub struct HashTable {
    entries: Vec<Slot>,
    count: usize,
}

impl Default for HashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HashTable {
    pub fn new() -> Self {
        HashTable {
            entries: Vec::new(),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn probe(&self, hash: u32, eq: impl Fn(*const Obj) -> bool) -> Probe {
        let cap = self.entries.len();
        debug_assert!(cap > 0);
        let mut index = (hash as usize) % cap;
        let mut tombstone: Option<usize> = None;
        loop {
            match &self.entries[index] {
                Slot::Free => return Probe::Insert(tombstone.unwrap_or(index)),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Live { key, .. } => {
                    if eq(*key) {
                        return Probe::Found(index);
                    }
                }
            }
            index = (index + 1) % cap;
        }
    }

    fn ensure_slack(&mut self) {
        if self.entries.is_empty() || (self.count + 1) * 4 > self.entries.len() * 3 {
            let new_cap = if self.entries.is_empty() {
                INITIAL_CAPACITY
            } else {
                self.entries.len() * 2
            };
            self.grow(new_cap);
        }
    }

    fn grow(&mut self, new_cap: usize) {
        let old = std::mem::replace(
            &mut self.entries,
            (0..new_cap).map(|_| Slot::Free).collect(),
        );
        self.count = 0;
        for slot in old {
            if let Slot::Live { key, value } = slot {
                let hash = unsafe { (*key).as_string().hash() };
                match self.probe(hash, |k| std::ptr::eq(k, key)) {
                    Probe::Insert(i) => {
                        self.entries[i] = Slot::Live { key, value };
                        self.count += 1;
                    }
                    Probe::Found(_) => unreachable!("resize cannot find a duplicate key"),
                }
            }
        }
    }

    /// Insert or overwrite by pointer identity. Returns whether this
    /// occupied a previously-`Free` slot (a brand-new key).
    ///
    /// # Safety
    /// `key` must point at a live `Obj::Str`.
    pub unsafe fn set_identity(&mut self, key: *const Obj, value: Value) -> bool {
        self.ensure_slack();
        let hash = unsafe { (*key).as_string().hash() };
        match self.probe(hash, |k| std::ptr::eq(k, key)) {
            Probe::Found(i) => {
                if let Slot::Live { value: v, .. } = &mut self.entries[i] {
                    *v = value;
                }
                false
            }
            Probe::Insert(i) => {
                let was_new = matches!(self.entries[i], Slot::Free);
                self.entries[i] = Slot::Live { key, value };
                if was_new {
                    self.count += 1;
                }
                true
            }
        }
    }

    /// # Safety
    /// `key` must point at a live `Obj::Str`.
    pub unsafe fn get_identity(&self, key: *const Obj) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let hash = unsafe { (*key).as_string().hash() };
        match self.probe(hash, |k| std::ptr::eq(k, key)) {
            Probe::Found(i) => match &self.entries[i] {
                Slot::Live { value, .. } => Some(*value),
                _ => unreachable!(),
            },
            Probe::Insert(_) => None,
        }
    }

    /// # Safety
    /// `key` must point at a live `Obj::Str`.
    pub unsafe fn delete_identity(&mut self, key: *const Obj) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let hash = unsafe { (*key).as_string().hash() };
        match self.probe(hash, |k| std::ptr::eq(k, key)) {
            Probe::Found(i) => {
                self.entries[i] = Slot::Tombstone;
                true
            }
            Probe::Insert(_) => false,
        }
    }

    /// Structural probe used by the interning pool: find an existing entry
    /// whose key's bytes equal `bytes`, without needing a pointer to compare
    /// against yet.
    pub fn find_by_content(&self, hash: u32, bytes: &[u8]) -> Option<*const Obj> {
        if self.entries.is_empty() {
            return None;
        }
        match self.probe(hash, |k| unsafe { (*k).as_string().as_bytes() } == bytes) {
            Probe::Found(i) => match &self.entries[i] {
                Slot::Live { key, .. } => Some(*key),
                _ => unreachable!(),
            },
            Probe::Insert(_) => None,
        }
    }

    /// # Safety
    /// Every live key in `other` must point at a live `Obj::Str`.
    pub unsafe fn add_all(&mut self, other: &HashTable) {
        for slot in &other.entries {
            if let Slot::Live { key, value } = slot {
                unsafe { self.set_identity(*key, *value) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StringObj;

    fn leak(s: &str) -> *const Obj {
        Box::into_raw(Box::new(Obj::Str(StringObj::from_bytes(
            s.as_bytes().to_vec().into_boxed_slice(),
        ))))
    }

    #[test]
    fn set_get_delete_round_trip() {
        let mut t = HashTable::new();
        let k = leak("alpha");
        assert!(unsafe { t.set_identity(k, Value::Number(1.0)) });
        assert!(unsafe { t.get_identity(k) }.unwrap().equals(&Value::Number(1.0)));
        assert!(unsafe { t.delete_identity(k) });
        assert!(unsafe { t.get_identity(k) }.is_none());
        unsafe { drop(Box::from_raw(k as *mut Obj)) };
    }

    #[test]
    fn slack_invariant_holds_after_many_inserts() {
        let mut t = HashTable::new();
        let mut keys = Vec::new();
        for i in 0..200 {
            let k = leak(&format!("key-{i}"));
            unsafe { t.set_identity(k, Value::Number(i as f64)) };
            keys.push(k);
            assert!(t.capacity() == 0 || t.len() + 1 < t.capacity());
        }
        for k in keys {
            unsafe { drop(Box::from_raw(k as *mut Obj)) };
        }
    }

    #[test]
    fn tombstone_does_not_break_probe_chain() {
        let mut t = HashTable::new();
        let a = leak("a");
        let b = leak("b");
        unsafe { t.set_identity(a, Value::Nil) };
        unsafe { t.set_identity(b, Value::Nil) };
        unsafe { t.delete_identity(a) };
        assert!(unsafe { t.get_identity(b) }.is_some());
        unsafe {
            drop(Box::from_raw(a as *mut Obj));
            drop(Box::from_raw(b as *mut Obj));
        }
    }

    #[test]
    fn find_by_content_matches_structural_equality() {
        let mut t = HashTable::new();
        let k = leak("shared");
        unsafe { t.set_identity(k, Value::Nil) };
        let hash = crate::object::fnv1a_hash(b"shared");
        assert_eq!(t.find_by_content(hash, b"shared"), Some(k));
        assert_eq!(t.find_by_content(hash, b"different"), None);
        unsafe { drop(Box::from_raw(k as *mut Obj)) };
    }
}
