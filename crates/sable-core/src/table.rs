//! Open-addressed hash table and the string interner built on it.
//!
//! The table is keyed by interned strings and probes linearly on the
//! key's stored FNV-1a hash. Key comparison inside the probe loop is
//! pointer comparison; only the interner's raw-lookup path
//! ([`Table::find_str`]) ever compares content, which is what makes
//! interning sound in the first place.
//!
//! Deletion uses tombstones: a deleted slot keeps probe chains intact
//! (lookups walk past it) while insertions may reuse it. The load factor
//! counts tombstones, so a table that churns keys still grows before
//! probe chains degrade.

use std::rc::Rc;

use crate::object::StringObject;
use crate::value::Value;

/// FNV-1a over `bytes` (seed 2166136261, multiplier 16777619).
pub fn str_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// One bucket of the table.
#[derive(Clone, Debug)]
enum Slot {
    /// Never used; terminates probe chains.
    Empty,
    /// Previously held an entry; probe chains continue past it.
    Tombstone,
    /// A live key/value pair.
    Entry { key: Rc<StringObject>, value: Value },
}

/// Open-addressed map from interned string to [`Value`].
///
/// Linear probing, load factor ≤ 3/4, capacity growth `max(8, cap * 2)`.
/// The globals table and the interner's backing set are both this type.
#[derive(Debug, Default)]
pub struct Table {
    slots: Vec<Slot>,
    /// Live entries.
    live: usize,
    /// Live entries plus tombstones (what the load factor watches).
    used: usize,
}

/// Index of the slot `key` occupies, or of the slot an insertion should
/// use (the first tombstone on the chain, else the terminating empty).
///
/// Requires at least one non-entry slot, which the load factor guarantees.
fn find_slot(slots: &[Slot], key: &Rc<StringObject>) -> usize {
    let capacity = slots.len();
    let mut index = key.hash() as usize % capacity;
    let mut tombstone = None;

    loop {
        match &slots[index] {
            Slot::Entry { key: existing, .. } => {
                if Rc::ptr_eq(existing, key) {
                    return index;
                }
            }
            Slot::Tombstone => {
                if tombstone.is_none() {
                    tombstone = Some(index);
                }
            }
            Slot::Empty => return tombstone.unwrap_or(index),
        }
        index = (index + 1) % capacity;
    }
}

impl Table {
    /// Creates an empty table (no allocation until the first insert).
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the table has no live entries.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Inserts or updates `key`. Returns `true` when the key was new.
    pub fn set(&mut self, key: Rc<StringObject>, value: Value) -> bool {
        if (self.used + 1) * 4 > self.slots.len() * 3 {
            self.grow();
        }

        let index = find_slot(&self.slots, &key);
        let is_new = !matches!(self.slots[index], Slot::Entry { .. });
        if is_new {
            self.live += 1;
            if matches!(self.slots[index], Slot::Empty) {
                self.used += 1;
            }
        }
        self.slots[index] = Slot::Entry { key, value };
        is_new
    }

    /// Looks up `key`.
    pub fn get(&self, key: &Rc<StringObject>) -> Option<&Value> {
        if self.live == 0 {
            return None;
        }
        match &self.slots[find_slot(&self.slots, key)] {
            Slot::Entry { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Removes `key`, leaving a tombstone. Returns `true` if it was
    /// present.
    pub fn delete(&mut self, key: &Rc<StringObject>) -> bool {
        if self.live == 0 {
            return false;
        }
        let index = find_slot(&self.slots, key);
        if !matches!(self.slots[index], Slot::Entry { .. }) {
            return false;
        }
        self.slots[index] = Slot::Tombstone;
        self.live -= 1;
        true
    }

    /// Copies every live entry of `from` into `self`.
    pub fn add_all(&mut self, from: &Table) {
        for slot in &from.slots {
            if let Slot::Entry { key, value } = slot {
                self.set(key.clone(), value.clone());
            }
        }
    }

    /// Content-based lookup used by the interner: finds the stored key
    /// whose `{hash, length, bytes}` match, before any `Rc` for the
    /// content exists.
    pub fn find_str(&self, text: &str, hash: u32) -> Option<Rc<StringObject>> {
        if self.live == 0 {
            return None;
        }
        let capacity = self.slots.len();
        let mut index = hash as usize % capacity;
        loop {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Entry { key, .. } => {
                    if key.hash() == hash && key.len() == text.len() && key.as_str() == text {
                        return Some(key.clone());
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    /// Rebuilds into a larger slot array, dropping tombstones.
    fn grow(&mut self) {
        let new_capacity = if self.slots.len() < 8 {
            8
        } else {
            self.slots.len() * 2
        };
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; new_capacity]);
        self.live = 0;
        self.used = 0;

        for slot in old {
            if let Slot::Entry { key, value } = slot {
                let index = find_slot(&self.slots, &key);
                self.slots[index] = Slot::Entry { key, value };
                self.live += 1;
                self.used += 1;
            }
        }
    }
}

/// The string interner: at most one [`StringObject`] per content.
///
/// Backed by a [`Table`] whose values are an unused `true` sentinel.
/// `intern` probes by content first, so a hit allocates nothing beyond
/// the text the caller already built.
///
/// # Examples
///
/// ```
/// use sable_core::Interner;
/// use std::rc::Rc;
///
/// let mut interner = Interner::new();
/// let a = interner.intern("hello");
/// let b = interner.intern("hello");
/// assert!(Rc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Default)]
pub struct Interner {
    strings: Table,
}

impl Interner {
    /// Creates an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unique string object for `text`, creating it on first
    /// sight.
    pub fn intern(&mut self, text: &str) -> Rc<StringObject> {
        let hash = str_hash(text.as_bytes());
        if let Some(existing) = self.strings.find_str(text, hash) {
            return existing;
        }

        let object = Rc::new(StringObject::with_hash(text, hash));
        self.strings.set(object.clone(), Value::Bool(true));
        object
    }

    /// Number of distinct strings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
