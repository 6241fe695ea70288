//! Generational arena for hypotheses.
//!
//! Nodes refer to each other by `Key`, never by pointer. Removing a value
//! bumps its slot's generation, so a stale key cannot observe whatever is
//! later stored in the same slot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Whether freed slots are recycled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocPolicy {
    /// Every allocation takes a new slot.
    #[default]
    Fresh,
    /// Freed slots are reused, most recently freed first.
    Pooled,
}

pub struct Key<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    fn new(index: u32, generation: u32) -> Self {
        Key {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Key<T> {}

impl<T> std::hash::Hash for Key<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}v{})", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    pub allocated: usize,
    pub recycled: usize,
    pub removed: usize,
    pub live: usize,
    pub slots: usize,
}

#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    policy: AllocPolicy,
    stats: ArenaStats,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new(AllocPolicy::default())
    }
}

impl<T> Arena<T> {
    pub fn new(policy: AllocPolicy) -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            policy,
            stats: ArenaStats::default(),
        }
    }

    pub fn policy(&self) -> AllocPolicy {
        self.policy
    }

    pub fn alloc(&mut self, value: T) -> Key<T> {
        self.stats.allocated += 1;
        self.stats.live += 1;

        if let Some(index) = self.free.pop() {
            self.stats.recycled += 1;
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Key::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        self.stats.slots = self.slots.len();
        Key::new(index, 0)
    }

    pub fn get(&self, key: Key<T>) -> Option<&T> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, key: Key<T>) -> Option<&mut T> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, key: Key<T>) -> bool {
        self.get(key).is_some()
    }

    /// Take the value out of the arena; `None` if the key is stale.
    pub fn remove(&mut self, key: Key<T>) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        if self.policy == AllocPolicy::Pooled {
            self.free.push(key.index);
        }
        self.stats.removed += 1;
        self.stats.live -= 1;
        Some(value)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.stats.live
    }

    pub fn is_empty(&self) -> bool {
        self.stats.live == 0
    }

    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Key::new(i as u32, slot.generation), v))
        })
    }
}

impl<T> Index<Key<T>> for Arena<T> {
    type Output = T;

    fn index(&self, key: Key<T>) -> &Self::Output {
        match self.get(key) {
            Some(value) => value,
            None => panic!("dangling arena key {:?}", key),
        }
    }
}

impl<T> IndexMut<Key<T>> for Arena<T> {
    fn index_mut(&mut self, key: Key<T>) -> &mut Self::Output {
        match self.get_mut(key) {
            Some(value) => value,
            None => panic!("dangling arena key {:?}", key),
        }
    }
}
