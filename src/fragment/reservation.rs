// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Token-guarded reservations owned by a processing session
//!
//! The table maps a node id to that node's reservations, each keyed by a
//! caller-chosen reservation id. A reservation is held by exactly one
//! [`Token`]; the same token may reserve again, any other token is refused.
//! Entries marked inheritable are copied onto descendants when those are
//! wrapped into fragments.

use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity of a reservation owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    /// Wrap an explicit value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// A token distinct from every other token produced by this function
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

/// A stored reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Owner
    pub token: Token,
    /// Visible to descendants wrapped later
    pub inheritable: bool,
}

/// Reservations for every node of one document
///
/// Lives for a single pass over a single document and is not shared across
/// threads.
#[derive(Debug, Default)]
pub struct ReservationTable {
    entries: RefCell<FxHashMap<u64, FxHashMap<u64, Reservation>>>,
    inheritable: Cell<usize>,
}

impl ReservationTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `id` on `node` for `token`
    ///
    /// Succeeds when no entry exists (creating one) or when the existing
    /// entry already belongs to `token`.
    pub fn reserve(&self, node: u64, id: u64, token: Token, inheritable: bool) -> bool {
        let mut entries = self.entries.borrow_mut();
        let slots = entries.entry(node).or_default();
        match slots.get(&id) {
            Some(existing) if existing.token == token => true,
            Some(existing) => {
                log::debug!(
                    "reservation {id} on node {node} held by {}, refused {token}",
                    existing.token
                );
                false
            }
            None => {
                slots.insert(id, Reservation { token, inheritable });
                if inheritable {
                    self.inheritable.set(self.inheritable.get() + 1);
                }
                true
            }
        }
    }

    /// Remove the reservation `id` on `node` if `token` holds it
    pub fn release(&self, node: u64, id: u64, token: Token) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(slots) = entries.get_mut(&node) else {
            log::debug!("release of {id} on node {node} without reservation");
            return false;
        };
        match slots.get(&id) {
            Some(existing) if existing.token == token => {
                if existing.inheritable {
                    self.inheritable.set(self.inheritable.get().saturating_sub(1));
                }
                slots.remove(&id);
                if slots.is_empty() {
                    entries.remove(&node);
                }
                true
            }
            Some(existing) => {
                log::debug!(
                    "release of {id} on node {node} by {token} refused, held by {}",
                    existing.token
                );
                false
            }
            None => {
                log::debug!("release of {id} on node {node} without reservation");
                false
            }
        }
    }

    /// Copy inheritable entries from `ancestors` (nearest first) onto `node`
    ///
    /// Entries already present on `node` are kept, and a nearer ancestor's
    /// entry shadows a farther one.
    pub fn inherit(&self, node: u64, ancestors: impl IntoIterator<Item = u64>) {
        if self.inheritable.get() == 0 {
            return;
        }
        let mut inherited: Vec<(u64, Reservation)> = Vec::new();
        {
            let entries = self.entries.borrow();
            let own = entries.get(&node);
            for ancestor in ancestors {
                let Some(slots) = entries.get(&ancestor) else {
                    continue;
                };
                for (&id, reservation) in slots {
                    let shadowed = own.is_some_and(|own| own.contains_key(&id))
                        || inherited.iter().any(|(seen, _)| *seen == id);
                    if reservation.inheritable && !shadowed {
                        inherited.push((id, *reservation));
                    }
                }
            }
        }
        if inherited.is_empty() {
            return;
        }

        log::trace!("node {node} inherits {} reservation(s)", inherited.len());
        let mut entries = self.entries.borrow_mut();
        let slots = entries.entry(node).or_default();
        for (id, reservation) in inherited {
            slots.insert(id, reservation);
            self.inheritable.set(self.inheritable.get() + 1);
        }
    }

    /// Reservation `id` on `node`, if any
    pub fn get(&self, node: u64, id: u64) -> Option<Reservation> {
        self.entries
            .borrow()
            .get(&node)
            .and_then(|slots| slots.get(&id).copied())
    }

    /// Is `id` reserved on `node`
    pub fn is_reserved(&self, node: u64, id: u64) -> bool {
        self.get(node, id).is_some()
    }

    /// Total number of entries across all nodes
    pub fn len(&self) -> usize {
        self.entries.borrow().values().map(FxHashMap::len).sum()
    }

    /// No entries at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
