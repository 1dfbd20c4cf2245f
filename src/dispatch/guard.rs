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

use crate::fragment::{Fragment, Token};

/// A held reservation, released when dropped
///
/// Only the guard that created the entry releases it. A nested guard acquired
/// with the owner's token leaves the reservation in place when it drops.
#[derive(Debug)]
#[must_use = "the reservation is released as soon as the guard is dropped"]
pub struct ReservationGuard<'f, F: Fragment> {
    fragment: &'f F,
    id: u64,
    token: Token,
    created: bool,
}

impl<'f, F: Fragment> ReservationGuard<'f, F> {
    /// Reserve `id` on `fragment`; `None` when another token holds it
    pub fn acquire(fragment: &'f F, id: u64, token: Token) -> Option<Self> {
        let created = fragment.reserved_by(id).is_none();
        if !fragment.reserve(id, token) {
            log::debug!("fragment {} already reserved for {id}", fragment.id());
            return None;
        }
        Some(Self {
            fragment,
            id,
            token,
            created,
        })
    }

    /// Reservation id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Owner token
    pub fn token(&self) -> Token {
        self.token
    }

    /// Did this guard create the reservation, rather than re-enter it
    pub fn is_owner(&self) -> bool {
        self.created
    }
}

impl<F: Fragment> Drop for ReservationGuard<'_, F> {
    fn drop(&mut self) {
        if !self.created {
            return;
        }
        if !self.fragment.release(self.id, self.token) {
            log::warn!(
                "reservation {} on fragment {} was not held by {}",
                self.id,
                self.fragment.id(),
                self.token
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::TreeSession;
    use crate::model::Document;

    #[test]
    fn test_guard_blocks_other_tokens_until_dropped() {
        let doc = Document::with_root("a", |_| {});
        let session = TreeSession::new(&doc);
        let fragment = session.fragment(doc.root_element().unwrap());
        let (owner, other) = (Token::next(), Token::next());

        {
            let guard = ReservationGuard::acquire(&fragment, 1, owner).unwrap();
            assert_eq!(guard.token(), owner);
            assert!(ReservationGuard::acquire(&fragment, 1, other).is_none());
        }
        assert!(session.reservations().is_empty());
        assert!(ReservationGuard::acquire(&fragment, 1, other).is_some());
    }

    #[test]
    fn test_nested_guard_keeps_outer_reservation() {
        let doc = Document::with_root("a", |_| {});
        let session = TreeSession::new(&doc);
        let fragment = session.fragment(doc.root_element().unwrap());
        let (owner, other) = (Token::next(), Token::next());

        let outer = ReservationGuard::acquire(&fragment, 1, owner).unwrap();
        assert!(outer.is_owner());
        {
            let inner = ReservationGuard::acquire(&fragment, 1, owner).unwrap();
            assert!(!inner.is_owner());
        }
        assert!(!fragment.reserve(1, other));
        assert_eq!(fragment.reserved_by(1), Some(owner));

        drop(outer);
        assert!(session.reservations().is_empty());
        assert!(fragment.reserve(1, other));
    }
}
