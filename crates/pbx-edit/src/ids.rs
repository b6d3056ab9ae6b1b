//! Identifier allocation
//!
//! Fresh identifiers are random uppercase hex, checked against every
//! identifier in the document and every one issued earlier in the session.
//! An issued identifier stays reserved even if the edit that took it was
//! rolled back.

use pbx_model::ObjectId;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashSet;

/// Per-session identifier source
#[derive(Debug)]
pub struct IdAllocator {
    rng: StdRng,
    width: usize,
    issued: HashSet<ObjectId>,
}

impl IdAllocator {
    /// Allocator producing `width` hex digits; seeded when `seed` is given
    #[must_use]
    pub fn new(width: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            width,
            issued: HashSet::new(),
        }
    }

    /// Digits per identifier
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Identifiers handed out so far
    #[inline]
    #[must_use]
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Next identifier for which `taken` is false
    pub fn allocate(&mut self, taken: impl Fn(&str) -> bool) -> ObjectId {
        let mut bytes = vec![0u8; self.width.div_ceil(2)];
        loop {
            self.rng.fill_bytes(&mut bytes);
            let mut token = hex::encode_upper(&bytes);
            token.truncate(self.width);
            if taken(&token) || self.issued.contains(token.as_str()) {
                tracing::debug!(%token, "identifier collision, drawing again");
                continue;
            }
            let id = ObjectId::from(token);
            self.issued.insert(id.clone());
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_and_alphabet() {
        let mut ids = IdAllocator::new(24, Some(1));
        let id = ids.allocate(|_| false);
        assert_eq!(id.as_str().len(), 24);
        assert!(id.is_hex());
        assert_eq!(id.as_str(), id.as_str().to_uppercase());
    }

    #[test]
    fn odd_width() {
        let mut ids = IdAllocator::new(9, Some(1));
        assert_eq!(ids.allocate(|_| false).as_str().len(), 9);
    }

    #[test]
    fn seeded_allocators_agree() {
        let mut a = IdAllocator::new(24, Some(99));
        let mut b = IdAllocator::new(24, Some(99));
        assert_eq!(a.allocate(|_| false), b.allocate(|_| false));
    }

    #[test]
    fn skips_taken_identifiers() {
        let mut probe = IdAllocator::new(24, Some(5));
        let first = probe.allocate(|_| false);

        let mut ids = IdAllocator::new(24, Some(5));
        let next = ids.allocate(|t| t == first.as_str());
        assert_ne!(next, first);
    }

    #[test]
    fn never_reissues() {
        let mut ids = IdAllocator::new(8, Some(3));
        let all: HashSet<ObjectId> = (0..500).map(|_| ids.allocate(|_| false)).collect();
        assert_eq!(all.len(), 500);
        assert_eq!(ids.issued(), 500);
    }
}
