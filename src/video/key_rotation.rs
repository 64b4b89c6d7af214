use std::sync::atomic::{AtomicUsize, Ordering};

/// API keys used in turn: the active one is kept until the platform refuses it.
#[derive(Debug)]
pub struct ApiKeyRing {
    keys: Vec<String>,
    active: AtomicUsize,
}

impl ApiKeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys,
            active: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index and value of the active key.
    pub fn current(&self) -> Option<(usize, &str)> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.active.load(Ordering::Acquire) % self.keys.len();
        Some((index, self.keys[index].as_str()))
    }

    /// Moves past the key at `failed_index`. If a concurrent request already
    /// rotated away from it, the ring is left alone.
    pub fn rotate_from(&self, failed_index: usize) {
        if self.keys.is_empty() {
            return;
        }
        let next = (failed_index + 1) % self.keys.len();
        let _ = self.active.compare_exchange(
            failed_index,
            next,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(keys: &[&str]) -> ApiKeyRing {
        ApiKeyRing::new(keys.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn blank_keys_are_dropped() {
        let ring = ring(&["", "  ", "k1"]);
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.current(), Some((0, "k1")));
        assert!(ApiKeyRing::new(vec![]).current().is_none());
    }

    #[test]
    fn rotation_wraps_around() {
        let ring = ring(&["a", "b", "c"]);
        ring.rotate_from(0);
        assert_eq!(ring.current(), Some((1, "b")));
        ring.rotate_from(1);
        ring.rotate_from(2);
        assert_eq!(ring.current(), Some((0, "a")));
    }

    #[test]
    fn stale_rotation_is_ignored() {
        let ring = ring(&["a", "b", "c"]);
        ring.rotate_from(0);
        ring.rotate_from(0);
        assert_eq!(ring.current(), Some((1, "b")));
    }
}
