// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Operator Cache
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use vrm_types::error::VrmResult;

/// Single-slot cache tagged with the epoch it was built for.
///
/// A lookup with any other epoch rebuilds the value.
#[derive(Debug, Clone)]
pub struct OperatorCache<T> {
    slot: Option<(u64, T)>,
    builds: usize,
}

impl<T> Default for OperatorCache<T> {
    fn default() -> Self {
        OperatorCache {
            slot: None,
            builds: 0,
        }
    }
}

impl<T> OperatorCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, epoch: u64) -> Option<&T> {
        match &self.slot {
            Some((e, value)) if *e == epoch => Some(value),
            _ => None,
        }
    }

    pub fn get_or_try_insert_with<F>(&mut self, epoch: u64, build: F) -> VrmResult<&T>
    where
        F: FnOnce() -> VrmResult<T>,
    {
        let current = match self.slot.take() {
            Some((e, value)) if e == epoch => (e, value),
            stale => match build() {
                Ok(value) => {
                    self.builds += 1;
                    (epoch, value)
                }
                Err(err) => {
                    self.slot = stale;
                    return Err(err);
                }
            },
        };
        Ok(&self.slot.insert(current).1)
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Number of times a value has been built.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
