use super::SequenceError;
use crate::types::Element;

/// Minimum number of entries computed when the cache has to grow.
pub const CACHE_BLOCK: i64 = 128;

/// Most entries a single cache will hold. A request further out is refused
/// instead of computing and storing everything before it.
pub const CACHE_LIMIT: i64 = 1 << 22;

/// Consecutive computed entries starting at the sequence's first index.
#[derive(Debug, Clone, Default)]
pub struct ElementCache {
    first: i64,
    values: Vec<Element>,
}

impl ElementCache {
    pub fn new(first: i64) -> Self {
        Self {
            first,
            values: Vec::new(),
        }
    }

    pub fn get(&self, n: i64) -> Option<&Element> {
        let offset = usize::try_from(n.checked_sub(self.first)?).ok()?;
        self.values.get(offset)
    }

    /// Like [`ElementCache::get`], for use inside `calculate` where earlier
    /// entries are guaranteed to exist.
    pub fn value(&self, n: i64) -> Result<Element, SequenceError> {
        self.get(n).cloned().ok_or(SequenceError::Uncached(n))
    }

    /// Index the next computed entry will have, or `None` once the cache
    /// reaches the end of the index range.
    pub fn next_index(&self) -> Option<i64> {
        i64::try_from(self.values.len())
            .ok()
            .and_then(|len| self.first.checked_add(len))
    }

    /// Largest index this cache may ever hold.
    pub fn limit(&self) -> i64 {
        self.first.saturating_add(CACHE_LIMIT - 1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// How far to fill so that `n` is covered: at least a block, and at
    /// least doubling what is already there, but never past `last` or the
    /// cache limit.
    pub fn growth_target(&self, n: i64, last: Option<i64>) -> Result<i64, SequenceError> {
        let limit = self.limit();
        if n > limit {
            return Err(SequenceError::TooFar { n, limit });
        }
        let last_cached = self
            .first
            .saturating_add(self.values.len() as i64)
            .saturating_sub(1);
        let target = n
            .max(last_cached.saturating_add(CACHE_BLOCK))
            .max(last_cached.saturating_add(self.values.len() as i64))
            .min(limit);
        Ok(match last {
            Some(last) => target.min(last),
            None => target,
        })
    }

    /// Computes entries in increasing order up to `target` inclusive. Each
    /// index is computed at most once; on error the entries computed so far
    /// are kept.
    pub fn fill_to<F>(&mut self, target: i64, mut calculate: F) -> Result<(), SequenceError>
    where
        F: FnMut(i64, &ElementCache) -> Result<Element, SequenceError>,
    {
        while let Some(n) = self.next_index().filter(|&n| n <= target) {
            let value = calculate(n, self)?;
            self.values.push(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_is_amortized() {
        let mut cache = ElementCache::new(0);
        assert_eq!(cache.growth_target(3, None), Ok(127));
        cache.fill_to(127, |n, _| Ok(Element::from(n))).unwrap();
        assert_eq!(cache.growth_target(130, None), Ok(255));
        cache.fill_to(255, |n, _| Ok(Element::from(n))).unwrap();
        assert_eq!(cache.growth_target(300, None), Ok(511));
        assert_eq!(cache.growth_target(300, Some(400)), Ok(400));
        assert_eq!(cache.growth_target(10_000, None), Ok(10_000));
    }

    #[test]
    fn growth_stops_at_the_limit() {
        let cache = ElementCache::new(5);
        assert_eq!(cache.growth_target(cache.limit(), None), Ok(cache.limit()));
        assert_eq!(
            cache.growth_target(1_000_000_000, None),
            Err(SequenceError::TooFar {
                n: 1_000_000_000,
                limit: 5 + CACHE_LIMIT - 1
            })
        );
    }

    #[test]
    fn fill_stops_at_the_end_of_the_index_range() {
        let mut cache = ElementCache::new(i64::MAX - 1);
        cache.fill_to(i64::MAX, |n, _| Ok(Element::from(n))).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.next_index(), None);
        assert_eq!(cache.get(i64::MAX), Some(&Element::from(i64::MAX)));
    }

    #[test]
    fn fill_sees_earlier_entries() {
        let mut cache = ElementCache::new(1);
        cache
            .fill_to(5, |n, known| match n {
                1 => Ok(Element::from(1)),
                _ => Ok(known.value(n - 1)? * 2),
            })
            .unwrap();
        assert_eq!(cache.get(5), Some(&Element::from(16)));
        assert_eq!(cache.get(0), None);
        assert_eq!(cache.get(6), None);
    }

    #[test]
    fn failure_keeps_prefix() {
        let mut cache = ElementCache::new(0);
        let result = cache.fill_to(10, |n, _| {
            if n == 4 {
                Err(SequenceError::NonIntegral { n })
            } else {
                Ok(Element::from(0))
            }
        });
        assert_eq!(result, Err(SequenceError::NonIntegral { n: 4 }));
        assert_eq!(cache.len(), 4);
    }
}
