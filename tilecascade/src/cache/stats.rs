//! Cache statistics tracking and reporting.

/// Point-in-time cache statistics for monitoring and debugging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Tiles currently held
    pub entries: usize,
    /// Configured maximum number of tiles
    pub capacity: usize,
    /// Tiles stored since creation
    pub inserts: u64,
    /// Tiles dropped to stay within capacity
    pub evictions: u64,
    /// Counted lookups (`TileCache::get`) that found a tile
    pub hits: u64,
    /// Counted lookups that found nothing
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fraction of capacity in use (0.0 to 1.0).
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.entries as f64 / self.capacity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_utilization() {
        let stats = CacheStats {
            entries: 5,
            capacity: 20,
            ..Default::default()
        };
        assert!((stats.utilization() - 0.25).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().utilization(), 0.0);
    }
}
