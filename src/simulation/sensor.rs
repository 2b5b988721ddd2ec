//! Distance sensing by ray-marching against the track raster.
//!
//! Readings are memoized per rounded pose in a bounded LRU cache. Each cache
//! slot holds a [`OnceLock`], so concurrent misses on the same key block on a
//! single computation instead of repeating it.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use lru::LruCache;
use ndarray::Array1;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::geometric_utils::{Pose, normalize_heading};
use super::params::SensorParams;
use super::track::Track;

/// Distances to the nearest non-drivable cell along three rays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Ray at `heading - side_angle`.
    pub left: f32,
    /// Ray along the heading.
    pub ahead: f32,
    /// Ray at `heading + side_angle`.
    pub right: f32,
}

impl SensorReading {
    /// The reading as `[right, ahead, left]`, the order the brain expects.
    pub fn to_array(&self) -> Array1<f32> {
        Array1::from_vec(vec![self.right, self.ahead, self.left])
    }
}

/// Cache key: a pose rounded to whole cells and whole degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoseKey {
    x: i32,
    y: i32,
    heading: i32,
}

impl PoseKey {
    /// Rounds a pose into a key.
    ///
    /// The float-to-int casts saturate: NaN maps to 0 and huge coordinates to
    /// `i32::MIN`/`i32::MAX`, so such poses share keys with ordinary ones.
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            x: pose.x.round() as i32,
            y: pose.y.round() as i32,
            heading: normalize_heading(pose.heading.round()) as i32,
        }
    }

    /// The pose the key stands for.
    pub fn pose(&self) -> Pose {
        Pose::new(self.x as f32, self.y as f32, self.heading as f32)
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by an existing slot.
    pub hits: u64,
    /// Lookups that created a new slot.
    pub misses: u64,
    /// Ray casts actually performed.
    pub computations: u64,
    /// Slots currently held.
    pub entries: usize,
    /// Maximum number of slots.
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} computations={} entries={}/{} hit_rate={:.3}",
            self.hits,
            self.misses,
            self.computations,
            self.entries,
            self.capacity,
            self.hit_rate()
        )
    }
}

type Slot = Arc<OnceLock<SensorReading>>;

/// Shared, thread-safe ray caster for one track.
pub struct SensorEngine {
    track: Arc<Track>,
    params: SensorParams,
    cache: Mutex<LruCache<PoseKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

impl fmt::Debug for SensorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorEngine")
            .field("params", &self.params)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl SensorEngine {
    /// Creates an engine with an empty cache.
    pub fn new(track: Arc<Track>, params: SensorParams) -> Self {
        let capacity = NonZeroUsize::new(params.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            track,
            params,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// The track this engine senses.
    pub fn track(&self) -> &Arc<Track> {
        &self.track
    }

    /// Maximum sight range `R`.
    pub fn max_range(&self) -> f32 {
        self.params.max_range as f32
    }

    /// Returns the cached reading for `pose`, casting the rays on first use.
    pub fn sense(&self, pose: &Pose) -> SensorReading {
        let key = PoseKey::from_pose(pose);

        let slot = {
            let mut cache = self.cache.lock();
            if let Some(slot) = cache.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Arc::clone(slot)
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let slot = Slot::default();
                cache.put(key, Arc::clone(&slot));
                slot
            }
        };

        // The lock is released here; waiters on the same key block in get_or_init.
        *slot.get_or_init(|| {
            self.computations.fetch_add(1, Ordering::Relaxed);
            self.cast(&key.pose())
        })
    }

    /// Casts all three rays from `pose` without touching the cache.
    pub fn cast(&self, pose: &Pose) -> SensorReading {
        SensorReading {
            left: self.cast_ray(pose, -self.params.side_angle),
            ahead: self.cast_ray(pose, 0.0),
            right: self.cast_ray(pose, self.params.side_angle),
        }
    }

    /// Marches one ray in unit steps and returns the first blocked step.
    ///
    /// Samples outside the raster do not block the ray.
    fn cast_ray(&self, pose: &Pose, angle_offset: f32) -> f32 {
        for step in 0..self.params.max_range {
            let (x, y) = pose.project(angle_offset, step as f32);
            if self.track.is_drivable_at(x, y) == Some(false) {
                return step as f32;
            }
        }
        self.max_range()
    }

    /// Current cache counters.
    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            entries: cache.len(),
            capacity: cache.cap().get(),
        }
    }
}
