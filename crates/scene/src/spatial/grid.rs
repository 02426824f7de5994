use std::collections::HashMap;

use foundation::math::LatLng;

/// Cells per degree.
const CELLS_PER_DEGREE: f64 = 100.0;
/// Neighborhood half-width in cells; a lookup touches a 7x7 block.
pub const NEIGHBORHOOD_CELLS: i64 = 3;

/// A 0.01 degree grid cell, addressed by rounded latitude and longitude.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridKey {
    pub lat: i64,
    pub lng: i64,
}

impl GridKey {
    pub fn of(at: LatLng) -> Self {
        Self {
            lat: quantize(at.lat),
            lng: quantize(at.lng),
        }
    }
}

/// Formats as `"<lat>x<lng>"` with two decimals, e.g. `"51.50x-0.12"`.
impl std::fmt::Display for GridKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.2}x{:.2}",
            self.lat as f64 / CELLS_PER_DEGREE,
            self.lng as f64 / CELLS_PER_DEGREE
        )
    }
}

fn quantize(deg: f64) -> i64 {
    (deg * CELLS_PER_DEGREE).round() as i64
}

/// Point entries bucketed by `GridKey` for nearest-point lookups.
///
/// Ordering contract:
/// - `candidates` scans cells by ascending latitude, then ascending
///   longitude, yielding entries of one cell in insertion order.
/// - When no neighboring cell is occupied, every entry is a candidate, in
///   insertion order.
#[derive(Debug, Clone)]
pub struct PointGrid<T> {
    entries: Vec<T>,
    buckets: HashMap<GridKey, Vec<usize>>,
}

impl<T> Default for PointGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PointGrid<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.buckets.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Adds `entry` at `at`; returns its index.
    pub fn insert(&mut self, at: LatLng, entry: T) -> usize {
        let index = self.entries.len();
        self.entries.push(entry);
        self.buckets.entry(GridKey::of(at)).or_default().push(index);
        index
    }

    pub fn candidates(&self, at: LatLng) -> Vec<usize> {
        let center = GridKey::of(at);
        let mut out = Vec::new();
        for dlat in -NEIGHBORHOOD_CELLS..=NEIGHBORHOOD_CELLS {
            for dlng in -NEIGHBORHOOD_CELLS..=NEIGHBORHOOD_CELLS {
                let key = GridKey {
                    lat: center.lat + dlat,
                    lng: center.lng + dlng,
                };
                if let Some(bucket) = self.buckets.get(&key) {
                    out.extend_from_slice(bucket);
                }
            }
        }
        if out.is_empty() {
            out.extend(0..self.entries.len());
        }
        out
    }

    /// Candidate with the smallest `distance`; earlier candidates win ties.
    pub fn nearest<F>(&self, at: LatLng, mut distance: F) -> Option<(usize, &T)>
    where
        F: FnMut(&T) -> f64,
    {
        let (index, _) = crate::picking::closest(self.candidates(at), |&i| {
            self.entries.get(i).map_or(f64::NAN, &mut distance)
        })?;
        Some((index, self.entries.get(index)?))
    }
}
