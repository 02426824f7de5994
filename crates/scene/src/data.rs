use foundation::bounds::Aabb2;
use foundation::math::CoordinateOrder;

use crate::feature::{Feature, FeatureKey, Geometry, Position};

/// Layer input as supplied by the caller.
///
/// Resolved once into a `FeatureSet`; nothing downstream branches on the
/// original shape again.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// Bare coordinate pairs, one point feature each.
    Positions(Vec<Position>),
    FeatureCollection(Vec<Feature>),
    Feature(Feature),
    Geometry(Geometry),
}

/// Which input shape a `FeatureSet` was built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataFormat {
    Positions,
    Features,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    IndexOutOfRange { index: usize, len: usize },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::IndexOutOfRange { index, len } => {
                write!(f, "feature index {index} out of range for {len} features")
            }
        }
    }
}

impl std::error::Error for DataError {}

/// Canonical, ordered feature storage for one layer.
///
/// Every feature entering the set receives a fresh `FeatureKey`; replacing a
/// feature in place gives the replacement a new key.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    features: Vec<Feature>,
    format: DataFormat,
    next_key: u32,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            format: DataFormat::Features,
            next_key: 0,
        }
    }
}

impl FeatureSet {
    pub fn from_source(source: DataSource) -> Self {
        let mut set = Self::default();
        set.replace(source);
        set
    }

    /// Replaces all features. Keys keep increasing across replacements.
    pub fn replace(&mut self, source: DataSource) {
        let (format, features) = match source {
            DataSource::Positions(ps) => (
                DataFormat::Positions,
                ps.into_iter().map(|p| Feature::new(Geometry::Point(p))).collect(),
            ),
            DataSource::FeatureCollection(fs) => (DataFormat::Features, fs),
            DataSource::Feature(f) => (DataFormat::Features, vec![f]),
            DataSource::Geometry(g) => (DataFormat::Features, vec![Feature::new(g)]),
        };
        let keyed: Vec<Feature> = features.into_iter().map(|f| self.keyed(f)).collect();
        self.format = format;
        self.features = keyed;
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn as_slice(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn by_key(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.iter().find(|f| f.key == key)
    }

    /// Splices `features` in before `index`; an index past the end appends.
    pub fn insert(&mut self, features: Vec<Feature>, index: usize) {
        let at = index.min(self.features.len());
        let keyed: Vec<Feature> = features.into_iter().map(|f| self.keyed(f)).collect();
        self.features.splice(at..at, keyed);
    }

    /// Replaces features starting at `index`. Writing exactly one past the
    /// end appends; anything further is rejected before any change is made.
    pub fn update(&mut self, features: Vec<Feature>, index: usize) -> Result<(), DataError> {
        let len = self.features.len();
        if index > len {
            return Err(DataError::IndexOutOfRange { index, len });
        }
        for (i, feature) in features.into_iter().enumerate() {
            let feature = self.keyed(feature);
            match self.features.get_mut(index + i) {
                Some(slot) => *slot = feature,
                None => self.features.push(feature),
            }
        }
        Ok(())
    }

    /// Removes the features at `indices`, highest index first so earlier
    /// indices stay valid. Duplicates and out-of-range indices are ignored.
    ///
    /// Returns the removed features in ascending index order.
    pub fn remove(&mut self, indices: &[usize]) -> Vec<Feature> {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.features.len())
            .collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut removed = Vec::with_capacity(sorted.len());
        for &i in sorted.iter().rev() {
            removed.push(self.features.remove(i));
        }
        removed.reverse();
        removed
    }

    /// `[lng, lat]` extent of every position, or `None` when there are none.
    pub fn lng_lat_bounds(&self, order: CoordinateOrder) -> Option<Aabb2> {
        let mut b = Aabb2::empty();
        for f in &self.features {
            f.geometry.for_each_position(|p| {
                let ll = order.lat_lng(p);
                b.extend([ll.lng, ll.lat]);
            });
        }
        if b.is_empty() { None } else { Some(b) }
    }

    fn keyed(&mut self, mut feature: Feature) -> Feature {
        feature.key = FeatureKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        feature
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataError, DataFormat, DataSource, FeatureSet};
    use crate::feature::{Feature, Geometry};
    use foundation::bounds::Aabb2;
    use foundation::math::CoordinateOrder;

    fn point(x: f64, y: f64) -> Feature {
        Feature::new(Geometry::Point([x, y]))
    }

    fn xs(set: &FeatureSet) -> Vec<f64> {
        set.iter()
            .map(|f| f.geometry.point().map(|p| p[0]).unwrap_or(f64::NAN))
            .collect()
    }

    #[test]
    fn positions_become_point_features() {
        let set = FeatureSet::from_source(DataSource::Positions(vec![[1.0, 2.0], [3.0, 4.0]]));
        assert_eq!(set.format(), DataFormat::Positions);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).and_then(|f| f.geometry.point()), Some([3.0, 4.0]));
    }

    #[test]
    fn single_feature_and_geometry_sources_hold_one_record() {
        let set = FeatureSet::from_source(DataSource::Feature(point(1.0, 1.0)));
        assert_eq!(set.len(), 1);
        let set = FeatureSet::from_source(DataSource::Geometry(Geometry::Point([0.0, 0.0])));
        assert_eq!(set.format(), DataFormat::Features);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn keys_are_unique_even_for_equal_values() {
        let set = FeatureSet::from_source(DataSource::FeatureCollection(vec![
            point(1.0, 1.0),
            point(1.0, 1.0),
        ]));
        let a = set.get(0).map(|f| f.key());
        let b = set.get(1).map(|f| f.key());
        assert_ne!(a, b);
    }

    #[test]
    fn insert_then_remove_restores_collection() {
        let mut set = FeatureSet::from_source(DataSource::FeatureCollection(vec![
            point(0.0, 0.0),
            point(2.0, 2.0),
        ]));
        let before: Vec<_> = set.iter().map(|f| f.key()).collect();

        set.insert(vec![point(1.0, 1.0)], 1);
        assert_eq!(xs(&set), vec![0.0, 1.0, 2.0]);

        let removed = set.remove(&[1]);
        assert_eq!(removed.len(), 1);
        let after: Vec<_> = set.iter().map(|f| f.key()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn insert_past_end_appends() {
        let mut set = FeatureSet::from_source(DataSource::Positions(vec![[0.0, 0.0]]));
        set.insert(vec![point(5.0, 5.0), point(6.0, 6.0)], 99);
        assert_eq!(xs(&set), vec![0.0, 5.0, 6.0]);
    }

    #[test]
    fn update_replaces_in_place_with_new_identity() {
        let mut set = FeatureSet::from_source(DataSource::FeatureCollection(vec![
            point(0.0, 0.0),
            point(1.0, 1.0),
        ]));
        let old_key = set.get(1).map(|f| f.key());
        set.update(vec![point(9.0, 9.0), point(10.0, 10.0)], 1)
            .expect("update");
        assert_eq!(xs(&set), vec![0.0, 9.0, 10.0]);
        assert_ne!(set.get(1).map(|f| f.key()), old_key);

        let err = set.update(vec![point(0.0, 0.0)], 7).unwrap_err();
        assert_eq!(err, DataError::IndexOutOfRange { index: 7, len: 3 });
    }

    #[test]
    fn remove_many_goes_highest_first() {
        let mut set = FeatureSet::from_source(DataSource::FeatureCollection(
            (0..5).map(|i| point(i as f64, 0.0)).collect(),
        ));
        let removed = set.remove(&[1, 3, 3, 42]);
        assert_eq!(removed.len(), 2);
        assert_eq!(xs(&set), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn bounds_follow_coordinate_order() {
        let set = FeatureSet::from_source(DataSource::Positions(vec![[10.0, 20.0], [12.0, 25.0]]));
        assert_eq!(
            set.lng_lat_bounds(CoordinateOrder::LngFirst),
            Some(Aabb2::new([10.0, 20.0], [12.0, 25.0]))
        );
        assert_eq!(
            set.lng_lat_bounds(CoordinateOrder::LatFirst),
            Some(Aabb2::new([20.0, 10.0], [25.0, 12.0]))
        );
        assert_eq!(FeatureSet::default().lng_lat_bounds(CoordinateOrder::LngFirst), None);
    }
}
