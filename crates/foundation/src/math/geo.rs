/// A geographic coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Selects which index of a raw `[a, b]` pair holds the longitude.
///
/// The order is fixed for the lifetime of a layer and applied to every
/// position that layer reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum CoordinateOrder {
    #[default]
    LngFirst,
    LatFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCoordinateOrder(pub String);

impl std::fmt::Display for UnknownCoordinateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown coordinate order {:?}, expected \"lngFirst\" or \"latFirst\"",
            self.0
        )
    }
}

impl std::error::Error for UnknownCoordinateOrder {}

impl CoordinateOrder {
    pub fn longitude_key(self) -> usize {
        match self {
            CoordinateOrder::LngFirst => 0,
            CoordinateOrder::LatFirst => 1,
        }
    }

    pub fn latitude_key(self) -> usize {
        1 - self.longitude_key()
    }

    /// Builds an order from explicit key indices. Both keys must be distinct and in `0..=1`.
    pub fn from_keys(longitude_key: usize, latitude_key: usize) -> Option<Self> {
        match (longitude_key, latitude_key) {
            (0, 1) => Some(CoordinateOrder::LngFirst),
            (1, 0) => Some(CoordinateOrder::LatFirst),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CoordinateOrder::LngFirst => "lngFirst",
            CoordinateOrder::LatFirst => "latFirst",
        }
    }

    #[inline]
    pub fn lat_lng(self, pair: [f64; 2]) -> LatLng {
        LatLng::new(pair[self.latitude_key()], pair[self.longitude_key()])
    }

    #[inline]
    pub fn pair(self, lat_lng: LatLng) -> [f64; 2] {
        let mut out = [0.0; 2];
        out[self.latitude_key()] = lat_lng.lat;
        out[self.longitude_key()] = lat_lng.lng;
        out
    }
}

impl std::str::FromStr for CoordinateOrder {
    type Err = UnknownCoordinateOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lngFirst" => Ok(CoordinateOrder::LngFirst),
            "latFirst" => Ok(CoordinateOrder::LatFirst),
            other => Err(UnknownCoordinateOrder(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoordinateOrder, LatLng};

    #[test]
    fn lng_first_reads_x_as_longitude() {
        let ll = CoordinateOrder::LngFirst.lat_lng([10.0, 20.0]);
        assert_eq!(ll, LatLng::new(20.0, 10.0));
    }

    #[test]
    fn lat_first_reads_x_as_latitude() {
        let ll = CoordinateOrder::LatFirst.lat_lng([10.0, 20.0]);
        assert_eq!(ll, LatLng::new(10.0, 20.0));
    }

    #[test]
    fn pair_inverts_lat_lng() {
        for order in [CoordinateOrder::LngFirst, CoordinateOrder::LatFirst] {
            let ll = LatLng::new(-33.5, 151.25);
            assert_eq!(order.lat_lng(order.pair(ll)), ll);
        }
    }

    #[test]
    fn parses_names_and_keys() {
        assert_eq!("lngFirst".parse::<CoordinateOrder>(), Ok(CoordinateOrder::LngFirst));
        assert_eq!("latFirst".parse::<CoordinateOrder>(), Ok(CoordinateOrder::LatFirst));
        assert!("xyz".parse::<CoordinateOrder>().is_err());
        assert_eq!(CoordinateOrder::from_keys(1, 0), Some(CoordinateOrder::LatFirst));
        assert_eq!(CoordinateOrder::from_keys(0, 0), None);
        assert_eq!(CoordinateOrder::LatFirst.name(), "latFirst");
    }
}
