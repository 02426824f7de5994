/// Column-major 4x4 matrix that maps zoom-0 map pixels to clip space.
///
/// Built fresh for every paint: `set_size` resets it, then `scale_to` and
/// `translate_to` apply the current zoom and viewport offset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapMatrix {
    pub array: [f32; 16],
}

impl Default for MapMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl MapMatrix {
    pub fn new() -> Self {
        let mut array = [0.0; 16];
        array[0] = 1.0;
        array[5] = 1.0;
        array[10] = 1.0;
        array[15] = 1.0;
        Self { array }
    }

    pub fn set_size(&mut self, width: f64, height: f64) -> &mut Self {
        self.array = [0.0; 16];
        self.array[0] = (2.0 / width) as f32;
        self.array[5] = (-2.0 / height) as f32;
        self.array[12] = -1.0;
        self.array[13] = 1.0;
        self.array[15] = 1.0;
        self
    }

    pub fn scale_to(&mut self, scale: f64) -> &mut Self {
        self.array[0] *= scale as f32;
        self.array[5] *= scale as f32;
        self
    }

    pub fn translate_to(&mut self, x: f64, y: f64) -> &mut Self {
        let a0 = self.array[0] as f64;
        let a5 = self.array[5] as f64;
        self.array[12] = (a0 * x - 1.0) as f32;
        self.array[13] = (a5 * y + 1.0) as f32;
        self
    }

    /// Applies the matrix to a 2D point (z = 0, w = 1).
    pub fn transform_point(&self, x: f64, y: f64) -> [f64; 2] {
        let a = &self.array;
        [
            a[0] as f64 * x + a[4] as f64 * y + a[12] as f64,
            a[1] as f64 * x + a[5] as f64 * y + a[13] as f64,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::MapMatrix;

    #[test]
    fn set_size_maps_canvas_corners_to_clip_corners() {
        let mut m = MapMatrix::new();
        m.set_size(256.0, 128.0);
        assert_eq!(m.transform_point(0.0, 0.0), [-1.0, 1.0]);
        assert_eq!(m.transform_point(256.0, 128.0), [1.0, -1.0]);
    }

    #[test]
    fn scale_then_translate_matches_layout() {
        let mut m = MapMatrix::new();
        m.set_size(512.0, 256.0).scale_to(4.0).translate_to(-10.0, -20.0);
        let a = m.array;
        assert_eq!(a[0], 2.0 / 512.0 * 4.0);
        assert_eq!(a[5], -2.0 / 256.0 * 4.0);
        assert_eq!(a[12], a[0] * -10.0 - 1.0);
        assert_eq!(a[13], a[5] * -20.0 + 1.0);
        assert_eq!(a[15], 1.0);
        assert_eq!(a[10], 0.0);
    }

    #[test]
    fn translated_origin_lands_on_top_left() {
        // The viewport's top-left pixel, once offset by translate_to, sits at clip (-1, 1).
        let mut m = MapMatrix::new();
        m.set_size(100.0, 100.0).scale_to(2.0).translate_to(-30.0, -40.0);
        let p = m.transform_point(30.0, 40.0);
        assert!((p[0] + 1.0).abs() < 1e-6);
        assert!((p[1] - 1.0).abs() < 1e-6);
    }
}
