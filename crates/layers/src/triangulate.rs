use earcutr::earcut;
use scene::Position;

/// Triangles and border edges of one polygon part, in raw coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Triangulation {
    /// Ring vertices in input order with closing duplicates dropped.
    pub vertices: Vec<Position>,
    /// Index into `vertices` where each hole ring starts.
    pub holes: Vec<usize>,
    /// Three vertex indices per triangle.
    pub triangles: Vec<usize>,
    /// Border edges. Every ring is closed; no edge joins two rings.
    pub edges: Vec<[usize; 2]>,
}

impl Triangulation {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Positions of every triangle corner, three per triangle.
    pub fn corners(&self) -> impl Iterator<Item = Position> + '_ {
        self.triangles
            .iter()
            .filter_map(|&i| self.vertices.get(i).copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriangulateError {
    NonFinite(Position),
    Earcut(String),
}

impl std::fmt::Display for TriangulateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriangulateError::NonFinite(p) => write!(f, "non-finite vertex [{}, {}]", p[0], p[1]),
            TriangulateError::Earcut(e) => write!(f, "earcut failed: {e}"),
        }
    }
}

impl std::error::Error for TriangulateError {}

/// Triangulates one polygon part: an outer ring followed by its holes.
///
/// Returns `Ok(None)` for a degenerate part (no outer ring, or fewer than
/// three distinct outer vertices) so the caller can skip it. Holes with
/// fewer than three vertices are ignored.
pub fn triangulate(rings: &[Vec<Position>]) -> Result<Option<Triangulation>, TriangulateError> {
    let mut out = Triangulation::default();
    let mut coords: Vec<f64> = Vec::new();

    for (ring_i, ring) in rings.iter().enumerate() {
        if let Some(bad) = ring.iter().find(|p| !(p[0].is_finite() && p[1].is_finite())) {
            return Err(TriangulateError::NonFinite(*bad));
        }
        let points = without_closing_duplicate(ring);
        if points.len() < 3 {
            if ring_i == 0 {
                return Ok(None);
            }
            continue;
        }

        let start = out.vertices.len();
        if ring_i > 0 {
            out.holes.push(start);
        }
        for (i, p) in points.iter().enumerate() {
            coords.push(p[0]);
            coords.push(p[1]);
            out.vertices.push(*p);
            out.edges.push([start + i, start + (i + 1) % points.len()]);
        }
    }

    if out.vertices.is_empty() {
        return Ok(None);
    }

    out.triangles =
        earcut(&coords, &out.holes, 2).map_err(|e| TriangulateError::Earcut(format!("{e:?}")))?;
    Ok(Some(out))
}

fn without_closing_duplicate(ring: &[Position]) -> &[Position] {
    match ring {
        [first, .., last] if ring.len() >= 2 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

#[cfg(test)]
mod tests {
    use super::{TriangulateError, triangulate};
    use scene::Position;

    fn square(x0: f64, y0: f64, side: f64) -> Vec<Position> {
        vec![
            [x0, y0],
            [x0 + side, y0],
            [x0 + side, y0 + side],
            [x0, y0 + side],
            [x0, y0],
        ]
    }

    fn area(t: &super::Triangulation) -> f64 {
        let corners: Vec<Position> = t.corners().collect();
        corners
            .chunks(3)
            .map(|c| {
                ((c[1][0] - c[0][0]) * (c[2][1] - c[0][1]) - (c[2][0] - c[0][0]) * (c[1][1] - c[0][1]))
                    .abs()
                    / 2.0
            })
            .sum()
    }

    #[test]
    fn square_makes_two_triangles_and_four_edges() {
        let t = triangulate(&[square(0.0, 0.0, 1.0)]).unwrap().unwrap();
        assert_eq!(t.vertices.len(), 4);
        assert_eq!(t.triangle_count(), 2);
        assert_eq!(t.edges, vec![[0, 1], [1, 2], [2, 3], [3, 0]]);
        assert!((area(&t) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn holes_are_excluded_and_never_bridged() {
        let t = triangulate(&[square(0.0, 0.0, 4.0), square(1.0, 1.0, 1.0)])
            .unwrap()
            .unwrap();
        assert_eq!(t.holes, vec![4]);
        assert_eq!(t.triangle_count(), 8);
        assert!((area(&t) - 15.0).abs() < 1e-9);
        assert_eq!(t.edges.len(), 8);
        for [a, b] in &t.edges {
            assert_eq!(*a < 4, *b < 4, "edge {a}-{b} crosses rings");
        }
    }

    #[test]
    fn open_rings_are_closed_by_the_edge_list() {
        let open = vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]];
        let t = triangulate(&[open]).unwrap().unwrap();
        assert_eq!(t.triangle_count(), 1);
        assert_eq!(t.edges.last(), Some(&[2, 0]));
    }

    #[test]
    fn degenerate_parts_are_skipped() {
        assert_eq!(triangulate(&[]).unwrap(), None);
        assert_eq!(triangulate(&[vec![]]).unwrap(), None);
        assert_eq!(triangulate(&[vec![[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]).unwrap(), None);
    }

    #[test]
    fn tiny_holes_are_ignored() {
        let t = triangulate(&[square(0.0, 0.0, 1.0), vec![[0.5, 0.5]]]).unwrap().unwrap();
        assert!(t.holes.is_empty());
        assert_eq!(t.triangle_count(), 2);
    }

    #[test]
    fn non_finite_input_is_an_error() {
        let err = triangulate(&[vec![[0.0, 0.0], [f64::INFINITY, 0.0], [0.0, 1.0]]]).unwrap_err();
        assert!(matches!(err, TriangulateError::NonFinite(_)));
    }
}
