use foundation::bounds::Aabb2;
use foundation::math::precision::stable_total_cmp_f64;

/// A deterministic bounding volume hierarchy over `Aabb2` items.
///
/// Ordering contract:
/// - Queries return item ids in ascending order without duplicates.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb2,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb2,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub id: usize,
    pub bounds: Aabb2,
}

const LEAF_MAX: usize = 8;

impl Bvh {
    pub fn build(items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        let mut items = items;
        if !items.is_empty() {
            build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Items whose bounds intersect `query`.
    pub fn query_aabb(&self, query: &Aabb2) -> Vec<usize> {
        self.collect(|b| b.intersects(query))
    }

    /// Items whose bounds contain `p` (edges inclusive).
    pub fn query_point(&self, p: [f64; 2]) -> Vec<usize> {
        self.collect(|b| b.contains(p))
    }

    fn collect<F>(&self, hit: F) -> Vec<usize>
    where
        F: Fn(&Aabb2) -> bool,
    {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        let mut stack: Vec<usize> = vec![0];

        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !hit(bounds) {
                        continue;
                    }
                    hits.extend(items.iter().filter(|i| hit(&i.bounds)).map(|i| i.id));
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if !hit(bounds) {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = bounds_for_items(items);
    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = split_axis(&bounds);
    items.sort_by(|a, b| {
        let ca = (a.bounds.min[axis] + a.bounds.max[axis]) * 0.5;
        let cb = (b.bounds.min[axis] + b.bounds.max[axis]) * 0.5;
        stable_total_cmp_f64(ca, cb).then_with(|| a.id.cmp(&b.id))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; patched once both children exist.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);

    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn split_axis(bounds: &Aabb2) -> usize {
    let ex = bounds.max[0] - bounds.min[0];
    let ey = bounds.max[1] - bounds.min[1];
    // Deterministic tie-break: prefer X.
    if ex >= ey { 0 } else { 1 }
}

fn bounds_for_items(items: &[Item]) -> Aabb2 {
    items
        .iter()
        .fold(Aabb2::empty(), |acc, item| acc.union(&item.bounds))
}
