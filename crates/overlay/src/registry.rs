use foundation::{Arena, Handle};
use layers::{HostMap, Layer, LayerKind, Lines, MapId, Points, Shapes};

/// Stable identity of a registered layer instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    pub kind: LayerKind,
    pub handle: Handle,
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.handle)
    }
}

/// A layer kind the registry can hold.
pub trait Member: Layer + Sized + 'static {
    const KIND: LayerKind;
    fn arena(registry: &Registry) -> &Arena<Self>;
    fn arena_mut(registry: &mut Registry) -> &mut Arena<Self>;
}

impl Member for Points {
    const KIND: LayerKind = LayerKind::Points;

    fn arena(registry: &Registry) -> &Arena<Self> {
        &registry.points
    }

    fn arena_mut(registry: &mut Registry) -> &mut Arena<Self> {
        &mut registry.points
    }
}

impl Member for Lines {
    const KIND: LayerKind = LayerKind::Lines;

    fn arena(registry: &Registry) -> &Arena<Self> {
        &registry.lines
    }

    fn arena_mut(registry: &mut Registry) -> &mut Arena<Self> {
        &mut registry.lines
    }
}

impl Member for Shapes {
    const KIND: LayerKind = LayerKind::Shapes;

    fn arena(registry: &Registry) -> &Arena<Self> {
        &registry.shapes
    }

    fn arena_mut(registry: &mut Registry) -> &mut Arena<Self> {
        &mut registry.shapes
    }
}

/// Live layer instances, one arena per kind.
///
/// Ordering contract:
/// - `members` and `members_mut` yield instances in creation order, which
///   is the order pick ties are resolved in.
#[derive(Default)]
pub struct Registry {
    points: Arena<Points>,
    lines: Arena<Lines>,
    shapes: Arena<Shapes>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert<L: Member>(&mut self, layer: L) -> InstanceId {
        InstanceId {
            kind: L::KIND,
            handle: L::arena_mut(self).insert(layer),
        }
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.layer(id).is_some()
    }

    pub fn get<L: Member>(&self, id: InstanceId) -> Option<&L> {
        if id.kind != L::KIND {
            return None;
        }
        L::arena(self).get(id.handle)
    }

    pub fn get_mut<L: Member>(&mut self, id: InstanceId) -> Option<&mut L> {
        if id.kind != L::KIND {
            return None;
        }
        L::arena_mut(self).get_mut(id.handle)
    }

    pub fn layer(&self, id: InstanceId) -> Option<&dyn Layer> {
        match id.kind {
            LayerKind::Points => self.points.get(id.handle).map(|l| l as &dyn Layer),
            LayerKind::Lines => self.lines.get(id.handle).map(|l| l as &dyn Layer),
            LayerKind::Shapes => self.shapes.get(id.handle).map(|l| l as &dyn Layer),
        }
    }

    pub fn layer_mut(&mut self, id: InstanceId) -> Option<&mut dyn Layer> {
        match id.kind {
            LayerKind::Points => self.points.get_mut(id.handle).map(|l| l as &mut dyn Layer),
            LayerKind::Lines => self.lines.get_mut(id.handle).map(|l| l as &mut dyn Layer),
            LayerKind::Shapes => self.shapes.get_mut(id.handle).map(|l| l as &mut dyn Layer),
        }
    }

    /// Drops the instance from the registry. O(1).
    pub fn take(&mut self, id: InstanceId) -> Option<Box<dyn Layer>> {
        match id.kind {
            LayerKind::Points => self.points.remove(id.handle).map(|l| Box::new(l) as Box<dyn Layer>),
            LayerKind::Lines => self.lines.remove(id.handle).map(|l| Box::new(l) as Box<dyn Layer>),
            LayerKind::Shapes => self.shapes.remove(id.handle).map(|l| Box::new(l) as Box<dyn Layer>),
        }
    }

    /// Every instance id, in creation order.
    pub fn ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<(layers::LayerId, InstanceId)> = Vec::with_capacity(self.len());
        for kind in LayerKind::ALL {
            match kind {
                LayerKind::Points => collect_ids(&self.points, &mut ids),
                LayerKind::Lines => collect_ids(&self.lines, &mut ids),
                LayerKind::Shapes => collect_ids(&self.shapes, &mut ids),
            }
        }
        ids.sort_by_key(|(layer, _)| *layer);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Instances of kind `L` bound to `map`, in creation order.
    pub fn members<L: Member>(&self, map: MapId) -> Vec<(InstanceId, &L)> {
        let mut out: Vec<(InstanceId, &L)> = L::arena(self)
            .iter()
            .filter(|(_, l)| l.core().map_id() == map)
            .map(|(handle, l)| (InstanceId { kind: L::KIND, handle }, l))
            .collect();
        out.sort_by_key(|(_, l)| l.id());
        out
    }

    pub fn members_mut<L: Member>(&mut self, map: MapId) -> Vec<(InstanceId, &mut L)> {
        let mut out: Vec<(InstanceId, &mut L)> = L::arena_mut(self)
            .iter_mut()
            .filter(|(_, l)| l.core().map_id() == map)
            .map(|(handle, l)| (InstanceId { kind: L::KIND, handle }, l))
            .collect();
        out.sort_by_key(|(_, l)| l.id());
        out
    }

    /// Every instance bound to `map`, in creation order.
    pub fn layers_on(&mut self, map: &dyn HostMap) -> Vec<(InstanceId, &mut dyn Layer)> {
        let map_id = map.id();
        let mut out: Vec<(InstanceId, &mut dyn Layer)> = Vec::new();
        let Registry { points, lines, shapes } = self;
        extend_on(points, LayerKind::Points, map_id, &mut out);
        extend_on(lines, LayerKind::Lines, map_id, &mut out);
        extend_on(shapes, LayerKind::Shapes, map_id, &mut out);
        out.sort_by_key(|(_, l)| l.id());
        out
    }
}

fn collect_ids<L: Layer>(arena: &Arena<L>, out: &mut Vec<(layers::LayerId, InstanceId)>) {
    for (handle, layer) in arena.iter() {
        out.push((layer.id(), InstanceId { kind: layer.kind(), handle }));
    }
}

fn extend_on<'a, L: Layer + 'static>(
    arena: &'a mut Arena<L>,
    kind: LayerKind,
    map: MapId,
    out: &mut Vec<(InstanceId, &'a mut dyn Layer)>,
) {
    for (handle, layer) in arena.iter_mut() {
        if layer.core().map_id() == map {
            out.push((InstanceId { kind, handle }, layer as &mut dyn Layer));
        }
    }
}
