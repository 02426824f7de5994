use runtime::Frame;
use scene::{DataSource, Feature, FeatureSet};

use crate::driver::LayerCore;
use crate::error::LayerError;
use crate::map::HostMap;
use crate::surface::{DrawEvent, SurfaceEvent, SurfaceTransform};

/// Identity of one layer instance, stable for its whole life.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// The three renderable layer kinds, in click-dispatch priority order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Points,
    Lines,
    Shapes,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Points, LayerKind::Lines, LayerKind::Shapes];

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Points => "points",
            LayerKind::Lines => "lines",
            LayerKind::Shapes => "shapes",
        }
    }
}

impl std::str::FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown layer kind `{s}` (expected points, lines or shapes)"))
    }
}

/// Behavior shared by every layer kind.
///
/// Implementors provide the full render pass and the paint-only pass; the
/// mutation API, frame handling and removal are built on those.
pub trait Layer {
    fn core(&self) -> &LayerCore;
    fn core_mut(&mut self) -> &mut LayerCore;

    /// Re-flattens and re-packs every feature, uploads, and schedules a
    /// paint. The layer is `Clean` afterwards.
    fn render(&mut self, map: &dyn HostMap) -> Result<(), LayerError>;

    /// Paints the uploaded buffers for `event`. Never touches feature data.
    fn draw_on_canvas(&mut self, event: &DrawEvent) -> bool;

    fn id(&self) -> LayerId {
        self.core().id()
    }

    fn kind(&self) -> LayerKind {
        self.core().kind()
    }

    /// Paints the pending frame, if there is one, then runs its callbacks.
    fn frame(&mut self, map: &dyn HostMap, frame: Frame) -> bool {
        let Some((event, callbacks)) = self.core_mut().surface.take_frame(map) else {
            return false;
        };
        let painted = self.draw_on_canvas(&event);
        self.core_mut().finish_frame(callbacks, frame);
        painted
    }

    fn handle_surface_event(&mut self, map: &dyn HostMap, event: SurfaceEvent) -> Option<SurfaceTransform> {
        self.core_mut().handle_surface_event(map, event)
    }

    fn set_data(&mut self, map: &dyn HostMap, data: DataSource) -> Result<(), LayerError> {
        mutate(self, map, |set| {
            set.replace(data);
            Ok(())
        })
    }

    /// Splices `features` in before `index`; past the end appends.
    fn insert(&mut self, map: &dyn HostMap, features: Vec<Feature>, index: usize) -> Result<(), LayerError> {
        mutate(self, map, |set| {
            set.insert(features, index);
            Ok(())
        })
    }

    /// Overwrites features from `index` on.
    fn update(&mut self, map: &dyn HostMap, features: Vec<Feature>, index: usize) -> Result<(), LayerError> {
        mutate(self, map, |set| Ok(set.update(features, index)?))
    }

    /// Removes the features at `indices`, highest first; returns them.
    fn remove_features(&mut self, map: &dyn HostMap, indices: &[usize]) -> Result<Vec<Feature>, LayerError> {
        mutate(self, map, |set| Ok(set.remove(indices)))
    }

    /// Takes the layer off `map` for good.
    fn remove(&mut self, map: &mut dyn HostMap) -> Result<(), LayerError> {
        self.core_mut().detach(map)
    }
}

/// Applies `change` to the layer's features and re-renders. Either both
/// succeed or the layer is left exactly as it was.
fn mutate<L, R>(
    layer: &mut L,
    map: &dyn HostMap,
    change: impl FnOnce(&mut FeatureSet) -> Result<R, LayerError>,
) -> Result<R, LayerError>
where
    L: Layer + ?Sized,
{
    layer.core().check_live(map)?;
    let before = layer.core().data().clone();
    let result = change(&mut layer.core_mut().data).and_then(|out| layer.render(map).map(|()| out));
    if result.is_err() {
        layer.core_mut().rollback(before);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{LayerId, LayerKind};

    #[test]
    fn kinds_parse_from_their_names() {
        for kind in LayerKind::ALL {
            assert_eq!(kind.name().parse::<LayerKind>(), Ok(kind));
        }
        assert!("polygons".parse::<LayerKind>().is_err());
        assert_eq!(LayerId(7).to_string(), "layer#7");
    }
}
