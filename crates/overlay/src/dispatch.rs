//! Pointer dispatch across every instance on one map.
//!
//! Clicks and context menus try points, then lines, then shapes, and stop
//! at the first kind that reports a result. Hover runs every kind.

use layers::{HostMap, Interaction, Layer, Lines, PointerEvent, Points, Shapes};
use scene::picking::closest;
use serde_json::Value;
use tracing::trace;

use crate::registry::Registry;

/// Runs a click or context-menu event through the kinds in priority order.
pub fn pointer(registry: &Registry, map: &dyn HostMap, event: &PointerEvent, interaction: Interaction) -> Option<Value> {
    try_points(registry, map, event, interaction)
        .or_else(|| try_lines(registry, map, event, interaction))
        .or_else(|| try_shapes(registry, map, event, interaction))
}

/// The closest point across all instances, if it is within its layer's
/// click radius. A hit always produces a result: the callback's, or `true`.
pub fn try_points(
    registry: &Registry,
    map: &dyn HostMap,
    event: &PointerEvent,
    interaction: Interaction,
) -> Option<Value> {
    let candidates = registry
        .members::<Points>(map.id())
        .into_iter()
        .filter(|(_, layer)| layer.core().accepts(map))
        .filter_map(|(id, layer)| layer.lookup(map, event.lat_lng).map(|entry| (id, layer, entry)));
    let ((id, layer, entry), _) = closest(candidates, |(_, _, entry)| {
        map.lat_lng_to_layer_point(entry.lat_lng).distance(event.layer_point)
    })?;
    if !layer.hits(map, entry, event, false) {
        return None;
    }
    trace!(instance = %id, feature = entry.feature, ?interaction, "point hit");
    Some(
        layer
            .core()
            .fire(interaction, event, entry.feature)
            .unwrap_or(Value::Bool(true)),
    )
}

/// The first line feature, in instance then data order, within click
/// tolerance. `None` when its callback does not handle the event.
pub fn try_lines(
    registry: &Registry,
    map: &dyn HostMap,
    event: &PointerEvent,
    interaction: Interaction,
) -> Option<Value> {
    let (id, layer, feature) = registry
        .members::<Lines>(map.id())
        .into_iter()
        .find_map(|(id, layer)| layer.pick(map, event).map(|feature| (id, layer, feature)))?;
    trace!(instance = %id, feature, ?interaction, "line hit");
    layer.core().fire(interaction, event, feature)
}

/// The first polygon containing the event, in instance then data order.
pub fn try_shapes(
    registry: &Registry,
    map: &dyn HostMap,
    event: &PointerEvent,
    interaction: Interaction,
) -> Option<Value> {
    let (id, layer, feature) = registry
        .members::<Shapes>(map.id())
        .into_iter()
        .find_map(|(id, layer)| layer.pick(map, event).map(|feature| (id, layer, feature)))?;
    trace!(instance = %id, feature, ?interaction, "shape hit");
    layer.core().fire(interaction, event, feature)
}

/// Updates the hovered set of every instance on `map` and collects the
/// hover callbacks' results.
pub fn hover(registry: &mut Registry, map: &dyn HostMap, event: &PointerEvent) -> Vec<Value> {
    let mut results = Vec::new();

    for (_, layer) in registry.members_mut::<Points>(map.id()) {
        if !layer.core().accepts(map) {
            continue;
        }
        let hits: Vec<usize> = layer.pick(map, event, true).map(|e| e.feature).into_iter().collect();
        results.extend(layer.core_mut().update_hover(event, &hits));
    }
    for (_, layer) in registry.members_mut::<Lines>(map.id()) {
        if !layer.core().accepts(map) {
            continue;
        }
        let hits = layer.pick_all(map, event);
        results.extend(layer.core_mut().update_hover(event, &hits));
    }
    for (_, layer) in registry.members_mut::<Shapes>(map.id()) {
        if !layer.core().accepts(map) {
            continue;
        }
        let hits: Vec<usize> = layer.pick(map, event).into_iter().collect();
        results.extend(layer.core_mut().update_hover(event, &hits));
    }
    results
}
