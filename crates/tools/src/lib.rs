//! Headless layer runs behind the `glmap` binary.
//!
//! Each run builds one layer against a `MercatorMap` and a recording GPU
//! context, paints a single frame and reports what happened as JSON.

use foundation::math::{CoordinateOrder, LatLng, Vec2};
use formats::{LoadError, geometry_to_geojson_value};
use gpu::{RecordingContext, SharedRenderLog};
use layers::{
    Layer, LayerError, LayerKind, LayerOptions, Lines, LinesSettings, MercatorMap, PointerEvent, Points,
    PointsSettings, Shapes, ShapesSettings,
};
use overlay::{InstanceId, Member, Overlay, OverlayError};
use runtime::{Frame, RENDER_PASSES};
use scene::DataSource;
use serde_json::{Map, Value, json};
use tracing::debug;

#[derive(Debug)]
pub enum ToolError {
    Load(LoadError),
    Layer(LayerError),
    Overlay(OverlayError),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::Load(e) => write!(f, "{e}"),
            ToolError::Layer(e) => write!(f, "layer rejected: {e}"),
            ToolError::Overlay(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToolError::Load(e) => Some(e),
            ToolError::Layer(e) => Some(e),
            ToolError::Overlay(e) => Some(e),
        }
    }
}

impl From<LoadError> for ToolError {
    fn from(e: LoadError) -> Self {
        ToolError::Load(e)
    }
}

impl From<LayerError> for ToolError {
    fn from(e: LayerError) -> Self {
        ToolError::Layer(e)
    }
}

impl From<OverlayError> for ToolError {
    fn from(e: OverlayError) -> Self {
        ToolError::Overlay(e)
    }
}

/// The map viewport a run renders into.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct View {
    pub size: Vec2,
    pub center: LatLng,
    pub zoom: f64,
}

impl Default for View {
    fn default() -> Self {
        Self {
            size: Vec2::new(1024.0, 768.0),
            center: LatLng::new(0.0, 0.0),
            zoom: 2.0,
        }
    }
}

pub struct Scenario {
    pub kind: LayerKind,
    pub data: DataSource,
    pub options: LayerOptions,
    pub view: View,
    pub order: CoordinateOrder,
}

/// Parses `"lng,lat"`, the order the command line uses regardless of the
/// data's coordinate order.
pub fn parse_lng_lat(s: &str) -> Result<LatLng, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lng,lat, got `{s}`"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude `{lng}`: {e}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("bad latitude `{lat}`: {e}"))?;
    Ok(LatLng::new(lat, lng))
}

struct Run {
    map: MercatorMap,
    overlay: Overlay,
    id: InstanceId,
    log: SharedRenderLog,
}

impl Run {
    fn build(scenario: &Scenario) -> Result<Self, ToolError> {
        let view = scenario.view;
        let mut map = MercatorMap::new(1, view.size).with_view(view.center, view.zoom);
        let mut overlay = Overlay::new();
        match scenario.order {
            CoordinateOrder::LngFirst => overlay.longitude_first(),
            CoordinateOrder::LatFirst => overlay.latitude_first(),
        };

        let (ctx, log) = RecordingContext::new();
        let ctx = Box::new(ctx);
        let data = scenario.data.clone();
        let options = &scenario.options;
        let id = match scenario.kind {
            LayerKind::Points => overlay.points(PointsSettings::new().options(options).data(data), &mut map, ctx)?,
            LayerKind::Lines => overlay.lines(LinesSettings::new().options(options).data(data), &mut map, ctx)?,
            LayerKind::Shapes => overlay.shapes(ShapesSettings::new().options(options).data(data), &mut map, ctx)?,
        };

        let mut run = Self { map, overlay, id, log };
        let painted = run.overlay.tick(&run.map, Frame::at_rate(0, 1.0 / 60.0));
        debug!(instance = %id, painted, "first frame");
        Ok(run)
    }

    fn member<L: Member>(&self) -> Result<&L, OverlayError> {
        self.overlay.get::<L>(self.id).ok_or(OverlayError::UnknownInstance(self.id))
    }
}

/// Buffer sizes and the draw calls of the first frame.
pub fn stats(scenario: &Scenario) -> Result<Value, ToolError> {
    let run = Run::build(scenario)?;
    let layer = run.overlay.layer(run.id)?;

    let mut out = Map::new();
    out.insert("kind".into(), json!(scenario.kind.name()));
    out.insert("features".into(), json!(layer.core().data().len()));
    match scenario.kind {
        LayerKind::Points => {
            out.insert("vertices".into(), json!(run.member::<Points>()?.buffer().len()));
        }
        LayerKind::Lines => {
            let lines = run.member::<Lines>()?;
            out.insert("vertices".into(), json!(lines.vertex_count()));
            out.insert("parts".into(), json!(lines.parts().len()));
        }
        LayerKind::Shapes => {
            let shapes = run.member::<Shapes>()?;
            out.insert("vertices".into(), json!(shapes.buffer().len()));
            out.insert("triangles".into(), json!(shapes.triangle_count()));
            out.insert("edges".into(), json!(shapes.border_buffer().len() / 2));
        }
    }
    out.insert(
        "renderPasses".into(),
        json!(layer.core().metrics().counter(RENDER_PASSES)),
    );

    let draws: Vec<Value> = run
        .log
        .borrow()
        .draw_calls()
        .into_iter()
        .map(|(mode, first, count)| json!({"mode": format!("{mode:?}"), "first": first, "count": count}))
        .collect();
    out.insert("drawCalls".into(), Value::Array(draws));
    Ok(Value::Object(out))
}

/// Features under `at`. Clicks report at most one; line hover reports
/// every line in range.
pub fn pick(scenario: &Scenario, at: LatLng, hover: bool) -> Result<Value, ToolError> {
    let run = Run::build(scenario)?;
    let event = PointerEvent::at(&run.map, at);

    let indices: Vec<usize> = match scenario.kind {
        LayerKind::Points => run
            .member::<Points>()?
            .pick(&run.map, &event, hover)
            .map(|entry| entry.feature)
            .into_iter()
            .collect(),
        LayerKind::Lines if hover => run.member::<Lines>()?.pick_all(&run.map, &event),
        LayerKind::Lines => run.member::<Lines>()?.pick(&run.map, &event).into_iter().collect(),
        LayerKind::Shapes => run.member::<Shapes>()?.pick(&run.map, &event).into_iter().collect(),
    };

    let data = run.overlay.layer(run.id)?.core().data();
    let hits: Vec<Value> = indices
        .into_iter()
        .filter_map(|index| {
            data.get(index).map(|f| {
                json!({
                    "index": index,
                    "id": f.id,
                    "properties": f.properties,
                    "geometry": geometry_to_geojson_value(&f.geometry),
                })
            })
        })
        .collect();
    Ok(json!({"at": [at.lng, at.lat], "hover": hover, "hits": hits}))
}

#[cfg(test)]
mod tests {
    use super::{Scenario, View, parse_lng_lat, pick, stats};
    use foundation::math::{CoordinateOrder, LatLng};
    use layers::{LayerKind, LayerOptions};
    use pretty_assertions::assert_eq;
    use scene::{DataSource, Feature, Geometry};
    use serde_json::json;

    fn scenario(kind: LayerKind, data: DataSource) -> Scenario {
        Scenario {
            kind,
            data,
            options: LayerOptions {
                size: Some(5.0),
                ..LayerOptions::default()
            },
            view: View::default(),
            order: CoordinateOrder::LngFirst,
        }
    }

    fn square() -> DataSource {
        DataSource::Feature(Feature::new(Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]])))
    }

    #[test]
    fn lng_lat_arguments_parse() {
        assert_eq!(parse_lng_lat("10.5, -3").unwrap(), LatLng::new(-3.0, 10.5));
        assert!(parse_lng_lat("10.5").is_err());
        assert!(parse_lng_lat("east,3").is_err());
    }

    #[test]
    fn point_stats_report_one_draw() {
        let s = scenario(LayerKind::Points, DataSource::Positions(vec![[0.0, 0.0], [10.0, 10.0]]));
        let out = stats(&s).unwrap();
        assert_eq!(out["features"], json!(2));
        assert_eq!(out["vertices"], json!(2));
        assert_eq!(out["drawCalls"], json!([{"mode": "Points", "first": 0, "count": 2}]));
    }

    #[test]
    fn line_stats_count_brush_passes() {
        let line = Feature::new(Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]));
        let out = stats(&scenario(LayerKind::Lines, DataSource::Feature(line))).unwrap();
        assert_eq!(out["vertices"], json!(2));
        assert_eq!(out["parts"], json!(1));
        assert_eq!(out["drawCalls"].as_array().map(Vec::len), Some(81));
    }

    #[test]
    fn shape_stats_draw_the_border_after_the_fill() {
        let mut s = scenario(LayerKind::Shapes, square());
        let out = stats(&s).unwrap();
        assert_eq!(out["triangles"], json!(2));
        assert_eq!(out["drawCalls"], json!([{"mode": "Triangles", "first": 0, "count": 6}]));

        s.options.border = Some(true);
        let out = stats(&s).unwrap();
        assert_eq!(out["drawCalls"][1]["mode"], json!("Lines"));
    }

    #[test]
    fn picks_report_the_feature() {
        let s = scenario(LayerKind::Shapes, square());
        let out = pick(&s, LatLng::new(0.5, 0.5), false).unwrap();
        assert_eq!(out["hits"][0]["index"], json!(0));
        assert_eq!(out["hits"][0]["geometry"]["type"], json!("Polygon"));
        let out = pick(&s, LatLng::new(5.0, 5.0), false).unwrap();
        assert_eq!(out["hits"], json!([]));
    }

    #[test]
    fn lat_first_data_is_picked_at_its_true_position() {
        let mut s = scenario(LayerKind::Points, DataSource::Positions(vec![[10.0, 20.0]]));
        s.order = CoordinateOrder::LatFirst;
        let out = pick(&s, LatLng::new(10.0, 20.0), false).unwrap();
        assert_eq!(out["hits"][0]["index"], json!(0));
    }

    #[test]
    fn configuration_errors_surface() {
        let mut s = scenario(LayerKind::Points, DataSource::Positions(vec![[0.0, 0.0]]));
        s.options.size = None;
        let err = stats(&s).err().unwrap();
        assert!(err.to_string().contains("settings.size"));
    }
}
