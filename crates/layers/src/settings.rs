//! Layer configuration.
//!
//! Plain values arrive through `LayerOptions` (serde), everything else
//! through the builder methods on the per-kind settings. `validate` turns a
//! settings record into a resolved config or reports every violation at once.

use std::rc::Rc;

use foundation::math::CoordinateOrder;
use gpu::{VertexLayout, shaders};
use runtime::DebounceEdge;
use scene::{DataSource, Feature};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layer::LayerKind;
use crate::lines::MAX_LINE_WEIGHT;
use crate::map::PointerEvent;
use crate::pack::{LineFeatureVertices, PointEntry, ShapeVertex};
use crate::symbology::{Attribute, Color};

pub const DEFAULT_PANE: &str = "overlayPane";
pub const DEFAULT_HOVER_WAIT_MS: f64 = 250.0;

/// Interaction callback. `None` means the event was not handled.
pub type PointerCallback = Rc<dyn Fn(&PointerEvent, &Feature) -> Option<Value>>;
pub type PointHook = Rc<dyn Fn(&PointEntry)>;
pub type LineHook = Rc<dyn Fn(&LineFeatureVertices)>;
pub type ShapeHook = Rc<dyn Fn(&ShapeVertex)>;

#[derive(Clone, Default)]
pub struct Callbacks {
    pub click: Option<PointerCallback>,
    pub context_menu: Option<PointerCallback>,
    pub hover: Option<PointerCallback>,
    pub hover_off: Option<PointerCallback>,
}

impl Callbacks {
    pub fn wants_hover(&self) -> bool {
        self.hover.is_some() || self.hover_off.is_some()
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("click", &self.click.is_some())
            .field("context_menu", &self.context_menu.is_some())
            .field("hover", &self.hover.is_some())
            .field("hover_off", &self.hover_off.is_some())
            .finish()
    }
}

/// Shader program sources plus the vertex layout they expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shaders {
    pub vertex: String,
    pub fragment: String,
    pub layout: VertexLayout,
}

impl Shaders {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>, layout: VertexLayout) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            layout,
        }
    }

    pub fn for_kind(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Points => Self::new(shaders::VERTEX, shaders::FRAGMENT_DOT, VertexLayout::points()),
            LayerKind::Lines | LayerKind::Shapes => {
                Self::new(shaders::VERTEX, shaders::FRAGMENT_POLYGON, VertexLayout::colored())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub pane: String,
    pub class_name: String,
    pub preserve_drawing_buffer: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            pane: DEFAULT_PANE.to_string(),
            class_name: String::new(),
            preserve_drawing_buffer: false,
        }
    }
}

/// Serializable plain-value options shared by every layer kind. Keys that
/// do not apply to a kind are ignored by it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LayerOptions {
    pub pane: Option<String>,
    pub class_name: Option<String>,
    pub preserve_drawing_buffer: Option<bool>,
    #[serde(with = "order_name")]
    pub coordinate_order: Option<CoordinateOrder>,
    pub opacity: Option<f32>,
    pub color: Option<Color>,
    pub size: Option<f32>,
    pub weight: Option<f32>,
    pub sensitivity: Option<f64>,
    pub sensitivity_hover: Option<f64>,
    #[serde(rename = "hoverWait")]
    pub hover_wait_ms: Option<f64>,
    pub immediate_hover: Option<bool>,
    pub border: Option<bool>,
    pub border_opacity: Option<f32>,
}

mod order_name {
    use foundation::math::CoordinateOrder;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(order: &Option<CoordinateOrder>, s: S) -> Result<S::Ok, S::Error> {
        match order {
            Some(order) => s.serialize_some(order.name()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<CoordinateOrder>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|name| name.parse().map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// One broken setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    pub field: &'static str,
    pub problem: String,
}

impl ConfigViolation {
    pub fn new(field: &'static str, problem: impl Into<String>) -> Self {
        Self {
            field,
            problem: problem.into(),
        }
    }

    pub fn undefined(field: &'static str) -> Self {
        Self::new(field, "is not properly defined")
    }
}

impl std::fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "settings.{} {}", self.field, self.problem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub violations: Vec<ConfigViolation>,
}

impl ConfigError {
    pub fn new(violations: Vec<ConfigViolation>) -> Self {
        Self { violations }
    }

    pub fn has(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// Settings every layer kind shares.
#[derive(Clone)]
pub struct CommonSettings {
    pub data: Option<DataSource>,
    /// `None` defers to the overlay's global default.
    pub coordinate_order: Option<CoordinateOrder>,
    pub surface: SurfaceOptions,
    pub opacity: f32,
    /// `None` colors each feature from the palette.
    pub color: Option<Attribute<Color>>,
    pub sensitivity: f64,
    pub sensitivity_hover: f64,
    pub hover_wait_ms: f64,
    pub hover_edge: DebounceEdge,
    pub callbacks: Callbacks,
    pub shaders: Shaders,
}

impl CommonSettings {
    pub fn for_kind(kind: LayerKind) -> Self {
        let (opacity, sensitivity) = match kind {
            LayerKind::Points => (0.8, 2.0),
            LayerKind::Lines | LayerKind::Shapes => (0.5, 0.1),
        };
        Self {
            data: None,
            coordinate_order: None,
            surface: SurfaceOptions::default(),
            opacity,
            color: None,
            sensitivity,
            sensitivity_hover: 0.03,
            hover_wait_ms: DEFAULT_HOVER_WAIT_MS,
            hover_edge: DebounceEdge::Trailing,
            callbacks: Callbacks::default(),
            shaders: Shaders::for_kind(kind),
        }
    }

    fn apply(&mut self, o: &LayerOptions) {
        if let Some(pane) = &o.pane {
            self.surface.pane = pane.clone();
        }
        if let Some(class_name) = &o.class_name {
            self.surface.class_name = class_name.clone();
        }
        if let Some(preserve) = o.preserve_drawing_buffer {
            self.surface.preserve_drawing_buffer = preserve;
        }
        if o.coordinate_order.is_some() {
            self.coordinate_order = o.coordinate_order;
        }
        if let Some(opacity) = o.opacity {
            self.opacity = opacity;
        }
        if let Some(color) = o.color {
            self.color = Some(Attribute::Constant(color));
        }
        if let Some(v) = o.sensitivity {
            self.sensitivity = v;
        }
        if let Some(v) = o.sensitivity_hover {
            self.sensitivity_hover = v;
        }
        if let Some(ms) = o.hover_wait_ms {
            self.hover_wait_ms = ms;
        }
        if let Some(immediate) = o.immediate_hover {
            self.hover_edge = if immediate {
                DebounceEdge::Leading
            } else {
                DebounceEdge::Trailing
            };
        }
    }

    fn violations(&self, floats_per_vertex: u32) -> Vec<ConfigViolation> {
        let mut out = Vec::new();
        if self.data.is_none() {
            out.push(ConfigViolation::undefined("data"));
        }
        if self.coordinate_order.is_none() {
            out.push(ConfigViolation::undefined("coordinateOrder"));
        }
        if self.surface.pane.is_empty() {
            out.push(ConfigViolation::undefined("pane"));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            out.push(ConfigViolation::new("opacity", "must be within 0..=1"));
        }
        if let Some(Attribute::Constant(c)) = &self.color {
            if !c.is_valid() {
                out.push(ConfigViolation::new("color", "channels must be within 0..=1"));
            }
        }
        for (field, v) in [
            ("sensitivity", self.sensitivity),
            ("sensitivityHover", self.sensitivity_hover),
            ("hoverWait", self.hover_wait_ms),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                out.push(ConfigViolation::new(field, "must be a non-negative number"));
            }
        }
        if self.shaders.vertex.trim().is_empty() {
            out.push(ConfigViolation::undefined("vertexShaderSource"));
        }
        if self.shaders.fragment.trim().is_empty() {
            out.push(ConfigViolation::undefined("fragmentShaderSource"));
        }
        let floats = self.shaders.layout.floats_per_vertex();
        if floats != floats_per_vertex {
            out.push(ConfigViolation::new(
                "shaderVariables",
                format!("describe {floats} floats per vertex, expected {floats_per_vertex}"),
            ));
        }
        out
    }

    /// Collects this record's violations after `kind_violations`; succeeds
    /// only when there are none at all.
    fn into_config(
        self,
        floats_per_vertex: u32,
        mut violations: Vec<ConfigViolation>,
    ) -> Result<(LayerConfig, DataSource), ConfigError> {
        let mut own = self.violations(floats_per_vertex);
        own.append(&mut violations);
        match (self.data, self.coordinate_order) {
            (Some(data), Some(order)) if own.is_empty() => Ok((
                LayerConfig {
                    order,
                    surface: self.surface,
                    opacity: self.opacity,
                    color: self.color,
                    sensitivity: self.sensitivity,
                    sensitivity_hover: self.sensitivity_hover,
                    hover_wait_ms: self.hover_wait_ms,
                    hover_edge: self.hover_edge,
                    callbacks: self.callbacks,
                    shaders: self.shaders,
                },
                data,
            )),
            _ => Err(ConfigError::new(own)),
        }
    }
}

/// Validated settings shared by every kind.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    pub order: CoordinateOrder,
    pub surface: SurfaceOptions,
    pub opacity: f32,
    pub color: Option<Attribute<Color>>,
    pub sensitivity: f64,
    pub sensitivity_hover: f64,
    pub hover_wait_ms: f64,
    pub hover_edge: DebounceEdge,
    pub callbacks: Callbacks,
    pub shaders: Shaders,
}

impl LayerConfig {
    /// Packed `[r, g, b, a]` for the feature at `index`.
    pub fn color_of(&self, index: usize, feature: &Feature) -> [f32; 4] {
        let color = match &self.color {
            Some(attr) => attr.resolve(index, feature),
            None => Color::palette(index),
        };
        color.to_rgba(self.opacity)
    }
}

fn check_extent(field: &'static str, attr: Option<&Attribute<f32>>, out: &mut Vec<ConfigViolation>) {
    match attr {
        None => out.push(ConfigViolation::undefined(field)),
        Some(Attribute::Constant(v)) if !(v.is_finite() && *v >= 0.0) => {
            out.push(ConfigViolation::new(field, "must be a non-negative number"))
        }
        Some(_) => {}
    }
}

macro_rules! common_builders {
    ($settings:ty) => {
        impl $settings {
            pub fn data(mut self, data: DataSource) -> Self {
                self.common.data = Some(data);
                self
            }

            pub fn coordinate_order(mut self, order: CoordinateOrder) -> Self {
                self.common.coordinate_order = Some(order);
                self
            }

            pub fn color(mut self, color: impl Into<Attribute<Color>>) -> Self {
                self.common.color = Some(color.into());
                self
            }

            pub fn color_fn<F>(self, f: F) -> Self
            where
                F: Fn(usize, &Feature) -> Color + 'static,
            {
                self.color(Attribute::computed(f))
            }

            pub fn opacity(mut self, opacity: f32) -> Self {
                self.common.opacity = opacity;
                self
            }

            pub fn sensitivity(mut self, sensitivity: f64) -> Self {
                self.common.sensitivity = sensitivity;
                self
            }

            pub fn sensitivity_hover(mut self, sensitivity: f64) -> Self {
                self.common.sensitivity_hover = sensitivity;
                self
            }

            pub fn hover_wait_ms(mut self, ms: f64) -> Self {
                self.common.hover_wait_ms = ms;
                self
            }

            pub fn hover_edge(mut self, edge: DebounceEdge) -> Self {
                self.common.hover_edge = edge;
                self
            }

            pub fn pane(mut self, pane: impl Into<String>) -> Self {
                self.common.surface.pane = pane.into();
                self
            }

            pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
                self.common.surface.class_name = class_name.into();
                self
            }

            pub fn shaders(mut self, shaders: Shaders) -> Self {
                self.common.shaders = shaders;
                self
            }

            pub fn on_click<F>(mut self, f: F) -> Self
            where
                F: Fn(&PointerEvent, &Feature) -> Option<Value> + 'static,
            {
                self.common.callbacks.click = Some(Rc::new(f));
                self
            }

            pub fn on_context_menu<F>(mut self, f: F) -> Self
            where
                F: Fn(&PointerEvent, &Feature) -> Option<Value> + 'static,
            {
                self.common.callbacks.context_menu = Some(Rc::new(f));
                self
            }

            pub fn on_hover<F>(mut self, f: F) -> Self
            where
                F: Fn(&PointerEvent, &Feature) -> Option<Value> + 'static,
            {
                self.common.callbacks.hover = Some(Rc::new(f));
                self
            }

            pub fn on_hover_off<F>(mut self, f: F) -> Self
            where
                F: Fn(&PointerEvent, &Feature) -> Option<Value> + 'static,
            {
                self.common.callbacks.hover_off = Some(Rc::new(f));
                self
            }
        }
    };
}

#[derive(Clone)]
pub struct PointsSettings {
    pub common: CommonSettings,
    pub size: Option<Attribute<f32>>,
    pub each_vertex: Option<PointHook>,
}

pub struct PointsConfig {
    pub layer: LayerConfig,
    pub size: Attribute<f32>,
    pub each_vertex: Option<PointHook>,
}

impl Default for PointsSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl PointsSettings {
    pub fn new() -> Self {
        Self {
            common: CommonSettings::for_kind(LayerKind::Points),
            size: None,
            each_vertex: None,
        }
    }

    pub fn options(mut self, o: &LayerOptions) -> Self {
        self.common.apply(o);
        if let Some(size) = o.size {
            self.size = Some(Attribute::Constant(size));
        }
        self
    }

    pub fn size(mut self, size: impl Into<Attribute<f32>>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn size_fn<F>(self, f: F) -> Self
    where
        F: Fn(usize, &Feature) -> f32 + 'static,
    {
        self.size(Attribute::computed(f))
    }

    pub fn each_vertex<F>(mut self, f: F) -> Self
    where
        F: Fn(&PointEntry) + 'static,
    {
        self.each_vertex = Some(Rc::new(f));
        self
    }

    pub fn validate(self) -> Result<(PointsConfig, DataSource), ConfigError> {
        let mut violations = Vec::new();
        check_extent("size", self.size.as_ref(), &mut violations);
        let (layer, data) = self.common.into_config(7, violations)?;
        let size = self
            .size
            .ok_or_else(|| ConfigError::new(vec![ConfigViolation::undefined("size")]))?;
        Ok((
            PointsConfig {
                layer,
                size,
                each_vertex: self.each_vertex,
            },
            data,
        ))
    }
}

common_builders!(PointsSettings);

#[derive(Clone)]
pub struct LinesSettings {
    pub common: CommonSettings,
    pub weight: Option<Attribute<f32>>,
    pub each_vertex: Option<LineHook>,
}

pub struct LinesConfig {
    pub layer: LayerConfig,
    pub weight: Attribute<f32>,
    pub each_vertex: Option<LineHook>,
}

impl Default for LinesSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LinesSettings {
    pub fn new() -> Self {
        Self {
            common: CommonSettings::for_kind(LayerKind::Lines),
            weight: Some(Attribute::Constant(2.0)),
            each_vertex: None,
        }
    }

    pub fn options(mut self, o: &LayerOptions) -> Self {
        self.common.apply(o);
        if let Some(weight) = o.weight {
            self.weight = Some(Attribute::Constant(weight));
        }
        self
    }

    pub fn weight(mut self, weight: impl Into<Attribute<f32>>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    pub fn weight_fn<F>(self, f: F) -> Self
    where
        F: Fn(usize, &Feature) -> f32 + 'static,
    {
        self.weight(Attribute::computed(f))
    }

    /// Drops the default weight; validation then reports it missing.
    pub fn without_weight(mut self) -> Self {
        self.weight = None;
        self
    }

    pub fn each_vertex<F>(mut self, f: F) -> Self
    where
        F: Fn(&LineFeatureVertices) + 'static,
    {
        self.each_vertex = Some(Rc::new(f));
        self
    }

    pub fn validate(self) -> Result<(LinesConfig, DataSource), ConfigError> {
        let mut violations = Vec::new();
        check_extent("weight", self.weight.as_ref(), &mut violations);
        if matches!(self.weight, Some(Attribute::Constant(w)) if w > MAX_LINE_WEIGHT) {
            violations.push(ConfigViolation::new(
                "weight",
                format!("must be at most {MAX_LINE_WEIGHT}"),
            ));
        }
        let (layer, data) = self.common.into_config(6, violations)?;
        let weight = self
            .weight
            .ok_or_else(|| ConfigError::new(vec![ConfigViolation::undefined("weight")]))?;
        Ok((
            LinesConfig {
                layer,
                weight,
                each_vertex: self.each_vertex,
            },
            data,
        ))
    }
}

common_builders!(LinesSettings);

#[derive(Clone)]
pub struct ShapesSettings {
    pub common: CommonSettings,
    pub border: bool,
    pub border_opacity: f32,
    pub each_vertex: Option<ShapeHook>,
}

pub struct ShapesConfig {
    pub layer: LayerConfig,
    pub border: bool,
    pub border_opacity: f32,
    pub each_vertex: Option<ShapeHook>,
}

impl Default for ShapesSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapesSettings {
    pub fn new() -> Self {
        Self {
            common: CommonSettings::for_kind(LayerKind::Shapes),
            border: false,
            border_opacity: 1.0,
            each_vertex: None,
        }
    }

    pub fn options(mut self, o: &LayerOptions) -> Self {
        self.common.apply(o);
        if let Some(border) = o.border {
            self.border = border;
        }
        if let Some(opacity) = o.border_opacity {
            self.border_opacity = opacity;
        }
        self
    }

    pub fn border(mut self, border: bool) -> Self {
        self.border = border;
        self
    }

    pub fn border_opacity(mut self, opacity: f32) -> Self {
        self.border_opacity = opacity;
        self
    }

    pub fn each_vertex<F>(mut self, f: F) -> Self
    where
        F: Fn(&ShapeVertex) + 'static,
    {
        self.each_vertex = Some(Rc::new(f));
        self
    }

    pub fn validate(self) -> Result<(ShapesConfig, DataSource), ConfigError> {
        let mut violations = Vec::new();
        if !(0.0..=1.0).contains(&self.border_opacity) {
            violations.push(ConfigViolation::new("borderOpacity", "must be within 0..=1"));
        }
        let (layer, data) = self.common.into_config(6, violations)?;
        Ok((
            ShapesConfig {
                layer,
                border: self.border,
                border_opacity: self.border_opacity,
                each_vertex: self.each_vertex,
            },
            data,
        ))
    }
}

common_builders!(ShapesSettings);
