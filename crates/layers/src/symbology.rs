use std::rc::Rc;

use scene::Feature;
use serde::{Deserialize, Serialize};

/// Linear RGB color in `0..=1`. Alpha falls back to the layer opacity.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid color `{}`", self.0)
    }
}

impl std::error::Error for ColorParseError {}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels {
        r: f32,
        g: f32,
        b: f32,
        #[serde(default)]
        a: Option<f32>,
    },
}

impl TryFrom<ColorRepr> for Color {
    type Error = ColorParseError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(s) => Color::from_hex(&s),
            ColorRepr::Channels { r, g, b, a } => Ok(Color { r, g, b, a }),
        }
    }
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: None }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r,
            g,
            b,
            a: Some(a),
        }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`; the `#` is optional.
    pub fn from_hex(s: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(err());
        }
        let channel = |i: usize, width: usize| -> Result<f32, ColorParseError> {
            let digits = hex.get(i * width..(i + 1) * width).ok_or_else(err)?;
            let v = u8::from_str_radix(digits, 16).map_err(|_| err())?;
            let v = if width == 1 { v * 17 } else { v };
            Ok(f32::from(v) / 255.0)
        };
        match hex.len() {
            3 => Ok(Color::rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            6 => Ok(Color::rgb(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
            8 => Ok(Color::rgba(
                channel(0, 2)?,
                channel(1, 2)?,
                channel(2, 2)?,
                channel(3, 2)?,
            )),
            _ => Err(err()),
        }
    }

    /// Deterministic stand-in for a random color: hues stepped by the
    /// golden angle so neighbouring indices stay distinguishable.
    pub fn palette(index: usize) -> Self {
        let hue = (index as f64 * 137.507_764).rem_euclid(360.0);
        hsv(hue, 0.65, 0.95)
    }

    /// `[r, g, b, a]` with `opacity` standing in for a missing alpha.
    pub fn to_rgba(self, opacity: f32) -> [f32; 4] {
        [self.r, self.g, self.b, self.a.unwrap_or(opacity)]
    }

    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b, self.a.unwrap_or(1.0)]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

fn hsv(hue: f64, saturation: f64, value: f64) -> Color {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    Color::rgb((r + m) as f32, (g + m) as f32, (b + m) as f32)
}

pub type ComputeFn<T> = Rc<dyn Fn(usize, &Feature) -> T>;

/// A per-feature visual attribute: one value for every feature, or a
/// function of the feature index and feature. Resolved once per feature
/// while packing, never at draw time.
#[derive(Clone)]
pub enum Attribute<T> {
    Constant(T),
    Computed(ComputeFn<T>),
}

impl<T: Copy> Attribute<T> {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(usize, &Feature) -> T + 'static,
    {
        Attribute::Computed(Rc::new(f))
    }

    pub fn resolve(&self, index: usize, feature: &Feature) -> T {
        match self {
            Attribute::Constant(v) => *v,
            Attribute::Computed(f) => f(index, feature),
        }
    }

    pub fn constant(&self) -> Option<T> {
        match self {
            Attribute::Constant(v) => Some(*v),
            Attribute::Computed(_) => None,
        }
    }
}

impl<T> From<T> for Attribute<T> {
    fn from(v: T) -> Self {
        Attribute::Constant(v)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Attribute::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
