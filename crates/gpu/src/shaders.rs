//! Bundled GLSL ES sources.
//!
//! Attribute names and the `matrix` uniform must match `VertexLayout`.

pub const VERTEX: &str = r#"
uniform mat4 matrix;
attribute vec4 vertex;
attribute vec4 color;
attribute float pointSize;
varying vec4 _color;

void main() {
  gl_PointSize = pointSize;
  gl_Position = matrix * vertex;
  _color = color;
}
"#;

/// Round, soft-edged point.
pub const FRAGMENT_DOT: &str = r#"
precision mediump float;
varying vec4 _color;

void main() {
  float border = 0.05;
  float radius = 0.5;
  vec2 m = gl_PointCoord.xy - vec2(0.5, 0.5);
  float dist = radius - sqrt(m.x * m.x + m.y * m.y);
  float t = 0.0;
  if (dist > border) {
    t = 1.0;
  } else if (dist > 0.0) {
    t = dist / border;
  }
  gl_FragColor = vec4(_color.rgb, _color.a * t);
}
"#;

/// Square point.
pub const FRAGMENT_SQUARE: &str = r#"
precision mediump float;
varying vec4 _color;

void main() {
  gl_FragColor = _color;
}
"#;

/// Flat fill for lines, polygons and borders.
pub const FRAGMENT_POLYGON: &str = r#"
precision mediump float;
varying vec4 _color;

void main() {
  gl_FragColor = _color;
}
"#;
