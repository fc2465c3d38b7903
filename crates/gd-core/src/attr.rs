//! Attribute values and the typed records behind each node kind.
//!
//! Nodes store their attributes as a string-keyed JSON map so commands can
//! capture, coalesce, and restore individual keys generically. Each node kind
//! also has a strongly-typed record (`RectProps`, `TextProps`, ...) that the
//! map must deserialize into; that check runs at the load boundary and on
//! every tracked edit. Geometry is normalized to `0.0..=1.0` relative to the
//! containing node; the document itself is sized in pixels.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The attribute bag of a node. Backed by a `BTreeMap`, so key order is stable.
pub type Attributes = serde_json::Map<String, Value>;

/// Well-known attribute keys.
pub mod keys {
    pub const POSITION: &str = "position";
    pub const SIZE: &str = "size";
    pub const ANGLE: &str = "angle";
    pub const STYLE: &str = "style";
    pub const CORNER_RADIUS: &str = "cornerRadius";
    pub const TEXT: &str = "text";
    pub const FONT: &str = "font";
    pub const COLOR: &str = "color";
    pub const ALIGN: &str = "align";
    pub const SRC: &str = "src";
    pub const OPACITY: &str = "opacity";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const BACKGROUND: &str = "background";
    pub const NAME: &str = "name";
}

/// Keys with this prefix are runtime-only (view bookkeeping) and never saved.
pub const TRANSIENT_PREFIX: char = '_';

pub fn is_transient(key: &str) -> bool {
    key.starts_with(TRANSIENT_PREFIX)
}

// ─── Shared records ──────────────────────────────────────────────────────

/// A point, normalized to the parent container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height, normalized to the parent container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Fill and stroke styling shared by shapes and lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Some("#D9D9D9".into()),
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub weight: u16, // 100..900
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Inter".into(),
            size: 16.0,
            weight: 400,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

// ─── Per-kind records ────────────────────────────────────────────────────

/// The document (canvas) root. Sized in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentProps {
    pub size: Size,
    pub background: String,
    pub name: String,
}

impl Default for DocumentProps {
    fn default() -> Self {
        Self {
            size: Size::new(1920.0, 1080.0),
            background: "#FFFFFF".into(),
            name: "Untitled".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupProps {
    pub position: Vec2,
    pub size: Size,
    pub angle: f64,
}

impl Default for GroupProps {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            size: Size::new(1.0, 1.0),
            angle: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RectProps {
    pub position: Vec2,
    pub size: Size,
    pub angle: f64,
    pub style: Style,
    pub corner_radius: f64,
}

impl Default for RectProps {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            size: Size::new(0.2, 0.2),
            angle: 0.0,
            style: Style::default(),
            corner_radius: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleProps {
    pub position: Vec2,
    pub size: Size,
    pub angle: f64,
    pub style: Style,
}

impl Default for CircleProps {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            size: Size::new(0.2, 0.2),
            angle: 0.0,
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProps {
    pub position: Vec2,
    pub size: Size,
    pub angle: f64,
    pub text: String,
    pub font: Font,
    pub color: String,
    pub align: TextAlign,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            size: Size::new(0.3, 0.1),
            angle: 0.0,
            text: String::new(),
            font: Font::default(),
            color: "#000000".into(),
            align: TextAlign::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageProps {
    pub position: Vec2,
    pub size: Size,
    pub angle: f64,
    pub src: String,
    pub opacity: f64,
}

impl Default for ImageProps {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            size: Size::new(0.3, 0.3),
            angle: 0.0,
            src: String::new(),
            opacity: 1.0,
        }
    }
}

/// A straight segment between two normalized points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineProps {
    pub start: Vec2,
    pub end: Vec2,
    pub style: Style,
}

impl Default for LineProps {
    fn default() -> Self {
        Self {
            start: Vec2::new(0.0, 0.0),
            end: Vec2::new(0.2, 0.0),
            style: Style {
                fill: None,
                stroke: Some("#000000".into()),
                ..Style::default()
            },
        }
    }
}

// ─── Conversions & equality ──────────────────────────────────────────────

/// Flatten a typed record into an attribute map.
pub fn to_attributes<T: Serialize>(record: &T) -> Attributes {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Attributes::new(),
    }
}

/// Read an attribute map back as a typed record.
pub fn from_attributes<T: DeserializeOwned>(attributes: &Attributes) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(attributes.clone()))
}

/// Convenience for building attribute values from typed records.
pub fn value_of<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`.
pub fn deep_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| deep_eq(x, y)))
        }
        _ => a == b,
    }
}

/// [`deep_eq`] over possibly-absent values. Absent only equals absent.
pub fn deep_eq_opt(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => deep_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// [`deep_eq`] over whole attribute maps.
pub fn attributes_eq(a: &Attributes, b: &Attributes) -> bool {
    a.len() == b.len() && a.iter().all(|(k, x)| b.get(k).is_some_and(|y| deep_eq(x, y)))
}
