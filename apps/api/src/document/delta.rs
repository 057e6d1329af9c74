//! Delta Model: the canonical in-memory document: an ordered list of styled text runs.
//!
//! Wire format is the Quill delta op array:
//! `[{"insert": "Jane\n", "attributes": {"bold": true, "size": 14}}, ...]`.
//! Deserialization is lenient: attributes of the wrong JSON type are dropped rather than
//! rejected, so a delta produced by any editor build can still be rendered and exported.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Quill's named font sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedSize {
    Small,
    Large,
    Huge,
}

impl NamedSize {
    pub fn as_str(self) -> &'static str {
        match self {
            NamedSize::Small => "small",
            NamedSize::Large => "large",
            NamedSize::Huge => "huge",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Some(NamedSize::Small),
            "large" => Some(NamedSize::Large),
            "huge" => Some(NamedSize::Huge),
            _ => None,
        }
    }
}

/// Run font size: either an absolute number (points/pixels as extracted) or a Quill named size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Size {
    Absolute(f64),
    Named(NamedSize),
}

impl Size {
    /// Accepts `12`, `12.5`, `"12"`, `"12px"`, `"large"`. Anything else is `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().filter(|v| *v > 0.0).map(Size::Absolute),
            Value::String(s) => {
                if let Some(named) = NamedSize::parse(s) {
                    return Some(Size::Named(named));
                }
                let trimmed = s.trim();
                let numeric = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
                numeric
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .map(Size::Absolute)
            }
            _ => None,
        }
    }

    fn to_value(self) -> Value {
        match self {
            Size::Absolute(v) => {
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Value::from(v as i64)
                } else {
                    Value::from(v)
                }
            }
            Size::Named(named) => Value::from(named.as_str()),
        }
    }
}

/// Styling of a run. Every field is optional; absent means "no styling".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub size: Option<Size>,
    pub font: Option<String>,
}

impl Attributes {
    pub fn bold() -> Self {
        Self {
            bold: Some(true),
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.bold.unwrap_or(false)
    }

    pub fn is_italic(&self) -> bool {
        self.italic.unwrap_or(false)
    }

    /// True when at least one attribute would change how the run is displayed.
    pub fn has_styling(&self) -> bool {
        self.is_bold() || self.is_italic() || self.size.is_some() || self.font.is_some()
    }

    /// Builds attributes from an arbitrary JSON value, silently dropping malformed entries.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            bold: obj.get("bold").and_then(Value::as_bool),
            italic: obj.get("italic").and_then(Value::as_bool),
            size: obj.get("size").and_then(Size::from_value),
            font: obj
                .get("font")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from),
        }
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(bold) = self.bold {
            obj.insert("bold".into(), Value::Bool(bold));
        }
        if let Some(italic) = self.italic {
            obj.insert("italic".into(), Value::Bool(italic));
        }
        if let Some(size) = self.size {
            obj.insert("size".into(), size.to_value());
        }
        if let Some(font) = &self.font {
            obj.insert("font".into(), Value::String(font.clone()));
        }
        Value::Object(obj)
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Attributes::from_value(&value))
    }
}

/// A contiguous span of text sharing one attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(rename = "insert", deserialize_with = "lenient_insert")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: None,
        }
    }

    pub fn styled(text: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            text: text.into(),
            attributes: Some(attributes),
        }
    }

    /// Attributes, or an empty set when the run carries none.
    pub fn attrs(&self) -> Attributes {
        self.attributes.clone().unwrap_or_default()
    }
}

/// Embeds (images, formulas) carry an object `insert`; they contribute no text.
fn lenient_insert<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// Ordered sequence of runs. Serializes transparently as the op array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta {
    pub runs: Vec<Run>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, run: Run) {
        self.runs.push(run);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Run> {
        self.runs.iter()
    }

    /// Full document text: the concatenation of every run in order.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

impl From<Vec<Run>> for Delta {
    fn from(runs: Vec<Run>) -> Self {
        Self { runs }
    }
}

impl FromIterator<Run> for Delta {
    fn from_iter<I: IntoIterator<Item = Run>>(iter: I) -> Self {
        Self {
            runs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Delta {
    type Item = &'a Run;
    type IntoIter = std::slice::Iter<'a, Run>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}
