//! Legacy (Wick 15.2) project format
//!
//! Raw serde types for the legacy project tree. Legacy objects are one loose
//! record type with optional fields per kind; [`LegacyObject::classify`]
//! decodes each into a [`LegacyNode`] once, before conversion.

use crate::error::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::marker::PhantomData;

// ============================================
// Raw legacy records (serde deserialization)
// ============================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyProject {
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub background_color: String,
    pub library: LegacyLibrary,
    pub root_object: LegacyObject,
}

impl Default for LegacyProject {
    fn default() -> Self {
        Self {
            name: None,
            width: 720,
            height: 480,
            framerate: 12,
            background_color: "#FFFFFF".to_string(),
            library: LegacyLibrary::default(),
            root_object: LegacyObject::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyLibrary {
    /// Assets keyed by uuid, in document order
    #[serde(deserialize_with = "ordered_entries")]
    pub assets: Vec<(String, LegacyAsset)>,
}

/// Deserialize a JSON object as key/value pairs in document order.
///
/// A repeated key replaces the earlier value in its original position.
fn ordered_entries<'de, D, T>(deserializer: D) -> std::result::Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of assets")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries: Vec<(String, T)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, T>()? {
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(existing) => existing.1 = value,
                    None => entries.push((key, value)),
                }
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyAsset {
    pub uuid: Option<String>,
    /// `image`, `audio`, or a kind the current format cannot represent
    #[serde(rename = "type")]
    pub asset_type: String,
    pub filename: String,
    /// Payload as a data URL
    pub data: Option<String>,
}

/// Any object placed on a legacy frame, including the root object.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyObject {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
    pub opacity: f64,
    pub wick_script: Option<String>,
    pub is_symbol: bool,
    pub is_group: bool,
    pub is_button: bool,
    /// SVG markup (or bare path data) for vector paths
    pub path_data: Option<String>,
    pub text_data: Option<TextData>,
    /// Library asset this object is an instance of (images)
    #[serde(rename = "assetUUID")]
    pub asset_uuid: Option<String>,
    pub layers: Vec<LegacyLayer>,
}

impl Default for LegacyObject {
    fn default() -> Self {
        Self {
            uuid: None,
            name: None,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            wick_script: None,
            is_symbol: false,
            is_group: false,
            is_button: false,
            path_data: None,
            text_data: None,
            asset_uuid: None,
            layers: Vec::new(),
        }
    }
}

/// Legacy text attributes
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextData {
    pub text: String,
    pub fill: String,
    pub font_family: String,
    /// `"normal"`, `"bold"`, or a numeric weight
    pub font_weight: serde_json::Value,
    pub font_size: f64,
    pub text_align: String,
}

impl Default for TextData {
    fn default() -> Self {
        Self {
            text: String::new(),
            fill: "#000000".to_string(),
            font_family: "Arial".to_string(),
            font_weight: serde_json::Value::String("normal".to_string()),
            font_size: 20.0,
            text_align: "left".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyLayer {
    pub name: String,
    pub locked: bool,
    pub hidden: bool,
    pub frames: Vec<LegacyFrame>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyFrame {
    pub playhead_position: i64,
    pub length: i64,
    #[serde(rename = "audioAssetUUID")]
    pub audio_asset_uuid: Option<String>,
    pub wick_script: Option<String>,
    pub wick_objects: Vec<LegacyObject>,
    pub tweens: Vec<LegacyTween>,
}

impl Default for LegacyFrame {
    fn default() -> Self {
        Self {
            playhead_position: 0,
            length: 1,
            audio_asset_uuid: None,
            wick_script: None,
            wick_objects: Vec::new(),
            tweens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyTween {
    /// One-based position within the frame
    pub playhead_position: i64,
    pub rotations: i64,
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
    pub opacity: f64,
}

impl Default for LegacyTween {
    fn default() -> Self {
        Self {
            playhead_position: 1,
            rotations: 0,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 1.0,
        }
    }
}

// ============================================
// Node classification
// ============================================

/// A legacy frame child, decoded by kind.
#[derive(Debug, Clone, Copy)]
pub enum LegacyNode<'a> {
    Path { markup: &'a str },
    Text(&'a TextData),
    Image { asset: &'a str },
    /// Symbols and groups both become clips
    Clip,
    Button,
}

impl LegacyNode<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LegacyNode::Path { .. } => "path",
            LegacyNode::Text(_) => "text",
            LegacyNode::Image { .. } => "image",
            LegacyNode::Clip => "clip",
            LegacyNode::Button => "button",
        }
    }
}

impl LegacyObject {
    /// Decode this object's kind; first match wins in the order
    /// path, text, image, clip-or-group, button.
    pub fn classify(&self) -> Option<LegacyNode<'_>> {
        if let Some(markup) = &self.path_data {
            Some(LegacyNode::Path { markup })
        } else if let Some(text) = &self.text_data {
            Some(LegacyNode::Text(text))
        } else if let Some(asset) = &self.asset_uuid {
            Some(LegacyNode::Image { asset })
        } else if (self.is_symbol || self.is_group) && !self.is_button {
            Some(LegacyNode::Clip)
        } else if self.is_button {
            Some(LegacyNode::Button)
        } else {
            None
        }
    }

    /// Identifier used in diagnostics
    pub fn display_id(&self) -> String {
        self.uuid
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

// ============================================
// Decoding
// ============================================

/// Turns legacy file bytes into a legacy project tree.
pub trait LegacyDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<LegacyProject>;
}

/// Decoder for uncompressed legacy project JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl LegacyDecoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<LegacyProject> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        serde_json::from_slice(bytes)
            .map_err(|e| Error::LegacyFormat(format!("invalid legacy project JSON: {}", e)))
    }
}

/// Derive a project name from a legacy file name.
///
/// Legacy exports are named `<project>-<timestamp>.wick` or `.json`; the
/// name is the part before the first `-` with the extension removed.
pub fn project_name_from_filename(file_name: &str) -> String {
    let mut name = file_name.split('-').next().unwrap_or_default();
    for ext in [".json", ".wick"] {
        if let Some(pos) = name.find(ext) {
            name = &name[..pos];
        }
    }
    if name.is_empty() {
        "New Project".to_string()
    } else {
        name.to_string()
    }
}
