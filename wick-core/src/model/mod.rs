//! Current project data model
//!
//! These types are the live, owned form of a project: a root [`Clip`] whose
//! timeline holds layers, frames and the objects placed on them, plus an
//! asset library shared by reference.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Clip** | A symbol with its own timeline; buttons are clips with button kind |
//! | **Layer** | An ordered track of frames in a timeline |
//! | **Frame** | A closed interval `[start, end]` of playhead positions holding content |
//! | **Path** | Vector geometry, laid-out text, or an image instance |
//! | **Tween** | A keyframed transform at a zero-based playhead position within a frame |
//! | **Asset** | A library entry (image or sound) whose payload lives in the file cache |
//!
//! The persisted form of the model is the flat, id-referencing record set in
//! [`records`].

pub mod records;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use records::{ObjectCache, ObjectRecord, ProjectData, ProjectRecord};

/// Identifier shared by every model object
pub type ObjectId = Uuid;

/// Generate a fresh object identifier
pub fn new_object_id() -> ObjectId {
    Uuid::new_v4()
}

// ============================================
// Shared value types
// ============================================

/// Placement of an object relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees
    pub rotation: f64,
    /// 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 1.0,
        }
    }
}

/// A script attached to one event of a clip or frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Event name (`load`, `update`, `mouseclick`, ...)
    pub name: String,
    /// Script source
    pub src: String,
}

// ============================================
// Assets
// ============================================

/// Kind of library asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Sound,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Sound => "sound",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A library asset.
///
/// `src` holds the binary payload as a data URL. It is not part of the
/// serialized record; the file cache stores and restores it by asset id.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: ObjectId,
    pub kind: AssetKind,
    pub filename: String,
    pub src: Option<String>,
}

impl Asset {
    /// Create an asset with a fresh id
    pub fn new(kind: AssetKind, filename: impl Into<String>, src: Option<String>) -> Self {
        Self {
            id: new_object_id(),
            kind,
            filename: filename.into(),
            src,
        }
    }

    /// Create a placeable instance of this asset.
    ///
    /// Only image assets can be placed on a frame; the instance refers to the
    /// asset by id and never copies its payload.
    pub fn create_instance(&self) -> Option<Path> {
        match self.kind {
            AssetKind::Image => Some(Path {
                id: new_object_id(),
                path_type: PathType::Image,
                asset: Some(self.id),
                json: serde_json::json!(["Raster", { "asset": self.id.to_string() }]),
            }),
            AssetKind::Sound => None,
        }
    }
}

// ============================================
// Timeline objects
// ============================================

/// Whether a clip behaves as a plain symbol or a button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Clip,
    Button,
}

/// A symbol with its own timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub id: ObjectId,
    pub kind: ClipKind,
    /// Name scripts use to refer to this clip
    pub identifier: Option<String>,
    pub transform: Transform,
    pub scripts: Vec<Script>,
    pub layers: Vec<Layer>,
}

impl Default for Clip {
    fn default() -> Self {
        Self::new()
    }
}

impl Clip {
    /// Create an empty clip with no layers
    pub fn new() -> Self {
        Self {
            id: new_object_id(),
            kind: ClipKind::Clip,
            identifier: None,
            transform: Transform::default(),
            scripts: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// Re-kind this clip as a button, keeping its timeline and transform
    pub fn into_button(mut self) -> Self {
        self.kind = ClipKind::Button;
        self
    }

    pub fn is_button(&self) -> bool {
        self.kind == ClipKind::Button
    }

    pub fn add_script(&mut self, name: impl Into<String>, src: impl Into<String>) {
        self.scripts.push(Script {
            name: name.into(),
            src: src.into(),
        });
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }
}

/// An ordered track of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: ObjectId,
    pub name: String,
    pub locked: bool,
    pub hidden: bool,
    pub frames: Vec<Frame>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_object_id(),
            name: name.into(),
            locked: false,
            hidden: false,
            frames: Vec::new(),
        }
    }

    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }
}

/// Content spanning the closed playhead interval `[start, end]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: ObjectId,
    pub start: i64,
    pub end: i64,
    /// Sound asset played when the frame is entered
    pub sound_asset: Option<ObjectId>,
    pub scripts: Vec<Script>,
    pub paths: Vec<Path>,
    pub clips: Vec<Clip>,
    pub tweens: Vec<Tween>,
}

impl Frame {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            id: new_object_id(),
            start,
            end,
            sound_asset: None,
            scripts: Vec::new(),
            paths: Vec::new(),
            clips: Vec::new(),
            tweens: Vec::new(),
        }
    }

    /// Number of playhead positions covered
    pub fn length(&self) -> i64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    pub fn add_script(&mut self, name: impl Into<String>, src: impl Into<String>) {
        self.scripts.push(Script {
            name: name.into(),
            src: src.into(),
        });
    }

    pub fn add_path(&mut self, path: Path) {
        self.paths.push(path);
    }

    pub fn add_clip(&mut self, clip: Clip) {
        self.clips.push(clip);
    }

    pub fn add_tween(&mut self, tween: Tween) {
        self.tweens.push(tween);
    }
}

/// What a [`Path`] draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    Path,
    Text,
    Image,
}

/// Vector geometry, text, or an image instance placed on a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub id: ObjectId,
    pub path_type: PathType,
    /// Bound asset for image instances
    pub asset: Option<ObjectId>,
    /// Structured geometry as produced by the vector collaborator
    pub json: serde_json::Value,
}

impl Path {
    pub fn new(path_type: PathType, json: serde_json::Value) -> Self {
        Self {
            id: new_object_id(),
            path_type,
            asset: None,
            json,
        }
    }
}

/// A keyframed transform inside a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub id: ObjectId,
    /// Zero-based position relative to the frame start
    pub playhead_position: i64,
    pub full_rotations: i64,
    pub transform: Transform,
}

impl Tween {
    pub fn new(playhead_position: i64) -> Self {
        Self {
            id: new_object_id(),
            playhead_position,
            full_rotations: 0,
            transform: Transform::default(),
        }
    }
}

// ============================================
// Project
// ============================================

/// Number of each node type reachable from a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub clips: usize,
    pub buttons: usize,
    pub layers: usize,
    pub frames: usize,
    pub paths: usize,
    pub texts: usize,
    pub images: usize,
    pub tweens: usize,
    pub image_assets: usize,
    pub sound_assets: usize,
}

impl NodeCounts {
    fn visit_clip(&mut self, clip: &Clip) {
        match clip.kind {
            ClipKind::Clip => self.clips += 1,
            ClipKind::Button => self.buttons += 1,
        }
        for layer in &clip.layers {
            self.layers += 1;
            for frame in &layer.frames {
                self.frames += 1;
                self.tweens += frame.tweens.len();
                for path in &frame.paths {
                    match path.path_type {
                        PathType::Path => self.paths += 1,
                        PathType::Text => self.texts += 1,
                        PathType::Image => self.images += 1,
                    }
                }
                for child in &frame.clips {
                    self.visit_clip(child);
                }
            }
        }
    }
}

/// A complete animation project.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ObjectId,
    pub name: String,
    /// CSS color string
    pub background_color: String,
    pub framerate: u32,
    pub width: u32,
    pub height: u32,
    pub last_modified: DateTime<Utc>,
    pub assets: Vec<Asset>,
    pub root: Clip,
    /// Clip currently being edited
    pub focus: ObjectId,
}

impl Project {
    /// Create a project with the editor defaults: one layer holding one frame.
    pub fn new(name: impl Into<String>) -> Self {
        let mut layer = Layer::new("Layer");
        layer.add_frame(Frame::new(0, 0));
        let mut root = Clip::new();
        root.add_layer(layer);
        Self::with_root(name, root)
    }

    /// Create a project around an existing root clip
    pub fn with_root(name: impl Into<String>, root: Clip) -> Self {
        Self {
            id: new_object_id(),
            name: name.into(),
            background_color: "#ffffff".to_string(),
            framerate: 12,
            width: 720,
            height: 405,
            last_modified: Utc::now(),
            focus: root.id,
            assets: Vec::new(),
            root,
        }
    }

    /// Record a modification at the current time
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn add_asset(&mut self, asset: Asset) {
        self.assets.push(asset);
    }

    pub fn get_asset(&self, id: ObjectId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn get_asset_mut(&mut self, id: ObjectId) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| a.id == id)
    }

    /// Count every node reachable from the project
    pub fn count_nodes(&self) -> NodeCounts {
        let mut counts = NodeCounts::default();
        for asset in &self.assets {
            match asset.kind {
                AssetKind::Image => counts.image_assets += 1,
                AssetKind::Sound => counts.sound_assets += 1,
            }
        }
        counts.visit_clip(&self.root);
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_has_default_timeline() {
        let project = Project::new("Demo");
        assert_eq!(project.focus, project.root.id);
        assert_eq!(project.root.layers.len(), 1);
        assert_eq!(project.root.layers[0].frames.len(), 1);
        assert_eq!(project.root.layers[0].frames[0].length(), 1);
    }

    #[test]
    fn test_image_instance_refers_to_asset() {
        let asset = Asset::new(AssetKind::Image, "cat.png", Some("data:image/png;base64,AAAA".into()));
        let instance = asset.create_instance().unwrap();

        assert_eq!(instance.path_type, PathType::Image);
        assert_eq!(instance.asset, Some(asset.id));
        assert!(!instance.json.to_string().contains("base64"));
    }

    #[test]
    fn test_sound_asset_has_no_instance() {
        let asset = Asset::new(AssetKind::Sound, "beep.wav", None);
        assert!(asset.create_instance().is_none());
    }

    #[test]
    fn test_count_nodes() {
        let mut project = Project::new("Counts");
        let image = Asset::new(AssetKind::Image, "a.png", None);
        let instance = image.create_instance().unwrap();
        project.add_asset(image);

        let mut button = Clip::new().into_button();
        button.add_layer(Layer::new("Button"));

        let frame = &mut project.root.layers[0].frames[0];
        frame.add_path(instance);
        frame.add_path(Path::new(PathType::Text, serde_json::json!(["PointText", {}])));
        frame.add_clip(button);
        frame.add_tween(Tween::new(0));

        let counts = project.count_nodes();
        assert_eq!(counts.clips, 1);
        assert_eq!(counts.buttons, 1);
        assert_eq!(counts.layers, 2);
        assert_eq!(counts.frames, 1);
        assert_eq!(counts.images, 1);
        assert_eq!(counts.texts, 1);
        assert_eq!(counts.tweens, 1);
        assert_eq!(counts.image_assets, 1);
    }
}
