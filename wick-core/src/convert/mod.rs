//! Legacy project conversion
//!
//! Converts a Wick 15.2 project tree into the current [`Project`] model by
//! recursive descent. Conversion is total over the recognised node kinds:
//! every legacy clip, layer, frame, tween, path, text and image yields
//! exactly one converted node. Unsupported asset types are skipped with a
//! warning; an unrecognised frame child fails the whole conversion.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ──LegacyDecoder──▶ LegacyProject ──LegacyConverter──▶ Conversion { project, warnings }
//!                                              │
//!                                              └─ VectorGraphics (paths, text)
//! ```

pub mod legacy;
pub mod script;
pub mod vector;

pub use legacy::{
    project_name_from_filename, JsonDecoder, LegacyAsset, LegacyDecoder, LegacyFrame, LegacyLayer,
    LegacyNode, LegacyObject, LegacyProject, LegacyTween, TextData,
};
pub use script::convert_script;
pub use vector::{PaperJson, VectorGraphics};

use crate::config::{ConverterConfig, ScriptPolicy};
use crate::error::{Error, Result};
use crate::model::{
    Asset, AssetKind, Clip, Frame, Layer, ObjectId, Path, PathType, Project, Transform, Tween,
};
use std::path::Path as FsPath;
use uuid::Uuid;

/// Result of converting one legacy project.
#[derive(Debug)]
pub struct Conversion {
    pub project: Project,
    /// Non-fatal problems (skipped assets, dropped references)
    pub warnings: Vec<String>,
}

/// Converts legacy projects using pluggable decoding and vector import.
pub struct LegacyConverter {
    script_policy: ScriptPolicy,
    decoder: Box<dyn LegacyDecoder>,
    vector: Box<dyn VectorGraphics>,
}

impl Default for LegacyConverter {
    fn default() -> Self {
        Self::new(&ConverterConfig::default())
    }
}

impl LegacyConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            script_policy: config.script_policy,
            decoder: Box::new(JsonDecoder),
            vector: Box::new(PaperJson),
        }
    }

    /// Replace the legacy file decoder
    pub fn with_decoder(mut self, decoder: impl LegacyDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Replace the vector graphics importer
    pub fn with_vector_graphics(mut self, vector: impl VectorGraphics + 'static) -> Self {
        self.vector = Box::new(vector);
        self
    }

    pub fn script_policy(&self) -> ScriptPolicy {
        self.script_policy
    }

    /// Read, decode and convert a legacy project file.
    ///
    /// The project name is taken from the file name, as legacy exports did.
    pub fn convert_file(&self, path: &FsPath) -> Result<Conversion> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Converting legacy project");

        let mut legacy = self.decoder.decode(&bytes)?;
        legacy.name = Some(project_name_from_filename(&name));
        self.convert(&legacy)
    }

    /// Convert a decoded legacy project
    pub fn convert(&self, legacy: &LegacyProject) -> Result<Conversion> {
        let mut warnings = Vec::new();

        let mut assets = Vec::with_capacity(legacy.library.assets.len());
        for (key, asset) in &legacy.library.assets {
            if let Some(converted) = convert_asset(key, asset, &mut warnings)? {
                assets.push(converted);
            }
        }

        let mut session = Session {
            script_policy: self.script_policy,
            vector: self.vector.as_ref(),
            assets: &assets,
            warnings,
        };
        let root = session.clip(&legacy.root_object)?;
        let warnings = session.warnings;

        let name = legacy
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "New Project".to_string());

        let mut project = Project::with_root(name, root);
        project.background_color = legacy.background_color.clone();
        project.framerate = legacy.framerate;
        project.width = legacy.width;
        project.height = legacy.height;
        project.assets = assets;

        let counts = project.count_nodes();
        tracing::info!(
            project = %project.id,
            name = %project.name,
            clips = counts.clips,
            buttons = counts.buttons,
            frames = counts.frames,
            paths = counts.paths + counts.texts + counts.images,
            assets = project.assets.len(),
            warnings = warnings.len(),
            "Converted legacy project"
        );

        Ok(Conversion { project, warnings })
    }
}

// ============================================
// Assets
// ============================================

fn convert_asset(
    key: &str,
    asset: &LegacyAsset,
    warnings: &mut Vec<String>,
) -> Result<Option<Asset>> {
    let kind = match asset.asset_type.as_str() {
        "image" => AssetKind::Image,
        "audio" => AssetKind::Sound,
        other => {
            tracing::warn!(
                asset = %key,
                asset_type = %other,
                filename = %asset.filename,
                "Unsupported legacy asset type, skipping"
            );
            warnings.push(format!(
                "unsupported asset type '{}' for asset {} ({}), skipped",
                other, key, asset.filename
            ));
            return Ok(None);
        }
    };

    let uuid = asset.uuid.as_deref().unwrap_or(key);
    let id = Uuid::parse_str(uuid)
        .map_err(|e| Error::LegacyFormat(format!("asset id '{}' is not a UUID: {}", uuid, e)))?;

    Ok(Some(Asset {
        id,
        kind,
        filename: asset.filename.clone(),
        src: asset.data.clone(),
    }))
}

// ============================================
// Timeline
// ============================================

/// State shared across one recursive conversion
struct Session<'a> {
    script_policy: ScriptPolicy,
    vector: &'a dyn VectorGraphics,
    /// Assets converted before the timeline
    assets: &'a [Asset],
    warnings: Vec<String>,
}

impl Session<'_> {
    fn clip(&mut self, object: &LegacyObject) -> Result<Clip> {
        let mut clip = Clip::new();
        clip.identifier = object.name.clone();
        clip.transform = transform_of(object);
        clip.scripts = convert_script(object.wick_script.as_deref(), self.script_policy);

        for layer in &object.layers {
            let converted = self.layer(layer)?;
            clip.add_layer(converted);
        }
        Ok(clip)
    }

    fn layer(&mut self, layer: &LegacyLayer) -> Result<Layer> {
        let mut converted = Layer::new(layer.name.clone());
        converted.locked = layer.locked;
        converted.hidden = layer.hidden;

        for frame in &layer.frames {
            let frame = self.frame(frame)?;
            converted.add_frame(frame);
        }
        Ok(converted)
    }

    fn frame(&mut self, frame: &LegacyFrame) -> Result<Frame> {
        let length = if frame.length < 1 {
            self.warnings.push(format!(
                "frame at playhead {} has length {}, using 1",
                frame.playhead_position, frame.length
            ));
            1
        } else {
            frame.length
        };

        let start = frame.playhead_position;
        let end = start.checked_add(length - 1).ok_or_else(|| {
            Error::LegacyFormat(format!(
                "frame at playhead {} with length {} overflows",
                start, length
            ))
        })?;
        let mut converted = Frame::new(start, end);
        converted.sound_asset = frame
            .audio_asset_uuid
            .as_deref()
            .and_then(|uuid| self.sound_asset(uuid, start));
        converted.scripts = convert_script(frame.wick_script.as_deref(), self.script_policy);

        for object in &frame.wick_objects {
            self.place(object, &mut converted)?;
        }

        for tween in &frame.tweens {
            converted.tweens.push(convert_tween(tween)?);
        }

        Ok(converted)
    }

    /// Convert one frame child and add it to `frame`
    fn place(&mut self, object: &LegacyObject, frame: &mut Frame) -> Result<()> {
        let node = object.classify().ok_or_else(|| Error::UnrecognizedNode {
            uuid: object.display_id(),
            description: "object is not a path, text, image, clip, group or button".to_string(),
        })?;

        tracing::trace!(object = %object.display_id(), kind = node.kind_name(), "Converting node");

        match node {
            LegacyNode::Path { markup } => {
                let json = self.vector.import_path(markup)?;
                frame.add_path(Path::new(PathType::Path, json));
            }
            LegacyNode::Text(text) => {
                let json = self.vector.layout_text(text)?;
                frame.add_path(Path::new(PathType::Text, json));
            }
            LegacyNode::Image { asset } => {
                let instance = self.image(object, asset)?;
                frame.add_path(instance);
            }
            LegacyNode::Clip => {
                let clip = self.clip(object)?;
                frame.add_clip(clip);
            }
            LegacyNode::Button => {
                let button = self.clip(object)?.into_button();
                frame.add_clip(button);
            }
        }
        Ok(())
    }

    fn image(&self, object: &LegacyObject, asset: &str) -> Result<Path> {
        let missing = || Error::MissingAsset {
            node: object.display_id(),
            asset: asset.to_string(),
        };
        let id = Uuid::parse_str(asset).map_err(|_| missing())?;
        self.find_asset(id)
            .and_then(Asset::create_instance)
            .ok_or_else(missing)
    }

    fn sound_asset(&mut self, uuid: &str, start: i64) -> Option<ObjectId> {
        let found = Uuid::parse_str(uuid)
            .ok()
            .filter(|id| matches!(self.find_asset(*id), Some(a) if a.kind == AssetKind::Sound));
        if found.is_none() {
            tracing::warn!(asset = %uuid, start, "Frame sound refers to unknown asset");
            self.warnings.push(format!(
                "frame at playhead {} refers to missing sound asset {}, dropped",
                start, uuid
            ));
        }
        found
    }

    fn find_asset(&self, id: ObjectId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }
}

/// Legacy tween playheads are 1-based, current ones 0-based
fn convert_tween(tween: &LegacyTween) -> Result<Tween> {
    let playhead = tween.playhead_position.checked_sub(1).ok_or_else(|| {
        Error::LegacyFormat(format!(
            "tween playhead {} out of range",
            tween.playhead_position
        ))
    })?;
    let mut converted = Tween::new(playhead);
    converted.full_rotations = tween.rotations;
    converted.transform = Transform {
        x: tween.x,
        y: tween.y,
        scale_x: tween.scale_x,
        scale_y: tween.scale_y,
        rotation: tween.rotation,
        opacity: tween.opacity,
    };
    Ok(converted)
}

fn transform_of(object: &LegacyObject) -> Transform {
    Transform {
        x: object.x,
        y: object.y,
        scale_x: object.scale_x,
        scale_y: object.scale_y,
        rotation: object.rotation,
        opacity: object.opacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClipKind;

    const IMAGE_ID: &str = "6f1d3c0e-8b4a-4e57-9d1e-2b7c4a0f9e11";

    fn legacy(json: serde_json::Value) -> LegacyProject {
        serde_json::from_value(json).unwrap()
    }

    fn root_frame(project: &Project) -> &Frame {
        &project.root.layers[0].frames[0]
    }

    #[test]
    fn test_empty_project() {
        let conversion = LegacyConverter::default()
            .convert(&LegacyProject::default())
            .unwrap();
        let project = conversion.project;

        assert_eq!(project.name, "New Project");
        assert_eq!(project.focus, project.root.id);
        assert!(project.root.layers.is_empty());
        assert!(project.root.scripts.is_empty());
        assert!(conversion.warnings.is_empty());
    }

    #[test]
    fn test_project_attributes_copied() {
        let project = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "name": "Attrs",
                "width": 640,
                "height": 360,
                "framerate": 24,
                "backgroundColor": "#123456"
            })))
            .unwrap()
            .project;

        assert_eq!(project.name, "Attrs");
        assert_eq!((project.width, project.height, project.framerate), (640, 360, 24));
        assert_eq!(project.background_color, "#123456");
    }

    #[test]
    fn test_frame_interval_and_tween_shift() {
        let project = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": {
                    "layers": [{
                        "name": "L",
                        "locked": true,
                        "frames": [{
                            "playheadPosition": 5,
                            "length": 3,
                            "tweens": [{ "playheadPosition": 4, "rotations": 2, "x": 10 }]
                        }]
                    }]
                }
            })))
            .unwrap()
            .project;

        let layer = &project.root.layers[0];
        assert_eq!(layer.name, "L");
        assert!(layer.locked);
        let frame = root_frame(&project);
        assert_eq!((frame.start, frame.end), (5, 7));
        assert_eq!(frame.tweens[0].playhead_position, 3);
        assert_eq!(frame.tweens[0].full_rotations, 2);
        assert_eq!(frame.tweens[0].transform.x, 10.0);
    }

    #[test]
    fn test_non_positive_frame_length_is_clamped() {
        let conversion = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [{ "playheadPosition": 2, "length": 0 }] }] }
            })))
            .unwrap();

        let frame = root_frame(&conversion.project);
        assert_eq!((frame.start, frame.end), (2, 2));
        assert_eq!(conversion.warnings.len(), 1);
    }

    #[test]
    fn test_out_of_range_playheads_are_rejected() {
        let err = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [
                    { "playheadPosition": i64::MAX, "length": 2 }
                ]}]}
            })))
            .unwrap_err();
        assert!(matches!(err, Error::LegacyFormat(_)));

        let err = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [{
                    "playheadPosition": 1,
                    "tweens": [{ "playheadPosition": i64::MIN }]
                }]}]}
            })))
            .unwrap_err();
        assert!(matches!(err, Error::LegacyFormat(_)));

        // A single-frame span at the very end still fits
        let conversion = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [{ "playheadPosition": i64::MAX }] }] }
            })))
            .unwrap();
        let frame = root_frame(&conversion.project);
        assert_eq!((frame.start, frame.end), (i64::MAX, i64::MAX));
    }

    #[test]
    fn test_button_and_group() {
        let project = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [{ "wickObjects": [
                    { "name": "btn", "isSymbol": true, "isButton": true, "x": 3, "wickScript": "play();" },
                    { "isGroup": true, "layers": [{ "frames": [{}] }] }
                ]}]}]}
            })))
            .unwrap()
            .project;

        let clips = &root_frame(&project).clips;
        assert_eq!(clips[0].kind, ClipKind::Button);
        assert_eq!(clips[0].identifier.as_deref(), Some("btn"));
        assert_eq!(clips[0].transform.x, 3.0);
        assert_eq!(clips[0].scripts[0].name, "load");
        assert_eq!(clips[0].scripts[0].src, "play();");
        assert_eq!(clips[1].kind, ClipKind::Clip);
        assert_eq!(clips[1].layers[0].frames.len(), 1);
    }

    #[test]
    fn test_split_scripts_policy() {
        let config = ConverterConfig {
            script_policy: ScriptPolicy::SplitEvents,
        };
        let project = LegacyConverter::new(&config)
            .convert(&legacy(serde_json::json!({
                "rootObject": { "wickScript": "function update() {\n  step();\n}" }
            })))
            .unwrap()
            .project;

        assert_eq!(project.root.scripts.len(), 1);
        assert_eq!(project.root.scripts[0].name, "update");
        assert_eq!(project.root.scripts[0].src, "step();");
    }

    #[test]
    fn test_image_uses_converted_asset() {
        let conversion = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "library": { "assets": {
                    IMAGE_ID: { "uuid": IMAGE_ID, "type": "image", "filename": "cat.png", "data": "data:image/png;base64,AA" }
                }},
                "rootObject": { "layers": [{ "frames": [{ "wickObjects": [{ "assetUUID": IMAGE_ID }] }] }] }
            })))
            .unwrap();

        let project = conversion.project;
        let asset_id = Uuid::parse_str(IMAGE_ID).unwrap();
        assert_eq!(project.assets[0].id, asset_id);
        assert_eq!(project.assets[0].src.as_deref(), Some("data:image/png;base64,AA"));
        let image = &root_frame(&project).paths[0];
        assert_eq!(image.path_type, PathType::Image);
        assert_eq!(image.asset, Some(asset_id));
    }

    #[test]
    fn test_missing_image_asset_fails() {
        let err = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [{ "wickObjects": [{ "assetUUID": IMAGE_ID }] }] }] }
            })))
            .unwrap_err();
        assert!(matches!(err, Error::MissingAsset { .. }));
    }

    #[test]
    fn test_assets_keep_library_order() {
        let raw = br#"{"library": {"assets": {
            "f0e1d2c3-0000-4000-8000-000000000003": {"type": "image", "filename": "c.png"},
            "00000000-0000-4000-8000-000000000001": {"type": "font", "filename": "a.ttf"},
            "80000000-0000-4000-8000-000000000002": {"type": "audio", "filename": "b.wav"}
        }}}"#;
        let legacy = JsonDecoder.decode(raw).unwrap();
        let conversion = LegacyConverter::default().convert(&legacy).unwrap();

        let filenames: Vec<&str> = conversion
            .project
            .assets
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        assert_eq!(filenames, vec!["c.png", "b.wav"]);
        assert_eq!(conversion.warnings.len(), 1);
    }

    #[test]
    fn test_image_on_sound_asset_fails() {
        let err = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "library": { "assets": {
                    IMAGE_ID: { "uuid": IMAGE_ID, "type": "audio", "filename": "a.wav" }
                }},
                "rootObject": { "layers": [{ "frames": [{ "wickObjects": [{ "assetUUID": IMAGE_ID }] }] }] }
            })))
            .unwrap_err();
        assert!(matches!(err, Error::MissingAsset { .. }));
    }

    #[test]
    fn test_unsupported_asset_is_skipped() {
        let conversion = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "library": { "assets": {
                    "x": { "type": "font", "filename": "comic.ttf" }
                }}
            })))
            .unwrap();

        assert!(conversion.project.assets.is_empty());
        assert_eq!(conversion.warnings.len(), 1);
        assert!(conversion.warnings[0].contains("font"));
    }

    #[test]
    fn test_unknown_frame_sound_is_dropped() {
        let conversion = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [{ "audioAssetUUID": IMAGE_ID }] }] }
            })))
            .unwrap();

        assert!(root_frame(&conversion.project).sound_asset.is_none());
        assert_eq!(conversion.warnings.len(), 1);
    }

    #[test]
    fn test_unrecognized_node_fails() {
        let err = LegacyConverter::default()
            .convert(&legacy(serde_json::json!({
                "rootObject": { "layers": [{ "frames": [{ "wickObjects": [{ "uuid": "mystery" }] }] }] }
            })))
            .unwrap_err();

        match err {
            Error::UnrecognizedNode { uuid, .. } => assert_eq!(uuid, "mystery"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_convert_file_names_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Rocket-2018-06-01.wick");
        std::fs::write(&path, r#"{"name": "ignored"}"#).unwrap();

        let conversion = LegacyConverter::default().convert_file(&path).unwrap();
        assert_eq!(conversion.project.name, "Rocket");
    }
}
