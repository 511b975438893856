//! Flat serialized form of the project model
//!
//! Every object serializes to one [`ObjectRecord`] tagged by `classname`.
//! Records reference their children by id, so a whole project flattens to a
//! [`ProjectRecord`] plus a list of object records.
//!
//! Reconstruction runs in two passes: all object records are interned into
//! an [`ObjectCache`] first, then the project is built top-down by resolving
//! ids against the cache. Every object must be owned by exactly one parent.

use super::{
    Asset, AssetKind, Clip, ClipKind, Frame, Layer, ObjectId, Path, PathType, Project, Script,
    Transform, Tween,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Version of the current project format written into project metadata
pub const FORMAT_VERSION: &str = "1.0";

// ============================================
// Record types
// ============================================

/// Project-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub last_modified: DateTime<Utc>,
    pub format_version: String,
}

/// Serialized project node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub uuid: ObjectId,
    pub name: String,
    pub background_color: String,
    pub framerate: u32,
    pub width: u32,
    pub height: u32,
    pub metadata: ProjectMetadata,
    pub assets: Vec<ObjectId>,
    pub root: ObjectId,
    pub focus: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRecord {
    pub uuid: ObjectId,
    pub identifier: Option<String>,
    pub transform: Transform,
    #[serde(default)]
    pub scripts: Vec<Script>,
    pub layers: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRecord {
    pub uuid: ObjectId,
    pub name: String,
    pub locked: bool,
    pub hidden: bool,
    pub frames: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub uuid: ObjectId,
    pub start: i64,
    pub end: i64,
    pub sound_asset: Option<ObjectId>,
    #[serde(default)]
    pub scripts: Vec<Script>,
    pub paths: Vec<ObjectId>,
    pub clips: Vec<ObjectId>,
    pub tweens: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    pub uuid: ObjectId,
    pub path_type: PathType,
    pub asset: Option<ObjectId>,
    pub json: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweenRecord {
    pub uuid: ObjectId,
    pub playhead_position: i64,
    pub full_rotations: i64,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub uuid: ObjectId,
    pub filename: String,
}

/// A serialized object, tagged by class name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "classname")]
pub enum ObjectRecord {
    Clip(ClipRecord),
    Button(ClipRecord),
    Layer(LayerRecord),
    Frame(FrameRecord),
    Path(PathRecord),
    Tween(TweenRecord),
    ImageAsset(AssetRecord),
    SoundAsset(AssetRecord),
}

impl ObjectRecord {
    pub fn id(&self) -> ObjectId {
        match self {
            ObjectRecord::Clip(r) | ObjectRecord::Button(r) => r.uuid,
            ObjectRecord::Layer(r) => r.uuid,
            ObjectRecord::Frame(r) => r.uuid,
            ObjectRecord::Path(r) => r.uuid,
            ObjectRecord::Tween(r) => r.uuid,
            ObjectRecord::ImageAsset(r) | ObjectRecord::SoundAsset(r) => r.uuid,
        }
    }

    pub fn classname(&self) -> &'static str {
        match self {
            ObjectRecord::Clip(_) => "Clip",
            ObjectRecord::Button(_) => "Button",
            ObjectRecord::Layer(_) => "Layer",
            ObjectRecord::Frame(_) => "Frame",
            ObjectRecord::Path(_) => "Path",
            ObjectRecord::Tween(_) => "Tween",
            ObjectRecord::ImageAsset(_) => "ImageAsset",
            ObjectRecord::SoundAsset(_) => "SoundAsset",
        }
    }
}

/// A project flattened into its project record and every owned object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub project: ProjectRecord,
    pub objects: Vec<ObjectRecord>,
}

// ============================================
// Serialization
// ============================================

impl Asset {
    pub fn to_record(&self) -> ObjectRecord {
        let record = AssetRecord {
            uuid: self.id,
            filename: self.filename.clone(),
        };
        match self.kind {
            AssetKind::Image => ObjectRecord::ImageAsset(record),
            AssetKind::Sound => ObjectRecord::SoundAsset(record),
        }
    }
}

impl Project {
    /// Flatten the project and everything it owns.
    ///
    /// Objects are emitted assets first, then the root clip depth-first.
    pub fn serialize(&self) -> ProjectData {
        let mut objects = Vec::new();
        for asset in &self.assets {
            objects.push(asset.to_record());
        }
        flatten_clip(&self.root, &mut objects);

        ProjectData {
            project: ProjectRecord {
                uuid: self.id,
                name: self.name.clone(),
                background_color: self.background_color.clone(),
                framerate: self.framerate,
                width: self.width,
                height: self.height,
                metadata: ProjectMetadata {
                    last_modified: self.last_modified,
                    format_version: FORMAT_VERSION.to_string(),
                },
                assets: self.assets.iter().map(|a| a.id).collect(),
                root: self.root.id,
                focus: self.focus,
            },
            objects,
        }
    }

    /// Rebuild a project from its flattened form.
    ///
    /// Asset payloads are not part of the records; callers resolve them
    /// through a file cache afterwards.
    pub fn from_data(data: &ProjectData) -> Result<Project> {
        let cache = ObjectCache::from_records(data.objects.iter().cloned())?;
        cache.build_project(&data.project)
    }
}

fn flatten_clip(clip: &Clip, out: &mut Vec<ObjectRecord>) {
    let record = ClipRecord {
        uuid: clip.id,
        identifier: clip.identifier.clone(),
        transform: clip.transform,
        scripts: clip.scripts.clone(),
        layers: clip.layers.iter().map(|l| l.id).collect(),
    };
    out.push(match clip.kind {
        ClipKind::Clip => ObjectRecord::Clip(record),
        ClipKind::Button => ObjectRecord::Button(record),
    });

    for layer in &clip.layers {
        out.push(ObjectRecord::Layer(LayerRecord {
            uuid: layer.id,
            name: layer.name.clone(),
            locked: layer.locked,
            hidden: layer.hidden,
            frames: layer.frames.iter().map(|f| f.id).collect(),
        }));

        for frame in &layer.frames {
            out.push(ObjectRecord::Frame(FrameRecord {
                uuid: frame.id,
                start: frame.start,
                end: frame.end,
                sound_asset: frame.sound_asset,
                scripts: frame.scripts.clone(),
                paths: frame.paths.iter().map(|p| p.id).collect(),
                clips: frame.clips.iter().map(|c| c.id).collect(),
                tweens: frame.tweens.iter().map(|t| t.id).collect(),
            }));

            for path in &frame.paths {
                out.push(ObjectRecord::Path(PathRecord {
                    uuid: path.id,
                    path_type: path.path_type,
                    asset: path.asset,
                    json: path.json.clone(),
                }));
            }
            for tween in &frame.tweens {
                out.push(ObjectRecord::Tween(TweenRecord {
                    uuid: tween.id,
                    playhead_position: tween.playhead_position,
                    full_rotations: tween.full_rotations,
                    transform: tween.transform,
                }));
            }
            for child in &frame.clips {
                flatten_clip(child, out);
            }
        }
    }
}

// ============================================
// Object cache
// ============================================

/// Interned records, keyed by object id.
#[derive(Debug, Default)]
pub struct ObjectCache {
    records: HashMap<ObjectId, ObjectRecord>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a batch of records; duplicate ids are rejected
    pub fn from_records(records: impl IntoIterator<Item = ObjectRecord>) -> Result<Self> {
        let mut cache = Self::new();
        for record in records {
            cache.insert(record)?;
        }
        Ok(cache)
    }

    pub fn insert(&mut self, record: ObjectRecord) -> Result<()> {
        let id = record.id();
        if let Some(existing) = self.records.get(&id) {
            return Err(Error::Corrupt {
                id,
                message: format!(
                    "duplicate record ({} and {})",
                    existing.classname(),
                    record.classname()
                ),
            });
        }
        self.records.insert(id, record);
        Ok(())
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Build the project node, resolving every referenced object
    pub fn build_project(&self, record: &ProjectRecord) -> Result<Project> {
        let mut resolver = Resolver {
            cache: self,
            claimed: HashSet::new(),
        };
        let project = resolver.project(record)?;

        let unreferenced = self.records.len() - resolver.claimed.len();
        if unreferenced > 0 {
            tracing::debug!(
                project = %record.uuid,
                unreferenced,
                "Ignoring records not reachable from project"
            );
        }
        Ok(project)
    }
}

/// Walks records top-down, claiming each id exactly once.
struct Resolver<'a> {
    cache: &'a ObjectCache,
    claimed: HashSet<ObjectId>,
}

impl<'a> Resolver<'a> {
    fn claim(&mut self, id: ObjectId, referenced_by: ObjectId) -> Result<&'a ObjectRecord> {
        let cache = self.cache;
        let record = cache.get(id).ok_or_else(|| Error::MissingObject {
            id,
            referenced_by: referenced_by.to_string(),
        })?;
        if !self.claimed.insert(id) {
            return Err(Error::Corrupt {
                id,
                message: "object is referenced more than once".to_string(),
            });
        }
        Ok(record)
    }

    fn project(&mut self, record: &ProjectRecord) -> Result<Project> {
        let mut assets = Vec::with_capacity(record.assets.len());
        for &id in &record.assets {
            let asset = match self.claim(id, record.uuid)? {
                ObjectRecord::ImageAsset(r) => (AssetKind::Image, r),
                ObjectRecord::SoundAsset(r) => (AssetKind::Sound, r),
                other => return Err(wrong_class(id, "asset", other)),
            };
            assets.push(Asset {
                id,
                kind: asset.0,
                filename: asset.1.filename.clone(),
                src: None,
            });
        }

        let root = self.clip(record.root, record.uuid)?;

        Ok(Project {
            id: record.uuid,
            name: record.name.clone(),
            background_color: record.background_color.clone(),
            framerate: record.framerate,
            width: record.width,
            height: record.height,
            last_modified: record.metadata.last_modified,
            assets,
            root,
            focus: record.focus,
        })
    }

    fn clip(&mut self, id: ObjectId, parent: ObjectId) -> Result<Clip> {
        let (kind, record) = match self.claim(id, parent)? {
            ObjectRecord::Clip(r) => (ClipKind::Clip, r.clone()),
            ObjectRecord::Button(r) => (ClipKind::Button, r.clone()),
            other => return Err(wrong_class(id, "clip", other)),
        };

        let mut layers = Vec::with_capacity(record.layers.len());
        for &layer_id in &record.layers {
            layers.push(self.layer(layer_id, id)?);
        }

        Ok(Clip {
            id,
            kind,
            identifier: record.identifier,
            transform: record.transform,
            scripts: record.scripts,
            layers,
        })
    }

    fn layer(&mut self, id: ObjectId, parent: ObjectId) -> Result<Layer> {
        let record = match self.claim(id, parent)? {
            ObjectRecord::Layer(r) => r.clone(),
            other => return Err(wrong_class(id, "layer", other)),
        };

        let mut frames = Vec::with_capacity(record.frames.len());
        for &frame_id in &record.frames {
            frames.push(self.frame(frame_id, id)?);
        }

        Ok(Layer {
            id,
            name: record.name,
            locked: record.locked,
            hidden: record.hidden,
            frames,
        })
    }

    fn frame(&mut self, id: ObjectId, parent: ObjectId) -> Result<Frame> {
        let record = match self.claim(id, parent)? {
            ObjectRecord::Frame(r) => r.clone(),
            other => return Err(wrong_class(id, "frame", other)),
        };

        let mut paths = Vec::with_capacity(record.paths.len());
        for &path_id in &record.paths {
            match self.claim(path_id, id)? {
                ObjectRecord::Path(r) => paths.push(Path {
                    id: path_id,
                    path_type: r.path_type,
                    asset: r.asset,
                    json: r.json.clone(),
                }),
                other => return Err(wrong_class(path_id, "path", other)),
            }
        }

        let mut tweens = Vec::with_capacity(record.tweens.len());
        for &tween_id in &record.tweens {
            match self.claim(tween_id, id)? {
                ObjectRecord::Tween(r) => tweens.push(Tween {
                    id: tween_id,
                    playhead_position: r.playhead_position,
                    full_rotations: r.full_rotations,
                    transform: r.transform,
                }),
                other => return Err(wrong_class(tween_id, "tween", other)),
            }
        }

        let mut clips = Vec::with_capacity(record.clips.len());
        for &clip_id in &record.clips {
            clips.push(self.clip(clip_id, id)?);
        }

        Ok(Frame {
            id,
            start: record.start,
            end: record.end,
            sound_asset: record.sound_asset,
            scripts: record.scripts,
            paths,
            clips,
            tweens,
        })
    }
}

fn wrong_class(id: ObjectId, expected: &str, found: &ObjectRecord) -> Error {
    Error::Corrupt {
        id,
        message: format!("expected {}, found {}", expected, found.classname()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::new_object_id;

    fn sample_project() -> Project {
        let mut project = Project::new("Records");
        let image = Asset::new(AssetKind::Image, "a.png", Some("data:image/png;base64,AA".into()));
        let instance = image.create_instance().unwrap();
        project.add_asset(image);
        project.add_asset(Asset::new(AssetKind::Sound, "b.mp3", None));

        let mut child = Clip::new();
        child.identifier = Some("ball".to_string());
        child.add_script("load", "stop();");
        let mut layer = Layer::new("inner");
        let mut inner = Frame::new(0, 3);
        inner.add_tween(Tween::new(2));
        layer.add_frame(inner);
        child.add_layer(layer);

        let frame = &mut project.root.layers[0].frames[0];
        frame.add_path(instance);
        frame.add_clip(child);
        project
    }

    #[test]
    fn test_serialize_then_rebuild_is_structurally_equal() {
        let mut project = sample_project();
        let data = project.serialize();
        let rebuilt = Project::from_data(&data).unwrap();

        assert_eq!(rebuilt.serialize(), data);

        // Payloads live in the file cache, not in records
        for asset in &mut project.assets {
            asset.src = None;
        }
        assert_eq!(rebuilt, project);
    }

    #[test]
    fn test_record_classname_tag() {
        let data = sample_project().serialize();
        let json = serde_json::to_value(&data.objects[0]).unwrap();
        assert_eq!(json["classname"], "ImageAsset");

        let parsed: ObjectRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, data.objects[0]);
    }

    #[test]
    fn test_missing_object_is_reported() {
        let mut data = sample_project().serialize();
        data.objects.retain(|r| !matches!(r, ObjectRecord::Tween(_)));

        let err = Project::from_data(&data).unwrap_err();
        assert!(matches!(err, Error::MissingObject { .. }));
    }

    #[test]
    fn test_duplicate_record_is_corrupt() {
        let mut data = sample_project().serialize();
        let first = data.objects[0].clone();
        data.objects.push(first);

        let err = Project::from_data(&data).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }

    #[test]
    fn test_shared_reference_is_corrupt() {
        let mut data = sample_project().serialize();
        let frame_id = data
            .objects
            .iter()
            .find_map(|r| match r {
                ObjectRecord::Frame(f) => Some(f.uuid),
                _ => None,
            })
            .unwrap();
        for record in &mut data.objects {
            if let ObjectRecord::Layer(layer) = record {
                layer.frames.push(frame_id);
                break;
            }
        }

        let err = Project::from_data(&data).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }

    #[test]
    fn test_wrong_class_is_corrupt() {
        let mut data = sample_project().serialize();
        data.project.root = data.project.assets[0];
        data.project.assets.remove(0);

        let err = Project::from_data(&data).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }

    #[test]
    fn test_unreachable_records_are_ignored() {
        let mut data = sample_project().serialize();
        data.objects.push(ObjectRecord::Tween(TweenRecord {
            uuid: new_object_id(),
            playhead_position: 0,
            full_rotations: 0,
            transform: Transform::default(),
        }));

        assert!(Project::from_data(&data).is_ok());
    }
}
