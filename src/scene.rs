//! Level scenes: geometry entries, their models and attaches.
//!
//! Scenes are persisted as JSON. Converting a scene flips its format: Basic
//! levels get their visible geometry rebuilt as chunk attaches, Chunk levels get
//! every chunk attach replaced in place by a basic one.

use crate::basic::BasicAttach;
use crate::chunk::ChunkAttach;
use crate::convert::{Converter, Stripifier};
use crate::error::Result;
use crate::types::{BoundingSphere, ModelTransform, SurfaceFlags};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Which engine representation a level uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelFormat {
    Basic,
    Chunk,
}

impl LevelFormat {
    /// The format a conversion produces.
    pub fn target(self) -> Self {
        match self {
            LevelFormat::Basic => LevelFormat::Chunk,
            LevelFormat::Chunk => LevelFormat::Basic,
        }
    }

    /// File extension for levels of this format.
    pub fn extension(self) -> &'static str {
        match self {
            LevelFormat::Basic => "sa1lvl",
            LevelFormat::Chunk => "sa2lvl",
        }
    }

    /// Output path for a converted level: the input path with this format's extension.
    pub fn output_path(self, input: &Path) -> PathBuf {
        input.with_extension(self.extension())
    }
}

/// Geometry payload in either representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Attach {
    Basic(BasicAttach),
    Chunk(ChunkAttach),
}

impl Attach {
    pub fn name(&self) -> &str {
        match self {
            Attach::Basic(basic) => &basic.name,
            Attach::Chunk(chunk) => &chunk.name,
        }
    }

    pub fn format(&self) -> LevelFormat {
        match self {
            Attach::Basic(_) => LevelFormat::Basic,
            Attach::Chunk(_) => LevelFormat::Chunk,
        }
    }
}

/// A named, placed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    pub name: String,
    #[serde(default)]
    pub transform: ModelTransform,
    #[serde(default)]
    pub attach: Option<Attach>,
}

/// One top-level geometry entry of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntry {
    #[serde(default)]
    pub bounds: BoundingSphere,
    #[serde(default)]
    pub surface_flags: SurfaceFlags,
    #[serde(default)]
    pub model: Option<ModelNode>,
}

impl GeoEntry {
    pub fn attach(&self) -> Option<&Attach> {
        self.model.as_ref()?.attach.as_ref()
    }
}

/// What a Basic→Chunk conversion does with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// No basic attach: copied unchanged.
    Passthrough,
    /// Converted to a visible-only chunk entry. With `keep_original` the source
    /// entry also stays, with its visible bit cleared.
    Convert { keep_original: bool },
    /// Basic collision entry without the visible bit.
    CollisionOnly,
    /// No flags at all.
    Drop,
}

impl Disposition {
    pub fn of(entry: &GeoEntry) -> Self {
        if !matches!(entry.attach(), Some(Attach::Basic(_))) {
            return Disposition::Passthrough;
        }
        let flags = entry.surface_flags;
        match (flags.is_visible(), flags.has_collision()) {
            (true, keep_original) => Disposition::Convert { keep_original },
            (false, true) => Disposition::CollisionOnly,
            (false, false) => Disposition::Drop,
        }
    }
}

/// A level: geometry entries plus animations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelScene {
    pub format: LevelFormat,
    #[serde(default)]
    pub geometry: Vec<GeoEntry>,
    /// Animated geometry, kept opaque. Conversion always clears it.
    #[serde(default)]
    pub animations: Vec<serde_json::Value>,
}

impl LevelScene {
    pub fn new(format: LevelFormat) -> Self {
        Self {
            format,
            geometry: Vec::new(),
            animations: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Convert every attach to the other format. Fails as a whole on the first
    /// attach that cannot be converted.
    pub fn convert<S: Stripifier>(&self, converter: &Converter<S>) -> Result<LevelScene> {
        let geometry = match self.format {
            LevelFormat::Basic => self.to_chunk_geometry(converter)?,
            LevelFormat::Chunk => self.to_basic_geometry(converter)?,
        };

        if !self.animations.is_empty() {
            log::info!("dropping {} animations", self.animations.len());
        }
        log::info!(
            "converted {} geometry entries into {} ({:?} -> {:?})",
            self.geometry.len(),
            geometry.len(),
            self.format,
            self.format.target()
        );

        Ok(LevelScene {
            format: self.format.target(),
            geometry,
            animations: Vec::new(),
        })
    }

    fn to_chunk_geometry<S: Stripifier>(&self, converter: &Converter<S>) -> Result<Vec<GeoEntry>> {
        let suffix = &converter.config().name_suffix;
        let share = converter.config().share_converted_attaches;
        let mut converted: HashMap<String, ChunkAttach> = HashMap::new();
        let mut geometry = Vec::with_capacity(self.geometry.len());

        for entry in &self.geometry {
            let keep_original = match Disposition::of(entry) {
                Disposition::Passthrough | Disposition::CollisionOnly => {
                    geometry.push(entry.clone());
                    continue;
                }
                Disposition::Drop => {
                    log::debug!("dropping entry without surface flags");
                    continue;
                }
                Disposition::Convert { keep_original } => keep_original,
            };
            let Some(model) = &entry.model else { continue };
            let Some(Attach::Basic(basic)) = &model.attach else { continue };

            let name = format!("{}{}", basic.name, suffix);
            let cached = if share { converted.get(&name).cloned() } else { None };
            let attach = match cached {
                Some(chunk) => chunk,
                None => {
                    let mut chunk = converter.to_chunk(basic)?;
                    chunk.name = name.clone();
                    if share {
                        converted.insert(name, chunk.clone());
                    }
                    chunk
                }
            };

            geometry.push(GeoEntry {
                bounds: entry.bounds,
                surface_flags: SurfaceFlags::VISIBLE,
                model: Some(ModelNode {
                    name: format!("{}{}", model.name, suffix),
                    transform: model.transform,
                    attach: Some(Attach::Chunk(attach)),
                }),
            });

            if keep_original {
                let mut original = entry.clone();
                original.surface_flags = entry.surface_flags.without(SurfaceFlags::VISIBLE);
                geometry.push(original);
            }
        }

        log::debug!("{} distinct attaches converted to chunk form", converted.len());
        Ok(geometry)
    }

    fn to_basic_geometry<S: Stripifier>(&self, converter: &Converter<S>) -> Result<Vec<GeoEntry>> {
        let share = converter.config().share_converted_attaches;
        let mut converted: HashMap<String, BasicAttach> = HashMap::new();
        let mut geometry = Vec::with_capacity(self.geometry.len());

        for entry in &self.geometry {
            let mut entry = entry.clone();
            if let Some(model) = entry.model.as_mut() {
                if let Some(Attach::Chunk(chunk)) = &model.attach {
                    let cached = if share { converted.get(&chunk.name).cloned() } else { None };
                    let basic = match cached {
                        Some(basic) => basic,
                        None => {
                            let basic = converter.to_basic(chunk)?;
                            if share {
                                converted.insert(chunk.name.clone(), basic.clone());
                            }
                            basic
                        }
                    };
                    model.attach = Some(Attach::Basic(basic));
                }
            }
            geometry.push(entry);
        }

        Ok(geometry)
    }
}
