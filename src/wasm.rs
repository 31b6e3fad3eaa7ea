//! WASM bindings for level-converter.
//!
//! This module provides JavaScript-friendly APIs for use in the browser.

use crate::chunk::codec;
use crate::scene::Attach;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the browser console
    console_error_panic_hook::set_once();
}

/// Converter configuration options.
#[wasm_bindgen]
pub struct ConvertOptions {
    high_precision_uv: bool,
    share_attaches: bool,
    recompute_bounds: bool,
    name_suffix: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl ConvertOptions {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ConvertOptions {
        ConvertOptions {
            high_precision_uv: false,
            share_attaches: true,
            recompute_bounds: false,
            name_suffix: None,
        }
    }

    #[wasm_bindgen(setter)]
    pub fn set_high_precision_uv(&mut self, value: bool) {
        self.high_precision_uv = value;
    }

    #[wasm_bindgen(setter)]
    pub fn set_share_attaches(&mut self, value: bool) {
        self.share_attaches = value;
    }

    #[wasm_bindgen(setter)]
    pub fn set_recompute_bounds(&mut self, value: bool) {
        self.recompute_bounds = value;
    }

    #[wasm_bindgen(setter)]
    pub fn set_name_suffix(&mut self, value: String) {
        self.name_suffix = Some(value);
    }

    fn to_config(&self) -> crate::ConverterConfig {
        let precision = if self.high_precision_uv {
            crate::UvPrecision::High
        } else {
            crate::UvPrecision::Normal
        };
        let mut config = crate::ConverterConfig::default()
            .with_uv_precision(precision)
            .with_shared_attaches(self.share_attaches)
            .with_recompute_bounds(self.recompute_bounds);
        if let Some(suffix) = &self.name_suffix {
            config = config.with_name_suffix(suffix.clone());
        }
        config
    }
}

/// Converted level plus summary numbers.
#[wasm_bindgen]
pub struct ConvertResult {
    json: String,
    entry_count: usize,
    vertex_count: usize,
    chunk_bytes: usize,
}

#[wasm_bindgen]
impl ConvertResult {
    /// Get the converted level as JSON.
    #[wasm_bindgen(getter)]
    pub fn json(&self) -> String {
        self.json.clone()
    }

    /// Get the number of geometry entries in the converted level.
    #[wasm_bindgen(getter)]
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Get the total vertex count across all attaches.
    #[wasm_bindgen(getter)]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Get the encoded size of all chunk attaches, in bytes.
    #[wasm_bindgen(getter)]
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    /// Get the geometry entry names as a JS array.
    pub fn entry_names(&self) -> Result<js_sys::Array, JsError> {
        let level = crate::LevelScene::from_json(&self.json)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(level
            .geometry
            .iter()
            .map(|entry| {
                let name = entry.model.as_ref().map(|m| m.name.as_str()).unwrap_or("");
                JsValue::from_str(name)
            })
            .collect())
    }
}

/// Convert a level given as JSON and return the converted level.
///
/// JSON format:
/// ```json
/// {
///   "format": "basic",
///   "geometry": [
///     { "surface_flags": 2147483649, "model": { "name": "floor", "attach": { "kind": "basic", ... } } }
///   ]
/// }
/// ```
#[wasm_bindgen(js_name = convertLevelJson)]
pub fn convert_level_json(
    json: &str,
    options: Option<ConvertOptions>,
) -> Result<ConvertResult, JsError> {
    let level = crate::LevelScene::from_json(json)
        .map_err(|e| JsError::new(&format!("Invalid JSON: {}", e)))?;

    let options = options.unwrap_or_default();
    let converted = crate::convert_level(&level, options.to_config())
        .map_err(|e| JsError::new(&e.to_string()))?;

    let mut vertex_count = 0;
    let mut chunk_bytes = 0;
    for attach in converted.geometry.iter().filter_map(|entry| entry.attach()) {
        match attach {
            Attach::Basic(basic) => vertex_count += basic.vertices.len(),
            Attach::Chunk(chunk) => {
                vertex_count += chunk.vertex_count();
                chunk_bytes += codec::write_vertex_chunks(&chunk.vertex)
                    .map_err(|e| JsError::new(&e.to_string()))?
                    .len();
                chunk_bytes += codec::write_poly_chunks(&chunk.poly)
                    .map_err(|e| JsError::new(&e.to_string()))?
                    .len();
            }
        }
    }

    let json = converted
        .to_json()
        .map_err(|e| JsError::new(&e.to_string()))?;

    Ok(ConvertResult {
        json,
        entry_count: converted.geometry.len(),
        vertex_count,
        chunk_bytes,
    })
}
