//! Binary encoding of chunk streams.
//!
//! All values are little-endian.
//!
//! # Vertex stream
//! ```text
//! u8 type | u8 flags | u16 size (32-bit words) | u16 index_offset | u16 count
//! count * (f32x3 position [f32x3 normal] [u32 ARGB diffuse])
//! ...
//! 0xFF 0x00 0x0000                                 end chunk
//! ```
//!
//! # Poly stream
//! ```text
//! bits      (1-7):    u8 type | u8 flags
//! tiny      (8-15):   u8 type | u8 flags | u16 data
//! material  (16-31),
//! volume    (56-63),
//! strip     (64-127): u8 type | u8 flags | u16 size (16-bit words) | body
//! end       (255):    0xFF 0x00
//! ```
//!
//! Strip bodies start with `u16 count | user_flag_count << 14`, then each strip is
//! an `i16` length (negative when reversed) followed by one record per index:
//! `u16 index [i16x2 uv] [i16x2 uv2] [f32x3 normal] [u32 ARGB color]` and, from
//! the third index on, `user_flag_count` u16 user flags.

use super::{
    ids, ChunkCategory, ChunkStrip, MaterialChunk, PolyChunk, RawChunk, StripChunk,
    StripFlags, StripKind, TextureChunk, VertexChunk, VertexChunkKind,
};
use crate::basic::{AlphaInstruction, FilterMode};
use crate::error::{ConvertError, Result};
use crate::types::{Color, Uv, Vector3};

/// Encode vertex chunks followed by an end chunk.
pub fn write_vertex_chunks(chunks: &[VertexChunk]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for chunk in chunks {
        write_vertex_chunk(&mut buf, chunk)?;
    }
    buf.extend_from_slice(&[ids::END, 0, 0, 0]);
    Ok(buf)
}

/// Encode poly chunks followed by an end chunk.
pub fn write_poly_chunks(chunks: &[PolyChunk]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for chunk in chunks {
        write_poly_chunk(&mut buf, chunk)?;
    }
    buf.extend_from_slice(&[ids::END, 0]);
    Ok(buf)
}

/// Decode a vertex stream up to its end chunk.
pub fn read_vertex_chunks(data: &[u8]) -> Result<Vec<VertexChunk>> {
    let mut reader = Reader::new(data);
    let mut chunks = Vec::new();
    loop {
        let start = reader.pos;
        let type_id = reader.u8()?;
        let flags = reader.u8()?;
        let size = reader.u16()? as usize;
        if type_id == ids::END {
            return Ok(chunks);
        }

        let kind = VertexChunkKind::from_type_id(type_id).ok_or_else(|| {
            reader.error_at(start, format!("unsupported vertex chunk type {}", type_id))
        })?;
        let index_offset = reader.u16()?;
        let count = reader.u16()? as usize;
        if size != count * kind.stride_words() + 1 {
            return Err(reader.error_at(
                start,
                format!("vertex chunk size {} does not match {} vertices", size, count),
            ));
        }

        let mut chunk = VertexChunk::new(kind);
        chunk.flags = flags;
        chunk.index_offset = index_offset;
        for _ in 0..count {
            chunk.vertices.push(reader.vector3()?);
            if kind.has_normal() {
                chunk.normals.push(reader.vector3()?);
            }
            if kind.has_diffuse() {
                chunk.diffuse.push(Color::from_argb(reader.u32()?));
            }
        }
        chunks.push(chunk);
    }
}

/// Decode a poly stream up to its end chunk.
pub fn read_poly_chunks(data: &[u8]) -> Result<Vec<PolyChunk>> {
    let mut reader = Reader::new(data);
    let mut chunks = Vec::new();
    loop {
        let start = reader.pos;
        let type_id = reader.u8()?;
        let flags = reader.u8()?;
        let chunk = match ChunkCategory::of(type_id) {
            ChunkCategory::End => return Ok(chunks),
            ChunkCategory::Null => PolyChunk::Raw(RawChunk {
                type_id,
                flags,
                body: Vec::new(),
            }),
            ChunkCategory::Bits => read_bits(type_id, flags),
            ChunkCategory::Tiny => {
                let data = reader.u16()?;
                read_tiny(type_id, flags, data)
            }
            ChunkCategory::Material | ChunkCategory::Volume | ChunkCategory::Strip => {
                let size = reader.u16()? as usize;
                let body = reader.bytes(size * 2)?;
                read_sized(type_id, flags, body, reader.pos - body.len())?
            }
            ChunkCategory::Vertex | ChunkCategory::Reserved => {
                return Err(reader.error_at(
                    start,
                    format!("chunk type {} cannot appear in a poly stream", type_id),
                ));
            }
        };
        chunks.push(chunk);
    }
}

fn write_vertex_chunk(buf: &mut Vec<u8>, chunk: &VertexChunk) -> Result<()> {
    let count = chunk.vertex_count();
    let kind = chunk.kind;
    if kind.has_normal() && chunk.normals.len() != count {
        let reason = format!("{} normals for {} vertices", chunk.normals.len(), count);
        return Err(encode_error(buf, reason));
    }
    if kind.has_diffuse() && chunk.diffuse.len() != count {
        let reason = format!("{} colors for {} vertices", chunk.diffuse.len(), count);
        return Err(encode_error(buf, reason));
    }
    let size = u16::try_from(chunk.size_words())
        .map_err(|_| encode_error(buf, format!("{} vertices do not fit one chunk", count)))?;

    buf.push(kind.type_id());
    buf.push(chunk.flags);
    write_u16(buf, size);
    write_u16(buf, chunk.index_offset);
    write_u16(buf, count as u16);
    for i in 0..count {
        write_vector3(buf, chunk.vertices[i]);
        if kind.has_normal() {
            write_vector3(buf, chunk.normals[i]);
        }
        if kind.has_diffuse() {
            write_u32(buf, chunk.diffuse[i].to_argb());
        }
    }
    Ok(())
}

fn write_poly_chunk(buf: &mut Vec<u8>, chunk: &PolyChunk) -> Result<()> {
    let type_id = chunk.type_id();
    match chunk {
        PolyChunk::BlendAlpha {
            source,
            destination,
        } => {
            buf.push(type_id);
            buf.push(source.bits() << 3 | destination.bits());
        }
        PolyChunk::MipmapDAdjust { value } => {
            buf.push(type_id);
            buf.push(value & 0x0F);
        }
        PolyChunk::SpecularExponent { exponent } => {
            buf.push(type_id);
            buf.push(exponent & 0x1F);
        }
        PolyChunk::CachePolygonList { list } | PolyChunk::DrawPolygonList { list } => {
            buf.push(type_id);
            buf.push(*list);
        }
        PolyChunk::Texture(texture) => {
            buf.push(type_id);
            buf.push(texture_flags(texture));
            write_u16(buf, texture_data(texture));
        }
        PolyChunk::Material(material) => {
            let mut body = Vec::with_capacity(12);
            for color in [material.diffuse, material.ambient].into_iter().flatten() {
                write_u32(&mut body, color.to_argb());
            }
            if let Some(specular) = material.specular {
                let packed = Color { a: material.specular_exponent, ..specular };
                write_u32(&mut body, packed.to_argb());
            }
            let flags = material.source_alpha.bits() << 3 | material.destination_alpha.bits();
            write_sized(buf, type_id, flags, &body)?;
        }
        PolyChunk::Strip(strip) => {
            let body = strip_body(buf.len(), strip)?;
            write_sized(buf, type_id, strip.flags.0, &body)?;
        }
        PolyChunk::Raw(raw) => match raw.category() {
            ChunkCategory::Null | ChunkCategory::Bits => {
                buf.push(type_id);
                buf.push(raw.flags);
            }
            ChunkCategory::Tiny if raw.body.len() == 2 => {
                buf.push(type_id);
                buf.push(raw.flags);
                buf.extend_from_slice(&raw.body);
            }
            ChunkCategory::Material | ChunkCategory::Volume | ChunkCategory::Strip => {
                write_sized(buf, type_id, raw.flags, &raw.body)?;
            }
            _ => {
                return Err(encode_error(
                    buf,
                    format!("raw chunk type {} has no poly stream layout", type_id),
                ));
            }
        },
    }
    Ok(())
}

fn strip_body(offset: usize, strip: &StripChunk) -> Result<Vec<u8>> {
    let kind = strip.kind;
    let fail = |reason: String| ConvertError::Codec { offset, reason };
    if strip.strips.len() > 0x3FFF || strip.user_flag_count > 3 {
        return Err(fail(format!(
            "{} strips with {} user flags cannot be encoded",
            strip.strips.len(),
            strip.user_flag_count
        )));
    }

    let mut body = Vec::new();
    write_u16(
        &mut body,
        strip.strips.len() as u16 | (strip.user_flag_count as u16) << 14,
    );
    for (n, s) in strip.strips.iter().enumerate() {
        let len = s.indices.len();
        let uvs = required(kind.has_uv(), &s.uvs, len)
            .ok_or_else(|| fail(format!("strip {} UVs do not match its indices", n)))?;
        let uvs2 = required(kind.has_second_uv(), &s.uvs2, len)
            .ok_or_else(|| fail(format!("strip {} second UVs do not match its indices", n)))?;
        let normals = required(kind.has_normal(), &s.normals, len)
            .ok_or_else(|| fail(format!("strip {} normals do not match its indices", n)))?;
        let colors = required(kind.has_color(), &s.colors, len)
            .ok_or_else(|| fail(format!("strip {} colors do not match its indices", n)))?;
        let flag_count = strip.user_flag_count as usize * len.saturating_sub(2);
        if s.user_flags.len() != flag_count {
            return Err(fail(format!(
                "strip {} has {} user flags, expected {}",
                n,
                s.user_flags.len(),
                flag_count
            )));
        }
        let signed_len =
            i16::try_from(len).map_err(|_| fail(format!("strip {} is too long", n)))?;

        write_i16(&mut body, if s.reversed { -signed_len } else { signed_len });
        let range = kind.uv_range().unwrap_or(1.0);
        let mut user_flags = s.user_flags.iter();
        for i in 0..len {
            write_u16(&mut body, s.indices[i]);
            if let Some(uvs) = uvs {
                write_uv(&mut body, uvs[i], range);
            }
            if let Some(uvs2) = uvs2 {
                write_uv(&mut body, uvs2[i], range);
            }
            if let Some(normals) = normals {
                write_vector3(&mut body, normals[i]);
            }
            if let Some(colors) = colors {
                write_u32(&mut body, colors[i].to_argb());
            }
            if i >= 2 {
                for flag in user_flags.by_ref().take(strip.user_flag_count as usize) {
                    write_u16(&mut body, *flag);
                }
            }
        }
    }
    Ok(body)
}

/// `Some(Some(values))` when the attribute is wanted and present at the right
/// length, `Some(None)` when it is not wanted, `None` when it is wanted but unusable.
fn required<'a, T>(
    wanted: bool,
    values: &'a Option<Vec<T>>,
    len: usize,
) -> Option<Option<&'a [T]>> {
    if !wanted {
        return Some(None);
    }
    match values {
        Some(v) if v.len() == len => Some(Some(v.as_slice())),
        _ => None,
    }
}

fn read_bits(type_id: u8, flags: u8) -> PolyChunk {
    match type_id {
        ids::BITS_BLEND_ALPHA => PolyChunk::BlendAlpha {
            source: AlphaInstruction::from_bits(flags >> 3),
            destination: AlphaInstruction::from_bits(flags),
        },
        ids::BITS_MIPMAP_D_ADJUST => PolyChunk::MipmapDAdjust { value: flags & 0x0F },
        ids::BITS_SPECULAR_EXPONENT => PolyChunk::SpecularExponent { exponent: flags & 0x1F },
        ids::BITS_CACHE_POLYGON_LIST => PolyChunk::CachePolygonList { list: flags },
        ids::BITS_DRAW_POLYGON_LIST => PolyChunk::DrawPolygonList { list: flags },
        _ => PolyChunk::Raw(RawChunk {
            type_id,
            flags,
            body: Vec::new(),
        }),
    }
}

fn read_tiny(type_id: u8, flags: u8, data: u16) -> PolyChunk {
    match type_id {
        ids::TINY_TEXTURE_ID | ids::TINY_TEXTURE_ID2 => PolyChunk::Texture(TextureChunk {
            second: type_id == ids::TINY_TEXTURE_ID2,
            texture_id: data & 0x1FFF,
            mipmap_d_adjust: flags & 0x0F,
            clamp_v: flags & 0x10 != 0,
            clamp_u: flags & 0x20 != 0,
            flip_v: flags & 0x40 != 0,
            flip_u: flags & 0x80 != 0,
            super_sample: data & 0x2000 != 0,
            filter_mode: FilterMode::from_bits((data >> 14) as u8),
        }),
        _ => PolyChunk::Raw(RawChunk {
            type_id,
            flags,
            body: data.to_le_bytes().to_vec(),
        }),
    }
}

fn read_sized(type_id: u8, flags: u8, body: &[u8], offset: usize) -> Result<PolyChunk> {
    let raw = || {
        PolyChunk::Raw(RawChunk {
            type_id,
            flags,
            body: body.to_vec(),
        })
    };

    if ChunkCategory::of(type_id) == ChunkCategory::Material {
        let second = type_id >= ids::MATERIAL2;
        let mask = type_id & 0x07;
        if (second && mask == 0) || body.len() != mask.count_ones() as usize * 4 {
            return Ok(raw());
        }
        let mut reader = Reader::new(body);
        let mut chunk = MaterialChunk {
            second,
            source_alpha: AlphaInstruction::from_bits(flags >> 3),
            destination_alpha: AlphaInstruction::from_bits(flags),
            ..Default::default()
        };
        if mask & 1 != 0 {
            chunk.diffuse = Some(Color::from_argb(reader.u32()?));
        }
        if mask & 2 != 0 {
            chunk.ambient = Some(Color::from_argb(reader.u32()?));
        }
        if mask & 4 != 0 {
            let packed = Color::from_argb(reader.u32()?);
            chunk.specular_exponent = packed.a;
            chunk.specular = Some(Color { a: 0xFF, ..packed });
        }
        return Ok(PolyChunk::Material(chunk));
    }

    match StripKind::from_type_id(type_id) {
        Some(kind) => read_strip(kind, flags, body).map_err(|err| match err {
            ConvertError::Codec { offset: inner, reason } => ConvertError::Codec {
                offset: offset + inner,
                reason,
            },
            other => other,
        }),
        None => Ok(raw()),
    }
}

fn read_strip(kind: StripKind, flags: u8, body: &[u8]) -> Result<PolyChunk> {
    let mut reader = Reader::new(body);
    let header = reader.u16()?;
    let mut chunk = StripChunk::new(kind);
    chunk.flags = StripFlags(flags);
    chunk.user_flag_count = (header >> 14) as u8;
    let range = kind.uv_range().unwrap_or(1.0);

    for _ in 0..(header & 0x3FFF) {
        let signed_len = reader.i16()?;
        let len = signed_len.unsigned_abs() as usize;
        let mut strip = ChunkStrip::new(Vec::with_capacity(len), signed_len < 0);
        let mut uvs = kind.has_uv().then(Vec::new);
        let mut uvs2 = kind.has_second_uv().then(Vec::new);
        let mut normals = kind.has_normal().then(Vec::new);
        let mut colors = kind.has_color().then(Vec::new);
        for i in 0..len {
            strip.indices.push(reader.u16()?);
            if let Some(uvs) = uvs.as_mut() {
                uvs.push(reader.uv(range)?);
            }
            if let Some(uvs2) = uvs2.as_mut() {
                uvs2.push(reader.uv(range)?);
            }
            if let Some(normals) = normals.as_mut() {
                normals.push(reader.vector3()?);
            }
            if let Some(colors) = colors.as_mut() {
                colors.push(Color::from_argb(reader.u32()?));
            }
            if i >= 2 {
                for _ in 0..chunk.user_flag_count {
                    strip.user_flags.push(reader.u16()?);
                }
            }
        }
        strip.uvs = uvs;
        strip.uvs2 = uvs2;
        strip.normals = normals;
        strip.colors = colors;
        chunk.strips.push(strip);
    }
    Ok(PolyChunk::Strip(chunk))
}

fn texture_flags(texture: &TextureChunk) -> u8 {
    (texture.mipmap_d_adjust & 0x0F)
        | (texture.clamp_v as u8) << 4
        | (texture.clamp_u as u8) << 5
        | (texture.flip_v as u8) << 6
        | (texture.flip_u as u8) << 7
}

fn texture_data(texture: &TextureChunk) -> u16 {
    (texture.texture_id & 0x1FFF)
        | (texture.super_sample as u16) << 13
        | (texture.filter_mode.bits() as u16) << 14
}

fn write_sized(buf: &mut Vec<u8>, type_id: u8, flags: u8, body: &[u8]) -> Result<()> {
    if body.len() % 2 != 0 {
        return Err(encode_error(buf, format!("chunk {} body has odd length", type_id)));
    }
    let size = u16::try_from(body.len() / 2)
        .map_err(|_| encode_error(buf, format!("chunk {} body too large", type_id)))?;
    buf.push(type_id);
    buf.push(flags);
    write_u16(buf, size);
    buf.extend_from_slice(body);
    Ok(())
}

fn encode_error(buf: &[u8], reason: String) -> ConvertError {
    ConvertError::Codec {
        offset: buf.len(),
        reason,
    }
}

// ============================================================================
// Byte writing helpers
// ============================================================================

fn write_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_vector3(buf: &mut Vec<u8>, v: Vector3) {
    for c in v {
        buf.extend_from_slice(&c.to_le_bytes());
    }
}

fn write_uv(buf: &mut Vec<u8>, uv: Uv, range: f32) {
    for c in uv.to_fixed(range) {
        write_i16(buf, c);
    }
}

// ============================================================================
// Byte reading
// ============================================================================

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn error_at(&self, offset: usize, reason: String) -> ConvertError {
        ConvertError::Codec { offset, reason }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        let slice = self.data.get(self.pos..end).ok_or_else(|| {
            self.error_at(self.pos, format!("unexpected end of data reading {} bytes", n))
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn vector3(&mut self) -> Result<Vector3> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    fn uv(&mut self, range: f32) -> Result<Uv> {
        Ok(Uv::from_fixed([self.i16()?, self.i16()?], range))
    }
}
