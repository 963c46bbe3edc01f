//! ESRI shapefile main file (`.shp`) and index (`.shx`) decoding.
//!
//! Z and M ordinates are skipped; overlays are drawn in 2D.

use fc_core::{BoundingBox, Coord};
use tracing::debug;

use crate::geometry::{Geometry, assemble_polygons};
use crate::{OverlayError, OverlayResult};

pub const FILE_CODE: i32 = 9994;
pub const VERSION: i32 = 1000;
pub const HEADER_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
}

impl ShapeType {
    pub fn from_code(code: i32) -> OverlayResult<Self> {
        Ok(match code {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            31 => ShapeType::MultiPatch,
            other => return Err(OverlayError::UnsupportedShapeType { code: other }),
        })
    }

    pub fn code(self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::PointZ => 11,
            ShapeType::PolyLineZ => 13,
            ShapeType::PolygonZ => 15,
            ShapeType::MultiPointZ => 18,
            ShapeType::PointM => 21,
            ShapeType::PolyLineM => 23,
            ShapeType::PolygonM => 25,
            ShapeType::MultiPointM => 28,
            ShapeType::MultiPatch => 31,
        }
    }
}

/// Header shared by `.shp` and `.shx`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHeader {
    pub file_len_bytes: usize,
    pub shape_type: ShapeType,
    /// Declared bounds; `None` for an empty file (all zero) or non-finite values.
    pub bbox: Option<BoundingBox>,
}

/// One `.shx` entry, already converted from 16-bit words to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: usize,
    pub content_len: usize,
}

/// Little helper over a byte slice that reports offsets on failure.
pub(crate) struct ByteCursor<'a> {
    file: &'static str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(file: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            file,
            bytes,
            pos: 0,
        }
    }

    pub(crate) fn at(file: &'static str, bytes: &'a [u8], pos: usize) -> Self {
        Self { file, bytes, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> OverlayError {
        OverlayError::Malformed {
            file: self.file,
            offset: self.pos,
            reason: reason.into(),
        }
    }

    pub(crate) fn take(&mut self, n: usize) -> OverlayResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.malformed(format!("need {n} bytes, file ends early")))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub(crate) fn skip(&mut self, n: usize) -> OverlayResult<()> {
        self.take(n).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> OverlayResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> OverlayResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16_le(&mut self) -> OverlayResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32_le(&mut self) -> OverlayResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn i32_be(&mut self) -> OverlayResult<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub(crate) fn i32_le(&mut self) -> OverlayResult<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub(crate) fn f64_le(&mut self) -> OverlayResult<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    fn count(&mut self, what: &str) -> OverlayResult<usize> {
        let value = self.i32_le()?;
        usize::try_from(value).map_err(|_| self.malformed(format!("negative {what} {value}")))
    }

    /// Fails unless `count` items of `width` bytes fit in what is left.
    fn ensure_fits(&self, count: usize, width: usize, what: &str) -> OverlayResult<()> {
        match count.checked_mul(width) {
            Some(need) if need <= self.remaining() => Ok(()),
            _ => Err(self.malformed(format!(
                "{what} {count} exceeds the {} bytes left",
                self.remaining()
            ))),
        }
    }

    fn coord(&mut self) -> OverlayResult<Coord> {
        let x = self.f64_le()?;
        let y = self.f64_le()?;
        Ok(Coord::new(x, y))
    }
}

pub fn parse_header(file: &'static str, bytes: &[u8]) -> OverlayResult<ShapeHeader> {
    let mut cur = ByteCursor::new(file, bytes);
    let code = cur.i32_be()?;
    if code != FILE_CODE {
        return Err(cur.malformed(format!("file code {code}, expected {FILE_CODE}")));
    }
    cur.skip(20)?;
    let words = cur.i32_be()?;
    let file_len_bytes = usize::try_from(words)
        .map(|w| w * 2)
        .map_err(|_| cur.malformed(format!("negative file length {words}")))?;
    let version = cur.i32_le()?;
    if version != VERSION {
        return Err(cur.malformed(format!("version {version}, expected {VERSION}")));
    }
    let shape_type = ShapeType::from_code(cur.i32_le()?)?;
    let (min_x, min_y, max_x, max_y) = (cur.f64_le()?, cur.f64_le()?, cur.f64_le()?, cur.f64_le()?);
    let all_zero = [min_x, min_y, max_x, max_y].iter().all(|v| *v == 0.0);
    let bbox = if all_zero {
        None
    } else {
        BoundingBox::new(min_x, min_y, max_x, max_y).ok()
    };
    Ok(ShapeHeader {
        file_len_bytes,
        shape_type,
        bbox,
    })
}

pub fn parse_index(shx: &[u8]) -> OverlayResult<Vec<IndexEntry>> {
    parse_header("shx", shx)?;
    let body = shx.len().saturating_sub(HEADER_LEN);
    if body % 8 != 0 {
        return Err(OverlayError::Malformed {
            file: "shx",
            offset: HEADER_LEN,
            reason: format!("index body of {body} bytes is not a multiple of 8"),
        });
    }
    let mut cur = ByteCursor::at("shx", shx, HEADER_LEN);
    let mut entries = Vec::with_capacity(body / 8);
    while cur.pos() < shx.len() {
        let offset = cur.i32_be()?;
        let len = cur.i32_be()?;
        match (usize::try_from(offset), usize::try_from(len)) {
            (Ok(o), Ok(l)) => entries.push(IndexEntry {
                offset: o * 2,
                content_len: l * 2,
            }),
            _ => return Err(cur.malformed(format!("negative index entry {offset}/{len}"))),
        }
    }
    Ok(entries)
}

/// Decode all shapes. With an index, records are read at the indexed
/// offsets; without one, the main file is walked sequentially.
pub fn read_shapes(shp: &[u8], shx: Option<&[u8]>) -> OverlayResult<(ShapeHeader, Vec<Geometry>)> {
    let header = parse_header("shp", shp)?;
    let offsets: Vec<usize> = match shx {
        Some(index) => parse_index(index)?.into_iter().map(|e| e.offset).collect(),
        None => sequential_offsets(shp)?,
    };
    let mut shapes = Vec::with_capacity(offsets.len());
    for (i, offset) in offsets.into_iter().enumerate() {
        shapes.push(read_record(shp, offset, i + 1)?);
    }
    debug!(
        shape_type = ?header.shape_type,
        count = shapes.len(),
        "decoded shapes"
    );
    Ok((header, shapes))
}

fn sequential_offsets(shp: &[u8]) -> OverlayResult<Vec<usize>> {
    let mut offsets = Vec::new();
    let mut cur = ByteCursor::at("shp", shp, HEADER_LEN);
    while cur.pos() + 8 <= shp.len() {
        let start = cur.pos();
        let _number = cur.i32_be()?;
        let words = cur.i32_be()?;
        let len = usize::try_from(words)
            .map_err(|_| cur.malformed(format!("negative content length {words}")))?;
        cur.skip(len * 2)?;
        offsets.push(start);
    }
    Ok(offsets)
}

fn read_record(shp: &[u8], offset: usize, expected_number: usize) -> OverlayResult<Geometry> {
    let mut cur = ByteCursor::at("shp", shp, offset);
    let number = cur.i32_be()?;
    if usize::try_from(number).ok() != Some(expected_number) {
        return Err(cur.malformed(format!(
            "record number {number}, expected {expected_number}"
        )));
    }
    let words = cur.i32_be()?;
    let content_len = usize::try_from(words)
        .map(|w| w * 2)
        .map_err(|_| cur.malformed(format!("negative content length {words}")))?;
    let content_start = cur.pos();
    let content = cur.take(content_len)?;
    let mut rec = ByteCursor::at("shp", &shp[..content_start + content.len()], content_start);
    let shape_type = ShapeType::from_code(rec.i32_le()?)?;
    decode_shape(&mut rec, shape_type)
}

fn decode_shape(cur: &mut ByteCursor<'_>, shape_type: ShapeType) -> OverlayResult<Geometry> {
    use ShapeType::*;
    match shape_type {
        Null => Ok(Geometry::Null),
        Point | PointZ | PointM => Ok(Geometry::Point(cur.coord()?)),
        MultiPoint | MultiPointZ | MultiPointM => {
            cur.skip(32)?;
            let n = cur.count("point count")?;
            cur.ensure_fits(n, 16, "point count")?;
            let points = (0..n).map(|_| cur.coord()).collect::<OverlayResult<Vec<_>>>()?;
            Ok(Geometry::MultiPoint(points))
        }
        PolyLine | PolyLineZ | PolyLineM => {
            let mut parts = read_parts(cur, false)?;
            Ok(if parts.len() == 1 {
                Geometry::LineString(parts.remove(0))
            } else {
                Geometry::MultiLineString(parts)
            })
        }
        Polygon | PolygonZ | PolygonM | MultiPatch => {
            let rings = read_parts(cur, shape_type == MultiPatch)?;
            let mut polygons = assemble_polygons(rings);
            Ok(match polygons.len() {
                0 => Geometry::Null,
                1 => Geometry::Polygon(polygons.remove(0)),
                _ => Geometry::MultiPolygon(polygons),
            })
        }
    }
}

/// Box, part and point counts, part starts, then the XY points split by part.
fn read_parts(cur: &mut ByteCursor<'_>, with_part_types: bool) -> OverlayResult<Vec<Vec<Coord>>> {
    cur.skip(32)?;
    let num_parts = cur.count("part count")?;
    let num_points = cur.count("point count")?;
    let part_width = if with_part_types { 8 } else { 4 };
    num_parts
        .checked_mul(part_width)
        .zip(num_points.checked_mul(16))
        .and_then(|(a, b)| a.checked_add(b))
        .filter(|need| *need <= cur.remaining())
        .ok_or_else(|| {
            cur.malformed(format!(
                "{num_parts} parts and {num_points} points exceed the {} bytes left",
                cur.remaining()
            ))
        })?;
    let mut starts = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        let start = cur.count("part start")?;
        if start > num_points {
            return Err(cur.malformed(format!("part start {start} beyond {num_points} points")));
        }
        starts.push(start);
    }
    if starts.windows(2).any(|w| w[0] > w[1]) {
        return Err(cur.malformed("part starts are not ascending"));
    }
    if with_part_types {
        cur.skip(num_parts * 4)?;
    }
    let points = (0..num_points)
        .map(|_| cur.coord())
        .collect::<OverlayResult<Vec<_>>>()?;
    let mut parts = Vec::with_capacity(num_parts);
    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(num_points);
        parts.push(points[*start..end].to_vec());
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::ShapefileFixture;

    #[test]
    fn shape_type_codes_roundtrip() {
        for code in [0, 1, 3, 5, 8, 11, 13, 15, 18, 21, 23, 25, 28, 31] {
            assert_eq!(ShapeType::from_code(code).unwrap().code(), code);
        }
        assert!(matches!(
            ShapeType::from_code(2),
            Err(OverlayError::UnsupportedShapeType { code: 2 })
        ));
    }

    #[test]
    fn rejects_bad_file_code() {
        let mut shp = ShapefileFixture::sample_districts().shp_bytes();
        shp[3] = 0;
        let err = parse_header("shp", &shp).unwrap_err();
        assert!(matches!(err, OverlayError::Malformed { file: "shp", .. }));
    }

    #[test]
    fn indexed_and_sequential_reads_agree() {
        let fixture = ShapefileFixture::sample_districts();
        let shp = fixture.shp_bytes();
        let shx = fixture.shx_bytes();
        let (header, indexed) = read_shapes(&shp, Some(&shx)).unwrap();
        let (_, walked) = read_shapes(&shp, None).unwrap();
        assert_eq!(header.shape_type, ShapeType::Polygon);
        assert_eq!(header.file_len_bytes, shp.len());
        assert_eq!(indexed, walked);
        assert_eq!(indexed.len(), 3);
    }

    #[test]
    fn truncated_record_is_malformed() {
        let shp = ShapefileFixture::sample_districts().shp_bytes();
        let cut = &shp[..shp.len() - 10];
        let err = read_shapes(cut, None).unwrap_err();
        assert!(matches!(err, OverlayError::Malformed { file: "shp", .. }));
    }

    #[test]
    fn inflated_part_count_is_malformed() {
        let mut shp = ShapefileFixture::sample_districts().shp_bytes();
        // record header, shape type, then the bounding box
        let num_parts_at = HEADER_LEN + 8 + 4 + 32;
        shp[num_parts_at..num_parts_at + 4].copy_from_slice(&i32::MAX.to_le_bytes());
        let err = read_shapes(&shp, None).unwrap_err();
        assert!(matches!(err, OverlayError::Malformed { file: "shp", .. }));
    }

    #[test]
    fn inflated_point_count_is_malformed() {
        let mut shp = ShapefileFixture::sample_districts().shp_bytes();
        let num_points_at = HEADER_LEN + 8 + 4 + 32 + 4;
        shp[num_points_at..num_points_at + 4].copy_from_slice(&i32::MAX.to_le_bytes());
        let err = read_shapes(&shp, None).unwrap_err();
        assert!(matches!(err, OverlayError::Malformed { file: "shp", .. }));
    }

    #[test]
    fn index_entries_are_in_bytes() {
        let fixture = ShapefileFixture::sample_districts();
        let entries = parse_index(&fixture.shx_bytes()).unwrap();
        assert_eq!(entries[0].offset, HEADER_LEN);
        assert_eq!(
            entries[1].offset,
            entries[0].offset + 8 + entries[0].content_len
        );
    }
}
