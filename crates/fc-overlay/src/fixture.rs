//! Builders for small shapefile bundles, used by tests here and in the
//! dashboard crates.

use std::io::{Cursor, Write};

use fc_core::{BoundingBox, Coord};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::dbf::{AttributeValue, FieldType};
use crate::geometry::Geometry;
use crate::shp::{FILE_CODE, HEADER_LEN, ShapeType, VERSION};

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub length: u8,
    pub decimals: u8,
}

impl FieldSpec {
    pub fn text(name: &str, length: u8) -> Self {
        Self::new(name, FieldType::Character, length, 0)
    }

    pub fn number(name: &str, length: u8, decimals: u8) -> Self {
        Self::new(name, FieldType::Numeric, length, decimals)
    }

    pub fn logical(name: &str) -> Self {
        Self::new(name, FieldType::Logical, 1, 0)
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, FieldType::Date, 8, 0)
    }

    fn new(name: &str, field_type: FieldType, length: u8, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            length,
            decimals,
        }
    }
}

/// Records as the writer sees them: a shape type plus raw parts.
#[derive(Debug, Clone)]
enum Shape {
    Null,
    Point(Coord),
    Parts(ShapeType, Vec<Vec<Coord>>),
}

#[derive(Debug, Clone)]
pub struct ShapefileFixture {
    fields: Vec<FieldSpec>,
    shapes: Vec<Shape>,
    rows: Vec<Vec<AttributeValue>>,
}

impl ShapefileFixture {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            shapes: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Three adjacent flood-depth districts, all clockwise squares.
    pub fn sample_districts() -> Self {
        let mut f = Self::new(vec![FieldSpec::text("NAME", 16), FieldSpec::number("DEPTH", 8, 2)]);
        let districts = [
            ("Central", 114.15, 22.27, 0.5),
            ("Wan Chai", 114.17, 22.27, 1.25),
            ("Kowloon", 114.16, 22.30, 2.0),
        ];
        for (name, x0, y0, depth) in districts {
            f.push_polygon(
                vec![square(x0, y0, 0.02)],
                vec![
                    AttributeValue::Text(name.to_string()),
                    AttributeValue::Number(depth),
                ],
            );
        }
        f
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn push_null(&mut self, row: Vec<AttributeValue>) -> &mut Self {
        self.push(Shape::Null, row)
    }

    pub fn push_point(&mut self, x: f64, y: f64, row: Vec<AttributeValue>) -> &mut Self {
        self.push(Shape::Point(Coord::new(x, y)), row)
    }

    pub fn push_polyline(&mut self, parts: Vec<Vec<Coord>>, row: Vec<AttributeValue>) -> &mut Self {
        self.push(Shape::Parts(ShapeType::PolyLine, parts), row)
    }

    pub fn push_polygon(&mut self, rings: Vec<Vec<Coord>>, row: Vec<AttributeValue>) -> &mut Self {
        self.push(Shape::Parts(ShapeType::Polygon, rings), row)
    }

    fn push(&mut self, shape: Shape, row: Vec<AttributeValue>) -> &mut Self {
        assert_eq!(row.len(), self.fields.len(), "row width must match fields");
        self.shapes.push(shape);
        self.rows.push(row);
        self
    }

    fn shape_type(&self) -> ShapeType {
        self.shapes
            .iter()
            .find_map(|s| match s {
                Shape::Null => None,
                Shape::Point(_) => Some(ShapeType::Point),
                Shape::Parts(t, _) => Some(*t),
            })
            .unwrap_or(ShapeType::Null)
    }

    fn bbox(&self) -> Option<BoundingBox> {
        let coords: Vec<&Coord> = self
            .shapes
            .iter()
            .flat_map(|s| match s {
                Shape::Null => Vec::new(),
                Shape::Point(c) => vec![c],
                Shape::Parts(_, parts) => parts.iter().flatten().collect(),
            })
            .collect();
        BoundingBox::from_coords(coords)
    }

    fn record_contents(&self) -> Vec<Vec<u8>> {
        self.shapes.iter().map(encode_shape).collect()
    }

    pub fn shp_bytes(&self) -> Vec<u8> {
        let contents = self.record_contents();
        let total = HEADER_LEN + contents.iter().map(|c| 8 + c.len()).sum::<usize>();
        let mut out = self.header(total);
        for (i, content) in contents.iter().enumerate() {
            out.extend_from_slice(&((i + 1) as i32).to_be_bytes());
            out.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
            out.extend_from_slice(content);
        }
        out
    }

    pub fn shx_bytes(&self) -> Vec<u8> {
        let contents = self.record_contents();
        let mut out = self.header(HEADER_LEN + 8 * contents.len());
        let mut offset = HEADER_LEN;
        for content in &contents {
            out.extend_from_slice(&((offset / 2) as i32).to_be_bytes());
            out.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
            offset += 8 + content.len();
        }
        out
    }

    fn header(&self, total_len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(&FILE_CODE.to_be_bytes());
        out.extend_from_slice(&[0u8; 20]);
        out.extend_from_slice(&((total_len / 2) as i32).to_be_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.shape_type().code().to_le_bytes());
        let b = self
            .bbox()
            .map(|b| [b.min_x, b.min_y, b.max_x, b.max_y])
            .unwrap_or([0.0; 4]);
        for v in b {
            out.extend_from_slice(&v.to_le_bytes());
        }
        // Z and M ranges.
        out.extend_from_slice(&[0u8; 32]);
        out
    }

    pub fn dbf_bytes(&self) -> Vec<u8> {
        let header_len = 32 + 32 * self.fields.len() + 1;
        let record_len = 1 + self.fields.iter().map(|f| f.length as usize).sum::<usize>();
        let mut out = Vec::with_capacity(header_len + record_len * self.rows.len() + 1);
        out.push(0x03);
        out.extend_from_slice(&[124, 1, 1]);
        out.extend_from_slice(&(self.rows.len() as u32).to_le_bytes());
        out.extend_from_slice(&(header_len as u16).to_le_bytes());
        out.extend_from_slice(&(record_len as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 20]);
        for field in &self.fields {
            let mut name = [0u8; 11];
            let bytes = field.name.as_bytes();
            let n = bytes.len().min(10);
            name[..n].copy_from_slice(&bytes[..n]);
            out.extend_from_slice(&name);
            out.push(field.field_type.as_byte());
            out.extend_from_slice(&[0u8; 4]);
            out.push(field.length);
            out.push(field.decimals);
            out.extend_from_slice(&[0u8; 14]);
        }
        out.push(0x0D);
        for row in &self.rows {
            out.push(b' ');
            for (field, value) in self.fields.iter().zip(row) {
                out.extend_from_slice(&encode_value(field, value));
            }
        }
        out.push(0x1A);
        out
    }

    /// `<stem>.shp`, `<stem>.shx` and `<stem>.dbf` zipped together.
    pub fn to_zip(&self, stem: &str) -> Vec<u8> {
        let [shp, shx, dbf] = ["shp", "shx", "dbf"].map(|ext| format!("{stem}.{ext}"));
        zip_members(&[
            (shp.as_str(), self.shp_bytes()),
            (shx.as_str(), self.shx_bytes()),
            (dbf.as_str(), self.dbf_bytes()),
        ])
    }
}

pub fn square(x0: f64, y0: f64, size: f64) -> Vec<Coord> {
    vec![
        Coord::new(x0, y0),
        Coord::new(x0, y0 + size),
        Coord::new(x0 + size, y0 + size),
        Coord::new(x0 + size, y0),
        Coord::new(x0, y0),
    ]
}

/// Zip arbitrary named members in order.
pub fn zip_members(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip member");
        writer.write_all(bytes).expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn encode_shape(shape: &Shape) -> Vec<u8> {
    let mut out = Vec::new();
    match shape {
        Shape::Null => out.extend_from_slice(&ShapeType::Null.code().to_le_bytes()),
        Shape::Point(c) => {
            out.extend_from_slice(&ShapeType::Point.code().to_le_bytes());
            out.extend_from_slice(&c.x.to_le_bytes());
            out.extend_from_slice(&c.y.to_le_bytes());
        }
        Shape::Parts(shape_type, parts) => {
            out.extend_from_slice(&shape_type.code().to_le_bytes());
            let geometry = Geometry::MultiLineString(parts.clone());
            let b = geometry
                .bbox()
                .map(|b| [b.min_x, b.min_y, b.max_x, b.max_y])
                .unwrap_or([0.0; 4]);
            for v in b {
                out.extend_from_slice(&v.to_le_bytes());
            }
            let num_points: usize = parts.iter().map(Vec::len).sum();
            out.extend_from_slice(&(parts.len() as i32).to_le_bytes());
            out.extend_from_slice(&(num_points as i32).to_le_bytes());
            let mut start = 0usize;
            for part in parts {
                out.extend_from_slice(&(start as i32).to_le_bytes());
                start += part.len();
            }
            for c in parts.iter().flatten() {
                out.extend_from_slice(&c.x.to_le_bytes());
                out.extend_from_slice(&c.y.to_le_bytes());
            }
        }
    }
    out
}

fn encode_value(field: &FieldSpec, value: &AttributeValue) -> Vec<u8> {
    let len = field.length as usize;
    let dec = field.decimals as usize;
    let text = match value {
        AttributeValue::Null => String::new(),
        AttributeValue::Text(s) => s.clone(),
        AttributeValue::Number(n) => format!("{n:>len$.dec$}"),
        AttributeValue::Integer(n) => format!("{n:>len$}"),
        AttributeValue::Bool(b) => (if *b { "T" } else { "F" }).to_string(),
        AttributeValue::Date(d) => d.format("%Y%m%d").to_string(),
    };
    let mut bytes = text.into_bytes();
    bytes.resize(len, b' ');
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dbf_layout_matches_header_fields() {
        let f = ShapefileFixture::sample_districts();
        let dbf = f.dbf_bytes();
        let header_len = u16::from_le_bytes([dbf[8], dbf[9]]) as usize;
        let record_len = u16::from_le_bytes([dbf[10], dbf[11]]) as usize;
        assert_eq!(header_len, 32 + 64 + 1);
        assert_eq!(record_len, 1 + 16 + 8);
        assert_eq!(dbf.len(), header_len + 3 * record_len + 1);
        assert_eq!(*dbf.last().unwrap(), 0x1A);
    }

    #[test]
    fn shp_length_is_declared_in_words() {
        let f = ShapefileFixture::sample_districts();
        let shp = f.shp_bytes();
        let words = i32::from_be_bytes([shp[24], shp[25], shp[26], shp[27]]) as usize;
        assert_eq!(words * 2, shp.len());
        assert_eq!(f.len(), 3);
    }
}
