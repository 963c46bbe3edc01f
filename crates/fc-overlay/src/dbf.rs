//! dBASE III attribute table (`.dbf`) decoding.

use std::fmt;

use chrono::NaiveDate;
use tracing::debug;

use crate::OverlayResult;
use crate::shp::ByteCursor;

const FIELD_TERMINATOR: u8 = 0x0D;
const DELETED: u8 = b'*';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
    Integer,
    Double,
    Memo,
    Other(u8),
}

impl FieldType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'C' => FieldType::Character,
            b'N' => FieldType::Numeric,
            b'F' => FieldType::Float,
            b'L' => FieldType::Logical,
            b'D' => FieldType::Date,
            b'I' => FieldType::Integer,
            b'O' => FieldType::Double,
            b'M' => FieldType::Memo,
            other => FieldType::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Logical => b'L',
            FieldType::Date => b'D',
            FieldType::Integer => b'I',
            FieldType::Double => b'O',
            FieldType::Memo => b'M',
            FieldType::Other(b) => b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub length: usize,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Date(NaiveDate),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => f.write_str(""),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Integer(n) => write!(f, "{n}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

/// Decoded table; deleted rows are kept as `None` so row indices stay
/// aligned with shape record numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTable {
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<Option<Vec<AttributeValue>>>,
}

impl AttributeTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Named values for one row; empty for a deleted or missing row.
    pub fn named_row(&self, index: usize) -> Vec<(String, AttributeValue)> {
        match self.rows.get(index) {
            Some(Some(values)) => self
                .fields
                .iter()
                .zip(values)
                .map(|(f, v)| (f.name.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

pub fn read_table(bytes: &[u8]) -> OverlayResult<AttributeTable> {
    let mut cur = ByteCursor::new("dbf", bytes);
    let _version = cur.u8()?;
    cur.skip(3)?;
    let num_records = cur.u32_le()? as usize;
    let header_len = cur.u16_le()? as usize;
    let record_len = cur.u16_le()? as usize;
    cur.skip(20)?;

    let mut fields = Vec::new();
    loop {
        let probe = ByteCursor::at("dbf", bytes, cur.pos()).u8()?;
        if probe == FIELD_TERMINATOR {
            break;
        }
        if cur.pos() + 32 > header_len {
            return Err(cur.malformed("field descriptors overrun header"));
        }
        let raw = cur.take(32)?;
        let name_end = raw[..11].iter().position(|b| *b == 0).unwrap_or(11);
        fields.push(FieldDescriptor {
            name: String::from_utf8_lossy(&raw[..name_end]).trim().to_string(),
            field_type: FieldType::from_byte(raw[11]),
            length: raw[16] as usize,
            decimals: raw[17],
        });
    }

    let declared: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
    if declared != record_len {
        return Err(cur.malformed(format!(
            "record length {record_len} does not match fields ({declared})"
        )));
    }

    let mut rec = ByteCursor::at("dbf", bytes, header_len);
    let fits = num_records
        .checked_mul(record_len)
        .is_some_and(|need| need <= rec.remaining());
    if !fits {
        return Err(rec.malformed(format!(
            "{num_records} records of {record_len} bytes exceed the {} bytes left",
            rec.remaining()
        )));
    }
    let mut rows = Vec::with_capacity(num_records);
    for _ in 0..num_records {
        let flag = rec.u8()?;
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            let raw = rec.take(field.length)?;
            values.push(decode_value(field, raw));
        }
        rows.push((flag != DELETED).then_some(values));
    }
    debug!(fields = fields.len(), rows = rows.len(), "decoded attribute table");
    Ok(AttributeTable { fields, rows })
}

fn decode_value(field: &FieldDescriptor, raw: &[u8]) -> AttributeValue {
    match field.field_type {
        FieldType::Integer if raw.len() == 4 => {
            let mut b = [0u8; 4];
            b.copy_from_slice(raw);
            AttributeValue::Integer(i32::from_le_bytes(b) as i64)
        }
        FieldType::Double if raw.len() == 8 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(raw);
            AttributeValue::Number(f64::from_le_bytes(b))
        }
        _ => decode_text_value(field, &text(raw)),
    }
}

fn decode_text_value(field: &FieldDescriptor, text: &str) -> AttributeValue {
    let trimmed = text.trim();
    match field.field_type {
        FieldType::Character => AttributeValue::Text(trimmed.to_string()),
        FieldType::Numeric | FieldType::Float => {
            if trimmed.is_empty() || trimmed.starts_with('*') {
                return AttributeValue::Null;
            }
            if field.decimals == 0 {
                if let Ok(n) = trimmed.parse::<i64>() {
                    return AttributeValue::Integer(n);
                }
            }
            trimmed
                .parse::<f64>()
                .map(AttributeValue::Number)
                .unwrap_or(AttributeValue::Null)
        }
        FieldType::Logical => match trimmed.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => AttributeValue::Bool(true),
            Some('F' | 'f' | 'N' | 'n') => AttributeValue::Bool(false),
            _ => AttributeValue::Null,
        },
        FieldType::Date => NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .map(AttributeValue::Date)
            .unwrap_or(AttributeValue::Null),
        _ if trimmed.is_empty() => AttributeValue::Null,
        _ => AttributeValue::Text(trimmed.to_string()),
    }
}

fn text(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OverlayError;
    use crate::fixture::{FieldSpec, ShapefileFixture};

    fn field(field_type: FieldType, decimals: u8) -> FieldDescriptor {
        FieldDescriptor {
            name: "F".into(),
            field_type,
            length: 10,
            decimals,
        }
    }

    #[test]
    fn numeric_fields_split_integer_and_float() {
        assert_eq!(
            decode_text_value(&field(FieldType::Numeric, 0), "   42"),
            AttributeValue::Integer(42)
        );
        assert_eq!(
            decode_text_value(&field(FieldType::Numeric, 2), " 4.25"),
            AttributeValue::Number(4.25)
        );
        assert_eq!(
            decode_text_value(&field(FieldType::Numeric, 0), "      "),
            AttributeValue::Null
        );
        assert_eq!(
            decode_text_value(&field(FieldType::Float, 0), "********"),
            AttributeValue::Null
        );
    }

    #[test]
    fn logical_and_date_fields() {
        assert_eq!(
            decode_text_value(&field(FieldType::Logical, 0), "Y"),
            AttributeValue::Bool(true)
        );
        assert_eq!(
            decode_text_value(&field(FieldType::Logical, 0), "?"),
            AttributeValue::Null
        );
        let date = decode_text_value(&field(FieldType::Date, 0), "20240131");
        assert_eq!(date.to_string(), "2024-01-31");
    }

    #[test]
    fn reads_fixture_table() {
        let fixture = ShapefileFixture::sample_districts();
        let table = read_table(&fixture.dbf_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.fields[0].name, "NAME");
        let row = table.named_row(1);
        assert_eq!(row[0].1, AttributeValue::Text("Wan Chai".into()));
        assert_eq!(table.field_index("depth"), Some(1));
    }

    #[test]
    fn deleted_rows_are_kept_as_none() {
        let mut fixture = ShapefileFixture::new(vec![FieldSpec::text("NAME", 8)]);
        fixture.push_point(0.0, 0.0, vec![AttributeValue::Text("a".into())]);
        fixture.push_point(1.0, 1.0, vec![AttributeValue::Text("b".into())]);
        let mut dbf = fixture.dbf_bytes();
        let header_len = u16::from_le_bytes([dbf[8], dbf[9]]) as usize;
        dbf[header_len] = DELETED;
        let table = read_table(&dbf).unwrap();
        assert_eq!(table.rows[0], None);
        assert!(table.named_row(0).is_empty());
        assert_eq!(table.named_row(1).len(), 1);
    }

    #[test]
    fn inflated_record_count_is_rejected() {
        let mut dbf = ShapefileFixture::sample_districts().dbf_bytes();
        dbf[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            read_table(&dbf),
            Err(OverlayError::Malformed { file: "dbf", .. })
        ));
    }

    #[test]
    fn mismatched_record_length_is_rejected() {
        let fixture = ShapefileFixture::sample_districts();
        let mut dbf = fixture.dbf_bytes();
        dbf[10] = dbf[10].wrapping_add(1);
        assert!(matches!(
            read_table(&dbf),
            Err(OverlayError::Malformed { file: "dbf", .. })
        ));
    }
}
