//! Named, typed arrays - the unit of data in a keyword file
//!
//! A keyword's header `(name, count, type)` is fixed at construction. Its
//! element values may be changed in place, but nothing here can grow or
//! shrink the array, so a modified keyword always re-encodes to exactly the
//! bytes it was read from.

pub mod codec;
pub mod ops;

use crate::error::{EclError, EclResult};
use crate::storage::data_type::DataType;
use crate::storage::header::{KeywordHeader, KeywordName};

/// Integer written for a true LOGI element
pub const BOOL_TRUE_INT: i32 = -1;
/// Integer written for a false LOGI element
pub const BOOL_FALSE_INT: i32 = 0;

/// Element storage, one variant per element type
#[derive(Debug, Clone)]
pub enum KeywordData {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Bool(Vec<bool>),
    /// CHAR and STRING elements, `width` bytes each, back to back
    Alpha(Vec<u8>),
    /// MESS keywords have no element storage
    Message,
}

impl KeywordData {
    fn variant_name(&self) -> &'static str {
        match self {
            KeywordData::Int(_) => "INTE",
            KeywordData::Float(_) => "REAL",
            KeywordData::Double(_) => "DOUB",
            KeywordData::Bool(_) => "LOGI",
            KeywordData::Alpha(_) => "CHAR/C0nn",
            KeywordData::Message => "MESS",
        }
    }

    /// Bitwise equality; NaN payloads compare equal to themselves
    fn bitwise_eq(&self, other: &KeywordData) -> bool {
        match (self, other) {
            (KeywordData::Int(a), KeywordData::Int(b)) => a == b,
            (KeywordData::Float(a), KeywordData::Float(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (KeywordData::Double(a), KeywordData::Double(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (KeywordData::Bool(a), KeywordData::Bool(b)) => a == b,
            (KeywordData::Alpha(a), KeywordData::Alpha(b)) => a == b,
            (KeywordData::Message, KeywordData::Message) => true,
            _ => false,
        }
    }
}

/// One element value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Double(f64),
    Bool(bool),
    /// Text with trailing padding removed
    Str(String),
}

impl Value {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(v) => f.write_str(if *v { "T" } else { "F" }),
            Value::Str(v) => write!(f, "'{}'", v),
        }
    }
}

/// Position of a keyword inside the file it was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Binding {
    pub file_id: u64,
    pub position: usize,
}

/// A named, typed, fixed-length array
#[derive(Debug, Clone)]
pub struct Keyword {
    header: KeywordHeader,
    data: KeywordData,
    binding: Option<Binding>,
}

impl Keyword {
    /// Build a keyword from a name and element storage.
    ///
    /// `data_type` must agree with the storage variant; for CHAR/STRING the
    /// byte buffer length must be a multiple of the element width.
    pub fn new(name: &str, data_type: DataType, data: KeywordData) -> EclResult<Self> {
        let name = KeywordName::new(name)?;
        let count = match (&data, data_type) {
            (KeywordData::Int(v), DataType::Int) => v.len(),
            (KeywordData::Float(v), DataType::Float) => v.len(),
            (KeywordData::Double(v), DataType::Double) => v.len(),
            (KeywordData::Bool(v), DataType::Bool) => v.len(),
            (KeywordData::Alpha(v), DataType::Char | DataType::String(_)) => {
                let width = data_type.element_size();
                if v.len() % width != 0 {
                    return Err(EclError::InvalidValue(format!(
                        "{} text bytes is not a multiple of element width {}",
                        v.len(),
                        width
                    )));
                }
                v.len() / width
            }
            (KeywordData::Message, DataType::Message) => 0,
            (data, data_type) => {
                return Err(EclError::TypeMismatch {
                    expected: data_type.to_string(),
                    found: data.variant_name().to_string(),
                })
            }
        };

        Ok(Keyword {
            header: KeywordHeader::new(name, count, data_type),
            data,
            binding: None,
        })
    }

    /// Keyword of `count` zero (or blank) elements
    pub fn zeroed(name: &str, count: usize, data_type: DataType) -> EclResult<Self> {
        let data = match data_type {
            DataType::Int => KeywordData::Int(vec![0; count]),
            DataType::Float => KeywordData::Float(vec![0.0; count]),
            DataType::Double => KeywordData::Double(vec![0.0; count]),
            DataType::Bool => KeywordData::Bool(vec![false; count]),
            DataType::Char | DataType::String(_) => {
                KeywordData::Alpha(vec![b' '; count * data_type.element_size()])
            }
            DataType::Message => KeywordData::Message,
        };
        let mut keyword = Keyword::new(name, data_type, data)?;
        if data_type == DataType::Message {
            keyword.header.count = count;
        }
        Ok(keyword)
    }

    pub fn from_ints(name: &str, values: Vec<i32>) -> EclResult<Self> {
        Keyword::new(name, DataType::Int, KeywordData::Int(values))
    }

    pub fn from_floats(name: &str, values: Vec<f32>) -> EclResult<Self> {
        Keyword::new(name, DataType::Float, KeywordData::Float(values))
    }

    pub fn from_doubles(name: &str, values: Vec<f64>) -> EclResult<Self> {
        Keyword::new(name, DataType::Double, KeywordData::Double(values))
    }

    pub fn from_bools(name: &str, values: Vec<bool>) -> EclResult<Self> {
        Keyword::new(name, DataType::Bool, KeywordData::Bool(values))
    }

    /// CHAR keyword; every value must fit in eight bytes
    pub fn from_strings<S: AsRef<str>>(name: &str, values: &[S]) -> EclResult<Self> {
        Self::from_strings_with_type(name, DataType::Char, values)
    }

    /// STRING keyword of the given element width
    pub fn from_strings_with_width<S: AsRef<str>>(
        name: &str,
        width: usize,
        values: &[S],
    ) -> EclResult<Self> {
        Self::from_strings_with_type(name, DataType::string(width)?, values)
    }

    fn from_strings_with_type<S: AsRef<str>>(
        name: &str,
        data_type: DataType,
        values: &[S],
    ) -> EclResult<Self> {
        let width = data_type.element_size();
        let mut bytes = vec![b' '; values.len() * width];
        for (i, value) in values.iter().enumerate() {
            write_padded(&mut bytes[i * width..(i + 1) * width], value.as_ref())?;
        }
        Keyword::new(name, data_type, KeywordData::Alpha(bytes))
    }

    /// Header-only MESS keyword
    pub fn message(name: &str) -> EclResult<Self> {
        Keyword::new(name, DataType::Message, KeywordData::Message)
    }

    pub(crate) fn from_parts(header: KeywordHeader, data: KeywordData) -> Self {
        Keyword {
            header,
            data,
            binding: None,
        }
    }

    pub fn header(&self) -> &KeywordHeader {
        &self.header
    }

    pub fn name(&self) -> &KeywordName {
        &self.header.name
    }

    pub fn count(&self) -> usize {
        self.header.count
    }

    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    pub fn data(&self) -> &KeywordData {
        &self.data
    }

    /// Check if the keyword is tied to a position in an open file
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub(crate) fn binding(&self) -> Option<Binding> {
        self.binding
    }

    pub(crate) fn bind(&mut self, file_id: u64, position: usize) {
        self.binding = Some(Binding { file_id, position });
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match &self.data {
            KeywordData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match &self.data {
            KeywordData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doubles(&self) -> Option<&[f64]> {
        match &self.data {
            KeywordData::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match &self.data {
            KeywordData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints_mut(&mut self) -> Option<&mut [i32]> {
        match &mut self.data {
            KeywordData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.data {
            KeywordData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doubles_mut(&mut self) -> Option<&mut [f64]> {
        match &mut self.data {
            KeywordData::Double(v) => Some(v),
            _ => None,
        }
    }

    /// Bounds-checked element read
    pub fn get(&self, index: usize) -> EclResult<Value> {
        self.check_index(index)?;
        Ok(match &self.data {
            KeywordData::Int(v) => Value::Int(v[index]),
            KeywordData::Float(v) => Value::Float(v[index]),
            KeywordData::Double(v) => Value::Double(v[index]),
            KeywordData::Bool(v) => Value::Bool(v[index]),
            KeywordData::Alpha(bytes) => {
                let width = self.header.data_type.element_size();
                let raw = &bytes[index * width..(index + 1) * width];
                Value::Str(String::from_utf8_lossy(raw).trim_end().to_string())
            }
            KeywordData::Message => {
                return Err(EclError::TypeMismatch {
                    expected: "element data".to_string(),
                    found: "MESS".to_string(),
                })
            }
        })
    }

    /// Bounds-checked element write.
    ///
    /// Integer values are accepted by FLOAT and DOUBLE keywords, and the two
    /// floating types accept each other; any other mix is a type mismatch.
    /// Text wider than the element width is rejected with `ValueTooLong`
    /// and the element is left unchanged.
    pub fn set(&mut self, index: usize, value: Value) -> EclResult<()> {
        self.check_index(index)?;
        let width = self.header.data_type.element_size();
        match (&mut self.data, value) {
            (KeywordData::Int(v), Value::Int(x)) => v[index] = x,
            (KeywordData::Float(v), Value::Float(x)) => v[index] = x,
            (KeywordData::Float(v), Value::Double(x)) => v[index] = x as f32,
            (KeywordData::Float(v), Value::Int(x)) => v[index] = x as f32,
            (KeywordData::Double(v), Value::Double(x)) => v[index] = x,
            (KeywordData::Double(v), Value::Float(x)) => v[index] = x as f64,
            (KeywordData::Double(v), Value::Int(x)) => v[index] = x as f64,
            (KeywordData::Bool(v), Value::Bool(x)) => v[index] = x,
            (KeywordData::Alpha(bytes), Value::Str(s)) => {
                write_padded(&mut bytes[index * width..(index + 1) * width], &s)?;
            }
            (_, value) => {
                return Err(EclError::TypeMismatch {
                    expected: self.header.data_type.to_string(),
                    found: value.type_name().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Element converted to f64 (INTE, REAL, DOUB only)
    pub fn get_as_f64(&self, index: usize) -> EclResult<f64> {
        match self.get(index)? {
            Value::Int(v) => Ok(v as f64),
            Value::Float(v) => Ok(v as f64),
            Value::Double(v) => Ok(v),
            other => Err(EclError::TypeMismatch {
                expected: "numeric".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Copy `count` elements starting at `offset` into a new unbound keyword.
    ///
    /// `count == None` takes the rest of the array. The copy keeps this
    /// keyword's name unless `new_name` is given.
    pub fn sub_range(
        &self,
        offset: usize,
        count: Option<usize>,
        new_name: Option<&str>,
    ) -> EclResult<Keyword> {
        let len = self.count();
        let count = match count {
            Some(count) => count,
            None => len.checked_sub(offset).ok_or(EclError::OutOfRange {
                offset,
                count: 0,
                len,
            })?,
        };
        if offset.checked_add(count).map_or(true, |end| end > len) {
            return Err(EclError::OutOfRange { offset, count, len });
        }

        let name = match new_name {
            Some(name) => KeywordName::new(name)?,
            None => self.header.name,
        };
        let data = self.copy_elements(offset..offset + count, 1);
        Ok(Keyword::from_parts(
            KeywordHeader::new(name, count, self.header.data_type),
            data,
        ))
    }

    /// Strided copy of `[start, end)`; both bounds are clamped to the array
    /// length, so an empty range yields an empty keyword.
    pub fn slice(&self, start: usize, end: usize, stride: usize) -> EclResult<Keyword> {
        if stride == 0 {
            return Err(EclError::InvalidValue("slice stride must be positive".to_string()));
        }
        let len = self.count();
        let start = start.min(len);
        let end = end.clamp(start, len);
        let data = self.copy_elements(start..end, stride);
        let count = (end - start).div_ceil(stride);
        Ok(Keyword::from_parts(
            KeywordHeader::new(self.header.name, count, self.header.data_type),
            data,
        ))
    }

    fn copy_elements(&self, range: std::ops::Range<usize>, stride: usize) -> KeywordData {
        match &self.data {
            KeywordData::Int(v) => KeywordData::Int(v[range].iter().step_by(stride).copied().collect()),
            KeywordData::Float(v) => {
                KeywordData::Float(v[range].iter().step_by(stride).copied().collect())
            }
            KeywordData::Double(v) => {
                KeywordData::Double(v[range].iter().step_by(stride).copied().collect())
            }
            KeywordData::Bool(v) => KeywordData::Bool(v[range].iter().step_by(stride).copied().collect()),
            KeywordData::Alpha(bytes) => {
                let width = self.header.data_type.element_size();
                let mut out = Vec::with_capacity(range.len() / stride * width + width);
                for i in range.step_by(stride) {
                    out.extend_from_slice(&bytes[i * width..(i + 1) * width]);
                }
                KeywordData::Alpha(out)
            }
            KeywordData::Message => KeywordData::Message,
        }
    }

    fn check_index(&self, index: usize) -> EclResult<()> {
        if index >= self.count() {
            return Err(EclError::OutOfRange {
                offset: index,
                count: 1,
                len: self.count(),
            });
        }
        Ok(())
    }
}

impl PartialEq for Keyword {
    /// Exact equality of header and element bits; file binding is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.data.bitwise_eq(&other.data)
    }
}

fn write_padded(target: &mut [u8], value: &str) -> EclResult<()> {
    let bytes = value.as_bytes();
    if bytes.len() > target.len() {
        return Err(EclError::ValueTooLong {
            value: value.to_string(),
            width: target.len(),
        });
    }
    target[..bytes.len()].copy_from_slice(bytes);
    target[bytes.len()..].fill(b' ');
    Ok(())
}
