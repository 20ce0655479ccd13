//! Element-wise arithmetic, statistics and comparisons on keywords
//!
//! Binary operations require both operands to share element type and
//! count. Integer keywords use wrapping arithmetic and only accept integer
//! scalars; floating keywords accept any numeric scalar. Every operation
//! validates its arguments before touching an element, so a rejected call
//! leaves the keyword unchanged.

use super::{Keyword, KeywordData, Value};
use crate::error::{EclError, EclResult};
use crate::storage::data_type::DataType;

/// Element-wise binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply_i32(self, a: i32, b: i32) -> i32 {
        match self {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => a.wrapping_div(b),
        }
    }

    fn apply_f32(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    fn apply_f64(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }
}

/// Relative/absolute tolerance test used by the approximate comparisons
pub fn approx_equal(a: f64, b: f64, abs_eps: f64, rel_eps: f64) -> bool {
    if a == b || (a.is_nan() && b.is_nan()) {
        return true;
    }
    let diff = (a - b).abs();
    if diff <= abs_eps {
        return true;
    }
    diff <= rel_eps * a.abs().max(b.abs())
}

impl Keyword {
    /// Apply `op` element-wise with `other` as right operand
    pub fn apply(&mut self, op: BinaryOp, other: &Keyword) -> EclResult<()> {
        self.check_operand(other)?;
        let indices: Vec<usize> = (0..self.count()).collect();
        self.apply_at(op, other, &indices)
    }

    pub fn add(&mut self, other: &Keyword) -> EclResult<()> {
        self.apply(BinaryOp::Add, other)
    }

    pub fn sub(&mut self, other: &Keyword) -> EclResult<()> {
        self.apply(BinaryOp::Sub, other)
    }

    pub fn mul(&mut self, other: &Keyword) -> EclResult<()> {
        self.apply(BinaryOp::Mul, other)
    }

    pub fn div(&mut self, other: &Keyword) -> EclResult<()> {
        self.apply(BinaryOp::Div, other)
    }

    /// Apply `op` with `other` only at the listed element indices
    pub fn apply_indexed(&mut self, op: BinaryOp, other: &Keyword, indices: &[usize]) -> EclResult<()> {
        self.check_operand(other)?;
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.count()) {
            return Err(EclError::OutOfRange {
                offset: bad,
                count: 1,
                len: self.count(),
            });
        }
        self.apply_at(op, other, indices)
    }

    pub fn add_indexed(&mut self, other: &Keyword, indices: &[usize]) -> EclResult<()> {
        self.apply_indexed(BinaryOp::Add, other, indices)
    }

    pub fn sub_indexed(&mut self, other: &Keyword, indices: &[usize]) -> EclResult<()> {
        self.apply_indexed(BinaryOp::Sub, other, indices)
    }

    pub fn mul_indexed(&mut self, other: &Keyword, indices: &[usize]) -> EclResult<()> {
        self.apply_indexed(BinaryOp::Mul, other, indices)
    }

    pub fn div_indexed(&mut self, other: &Keyword, indices: &[usize]) -> EclResult<()> {
        self.apply_indexed(BinaryOp::Div, other, indices)
    }

    fn apply_at(&mut self, op: BinaryOp, other: &Keyword, indices: &[usize]) -> EclResult<()> {
        match (&mut self.data, &other.data) {
            (KeywordData::Int(a), KeywordData::Int(b)) => {
                if op == BinaryOp::Div && indices.iter().any(|&i| b[i] == 0) {
                    return Err(EclError::InvalidValue("integer division by zero".to_string()));
                }
                for &i in indices {
                    a[i] = op.apply_i32(a[i], b[i]);
                }
            }
            (KeywordData::Float(a), KeywordData::Float(b)) => {
                for &i in indices {
                    a[i] = op.apply_f32(a[i], b[i]);
                }
            }
            (KeywordData::Double(a), KeywordData::Double(b)) => {
                for &i in indices {
                    a[i] = op.apply_f64(a[i], b[i]);
                }
            }
            _ => return Err(not_numeric(self.header.data_type)),
        }
        Ok(())
    }

    /// Apply `op` with a scalar right operand to every element
    pub fn apply_scalar(&mut self, op: BinaryOp, scalar: Value) -> EclResult<()> {
        match &mut self.data {
            KeywordData::Int(a) => {
                let b = match scalar {
                    Value::Int(b) => b,
                    other => {
                        return Err(EclError::TypeMismatch {
                            expected: "int".to_string(),
                            found: other.type_name().to_string(),
                        })
                    }
                };
                if op == BinaryOp::Div && b == 0 {
                    return Err(EclError::InvalidValue("integer division by zero".to_string()));
                }
                a.iter_mut().for_each(|x| *x = op.apply_i32(*x, b));
            }
            KeywordData::Float(a) => {
                let b = scalar_as_f64(&scalar)? as f32;
                a.iter_mut().for_each(|x| *x = op.apply_f32(*x, b));
            }
            KeywordData::Double(a) => {
                let b = scalar_as_f64(&scalar)?;
                a.iter_mut().for_each(|x| *x = op.apply_f64(*x, b));
            }
            _ => return Err(not_numeric(self.header.data_type)),
        }
        Ok(())
    }

    pub fn add_scalar(&mut self, scalar: Value) -> EclResult<()> {
        self.apply_scalar(BinaryOp::Add, scalar)
    }

    pub fn sub_scalar(&mut self, scalar: Value) -> EclResult<()> {
        self.apply_scalar(BinaryOp::Sub, scalar)
    }

    pub fn mul_scalar(&mut self, scalar: Value) -> EclResult<()> {
        self.apply_scalar(BinaryOp::Mul, scalar)
    }

    pub fn div_scalar(&mut self, scalar: Value) -> EclResult<()> {
        self.apply_scalar(BinaryOp::Div, scalar)
    }

    /// Multiply a floating keyword by `factor`
    pub fn scale(&mut self, factor: f64) -> EclResult<()> {
        self.require_floating()?;
        self.apply_scalar(BinaryOp::Mul, Value::Double(factor))
    }

    /// Add `offset` to every element of a floating keyword
    pub fn shift(&mut self, offset: f64) -> EclResult<()> {
        self.require_floating()?;
        self.apply_scalar(BinaryOp::Add, Value::Double(offset))
    }

    pub fn abs(&mut self) -> EclResult<()> {
        match &mut self.data {
            KeywordData::Int(a) => a.iter_mut().for_each(|x| *x = x.wrapping_abs()),
            KeywordData::Float(a) => a.iter_mut().for_each(|x| *x = x.abs()),
            KeywordData::Double(a) => a.iter_mut().for_each(|x| *x = x.abs()),
            _ => return Err(not_numeric(self.header.data_type)),
        }
        Ok(())
    }

    /// Replace every element of a floating keyword by its reciprocal
    pub fn inv(&mut self) -> EclResult<()> {
        self.require_floating()?;
        match &mut self.data {
            KeywordData::Float(a) => a.iter_mut().for_each(|x| *x = 1.0 / *x),
            KeywordData::Double(a) => a.iter_mut().for_each(|x| *x = 1.0 / *x),
            _ => {}
        }
        Ok(())
    }

    /// Sum of all elements in the keyword's own type
    pub fn sum(&self) -> EclResult<Value> {
        match &self.data {
            KeywordData::Int(a) => Ok(Value::Int(a.iter().fold(0i32, |s, x| s.wrapping_add(*x)))),
            KeywordData::Float(a) => Ok(Value::Float(a.iter().sum())),
            KeywordData::Double(a) => Ok(Value::Double(a.iter().sum())),
            _ => Err(not_numeric(self.header.data_type)),
        }
    }

    /// `(max, min)` of a numeric keyword, `None` when empty
    pub fn max_min(&self) -> EclResult<Option<(Value, Value)>> {
        match &self.data {
            KeywordData::Int(a) => Ok(a
                .iter()
                .max()
                .zip(a.iter().min())
                .map(|(max, min)| (Value::Int(*max), Value::Int(*min)))),
            KeywordData::Float(a) => Ok(fold_max_min(a.iter().map(|x| *x as f64))
                .map(|(max, min)| (Value::Float(max as f32), Value::Float(min as f32)))),
            KeywordData::Double(a) => Ok(fold_max_min(a.iter().copied())
                .map(|(max, min)| (Value::Double(max), Value::Double(min)))),
            _ => Err(not_numeric(self.header.data_type)),
        }
    }

    /// Exact equality of header and element bits
    pub fn equal(&self, other: &Keyword) -> bool {
        self == other
    }

    /// Same name, count and element type
    pub fn header_equal(&self, other: &Keyword) -> bool {
        self.header == other.header
    }

    /// Headers equal and floating elements within `epsilon` (absolute and
    /// relative); all other types compare exactly
    pub fn approximately_equal(&self, other: &Keyword, epsilon: f64) -> bool {
        self.numeric_equal(other, epsilon, epsilon)
    }

    pub fn numeric_equal(&self, other: &Keyword, abs_eps: f64, rel_eps: f64) -> bool {
        if !self.header_equal(other) {
            return false;
        }
        match (&self.data, &other.data) {
            (KeywordData::Float(a), KeywordData::Float(b)) => a
                .iter()
                .zip(b)
                .all(|(x, y)| approx_equal(*x as f64, *y as f64, abs_eps, rel_eps)),
            (KeywordData::Double(a), KeywordData::Double(b)) => {
                a.iter().zip(b).all(|(x, y)| approx_equal(*x, *y, abs_eps, rel_eps))
            }
            _ => self == other,
        }
    }

    /// Index of the first element at or after `offset` that differs from
    /// `other`, or `count()` when the tails agree
    pub fn first_different(
        &self,
        other: &Keyword,
        offset: usize,
        abs_eps: f64,
        rel_eps: f64,
    ) -> EclResult<usize> {
        if self.data_type() != other.data_type() || self.count() != other.count() {
            return Err(EclError::TypeMismatch {
                expected: format!("{}[{}]", self.data_type(), self.count()),
                found: format!("{}[{}]", other.data_type(), other.count()),
            });
        }
        if offset >= self.count() {
            return Err(EclError::OutOfRange {
                offset,
                count: 0,
                len: self.count(),
            });
        }

        let width = self.data_type().element_size();
        let position = match (&self.data, &other.data) {
            (KeywordData::Int(a), KeywordData::Int(b)) => (offset..a.len()).find(|&i| a[i] != b[i]),
            (KeywordData::Bool(a), KeywordData::Bool(b)) => (offset..a.len()).find(|&i| a[i] != b[i]),
            (KeywordData::Float(a), KeywordData::Float(b)) => (offset..a.len())
                .find(|&i| !approx_equal(a[i] as f64, b[i] as f64, abs_eps, rel_eps)),
            (KeywordData::Double(a), KeywordData::Double(b)) => {
                (offset..a.len()).find(|&i| !approx_equal(a[i], b[i], abs_eps, rel_eps))
            }
            (KeywordData::Alpha(a), KeywordData::Alpha(b)) => (offset..self.count())
                .find(|&i| a[i * width..(i + 1) * width] != b[i * width..(i + 1) * width]),
            _ => None,
        };
        Ok(position.unwrap_or(self.count()))
    }

    fn check_operand(&self, other: &Keyword) -> EclResult<()> {
        if self.data_type() != other.data_type() || self.count() != other.count() {
            return Err(EclError::TypeMismatch {
                expected: format!("{}[{}]", self.data_type(), self.count()),
                found: format!("{}[{}]", other.data_type(), other.count()),
            });
        }
        if !self.data_type().is_numeric() {
            return Err(not_numeric(self.header.data_type));
        }
        Ok(())
    }

    fn require_floating(&self) -> EclResult<()> {
        if !self.data_type().is_floating() {
            return Err(EclError::TypeMismatch {
                expected: "REAL or DOUB".to_string(),
                found: self.data_type().to_string(),
            });
        }
        Ok(())
    }
}

fn not_numeric(data_type: DataType) -> EclError {
    EclError::TypeMismatch {
        expected: "numeric".to_string(),
        found: data_type.to_string(),
    }
}

fn scalar_as_f64(scalar: &Value) -> EclResult<f64> {
    match scalar {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v as f64),
        Value::Double(v) => Ok(*v),
        other => Err(EclError::TypeMismatch {
            expected: "numeric".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn fold_max_min(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, x| match acc {
        None => Some((x, x)),
        Some((max, min)) => Some((max.max(x), min.min(x))),
    })
}
