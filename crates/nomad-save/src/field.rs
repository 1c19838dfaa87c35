//! Typed field values and their payload encoding.
//!
//! Scalars and vectors are stored little-endian at their natural width,
//! strings as raw UTF-8, arrays as `{ i32 elementType, u32 count, elements }`.

use std::fmt;

use glam::{Vec2, Vec3, Vec4};
use serde::Serialize;

use crate::error::FieldDecodeError;

/// On-disk type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum FieldType {
    I8 = 0,
    I16 = 1,
    I32 = 2,
    I64 = 3,
    U8 = 4,
    U16 = 5,
    U32 = 6,
    U64 = 7,
    F32 = 8,
    String = 9,
    Vec2 = 10,
    Vec3 = 11,
    Vec4 = 12,
    Array = 13,
}

impl FieldType {
    pub fn from_tag(tag: i32) -> Option<Self> {
        Some(match tag {
            0 => Self::I8,
            1 => Self::I16,
            2 => Self::I32,
            3 => Self::I64,
            4 => Self::U8,
            5 => Self::U16,
            6 => Self::U32,
            7 => Self::U64,
            8 => Self::F32,
            9 => Self::String,
            10 => Self::Vec2,
            11 => Self::Vec3,
            12 => Self::Vec4,
            13 => Self::Array,
            _ => return None,
        })
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Payload width for fixed-size types, `None` for strings and arrays.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::Vec2 => Some(8),
            Self::Vec3 => Some(12),
            Self::Vec4 => Some(16),
            Self::String | Self::Array => None,
        }
    }

    /// Types allowed as array elements.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::F32
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::String => "string",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Homogeneous array of numeric elements, kept in encoded form.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    element: FieldType,
    count: u32,
    bytes: Vec<u8>,
}

impl ArrayValue {
    pub fn from_slice<T: ArrayElement>(items: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(items.len() * T::TYPE.fixed_size().unwrap_or(0));
        for item in items {
            item.write_le(&mut bytes);
        }
        Self {
            element: T::TYPE,
            count: items.len() as u32,
            bytes,
        }
    }

    pub fn element_type(&self) -> FieldType {
        self.element
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Decode the elements, `None` if `T` is not the stored element type.
    pub fn to_vec<T: ArrayElement>(&self) -> Option<Vec<T>> {
        if T::TYPE != self.element {
            return None;
        }
        let width = T::TYPE.fixed_size()?;
        Some(self.bytes.chunks_exact(width).map(T::read_le).collect())
    }
}

/// A decoded field value. Each variant owns its data.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    String(String),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Array(ArrayValue),
}

fn put_floats(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn floats<const N: usize>(bytes: &[u8]) -> [f32; N] {
    let mut out = [0.0f32; N];
    for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *slot = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Vec2(_) => FieldType::Vec2,
            FieldValue::Vec3(_) => FieldType::Vec3,
            FieldValue::Vec4(_) => FieldType::Vec4,
            FieldValue::Array(_) => FieldType::Array,
        }
    }

    /// Append the payload bytes (no field header) to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            FieldValue::I8(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U8(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::String(s) => out.extend_from_slice(s.as_bytes()),
            FieldValue::Vec2(v) => put_floats(out, &v.to_array()),
            FieldValue::Vec3(v) => put_floats(out, &v.to_array()),
            FieldValue::Vec4(v) => put_floats(out, &v.to_array()),
            FieldValue::Array(a) => {
                out.extend_from_slice(&a.element.tag().to_le_bytes());
                out.extend_from_slice(&a.count.to_le_bytes());
                out.extend_from_slice(&a.bytes);
            }
        }
    }

    /// Decode a payload of type `ty`.
    pub fn decode(ty: FieldType, bytes: &[u8]) -> Result<Self, FieldDecodeError> {
        if let Some(size) = ty.fixed_size() {
            if bytes.len() != size {
                return Err(FieldDecodeError::WrongWidth {
                    ty,
                    found: bytes.len(),
                    expected: size,
                });
            }
        }

        let value = match ty {
            FieldType::I8 => FieldValue::I8(i8::read_le(bytes)),
            FieldType::I16 => FieldValue::I16(i16::read_le(bytes)),
            FieldType::I32 => FieldValue::I32(i32::read_le(bytes)),
            FieldType::I64 => FieldValue::I64(i64::read_le(bytes)),
            FieldType::U8 => FieldValue::U8(u8::read_le(bytes)),
            FieldType::U16 => FieldValue::U16(u16::read_le(bytes)),
            FieldType::U32 => FieldValue::U32(u32::read_le(bytes)),
            FieldType::U64 => FieldValue::U64(u64::read_le(bytes)),
            FieldType::F32 => FieldValue::F32(f32::read_le(bytes)),
            FieldType::String => FieldValue::String(
                String::from_utf8(bytes.to_vec()).map_err(|_| FieldDecodeError::InvalidUtf8)?,
            ),
            FieldType::Vec2 => FieldValue::Vec2(Vec2::from_array(floats(bytes))),
            FieldType::Vec3 => FieldValue::Vec3(Vec3::from_array(floats(bytes))),
            FieldType::Vec4 => FieldValue::Vec4(Vec4::from_array(floats(bytes))),
            FieldType::Array => FieldValue::Array(decode_array(bytes)?),
        };
        Ok(value)
    }
}

fn decode_array(bytes: &[u8]) -> Result<ArrayValue, FieldDecodeError> {
    if bytes.len() < 8 {
        return Err(FieldDecodeError::ShortArrayHeader(bytes.len()));
    }
    let tag = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let element = FieldType::from_tag(tag)
        .filter(|t| t.is_numeric())
        .ok_or(FieldDecodeError::BadArrayElement(tag))?;
    let width = element.fixed_size().unwrap_or(0);
    let body = &bytes[8..];
    if (count as usize).checked_mul(width) != Some(body.len()) {
        return Err(FieldDecodeError::ArrayLength {
            count,
            element,
            found: body.len(),
        });
    }
    Ok(ArrayValue {
        element,
        count,
        bytes: body.to_vec(),
    })
}

/// Numeric types that can be stored in an array field.
pub trait ArrayElement: Copy {
    const TYPE: FieldType;

    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from exactly `TYPE.fixed_size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! array_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl ArrayElement for $ty {
                const TYPE: FieldType = FieldType::$tag;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

array_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
}

/// Rust types that map one-to-one onto a single field value.
pub trait FieldScalar: Sized {
    const TYPE: FieldType;

    fn into_value(self) -> FieldValue;

    fn from_value(value: &FieldValue) -> Option<Self>;
}

macro_rules! field_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldScalar for $ty {
                const TYPE: FieldType = FieldType::$variant;

                fn into_value(self) -> FieldValue {
                    FieldValue::$variant(self)
                }

                fn from_value(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

field_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    String => String,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
}
