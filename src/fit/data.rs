//! Field values of data records.

use super::definition::{BaseType, FieldDefinition};

/// A decoded field value.
///
/// Values holding the base type's 'invalid' marker never appear: scalars are
/// dropped entirely, array elements are filtered out.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Array(Vec<Value>),
}

/// A field of a data message.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub base_type: BaseType,
    pub value: Value,
}

impl Value {
    /// The value as an integer, if it is numeric. Arrays yield their first
    /// element.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            Self::U8(x) => x.into(),
            Self::U16(x) => x.into(),
            Self::U32(x) => x.into(),
            Self::U64(x) => x.into(),
            Self::I8(x) => x.into(),
            Self::I16(x) => x.into(),
            Self::I32(x) => x.into(),
            Self::I64(x) => x.into(),
            Self::F32(x) => x as i128,
            Self::F64(x) => x as i128,
            Self::String(_) => return None,
            Self::Array(ref v) => v.first()?.as_i128()?,
        })
    }

    /// The value as a float, if it is numeric. Arrays yield their first
    /// element.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(x) => Some(x.into()),
            Self::F64(x) => Some(x),
            Self::Array(ref v) => v.first()?.as_f64(),
            _ => self.as_i128().map(|x| x as f64),
        }
    }
}

/// Conversion from a field value to a Rust type, used by message views.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_value_integer {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Option<Self> {
                    value.as_i128()?.try_into().ok()
                }
            }
        )*
    };
}

from_value_integer!(u8, u16, u32, u64, i8, i16, i32, i64);

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|x| x as f32)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(v) => v.iter().map(T::from_value).collect(),
            scalar => Some(vec![T::from_value(scalar)?]),
        }
    }
}

/// Decoding of a single element of a base type.
pub trait Primitive {
    /// The Rust primitive corresponding to this base type.
    type Into: Into<Value>;

    const SIZE: usize;

    /// Convert bytes of this base type to the corresponding primitive, if
    /// valid.
    fn decode(r: &[u8], is_le: bool) -> Option<Self::Into>;
}

macro_rules! primitive {
    ($t:ident, $into:ident, |$x:ident| $valid:expr, $(#[$attr:meta])*) => {
        $(#[$attr])*
        #[derive(Debug)]
        pub struct $t;

        impl Primitive for $t {
            type Into = $into;

            const SIZE: usize = size_of::<$into>();

            fn decode(r: &[u8], is_le: bool) -> Option<$into> {
                let r = r.try_into().ok()?;

                let $x = if is_le {
                    $into::from_le_bytes(r)
                } else {
                    $into::from_be_bytes(r)
                };

                ($valid).then_some($x)
            }
        }
    };
}

macro_rules! value_from {
    ($($into:ident => $variant:ident),*) => {
        $(
            impl From<$into> for Value {
                fn from(x: $into) -> Self {
                    Self::$variant(x)
                }
            }
        )*
    };
}

primitive!(U8, u8, |x| x != u8::MAX, /** `uint8`, `enum`, `byte` */);
primitive!(U8Z, u8, |x| x != u8::MIN, /** `uint8z` */);
primitive!(U16, u16, |x| x != u16::MAX, /** `uint16` */);
primitive!(U16Z, u16, |x| x != u16::MIN, /** `uint16z` */);
primitive!(U32, u32, |x| x != u32::MAX, /** `uint32` */);
primitive!(U32Z, u32, |x| x != u32::MIN, /** `uint32z` */);
primitive!(U64, u64, |x| x != u64::MAX, /** `uint64` */);
primitive!(U64Z, u64, |x| x != u64::MIN, /** `uint64z` */);

primitive!(I8, i8, |x| x != i8::MAX, /** `sint8` */);
primitive!(I16, i16, |x| x != i16::MAX, /** `sint16` */);
primitive!(I32, i32, |x| x != i32::MAX, /** `sint32` */);
primitive!(I64, i64, |x| x != i64::MAX, /** `sint64` */);

primitive!(F32, f32, |x| !x.is_nan(), /** `float32` */);
primitive!(F64, f64, |x| !x.is_nan(), /** `float64` */);

value_from!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);
value_from!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);
value_from!(f32 => F32, f64 => F64);

/// Decode the bytes of one field, returning `None` when it holds no valid
/// value.
pub fn decode_field(definition: &FieldDefinition, r: &[u8], is_le: bool) -> Option<Field> {
    let base_type = definition.base_type;

    let value = match base_type {
        BaseType::String => decode_string(r)?,
        // Byte arrays are only invalid as a whole.
        BaseType::Byte => decode_bytes(r)?,
        _ if r.is_empty() || r.len() % base_type.size() != 0 => decode_bytes(r)?,
        BaseType::Enum | BaseType::UInt8 => decode_elements::<U8>(r, is_le)?,
        BaseType::UInt8z => decode_elements::<U8Z>(r, is_le)?,
        BaseType::UInt16 => decode_elements::<U16>(r, is_le)?,
        BaseType::UInt16z => decode_elements::<U16Z>(r, is_le)?,
        BaseType::UInt32 => decode_elements::<U32>(r, is_le)?,
        BaseType::UInt32z => decode_elements::<U32Z>(r, is_le)?,
        BaseType::UInt64 => decode_elements::<U64>(r, is_le)?,
        BaseType::UInt64z => decode_elements::<U64Z>(r, is_le)?,
        BaseType::SInt8 => decode_elements::<I8>(r, is_le)?,
        BaseType::SInt16 => decode_elements::<I16>(r, is_le)?,
        BaseType::SInt32 => decode_elements::<I32>(r, is_le)?,
        BaseType::SInt64 => decode_elements::<I64>(r, is_le)?,
        BaseType::Float32 => decode_elements::<F32>(r, is_le)?,
        BaseType::Float64 => decode_elements::<F64>(r, is_le)?,
    };

    Some(Field { base_type, value })
}

fn decode_elements<T: Primitive>(r: &[u8], is_le: bool) -> Option<Value> {
    let mut values: Vec<Value> = r
        .chunks_exact(T::SIZE)
        .filter_map(|c| T::decode(c, is_le))
        .map(Into::into)
        .collect();

    match values.len() {
        0 => None,
        1 if r.len() == T::SIZE => values.pop(),
        _ => Some(Value::Array(values)),
    }
}

fn decode_bytes(r: &[u8]) -> Option<Value> {
    if r.iter().all(|&b| b == u8::MAX) {
        return None;
    }

    Some(match r {
        [b] => Value::U8(*b),
        _ => Value::Array(r.iter().map(|&b| Value::U8(b)).collect()),
    })
}

fn decode_string(r: &[u8]) -> Option<Value> {
    let end = r.iter().position(|&b| b == 0).unwrap_or(r.len());

    if end == 0 {
        return None;
    }

    Some(Value::String(
        String::from_utf8_lossy(&r[..end]).into_owned(),
    ))
}
