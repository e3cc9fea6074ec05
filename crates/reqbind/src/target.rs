//! Conversion target types.
//!
//! The set of types a request value can be converted into is closed:
//! booleans, integers, floats, complex numbers, strings, vectors of those,
//! and [`File`] values. [`BindTarget`] ties each Rust type to its
//! [`TypeKind`] so the converter can dispatch on an enum instead of on the
//! concrete type.

use num_complex::{Complex32, Complex64};

use crate::{ConvertError, File};

/// Primitive conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `isize`
    Isize,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `usize`
    Usize,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// Complex number with `f32` components.
    Complex32,
    /// Complex number with `f64` components.
    Complex64,
    /// `String`
    String,
}

impl ScalarKind {
    /// Returns the Rust name of the target type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Complex32 => "Complex32",
            Self::Complex64 => "Complex64",
            Self::String => "String",
        }
    }

    /// Returns the kind family: `bool`, `int`, `uint`, `float`, `complex`
    /// or `string`.
    #[must_use]
    pub const fn family(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::Isize => "int",
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::Usize => "uint",
            Self::F32 | Self::F64 => "float",
            Self::Complex32 | Self::Complex64 => "complex",
            Self::String => "string",
        }
    }

    /// Returns the bit width for numeric kinds.
    ///
    /// Complex kinds report the total width of both components.
    #[must_use]
    pub const fn bits(self) -> Option<u32> {
        match self {
            Self::I8 | Self::U8 => Some(8),
            Self::I16 | Self::U16 => Some(16),
            Self::I32 | Self::U32 | Self::F32 => Some(32),
            Self::I64 | Self::U64 | Self::F64 | Self::Complex32 => Some(64),
            Self::Isize => Some(isize::BITS),
            Self::Usize => Some(usize::BITS),
            Self::Complex64 => Some(128),
            Self::Bool | Self::String => None,
        }
    }
}

/// Shape of a destination field as seen by the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A single primitive value.
    Scalar(ScalarKind),
    /// A vector of primitive values bound from a comma-separated list.
    Slice(ScalarKind),
    /// A [`File`] value.
    File,
    /// An optional [`File`] value; `None` when no upload was bound.
    OptionalFile,
    /// A shape the binder cannot fill, with a description.
    Unsupported(&'static str),
}

impl TypeKind {
    /// Returns a short description of the kind.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Scalar(kind) => kind.name(),
            Self::Slice(_) => "slice",
            Self::File => "File",
            Self::OptionalFile => "Option<File>",
            Self::Unsupported(name) => name,
        }
    }

    /// Returns true for the two file kinds.
    #[must_use]
    pub const fn is_file(self) -> bool {
        matches!(self, Self::File | Self::OptionalFile)
    }
}

/// A converted primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `bool` value.
    Bool(bool),
    /// `i8` value.
    I8(i8),
    /// `i16` value.
    I16(i16),
    /// `i32` value.
    I32(i32),
    /// `i64` value.
    I64(i64),
    /// `isize` value.
    Isize(isize),
    /// `u8` value.
    U8(u8),
    /// `u16` value.
    U16(u16),
    /// `u32` value.
    U32(u32),
    /// `u64` value.
    U64(u64),
    /// `usize` value.
    Usize(usize),
    /// `f32` value.
    F32(f32),
    /// `f64` value.
    F64(f64),
    /// `Complex32` value.
    Complex32(Complex32),
    /// `Complex64` value.
    Complex64(Complex64),
    /// `String` value.
    String(String),
}

/// A converted value ready to be stored into a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// A single primitive.
    Scalar(Value),
    /// List elements in order; `None` marks an empty element that keeps the
    /// element's zero value.
    List(Vec<Option<Value>>),
    /// An uploaded file.
    File(File),
}

/// A Rust type that request values can be converted into.
pub trait BindTarget: Default {
    /// Conversion target kind, fixed per type.
    const KIND: TypeKind;

    /// Stores a converted value.
    ///
    /// Fails with [`ConvertError::Unsupported`] when the assignment does
    /// not match [`Self::KIND`].
    fn assign(&mut self, value: Assignment) -> Result<(), ConvertError>;
}

fn mismatch(kind: TypeKind) -> ConvertError {
    ConvertError::Unsupported(kind.describe())
}

macro_rules! impl_scalar_target {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl BindTarget for $ty {
                const KIND: TypeKind = TypeKind::Scalar(ScalarKind::$kind);

                fn assign(&mut self, value: Assignment) -> Result<(), ConvertError> {
                    match value {
                        Assignment::Scalar(Value::$kind(v)) => {
                            *self = v;
                            Ok(())
                        }
                        _ => Err(mismatch(Self::KIND)),
                    }
                }
            }
        )*
    };
}

impl_scalar_target! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    Complex32 => Complex32,
    Complex64 => Complex64,
    String => String,
}

impl<T: BindTarget> BindTarget for Vec<T> {
    const KIND: TypeKind = match T::KIND {
        TypeKind::Scalar(kind) => TypeKind::Slice(kind),
        TypeKind::Slice(_) => TypeKind::Unsupported("slice of slice"),
        TypeKind::File | TypeKind::OptionalFile => TypeKind::Unsupported("slice of file"),
        TypeKind::Unsupported(name) => TypeKind::Unsupported(name),
    };

    fn assign(&mut self, value: Assignment) -> Result<(), ConvertError> {
        let Assignment::List(items) = value else {
            return Err(mismatch(Self::KIND));
        };

        let mut elements = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let mut element = T::default();
            if let Some(value) = item {
                element
                    .assign(Assignment::Scalar(value))
                    .map_err(|e| ConvertError::element(index, e))?;
            }
            elements.push(element);
        }

        *self = elements;
        Ok(())
    }
}

impl BindTarget for File {
    const KIND: TypeKind = TypeKind::File;

    fn assign(&mut self, value: Assignment) -> Result<(), ConvertError> {
        match value {
            Assignment::File(file) => {
                *self = file;
                Ok(())
            }
            _ => Err(mismatch(Self::KIND)),
        }
    }
}

impl BindTarget for Option<File> {
    const KIND: TypeKind = TypeKind::OptionalFile;

    fn assign(&mut self, value: Assignment) -> Result<(), ConvertError> {
        match value {
            Assignment::File(file) => {
                *self = Some(file);
                Ok(())
            }
            _ => Err(mismatch(Self::KIND)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(<u16 as BindTarget>::KIND, TypeKind::Scalar(ScalarKind::U16));
        assert_eq!(<String as BindTarget>::KIND, TypeKind::Scalar(ScalarKind::String));
        assert_eq!(
            <Complex32 as BindTarget>::KIND,
            TypeKind::Scalar(ScalarKind::Complex32)
        );
    }

    #[test]
    fn test_vec_kinds() {
        assert_eq!(<Vec<i64> as BindTarget>::KIND, TypeKind::Slice(ScalarKind::I64));
        assert_eq!(
            <Vec<Vec<i64>> as BindTarget>::KIND,
            TypeKind::Unsupported("slice of slice")
        );
        assert_eq!(
            <Vec<File> as BindTarget>::KIND,
            TypeKind::Unsupported("slice of file")
        );
    }

    #[test]
    fn test_kind_metadata() {
        assert_eq!(ScalarKind::I16.family(), "int");
        assert_eq!(ScalarKind::Usize.family(), "uint");
        assert_eq!(ScalarKind::I16.bits(), Some(16));
        assert_eq!(ScalarKind::Complex32.bits(), Some(64));
        assert_eq!(ScalarKind::Complex64.bits(), Some(128));
        assert_eq!(ScalarKind::String.bits(), None);
        assert!(TypeKind::OptionalFile.is_file());
        assert!(!TypeKind::Slice(ScalarKind::U8).is_file());
    }

    #[test]
    fn test_scalar_assign_mismatch() {
        let mut value = 0_u8;
        let err = value.assign(Assignment::Scalar(Value::I8(1))).unwrap_err();
        assert_eq!(err, ConvertError::Unsupported("u8"));
        assert_eq!(value, 0);
    }

    #[test]
    fn test_vec_assign_fills_empty_elements_with_zero() {
        let mut values: Vec<u32> = vec![9, 9, 9, 9];
        values
            .assign(Assignment::List(vec![
                Some(Value::U32(1)),
                None,
                Some(Value::U32(3)),
            ]))
            .unwrap();
        assert_eq!(values, vec![1, 0, 3]);
    }

    #[test]
    fn test_optional_file_assign() {
        let mut file: Option<File> = None;
        file.assign(Assignment::File(File::new(
            "a.txt",
            3,
            Bytes::from_static(b"abc"),
        )))
        .unwrap();
        assert_eq!(file.as_ref().map(File::name), Some("a.txt"));
    }
}
