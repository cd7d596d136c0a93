use crate::time::Time;

/// A complex number as stored by the archive primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

/// Mutable view of an enumeration value, used by the bindings to pick the
/// integer (binary) or textual (XML) representation.
pub trait EnumValue {
    fn to_i32(&self) -> i32;
    /// Returns `false` if `value` is not a valid discriminant.
    fn set_i32(&mut self, value: i32) -> bool;
    fn name(&self) -> &'static str;
    /// Returns `false` if `name` is not a known variant name.
    fn set_name(&mut self, name: &str) -> bool;
}

/// One primitive slot handed to a binding. Reading fills it, writing reads it.
pub enum PrimitiveMut<'a> {
    Int(&'a mut i32),
    Float(&'a mut f32),
    Double(&'a mut f64),
    Bool(&'a mut bool),
    Text(&'a mut String),
    Time(&'a mut Time),
    ComplexFloat(&'a mut Complex<f32>),
    ComplexDouble(&'a mut Complex<f64>),
    Bytes(&'a mut Vec<u8>),
    IntVec(&'a mut Vec<i32>),
    FloatVec(&'a mut Vec<f32>),
    DoubleVec(&'a mut Vec<f64>),
    ComplexVec(&'a mut Vec<Complex<f64>>),
    TextVec(&'a mut Vec<String>),
    Enum(&'a mut dyn EnumValue),
}

/// A property type that maps onto one archive primitive.
pub trait ArchiveValue {
    fn as_primitive(&mut self) -> PrimitiveMut<'_>;
}

macro_rules! archive_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl ArchiveValue for $ty {
                fn as_primitive(&mut self) -> PrimitiveMut<'_> {
                    PrimitiveMut::$variant(self)
                }
            }
        )+
    };
}

archive_value! {
    i32 => Int,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    String => Text,
    Time => Time,
    Complex<f32> => ComplexFloat,
    Complex<f64> => ComplexDouble,
    Vec<u8> => Bytes,
    Vec<i32> => IntVec,
    Vec<f32> => FloatVec,
    Vec<f64> => DoubleVec,
    Vec<Complex<f64>> => ComplexVec,
    Vec<String> => TextVec,
}

/// Declares a C-like enumeration that archives as an `int32` in binary and as
/// its name in text bindings.
///
/// The first variant is the `Default`.
///
/// ```
/// seisgraph_core::enumeration! {
///     pub enum Quality {
///         Good = 0 => "good",
///         Bad = 1 => "bad",
///     }
/// }
/// assert_eq!(Quality::from_name("bad"), Some(Quality::Bad));
/// assert_eq!(Quality::default(), Quality::Good);
/// ```
#[macro_export]
macro_rules! enumeration {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $value:literal => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub const VARIANTS: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::VARIANTS[0]
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::archive::EnumValue for $name {
            fn to_i32(&self) -> i32 {
                *self as i32
            }

            fn set_i32(&mut self, value: i32) -> bool {
                match Self::from_i32(value) {
                    Some(v) => {
                        *self = v;
                        true
                    }
                    None => false,
                }
            }

            fn name(&self) -> &'static str {
                self.as_str()
            }

            fn set_name(&mut self, name: &str) -> bool {
                match Self::from_name(name) {
                    Some(v) => {
                        *self = v;
                        true
                    }
                    None => false,
                }
            }
        }

        impl $crate::archive::ArchiveValue for $name {
            fn as_primitive(&mut self) -> $crate::archive::PrimitiveMut<'_> {
                $crate::archive::PrimitiveMut::Enum(self)
            }
        }
    };
}
