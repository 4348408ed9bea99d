#![allow(unused_macros)]

/// Helper macro for building an [`crate::Error::OutOfRange`] for a reader
///
/// ```rust, ignore
///  return Err(out_of_range_error!(self, offset, 3));
/// ```
macro_rules! out_of_range_error {
    ($reader:expr, $offset:expr, $look_ahead:expr) => {
        crate::Error::OutOfRange {
            base: $reader.base(),
            offset: $offset,
            look_ahead: $look_ahead,
            size: $reader.size(),
        }
    };
}

/// Helper macro for building an [`crate::Error::Unmapped`] for an absolute address
///
/// ```rust, ignore
///  let bytes = region.slice(address, len).ok_or(unmapped_error!(address, len))?;
/// ```
macro_rules! unmapped_error {
    ($address:expr, $len:expr) => {
        crate::Error::Unmapped {
            address: $address,
            len: $len,
        }
    };
}

/// Helper macro that defines a refinement type over [`crate::metadata::handle::Handle`]
///
/// Every generated type accepts exactly its own [`crate::metadata::handle::HandleType`] or
/// `Null`. Accepted values are re-tagged with the expected kind, since typed record fields are
/// stored as bare offsets.
///
/// ```rust, ignore
///  typed_handle!(TypeDefinitionHandle, TypeDefinition);
///  let handle = TypeDefinitionHandle::try_from(raw)?;
/// ```
macro_rules! typed_handle {
    ($name:ident, $kind:ident) => {
        #[doc = concat!("A [`Handle`] refined to `HandleType::", stringify!($kind), "` (or `Null`).")]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(Handle);

        impl TypedHandle for $name {
            const KIND: HandleType = HandleType::$kind;

            fn from_handle_unchecked(handle: Handle) -> Self {
                $name(handle)
            }

            fn handle(&self) -> Handle {
                self.0
            }
        }

        impl TryFrom<Handle> for $name {
            type Error = crate::Error;

            fn try_from(handle: Handle) -> crate::Result<Self> {
                handle.expect_kind(HandleType::$kind)?;
                Ok($name(Handle::new(HandleType::$kind, handle.offset())))
            }
        }

        impl From<$name> for Handle {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}
