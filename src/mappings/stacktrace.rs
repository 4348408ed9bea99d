use bitflags::bitflags;

use crate::{
    metadata::{
        ConstantStringArrayHandle, ConstantStringValueHandle, Handle, HandleType,
        MethodSignatureHandle, TypedHandle,
    },
    nativeformat::{NativeParser, NativeReader},
    Result,
};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    /// Leading byte of every stack trace map entry: which parts of the running state change
    pub struct StackTraceDataCommand : u8 {
        /// A raw 32-bit owning type handle follows
        const UPDATE_OWNING_TYPE = 0x01;
        /// A name string offset follows
        const UPDATE_NAME = 0x02;
        /// A signature offset follows; clears the method instantiation
        const UPDATE_SIGNATURE = 0x04;
        /// A signature offset and a method instantiation offset follow
        const UPDATE_GENERIC_SIGNATURE = 0x08;
        /// The method is hidden from stack traces
        const IS_STACK_TRACE_HIDDEN = 0x10;
    }
}

/// One method of the stack trace map, with the running state applied.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StackTraceEntry {
    /// Address of the method body
    pub method: u64,
    /// Declaring type: a definition, reference or specification
    pub owning_type: Handle,
    /// Method name
    pub name: ConstantStringValueHandle,
    /// Method signature
    pub signature: MethodSignatureHandle,
    /// Generic arguments of an instantiated method
    pub method_instantiation: Option<ConstantStringArrayHandle>,
    /// Hidden from stack traces
    pub is_hidden: bool,
}

/// The `BlobIdStackTraceMethodRvaToTokenMapping` blob: method bodies to metadata.
///
/// A raw `u32` entry count is followed by delta-encoded entries. Every entry only stores the
/// fields that differ from the previous one, then a 32-bit relative pointer to the method.
#[derive(Clone, Copy, Debug)]
pub struct StackTraceMap<'a> {
    reader: NativeReader<'a>,
    count: u32,
}

impl<'a> StackTraceMap<'a> {
    /// Reads the entry count.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] if the blob is shorter than the count.
    pub fn new(reader: NativeReader<'a>) -> Result<StackTraceMap<'a>> {
        let count = reader.read_u32(0)?;
        Ok(StackTraceMap { reader, count })
    }

    /// Declared number of entries
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Decodes the entries in order.
    ///
    /// Iteration ends after the declared count or at the end of the blob, whichever comes
    /// first. An error ends the iteration.
    #[must_use]
    pub fn entries(&self) -> StackTraceEntries<'a> {
        StackTraceEntries {
            parser: NativeParser::new(self.reader, 4),
            remaining: self.count,
            state: StackTraceEntry {
                method: 0,
                owning_type: Handle::default(),
                name: ConstantStringValueHandle::from_handle_unchecked(Handle::default()),
                signature: MethodSignatureHandle::from_handle_unchecked(Handle::default()),
                method_instantiation: None,
                is_hidden: false,
            },
            done: false,
        }
    }
}

/// Iterator returned by [`StackTraceMap::entries`].
#[derive(Clone, Debug)]
pub struct StackTraceEntries<'a> {
    parser: NativeParser<'a>,
    remaining: u32,
    state: StackTraceEntry,
    done: bool,
}

impl StackTraceEntries<'_> {
    fn advance(&mut self) -> Result<StackTraceEntry> {
        let command = StackTraceDataCommand::from_bits_retain(self.parser.get_u8()?);

        if command.contains(StackTraceDataCommand::UPDATE_OWNING_TYPE) {
            let owning_type = Handle::from_raw(self.parser.get_u32()?)?;
            let is_type = matches!(
                owning_type.kind(),
                HandleType::TypeDefinition
                    | HandleType::TypeReference
                    | HandleType::TypeSpecification
            );
            if !is_type {
                return Err(bad_format_error!(
                    "Owning type {} at 0x{:x} is not a type",
                    owning_type,
                    self.parser.address()
                ));
            }
            self.state.owning_type = owning_type;
        }

        if command.contains(StackTraceDataCommand::UPDATE_NAME) {
            self.state.name = ConstantStringValueHandle::from_handle_unchecked(Handle::new(
                HandleType::ConstantStringValue,
                self.parser.get_unsigned()?,
            ));
        }

        if command.contains(StackTraceDataCommand::UPDATE_SIGNATURE) {
            self.state.signature = self.signature()?;
            self.state.method_instantiation = None;
        }

        if command.contains(StackTraceDataCommand::UPDATE_GENERIC_SIGNATURE) {
            self.state.signature = self.signature()?;
            self.state.method_instantiation =
                Some(ConstantStringArrayHandle::from_handle_unchecked(Handle::new(
                    HandleType::ConstantStringArray,
                    self.parser.get_unsigned()?,
                )));
        }

        let at = self.parser.address();
        let delta = self.parser.get_raw::<i32>()?;
        self.state.method = at.wrapping_add_signed(i64::from(delta));
        self.state.is_hidden = command.contains(StackTraceDataCommand::IS_STACK_TRACE_HIDDEN);

        Ok(self.state)
    }

    fn signature(&mut self) -> Result<MethodSignatureHandle> {
        Ok(MethodSignatureHandle::from_handle_unchecked(Handle::new(
            HandleType::MethodSignature,
            self.parser.get_unsigned()?,
        )))
    }
}

impl Iterator for StackTraceEntries<'_> {
    type Item = Result<StackTraceEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let exhausted = self.parser.offset() >= self.parser.reader().size();
        if self.done || self.remaining == 0 || exhausted {
            self.done = true;
            return None;
        }

        self.remaining -= 1;
        let entry = self.advance();
        if entry.is_err() {
            self.done = true;
        }
        Some(entry)
    }
}

impl std::iter::FusedIterator for StackTraceEntries<'_> {}
