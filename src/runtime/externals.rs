use crate::{image::Image, runtime::header::ModuleSection, Result};

/// The `CommonFixupsTable` section: an array of 32-bit relative pointers.
///
/// Mapping tables refer to runtime addresses (type handles, method entry points) by their index
/// into this array instead of storing the address itself.
#[derive(Clone, Copy, Debug)]
pub struct ExternalReferencesTable<'a> {
    image: &'a Image,
    start: u64,
    count: u32,
}

impl<'a> ExternalReferencesTable<'a> {
    /// Wraps the table stored in `section`. Trailing bytes that do not fill a whole slot are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] if the section is too large to index with 32 bits,
    /// and [`crate::Error::Unmapped`] if it is not backed by the image.
    pub fn new(image: &'a Image, section: &ModuleSection) -> Result<ExternalReferencesTable<'a>> {
        let count = u32::try_from(section.len() / 4)
            .map_err(|_| bad_format_error!("External reference table is too large"))?;
        let len = usize::try_from(section.len())
            .map_err(|_| bad_format_error!("External reference table is too large"))?;
        if !image.is_mapped(section.start, len) {
            return Err(unmapped_error!(section.start, len));
        }

        Ok(ExternalReferencesTable {
            image,
            start: section.start,
            count,
        })
    }

    /// Number of slots
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The absolute address referenced by slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BadFormat`] for an index past the end of the table.
    pub fn address(&self, index: u32) -> Result<u64> {
        if index >= self.count {
            return Err(bad_format_error!(
                "External reference {} out of range ({} slots)",
                index,
                self.count
            ));
        }

        self.image
            .read_relative_pointer(self.start + u64::from(index) * 4)
    }
}
