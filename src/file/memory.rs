use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// An executable image handed over as an owned byte buffer, e.g. one dumped from a process
/// or built in a test.
#[derive(Debug)]
pub struct Memory {
    image: Vec<u8>,
}

impl Memory {
    /// Takes ownership of `image`.
    pub fn new(image: Vec<u8>) -> Memory {
        Memory { image }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.image.get(offset..end))
            .ok_or(OutOfBounds)
    }

    fn data(&self) -> &[u8] {
        &self.image
    }

    fn len(&self) -> usize {
        self.image.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory() {
        let mut data = vec![0xCC_u8; 256];
        data[0x10..0x14].copy_from_slice(b"RTR\0");

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 256);
        assert_eq!(memory.data()[0], 0xCC);
        assert_eq!(memory.data_slice(0x10, 4).unwrap(), b"RTR\0");

        assert!(memory
            .data_slice(u32::MAX as usize, u32::MAX as usize)
            .is_err());
        assert!(memory.data_slice(0, 257).is_err());
    }

    #[test]
    fn empty_buffer() {
        let memory = Memory::new(vec![]);

        assert_eq!(memory.len(), 0);
        assert!(memory.data_slice(0, 1).is_err());
        assert!(memory.data_slice(1, 0).is_err());
        assert_eq!(memory.data_slice(0, 0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn offset_overflow() {
        let memory = Memory::new(vec![0x00; 100]);

        assert!(matches!(memory.data_slice(usize::MAX, 1), Err(OutOfBounds)));
        assert!(matches!(memory.data_slice(100, 1), Err(OutOfBounds)));
        assert!(matches!(memory.data_slice(99, 2), Err(OutOfBounds)));
        assert_eq!(memory.data_slice(99, 1).unwrap(), &[0x00]);
    }
}
