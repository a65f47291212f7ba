//! LC-3 memory subsystem.
//!
//! A flat 16-bit address space of 65536 sixteen-bit cells. Every `u16` is a
//! valid address, so reads and writes are infallible; only bulk loads can
//! fail when a program does not fit above its origin.

use crate::word::Word;
use thiserror::Error;

/// The number of addressable memory cells.
pub const MEMORY_SIZE: usize = 1 << 16;

/// LC-3 memory: 65536 sixteen-bit cells.
#[derive(Clone)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    #[inline]
    pub fn read(&self, addr: Word) -> Word {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: Word, value: Word) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy `program` into memory starting at `origin`.
    pub fn load_at(&mut self, origin: Word, program: &[Word]) -> Result<(), MemoryError> {
        let start = origin as usize;
        if start + program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                origin,
                size: program.len(),
                available: MEMORY_SIZE - start,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump `count` cells starting at `start`, wrapping past the top of memory.
    pub fn dump(&self, start: Word, count: usize) -> Vec<(Word, Word)> {
        (0..count.min(MEMORY_SIZE))
            .map(|i| {
                let addr = start.wrapping_add(i as Word);
                (addr, self.read(addr))
            })
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("program of {size} words at x{origin:04X} exceeds available space of {available} words")]
    ProgramTooLarge {
        origin: Word,
        size: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(0x3000, 0x1234);
        assert_eq!(mem.read(0x3000), 0x1234);
        assert_eq!(mem.read(0x3001), 0);
    }

    #[test]
    fn test_memory_top_cell() {
        let mut mem = Memory::new();
        mem.write(0xFFFF, 0xBEEF);
        assert_eq!(mem.read(0xFFFF), 0xBEEF);
    }

    #[test]
    fn test_load_at() {
        let mut mem = Memory::new();
        mem.load_at(0x3000, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0x3000), 1);
        assert_eq!(mem.read(0x3001), 2);
        assert_eq!(mem.read(0x3002), 3);
    }

    #[test]
    fn test_load_at_exact_fit() {
        let mut mem = Memory::new();
        assert!(mem.load_at(0xFFFE, &[7, 8]).is_ok());
        assert_eq!(mem.read(0xFFFF), 8);
    }

    #[test]
    fn test_load_too_large() {
        let mut mem = Memory::new();
        let err = mem.load_at(0xFFFE, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            MemoryError::ProgramTooLarge {
                origin: 0xFFFE,
                size: 3,
                available: 2
            }
        );
    }

    #[test]
    fn test_dump_wraps() {
        let mut mem = Memory::new();
        mem.write(0xFFFF, 9);
        mem.write(0x0000, 10);
        assert_eq!(mem.dump(0xFFFF, 2), vec![(0xFFFF, 9), (0x0000, 10)]);
    }

    #[test]
    fn test_clear() {
        let mut mem = Memory::new();
        mem.write(0x4000, 1);
        mem.clear();
        assert_eq!(mem.read(0x4000), 0);
    }
}
