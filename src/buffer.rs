//! Operand edit buffer.
//!
//! Bits are entered least-significant first: the first append lands at
//! weight 1, the second at weight 2, and so on. The cursor is a write head
//! in `0..=64`.

/// Number of bits in an operand.
pub const OPERAND_BITS: u8 = 64;

/// Width of the live feedback window.
pub const WINDOW_BITS: u8 = 4;

/// Current operand index and next bit position to write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub operand: usize,
    pub bit: u8,
}

/// Both operands plus the edit cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Operands {
    values: [u64; 2],
    cursor: Cursor,
}

impl Operands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `index`: clears that operand and rewinds the cursor.
    pub fn begin(&mut self, index: usize) {
        debug_assert!(index < 2);
        self.values[index] = 0;
        self.cursor = Cursor {
            operand: index,
            bit: 0,
        };
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn value(&self, index: usize) -> u64 {
        self.values[index]
    }

    pub fn current(&self) -> u64 {
        self.values[self.cursor.operand]
    }

    /// Write `bit` at the cursor and advance. No-op once 64 bits are in.
    ///
    /// A zero bit only moves the cursor; the position is already clear.
    pub fn append(&mut self, bit: bool) -> bool {
        if self.cursor.bit >= OPERAND_BITS {
            return false;
        }
        if bit {
            self.values[self.cursor.operand] |= 1u64 << self.cursor.bit;
        }
        self.cursor.bit += 1;
        true
    }

    /// Step the cursor back and clear the bit it now points at.
    pub fn backspace(&mut self) -> bool {
        if self.cursor.bit == 0 {
            return false;
        }
        self.cursor.bit -= 1;
        self.values[self.cursor.operand] &= !(1u64 << self.cursor.bit);
        true
    }

    /// The four bits ending at the cursor, `[max(bit - 4, 0), bit)`, as a nibble.
    ///
    /// Shown through the nibble display (window bit 3 on lamp 0), the newest
    /// bit lands on lamp 0 once four or more bits are entered. With fewer
    /// bits the window is right-aligned, so the oldest bit sits on lamp 3.
    pub fn window(&self) -> u8 {
        let shift = self.cursor.bit.saturating_sub(WINDOW_BITS);
        // bits above the cursor are always clear, so no upper mask is needed
        ((self.current() >> shift) & 0b1111) as u8
    }
}
