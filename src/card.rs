use core::fmt;

use bitfield::bitfield;

/// The only block size this adapter supports, in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Card family reported by the driver during identification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardType {
    None,
    /// v1.x standard capacity
    V1,
    /// v2.x standard capacity
    V2,
    /// v2.x high capacity
    V2Hc,
    Unknown,
}

bitfield! {
    /// Card command classes advertised in the CSD.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct CardClass(u32);
    pub basic, _: 0;
    pub block_read, _: 2;
    pub block_write, _: 4;
    pub erase, _: 5;
    pub write_protection, _: 6;
    pub application_specific, _: 8;
}

impl From<u32> for CardClass {
    fn from(bits: u32) -> Self {
        CardClass(bits)
    }
}

impl CardClass {
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CardClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardClass({:#x})", self.0)
    }
}

/// Geometry and identity snapshot, fetched once per successful init and
/// immutable until the next re-init.
#[derive(Copy, Clone, Debug)]
pub struct CardInfo {
    pub card_type: CardType,
    pub card_version: u32,
    pub card_class: CardClass,
    /// Relative card address assigned during identification.
    pub rel_card_addr: u32,
    /// Physical capacity in blocks.
    pub block_count: u32,
    /// Physical block size in bytes.
    pub block_size: u32,
    /// Logical capacity in blocks.
    pub log_block_count: u32,
    /// Logical block size in bytes.
    pub log_block_size: u32,
}
