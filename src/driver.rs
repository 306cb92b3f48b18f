use crate::card::CardInfo;

/// Data-path state reported by the hardware.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferState {
    Ready,
    Busy,
}

/// Contract implemented once per target hardware. The adapter owns request
/// validation, sequencing and timeouts; implementations only issue vendor
/// commands and report state. Block indices are logical 512 byte units.
pub trait Driver {
    type Error: core::fmt::Debug;

    /// Bring up the card. Called on the 0→1 init transition only.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Tear down the card. Called on the 1→0 deinit transition only.
    fn deinit(&mut self) -> Result<(), Self::Error>;

    /// Geometry and identity snapshot, valid after a successful `init`.
    fn card_info(&self) -> CardInfo;

    /// Current card state. `Busy` while a command is being serviced.
    fn card_state(&mut self) -> TransferState;

    /// Read `count` blocks starting at `block`, blocking until done.
    fn read_blocks(&mut self, buffer: &mut [u8], block: u32, count: u32)
        -> Result<(), Self::Error>;

    /// Write `count` blocks starting at `block`, blocking until done.
    fn write_blocks(&mut self, buffer: &[u8], block: u32, count: u32) -> Result<(), Self::Error>;

    /// Discard the contents of blocks `start..end` (end exclusive).
    fn erase_blocks(&mut self, start: u32, end: u32) -> Result<(), Self::Error>;

    /// Start a DMA read. The hardware keeps using the buffer until
    /// `read_pending` reports `Ready`; the adapter blocks until then, or
    /// calls `abort` when its wait times out first.
    #[cfg(feature = "async")]
    fn read_blocks_async(&mut self, buffer: &mut [u8], block: u32, count: u32)
        -> Result<(), Self::Error>;

    /// Start a DMA write. Same buffer rules as `read_blocks_async`.
    #[cfg(feature = "async")]
    fn write_blocks_async(&mut self, buffer: &[u8], block: u32, count: u32)
        -> Result<(), Self::Error>;

    /// DMA read completion state.
    #[cfg(feature = "async")]
    fn read_pending(&mut self) -> TransferState;

    /// DMA write completion state.
    #[cfg(feature = "async")]
    fn write_pending(&mut self) -> TransferState;

    /// Stop an in-flight DMA transfer whose completion wait timed out.
    /// Targets without a vendor abort primitive keep the no-op default, in
    /// which case the hardware may still write the buffer after the
    /// operation has returned.
    #[cfg(feature = "async")]
    fn abort(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
