/// Capability set a block-storage stack consumes. Implemented by the SDIO
/// adapter and any other backing store.
pub trait BlockDevice {
    type Error: core::fmt::Debug;

    /// Read `buffer.len()` bytes starting at byte address `addr`. Address
    /// and length must be multiples of [`read_size`](Self::read_size).
    fn read(&mut self, buffer: &mut [u8], addr: u64) -> Result<(), Self::Error>;

    /// Program `buffer.len()` bytes starting at byte address `addr`.
    /// Address and length must be multiples of
    /// [`program_size`](Self::program_size).
    fn program(&mut self, buffer: &[u8], addr: u64) -> Result<(), Self::Error>;

    /// Mark `size` bytes starting at `addr` as discardable. Address and
    /// size must be multiples of [`erase_size`](Self::erase_size).
    fn trim(&mut self, addr: u64, size: u64) -> Result<(), Self::Error>;

    /// Minimum readable unit in bytes.
    fn read_size(&self) -> u64;

    /// Minimum programmable unit in bytes.
    fn program_size(&self) -> u64;

    /// Minimum erasable unit in bytes.
    fn erase_size(&self) -> u64 {
        self.program_size()
    }

    /// Total device size in bytes, 0 before initialization.
    fn size(&self) -> u64;

    /// Identity tag of the backing store.
    fn device_type(&self) -> &'static str;
}
