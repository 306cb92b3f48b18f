/// Errors returned by the adapter. All are reported to the caller; nothing
/// at this layer panics or retries. Whether a failure is transient is for
/// the storage stack above to decide.
#[derive(Debug)]
pub enum Error<DRV> {
    Device(DRV),          // Driver failed to bring the card up
    NoDevice,             // Card missing or not connected
    NotInitialized,       // Operation before a successful init
    InvalidParameter,     // Misaligned or out-of-range address/size
    UnsupportedBlockSize, // Card geometry incompatible with the 512 byte block size
    ReadBlocks,           // Read data blocks from card failed
    WriteBlocks,          // Write data blocks to card failed
    EraseBlocks,          // Erase data blocks failed
}
