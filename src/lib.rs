//! # sdio_blockdev
//!
//! > A block device adapter over SD/SDIO memory cards, mainly focusing on
//! > embedded system with `no_std` support
//!
//! The adapter owns lifecycle (reference-counted init/deinit), request
//! validation and the wait/transfer/wait sequencing with timeouts; the
//! vendor-specific card driver sits behind [`driver::Driver`]. With the
//! `async` feature the driver submits DMA transfers and the adapter polls
//! completion; without it the driver's blocking calls are used.
//!
//! ## Using this crate
//!
//! Assuming `MyDriver` implements `driver::Driver` for your target:
//!
//! ```ignore
//! let ticker = sdio_blockdev::tick::std::Ticker::default();
//! let mut sd = SdioBlockDevice::new(MyDriver::new(), TickCountDown::new(ticker));
//! sd.init()?;
//! debug!("Card: {:?}", sd.card_info());
//! debug!("Size: {}", Size::from_bytes(sd.size()));
//!
//! let mut block = [0u8; 512];
//! sd.read(&mut block, 0)?;
//! sd.deinit()?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
extern crate log;

pub mod card;
pub mod device;
pub mod driver;
pub mod error;
pub mod tick;

use core::time::Duration;

use embedded_hal::digital::v2::InputPin;
use embedded_hal::timer::CountDown;

use card::{CardInfo, BLOCK_SIZE};
use device::BlockDevice;
use driver::Driver;
#[cfg(feature = "async")]
use driver::TransferState;
use error::Error;

const CMD_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Detect-line stand-in for slots wired without one. Always reads inserted.
pub struct AlwaysPresent;

impl InputPin for AlwaysPresent {
    type Error = core::convert::Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// A wait window ran out.
#[cfg(feature = "async")]
struct Expired;

/// Block device over an SD/SDIO card driver.
///
/// Every operation takes `&mut self`: the exclusive borrow serializes the
/// command stream per card, and sharing across threads means wrapping the
/// whole adapter in the integration's mutex.
pub struct SdioBlockDevice<D: Driver, CD, C> {
    driver: D,
    card_detect: CD,
    countdown: C,
    timeout: Duration,
    card_info: Option<CardInfo>,
    sectors: u64,
    is_initialized: bool,
    init_ref_count: u32,
}

impl<D: Driver, C> SdioBlockDevice<D, AlwaysPresent, C> {
    /// Adapter for a slot without a card-detect line.
    pub fn new(driver: D, countdown: C) -> Self {
        Self::with_card_detect(driver, AlwaysPresent, countdown)
    }
}

impl<D: Driver, CD, C> SdioBlockDevice<D, CD, C> {
    /// Adapter for a slot with a card-detect line, active low.
    pub fn with_card_detect(driver: D, card_detect: CD, countdown: C) -> Self {
        Self {
            driver,
            card_detect,
            countdown,
            timeout: CMD_TIMEOUT,
            card_info: None,
            sectors: 0,
            is_initialized: false,
            init_ref_count: 0,
        }
    }

    /// Timeout applied to each card-ready and transfer-completion wait.
    pub fn set_command_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Geometry snapshot captured by the last successful [`init`](Self::init).
    pub fn card_info(&self) -> Option<&CardInfo> {
        self.card_info.as_ref()
    }
}

impl<D, CD, C> SdioBlockDevice<D, CD, C>
where
    D: Driver,
    CD: InputPin,
    C: CountDown<Time = Duration>,
{
    /// Card presence as sensed by the detect line. A read error on the
    /// line counts as absent.
    pub fn is_present(&self) -> bool {
        self.card_detect.is_low().unwrap_or(false)
    }

    /// Initialize the card, hardware-touching only on the first of nested
    /// calls. Each successful or short-circuited `init` must be balanced
    /// by one [`deinit`](Self::deinit).
    pub fn init(&mut self) -> Result<(), Error<D::Error>> {
        debug!("init SDIO card");
        if !self.is_initialized {
            self.init_ref_count = 0;
        }
        self.init_ref_count += 1;
        if self.init_ref_count != 1 {
            return Ok(());
        }

        if !self.is_present() {
            return Err(Error::NoDevice);
        }
        self.driver.init().map_err(Error::Device)?;

        let info = self.driver.card_info();
        debug!(
            "SDIO initialized: type: {:?} version: {} class: {:?}",
            info.card_type, info.card_version, info.card_class
        );
        debug!("SDIO size: {} MB", info.log_block_count as u64 / 2 / 1024);

        self.sectors = info.log_block_count as u64;
        self.is_initialized = true;
        if info.block_size as usize != BLOCK_SIZE {
            // Unusable geometry: undo the init rather than keep a handle
            // that can never pass validation.
            let _ = self.driver.deinit();
            self.is_initialized = false;
            self.sectors = 0;
            self.init_ref_count = 0;
            return Err(Error::UnsupportedBlockSize);
        }
        self.card_info = Some(info);
        Ok(())
    }

    /// Release one init reference, tearing down hardware on the last one.
    /// Idempotent once uninitialized.
    pub fn deinit(&mut self) -> Result<(), Error<D::Error>> {
        debug!("deinit SDIO card");
        if !self.is_initialized {
            self.init_ref_count = 0;
            return Ok(());
        }
        self.init_ref_count -= 1;
        if self.init_ref_count != 0 {
            return Ok(());
        }

        let status = self.driver.deinit();
        self.is_initialized = false;
        self.card_info = None;
        self.sectors = 0;
        status.map_err(Error::Device)
    }

    fn byte_size(&self) -> u64 {
        BLOCK_SIZE as u64 * self.sectors
    }

    fn check_transfer(&mut self, addr: u64, len: u64) -> Result<(), Error<D::Error>> {
        if !self.is_present() {
            return Err(Error::NoDevice);
        }
        if !self.is_initialized {
            return Err(Error::NotInitialized);
        }
        let unit = BLOCK_SIZE as u64;
        let end = addr.checked_add(len);
        if addr % unit != 0 || len % unit != 0 || end.map_or(true, |end| end > self.byte_size()) {
            return Err(Error::InvalidParameter);
        }
        Ok(())
    }

    /// Poll `state` until `Ready`, bounded by the command timeout. Each
    /// call opens a fresh window.
    #[cfg(feature = "async")]
    fn wait_while_busy(
        &mut self,
        mut state: impl FnMut(&mut D) -> TransferState,
    ) -> Result<(), Expired> {
        self.countdown.start(self.timeout);
        while state(&mut self.driver) != TransferState::Ready {
            if self.countdown.wait().is_ok() {
                return Err(Expired);
            }
        }
        Ok(())
    }
}

impl<D, CD, C> BlockDevice for SdioBlockDevice<D, CD, C>
where
    D: Driver,
    CD: InputPin,
    C: CountDown<Time = Duration>,
{
    type Error = Error<D::Error>;

    fn read(&mut self, buffer: &mut [u8], addr: u64) -> Result<(), Self::Error> {
        self.check_transfer(addr, buffer.len() as u64)?;
        if buffer.is_empty() {
            return Ok(());
        }
        let block = (addr / BLOCK_SIZE as u64) as u32;
        let count = (buffer.len() / BLOCK_SIZE) as u32;
        debug!("read blocks addr: {} count: {}", block, count);

        #[cfg(feature = "async")]
        {
            if self.wait_while_busy(D::card_state).is_err() {
                return Err(Error::ReadBlocks);
            }
            if let Err(e) = self.driver.read_blocks_async(buffer, block, count) {
                warn!("read blocks failed: {:?}", e);
                return Err(Error::ReadBlocks);
            }
            // DMA completion, then card ready again; each wait has its own
            // timeout window.
            if self.wait_while_busy(D::read_pending).is_err()
                || self.wait_while_busy(D::card_state).is_err()
            {
                let _ = self.driver.abort();
                return Err(Error::ReadBlocks);
            }
            Ok(())
        }
        #[cfg(not(feature = "async"))]
        {
            self.driver.read_blocks(buffer, block, count).map_err(|e| {
                warn!("read blocks failed: {:?}", e);
                Error::ReadBlocks
            })
        }
    }

    fn program(&mut self, buffer: &[u8], addr: u64) -> Result<(), Self::Error> {
        self.check_transfer(addr, buffer.len() as u64)?;
        if buffer.is_empty() {
            return Ok(());
        }
        let block = (addr / BLOCK_SIZE as u64) as u32;
        let count = (buffer.len() / BLOCK_SIZE) as u32;
        debug!("write blocks addr: {} count: {}", block, count);

        #[cfg(feature = "async")]
        {
            if self.wait_while_busy(D::card_state).is_err() {
                return Err(Error::WriteBlocks);
            }
            if let Err(e) = self.driver.write_blocks_async(buffer, block, count) {
                warn!("write blocks failed: {:?}", e);
                return Err(Error::WriteBlocks);
            }
            if self.wait_while_busy(D::write_pending).is_err()
                || self.wait_while_busy(D::card_state).is_err()
            {
                let _ = self.driver.abort();
                return Err(Error::WriteBlocks);
            }
            Ok(())
        }
        #[cfg(not(feature = "async"))]
        {
            self.driver.write_blocks(buffer, block, count).map_err(|e| {
                warn!("write blocks failed: {:?}", e);
                Error::WriteBlocks
            })
        }
    }

    fn trim(&mut self, addr: u64, size: u64) -> Result<(), Self::Error> {
        self.check_transfer(addr, size)?;
        if size == 0 {
            return Ok(());
        }
        let block = (addr / BLOCK_SIZE as u64) as u32;
        let count = (size / BLOCK_SIZE as u64) as u32;
        debug!("erase blocks addr: {} count: {}", block, count);

        if let Err(e) = self.driver.erase_blocks(block, block + count) {
            warn!("erase blocks failed: {:?}", e);
            return Err(Error::EraseBlocks);
        }
        #[cfg(feature = "async")]
        if self.wait_while_busy(D::card_state).is_err() {
            return Err(Error::EraseBlocks);
        }
        Ok(())
    }

    fn read_size(&self) -> u64 {
        BLOCK_SIZE as u64
    }

    fn program_size(&self) -> u64 {
        BLOCK_SIZE as u64
    }

    fn erase_size(&self) -> u64 {
        BLOCK_SIZE as u64
    }

    fn size(&self) -> u64 {
        self.byte_size()
    }

    fn device_type(&self) -> &'static str {
        "SDIO"
    }
}

impl<D: Driver, CD, C> Drop for SdioBlockDevice<D, CD, C> {
    fn drop(&mut self) {
        // No hardware contact may outlive the handle.
        if self.is_initialized {
            let _ = self.driver.deinit();
        }
    }
}
