use std::ops::Range;
use std::time::Duration;

use clap::Parser;
use pretty_hex::PrettyHex;
use sdio_blockdev::card::{CardClass, CardInfo, CardType, BLOCK_SIZE};
use sdio_blockdev::device::BlockDevice;
use sdio_blockdev::driver::{Driver, TransferState};
use sdio_blockdev::tick::{self, TickCountDown};
use sdio_blockdev::SdioBlockDevice;
use size::Size;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Emulated card capacity in 512 byte blocks
    #[clap(short, long, value_parser, default_value_t = 2048)]
    blocks: u32,

    /// Command timeout in milliseconds
    #[clap(short, long, value_parser, default_value_t = 30_000)]
    timeout: u64,
}

/// RAM-backed stand-in for a vendor SDIO driver.
struct RamCard {
    memory: Vec<u8>,
    info: CardInfo,
}

impl RamCard {
    fn new(blocks: u32) -> Self {
        Self {
            memory: vec![0; blocks as usize * BLOCK_SIZE],
            info: CardInfo {
                card_type: CardType::V2Hc,
                card_version: 2,
                card_class: CardClass::from(0x5b5),
                rel_card_addr: 1,
                block_count: blocks,
                block_size: BLOCK_SIZE as u32,
                log_block_count: blocks,
                log_block_size: BLOCK_SIZE as u32,
            },
        }
    }

    fn span(&self, block: u32, count: u32) -> Range<usize> {
        let start = block as usize * BLOCK_SIZE;
        start..start + count as usize * BLOCK_SIZE
    }
}

#[derive(Debug)]
struct OutOfRange;

impl Driver for RamCard {
    type Error = OutOfRange;

    fn init(&mut self) -> Result<(), OutOfRange> {
        log::info!("emulated card up: {} blocks", self.info.log_block_count);
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), OutOfRange> {
        Ok(())
    }

    fn card_info(&self) -> CardInfo {
        self.info
    }

    fn card_state(&mut self) -> TransferState {
        TransferState::Ready
    }

    fn read_blocks(&mut self, buffer: &mut [u8], block: u32, count: u32) -> Result<(), OutOfRange> {
        let span = self.span(block, count);
        let memory = self.memory.get(span).ok_or(OutOfRange)?;
        buffer[..memory.len()].copy_from_slice(memory);
        Ok(())
    }

    fn write_blocks(&mut self, buffer: &[u8], block: u32, count: u32) -> Result<(), OutOfRange> {
        let span = self.span(block, count);
        let len = span.len();
        let memory = self.memory.get_mut(span).ok_or(OutOfRange)?;
        memory.copy_from_slice(&buffer[..len]);
        Ok(())
    }

    fn erase_blocks(&mut self, start: u32, end: u32) -> Result<(), OutOfRange> {
        let span = self.span(start, end - start);
        self.memory.get_mut(span).ok_or(OutOfRange)?.fill(0);
        Ok(())
    }

    fn read_blocks_async(
        &mut self,
        buffer: &mut [u8],
        block: u32,
        count: u32,
    ) -> Result<(), OutOfRange> {
        self.read_blocks(buffer, block, count)
    }

    fn write_blocks_async(&mut self, buffer: &[u8], block: u32, count: u32) -> Result<(), OutOfRange> {
        self.write_blocks(buffer, block, count)
    }

    fn read_pending(&mut self) -> TransferState {
        TransferState::Ready
    }

    fn write_pending(&mut self) -> TransferState {
        TransferState::Ready
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let countdown = TickCountDown::new(tick::std::Ticker::default());
    let mut sd = SdioBlockDevice::new(RamCard::new(args.blocks), countdown);
    sd.set_command_timeout(Duration::from_millis(args.timeout));

    sd.init().map_err(|e| format!("{:?}", e))?;
    println!("Card: {:?}", sd.card_info().ok_or("no card info")?);
    println!("Size: {}", Size::from_bytes(sd.size()));

    let mut pattern = vec![0u8; 4 * BLOCK_SIZE];
    for (i, byte) in pattern.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    sd.program(&pattern, 0).map_err(|e| format!("{:?}", e))?;

    let mut readback = vec![0u8; 4 * BLOCK_SIZE];
    sd.read(&mut readback, 0).map_err(|e| format!("{:?}", e))?;
    if readback != pattern {
        return Err("read back data differs from written pattern".into());
    }
    println!("round trip ok, first bytes:\n{:?}", readback[..64].hex_dump());

    sd.trim(0, 2 * BLOCK_SIZE as u64).map_err(|e| format!("{:?}", e))?;
    sd.read(&mut readback, 0).map_err(|e| format!("{:?}", e))?;
    println!("after trim:\n{:?}", readback[..16].hex_dump());

    sd.deinit().map_err(|e| format!("{:?}", e))?;
    Ok(())
}

fn main() {
    env_logger::init();
    match run() {
        Ok(_) => (),
        Err(e) => println!("{}", e),
    };
}
