//! Pixelrail - Serial-to-WS281x Strip Driver
//!
//! Main firmware binary for RP2040-based boards. A host streams whole frames
//! of pixel data over UART0; the firmware shows them on every configured
//! strip at once and cuts the strip power rail when the host goes quiet.
//!
//! Wiring comes from `strips.toml`, validated and turned into constants and
//! pin macros by the build script.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use pixelrail_core::link::Link;
use pixelrail_core::pixel::ChannelTable;
use pixelrail_core::safety::Watchdog;
use pixelrail_core::traits::Serializer;
use pixelrail_core::{Controller, EngineState, PollOutcome};
use pixelrail_hal::{Clock, OutputPin, UartRx, UartTx};
use pixelrail_hal_rp2040::{EmbassyClock, RelayPin, SerialLink};
use pixelrail_protocol::Opcode;

#[macro_use]
mod strips {
    include!(concat!(env!("OUT_DIR"), "/strips.rs"));
}

#[cfg(strips_backend = "pio")]
bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<embassy_rp::peripherals::PIO0>;
    PIO1_IRQ_0 => embassy_rp::pio::InterruptHandler<embassy_rp::peripherals::PIO1>;
});

#[cfg(strips_backend = "bitbang")]
bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// A full LoadPixelData payload can arrive while a frame is being emitted
const RX_BUF_LEN: usize = 1024;
const TX_BUF_LEN: usize = 16;

// Static cells for buffers that must live forever
static PIXELS: StaticCell<[u8; strips::BUFFER_LEN]> = StaticCell::new();
static TX_BUF: StaticCell<[u8; TX_BUF_LEN]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; RX_BUF_LEN]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Pixelrail firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let table = match ChannelTable::new(strips::CHANNELS) {
        Ok(table) => table,
        Err(e) => defmt::panic!("Invalid channel table: {}", e),
    };
    for (index, channel) in table.iter().enumerate() {
        info!(
            "Channel {}: GPIO{} {} pixels {} (bytes {}..{})",
            index,
            channel.pin,
            channel.pixels,
            channel.order,
            channel.offset,
            channel.offset + channel.len
        );
    }

    // Host link on UART0 (GPIO0 TX, GPIO1 RX)
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = strips::LINK.baud_rate;

    let tx_buf = TX_BUF.init([0u8; TX_BUF_LEN]);
    let rx_buf = RX_BUF.init([0u8; RX_BUF_LEN]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    let link = Link::new(SerialLink::new(rx, tx), EmbassyClock);
    info!("UART initialized at {} baud", strips::LINK.baud_rate);

    // Power rail starts open
    let relay = RelayPin::new(Output::new(relay_pin!(p), Level::Low));
    info!("Power rail relay on GPIO{}", strips::RELAY_PIN);

    #[cfg(strips_backend = "pio")]
    let mut pio = (
        embassy_rp::pio::Pio::new(p.PIO0, Irqs),
        embassy_rp::pio::Pio::new(p.PIO1, Irqs),
    );

    #[cfg(strips_backend = "pio")]
    let serializer = {
        let lanes = match pio_lanes!(p, pio, table) {
            Ok(lanes) => lanes,
            Err(e) => defmt::panic!("PIO lane setup failed: {}", e),
        };
        for lane in lanes.iter() {
            debug!("{}", lane);
        }
        match pixelrail_hal_rp2040::PioSerializer::new(&table, lanes) {
            Ok(serializer) => serializer,
            Err(e) => defmt::panic!("PIO serializer setup failed: {}", e),
        }
    };

    #[cfg(strips_backend = "bitbang")]
    let serializer = {
        let port = match pixelrail_hal_rp2040::SioPort::new(bitbang_lines!(p)) {
            Ok(port) => port,
            Err(_) => defmt::panic!("Too many bit-bang data lines"),
        };
        match pixelrail_core::engine::BitBangSerializer::new(
            port,
            &table,
            &pixelrail_core::engine::BitTiming::WS2812B,
            embassy_rp::clocks::clk_sys_freq(),
            strips::BITBANG_OVERHEAD_CYCLES,
        ) {
            Ok(serializer) => {
                debug!("Bit-bang phase steps: {}", serializer.steps());
                serializer
            }
            Err(e) => defmt::panic!("Bit-bang setup failed: {}", e),
        }
    };

    info!(
        "{} backend ready, frames are {} bytes",
        strips::BACKEND,
        Opcode::LoadPixelData.payload_len(strips::BUFFER_LEN)
    );

    let watchdog = Watchdog::new(strips::LINK.watchdog_timeout_ms, EmbassyClock.now_ms());
    let storage = PIXELS.init([0u8; strips::BUFFER_LEN]);
    let state = match EngineState::new(table, storage, watchdog) {
        Ok(state) => state,
        Err(e) => defmt::panic!("Pixel buffer setup failed: {}", e),
    };

    run(Controller::new(link, serializer, relay, state)).await
}

/// Control loop: boot handshake, then one command per iteration forever
async fn run<T, C, S, R, E>(mut controller: Controller<'_, T, C, S, R>) -> !
where
    T: UartRx<Error = E> + UartTx<Error = E>,
    C: Clock,
    S: Serializer,
    R: OutputPin,
    E: Format,
{
    match controller.boot() {
        Ok(dropped) => info!("Ready, dropped {} stale bytes", dropped),
        Err(e) => error!("Boot handshake failed: {}", e),
    }

    loop {
        match controller.poll() {
            Ok(PollOutcome::Idle) => {}
            Ok(PollOutcome::Handled(opcode)) => trace!("{} done", opcode),
            Ok(PollOutcome::Ignored(byte)) => debug!("Ignored unknown opcode {=u8:#04x}", byte),
            Ok(PollOutcome::LoadAborted { opcode, received }) => {
                warn!("{} aborted after {} payload bytes", opcode, received)
            }
            Ok(PollOutcome::WatchdogTripped) => warn!("Host silent, strip power cut"),
            Err(e) => error!("Poll failed: {}", e),
        }

        yield_now().await;
    }
}
