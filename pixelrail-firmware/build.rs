//! Build script for pixelrail-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates strips.toml at compile time
//! - Generates strips.rs: the channel table, link settings and the
//!   peripheral wiring for the selected backend

use std::env;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use pixelrail_core::config::{Backend, ChannelConfig, LinkConfig, DEFAULT_BAUD_RATE};
use pixelrail_core::engine::{BitTiming, FramePlan, LanePlan, LanePlanner, ResourceBudget};
use pixelrail_core::pixel::{ChannelTable, ColorOrder};
use pixelrail_core::safety::DEFAULT_TIMEOUT_MS;

/// GPIOs taken by the host UART (UART0 TX/RX)
const UART_PINS: [u8; 2] = [0, 1];

/// Highest user GPIO on the RP2040
const MAX_GPIO: i64 = 29;

/// Bit-bang loop overhead when strips.toml does not say
const DEFAULT_OVERHEAD_CYCLES: i64 = 4;

/// Validated contents of strips.toml
struct Strips {
    link: LinkConfig,
    relay_pin: u8,
    backend: Backend,
    overhead_cycles: u32,
    channels: Vec<ChannelConfig>,
}

fn main() {
    setup_linker();

    println!("cargo:rerun-if-changed=strips.toml");
    println!("cargo:rustc-check-cfg=cfg(strips_backend, values(\"pio\", \"bitbang\"))");

    let strips = load_strips(Path::new("strips.toml"));
    let table = match ChannelTable::new(&strips.channels) {
        Ok(table) => table,
        Err(e) => fail("Invalid channel table in strips.toml", &[format!("{:?}", e)]),
    };
    if let Err(e) = BitTiming::WS2812B.validate() {
        fail("Invalid bit timing", &[format!("{:?}", e)]);
    }

    let wiring = match strips.backend {
        Backend::Pio => {
            let plan = match LanePlanner::new(ResourceBudget::RP2040).plan(&table) {
                Ok(plan) => plan,
                Err(e) => fail(
                    "Channels do not fit the PIO backend",
                    &[
                        format!("{:?}", e),
                        "Use fewer distinct color orders or fewer channels".to_string(),
                    ],
                ),
            };
            println!("cargo:rustc-cfg=strips_backend=\"pio\"");
            pio_wiring(&table, &plan)
        }
        Backend::BitBang => {
            if let Err(e) = FramePlan::new(&table) {
                fail(
                    "Channels do not fit the bit-bang backend",
                    &[format!("{:?}", e)],
                );
            }
            println!("cargo:rustc-cfg=strips_backend=\"bitbang\"");
            bitbang_wiring(&table)
        }
    };

    let code = generate(&strips, &table, &wiring);
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("strips.rs"), code).unwrap();

    println!(
        "cargo:warning=strips.toml validated: {} channels, {} bytes per frame, {:?} backend",
        table.len(),
        table.total_len(),
        strips.backend
    );
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Read and type-check strips.toml
fn load_strips(path: &Path) -> Strips {
    if !path.exists() {
        fail(
            "strips.toml not found",
            &["The firmware requires a strips.toml wiring file".to_string()],
        );
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read strips.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in strips.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();

    let baud_rate = integer(&config, "baud_rate", DEFAULT_BAUD_RATE as i64, &mut errors);
    if baud_rate <= 0 || baud_rate > u32::MAX as i64 {
        errors.push("baud_rate must be a positive 32-bit number".to_string());
    }

    let timeout = integer(
        &config,
        "watchdog_timeout_ms",
        DEFAULT_TIMEOUT_MS as i64,
        &mut errors,
    );
    if timeout <= 0 || timeout > u32::MAX as i64 {
        errors.push("watchdog_timeout_ms must be a positive 32-bit number".to_string());
    }

    let overhead = integer(
        &config,
        "bitbang_overhead_cycles",
        DEFAULT_OVERHEAD_CYCLES,
        &mut errors,
    );
    if !(0..=64).contains(&overhead) {
        errors.push("bitbang_overhead_cycles must be 0-64".to_string());
    }

    let backend = match config.get("backend") {
        None => Backend::default(),
        Some(toml::Value::String(name)) => Backend::from_str_name(name).unwrap_or_else(|| {
            errors.push(format!("backend must be 'pio' or 'bitbang', not '{}'", name));
            Backend::default()
        }),
        Some(_) => {
            errors.push("backend must be a string".to_string());
            Backend::default()
        }
    };

    let relay_pin = match config.get("relay_pin") {
        Some(toml::Value::Integer(pin)) => {
            check_gpio("relay_pin", *pin, &mut errors);
            *pin as u8
        }
        Some(_) => {
            errors.push("relay_pin must be a GPIO number".to_string());
            0
        }
        None => {
            errors.push("Missing relay_pin".to_string());
            0
        }
    };

    let channels = parse_channels(&config, &mut errors);
    if channels.iter().any(|c| c.pin == relay_pin) {
        errors.push(format!("relay_pin {} is also a channel data pin", relay_pin));
    }

    if !errors.is_empty() {
        fail("Invalid strips.toml", &errors);
    }

    Strips {
        link: LinkConfig {
            baud_rate: baud_rate as u32,
            watchdog_timeout_ms: timeout as u32,
        },
        relay_pin,
        backend,
        overhead_cycles: overhead as u32,
        channels,
    }
}

/// Optional integer field with a default
fn integer(config: &toml::Value, key: &str, default: i64, errors: &mut Vec<String>) -> i64 {
    match config.get(key) {
        None => default,
        Some(toml::Value::Integer(value)) => *value,
        Some(_) => {
            errors.push(format!("{} must be an integer", key));
            default
        }
    }
}

fn check_gpio(what: &str, pin: i64, errors: &mut Vec<String>) {
    if !(0..=MAX_GPIO).contains(&pin) {
        errors.push(format!("{} must be a GPIO number 0-{}", what, MAX_GPIO));
    } else if UART_PINS.contains(&(pin as u8)) {
        errors.push(format!("{} {} is taken by the host UART", what, pin));
    }
}

/// Parse the `[[channel]]` array
fn parse_channels(config: &toml::Value, errors: &mut Vec<String>) -> Vec<ChannelConfig> {
    let entries = match config.get("channel") {
        Some(toml::Value::Array(entries)) => entries,
        Some(_) => {
            errors.push("channel must be an array of tables ([[channel]])".to_string());
            return Vec::new();
        }
        None => {
            errors.push("Missing [[channel]] section - at least one is required".to_string());
            return Vec::new();
        }
    };

    let mut channels = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let entry = match entry.as_table() {
            Some(t) => t,
            None => {
                errors.push(format!("channel {} must be a table", i));
                continue;
            }
        };

        let pin = match entry.get("pin") {
            Some(toml::Value::Integer(pin)) => {
                check_gpio(&format!("channel {} pin", i), *pin, errors);
                *pin as u8
            }
            _ => {
                errors.push(format!("channel {} missing integer 'pin'", i));
                continue;
            }
        };

        let pixels = match entry.get("pixels") {
            Some(toml::Value::Integer(n)) if (1..=u16::MAX as i64).contains(n) => *n as u16,
            Some(_) => {
                errors.push(format!("channel {} pixels must be 1-{}", i, u16::MAX));
                continue;
            }
            None => {
                errors.push(format!("channel {} missing 'pixels'", i));
                continue;
            }
        };

        let order = match entry.get("order") {
            None => ColorOrder::default(),
            Some(toml::Value::String(name)) => match ColorOrder::from_str_name(name) {
                Some(order) => order,
                None => {
                    errors.push(format!(
                        "channel {} order must be rgb, rbg, grb, gbr, brg or bgr",
                        i
                    ));
                    continue;
                }
            },
            Some(_) => {
                errors.push(format!("channel {} order must be a string", i));
                continue;
            }
        };

        channels.push(ChannelConfig::new(pin, pixels, order));
    }

    channels
}

/// `pio_lanes!` macro: loads one program per plan slot and builds every lane
fn pio_wiring(table: &ChannelTable, plan: &LanePlan) -> String {
    let mut body = String::new();

    for (k, slot) in plan.programs.iter().enumerate() {
        let first = plan
            .lanes
            .iter()
            .find(|lane| lane.program == k)
            .map(|lane| lane.channel)
            .unwrap_or(0);
        writeln!(
            body,
            "            let program_{k} = ::pixelrail_hal_rp2040::pio::Ws2812Program::load(\
             &mut $pio.{block}.common, ::pixelrail_core::pixel::ColorOrder::{order:?}, {first})?;",
            block = slot.block,
            order = slot.order,
        )
        .unwrap();
    }

    for lane in &plan.lanes {
        let channel = &table.channels()[lane.channel];
        let block = plan.programs[lane.program].block;
        writeln!(
            body,
            "            lanes.push(::pixelrail_hal_rp2040::PioLane::new(\
             &mut $pio.{block}.common, &mut $pio.{block}.sm{machine}, &program_{program}, \
             $p.PIN_{pin}, $p.DMA_CH{dma}, ::pixelrail_hal_rp2040::PioBlock::Pio{block}, \
             {index}, &table.channels()[{index}])?)\
             .map_err(|_| InitError::Config(::pixelrail_core::config::ConfigError::TooManyChannels))?;",
            machine = lane.machine,
            program = lane.program,
            pin = channel.pin,
            dma = lane.dma,
            index = lane.channel,
        )
        .unwrap();
    }

    format!(
        "/// State machine lanes for every channel, in table order\n\
         ///\n\
         /// `$pio` is the `(Pio<PIO0>, Pio<PIO1>)` pair; it must outlive the lanes.\n\
         macro_rules! pio_lanes {{\n\
         \x20   ($p:ident, $pio:ident, $table:expr) => {{\n\
         \x20       (|| -> Result<\n\
         \x20           ::heapless::Vec<\n\
         \x20               ::pixelrail_hal_rp2040::PioLane,\n\
         \x20               {{ ::pixelrail_core::config::MAX_CHANNELS }},\n\
         \x20           >,\n\
         \x20           ::pixelrail_core::engine::InitError,\n\
         \x20       > {{\n\
         \x20           use ::pixelrail_core::engine::InitError;\n\
         \x20           let table = &$table;\n\
         \x20           let mut lanes = ::heapless::Vec::new();\n\
         {body}\
         \x20           Ok(lanes)\n\
         \x20       }})()\n\
         \x20   }};\n\
         }}\n"
    )
}

/// `bitbang_lines!` macro: data line outputs in table order
fn bitbang_wiring(table: &ChannelTable) -> String {
    let lines = table
        .iter()
        .map(|c| {
            format!(
                "            ::embassy_rp::gpio::Output::new($p.PIN_{}, ::embassy_rp::gpio::Level::Low),\n",
                c.pin
            )
        })
        .collect::<String>();

    format!(
        "/// Data line outputs for the bit-bang backend, driven low\n\
         macro_rules! bitbang_lines {{\n\
         \x20   ($p:ident) => {{\n\
         \x20       [\n\
         {lines}\
         \x20       ]\n\
         \x20   }};\n\
         }}\n"
    )
}

/// Assemble strips.rs
fn generate(strips: &Strips, table: &ChannelTable, wiring: &str) -> String {
    let mut code = String::new();
    writeln!(code, "// Generated by build.rs from strips.toml. Do not edit.\n").unwrap();

    writeln!(
        code,
        "pub const LINK: ::pixelrail_core::config::LinkConfig = \
         ::pixelrail_core::config::LinkConfig {{ baud_rate: {}, watchdog_timeout_ms: {} }};",
        strips.link.baud_rate, strips.link.watchdog_timeout_ms
    )
    .unwrap();
    writeln!(
        code,
        "pub const BACKEND: ::pixelrail_core::config::Backend = \
         ::pixelrail_core::config::Backend::{:?};",
        strips.backend
    )
    .unwrap();
    writeln!(
        code,
        "pub const BITBANG_OVERHEAD_CYCLES: u32 = {};",
        strips.overhead_cycles
    )
    .unwrap();
    writeln!(code, "pub const BUFFER_LEN: usize = {};", table.total_len()).unwrap();
    writeln!(code, "pub const RELAY_PIN: u8 = {};\n", strips.relay_pin).unwrap();

    writeln!(
        code,
        "pub const CHANNELS: &[::pixelrail_core::config::ChannelConfig] = &["
    )
    .unwrap();
    for c in &strips.channels {
        writeln!(
            code,
            "    ::pixelrail_core::config::ChannelConfig::new({}, {}, \
             ::pixelrail_core::pixel::ColorOrder::{:?}),",
            c.pin, c.pixels, c.order
        )
        .unwrap();
    }
    writeln!(code, "];\n").unwrap();

    writeln!(
        code,
        "/// Relay output for the strip power rail\n\
         macro_rules! relay_pin {{\n\
         \x20   ($p:ident) => {{\n\
         \x20       $p.PIN_{}\n\
         \x20   }};\n\
         }}\n",
        strips.relay_pin
    )
    .unwrap();

    code.push_str(wiring);
    code
}
