// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use core::fmt::Write as _;

use embassy_executor::Spawner;
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{
    gpio::Pin,
    i2c::master::{Config as I2cConfig, I2c},
    interrupt::{Priority, software::SoftwareInterruptControl},
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_rtos::embassy::InterruptExecutor;
use heapless::String;
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use static_cell::StaticCell;

use cam_stamp::boot::{Board, boot};
use cam_stamp::espressif::buffered_uart::{BufferedUart, uart_task};
use cam_stamp::settings::{
    AP_ADDRESS, AP_PREFIX_LEN, BAUD_RATE, HTTP_PORT, REPLY_MAX, STA_CONNECT_POLICY, STREAM_PORT,
};
use hal::SystemControl;
use hal_espressif::{
    camera::Ov2640, delay::EmbassyDelay, net::EspNetwork, system::EspSystem, web::WebService,
};
use storage::esp::FlashMedium;

esp_bootloader_esp_idf::esp_app_desc!();

static UART_BUF: StaticCell<BufferedUart> = StaticCell::new();
static INT_EXECUTOR: StaticCell<InterruptExecutor<2>> = StaticCell::new();
static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    cfg_if::cfg_if!(
        if #[cfg(feature = "esp32s2")] {
            esp_alloc::heap_allocator!(size: 69 * 1024);
        } else {
            esp_alloc::heap_allocator!(size: 72 * 1024);
        }
    );
    esp_println::logger::init_logger_from_env();

    // System init
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let software_interrupts = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);

    cfg_if::cfg_if! {
        if #[cfg(any(feature = "esp32", feature = "esp32s2", feature = "esp32s3"))] {
            esp_rtos::start(timg0.timer0);
        } else {
            esp_rtos::start(timg0.timer0, software_interrupts.software_interrupt0);
        }
    }

    cfg_if::cfg_if! {
        if #[cfg(feature = "psram")] {
            esp_alloc::psram_allocator!(peripherals.PSRAM, esp_hal::psram);
            let (_, psram_bytes) = esp_hal::psram::psram_raw_parts(&peripherals.PSRAM);
        } else {
            let psram_bytes = 0;
        }
    }

    // Serial console runs in a higher priority InterruptExecutor so bytes
    // keep arriving while the main loop is busy
    let uart_buf = UART_BUF.init_with(BufferedUart::new);
    let interrupt_executor =
        INT_EXECUTOR.init_with(|| InterruptExecutor::new(software_interrupts.software_interrupt2));
    cfg_if::cfg_if! {
        if #[cfg(any(feature = "esp32", feature = "esp32s2", feature = "esp32s3"))] {
            let interrupt_spawner = interrupt_executor.start(Priority::Priority1);
        } else {
            let interrupt_spawner = interrupt_executor.start(Priority::Priority10);
        }
    }

    // UART0 is the USB serial bridge on camera boards. Pins per chip:
    cfg_if::cfg_if! {
        if #[cfg(feature = "esp32")] {
            let (uart_rx, uart_tx) = (peripherals.GPIO3.degrade(), peripherals.GPIO1.degrade());
        } else if #[cfg(any(feature = "esp32s2", feature = "esp32s3"))] {
            let (uart_rx, uart_tx) = (peripherals.GPIO44.degrade(), peripherals.GPIO43.degrade());
        } else if #[cfg(feature = "esp32c3")] {
            let (uart_rx, uart_tx) = (peripherals.GPIO20.degrade(), peripherals.GPIO21.degrade());
        } else {
            let (uart_rx, uart_tx) = (peripherals.GPIO17.degrade(), peripherals.GPIO16.degrade());
        }
    }
    interrupt_spawner
        .spawn(uart_task(uart_buf, peripherals.UART0, uart_rx, uart_tx, BAUD_RATE))
        .ok();

    // Camera control bus (SCCB) and status LED
    cfg_if::cfg_if! {
        if #[cfg(feature = "esp32")] {
            let (sccb_sda, sccb_scl) = (peripherals.GPIO26, peripherals.GPIO27);
            let mut system = EspSystem::new(psram_bytes).with_status_led(peripherals.GPIO33, true);
        } else {
            let (sccb_sda, sccb_scl) = (peripherals.GPIO4, peripherals.GPIO5);
            let mut system = EspSystem::new(psram_bytes);
        }
    }
    // OK expect: static init, fixed config
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .expect("SCCB config")
    .with_sda(sccb_sda)
    .with_scl(sccb_scl);

    let seed = (system.random_u32() as u64) << 32 | system.random_u32() as u64;

    let radio = RADIO.init(esp_radio::init().expect("radio init"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()).expect("wifi init");

    let mut board = Board {
        system,
        camera: Ov2640::new(i2c),
        network: EspNetwork::new(
            spawner,
            wifi_controller,
            interfaces,
            seed,
            AP_ADDRESS,
            AP_PREFIX_LEN,
        ),
        video: WebService::new(spawner, HTTP_PORT, STREAM_PORT),
        delay: EmbassyDelay,
    };

    let medium = FlashMedium::new(peripherals.FLASH);
    let (mut runtime, report) = boot(medium, &mut board, &STA_CONNECT_POLICY).await;
    info!("boot finished: {:?}, link {:?}", report.phase, report.link);
    for e in report.errors.iter() {
        warn!("boot: {}", e);
    }

    uart_buf
        .write(b"\r\ncam-stamp ready, type HELP for a list of commands\r\n")
        .await;

    let mut rx = [0u8; 64];
    let mut reply: String<REPLY_MAX> = String::new();
    loop {
        let n = uart_buf.read(&mut rx).await;
        let dropped = uart_buf.check_dropped_bytes();
        if dropped > 0 {
            warn!("console dropped {} bytes", dropped);
        }

        for &byte in &rx[..n] {
            if !runtime.receive(byte) {
                continue;
            }
            let restart_due = runtime.poll_once(&mut reply).unwrap_or_else(|_| {
                let _ = reply.write_str("\r\n(reply truncated)\r\n");
                runtime.config().pending().pending_restart
            });
            uart_buf.write(reply.as_bytes()).await;
            reply.clear();

            if restart_due {
                uart_buf.drain().await;
                runtime
                    .restart_if_pending(&mut board.system, &mut board.delay)
                    .await;
            }
        }
    }
}
