// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

/// Wrapper around bidirectional embassy-sync Pipes, in order to handle UART
/// RX/TX happening in an InterruptExecutor at higher priority.
///
/// Doesn't implement the InterruptExecutor, the task in the app should await
/// the 'run' async function.
///
use embassy_futures::select::select;
use embassy_sync::pipe::TryWriteError;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, pipe::Pipe};
use esp_hal::Async;
use esp_hal::gpio::AnyPin;
use esp_hal::peripherals::UART0;
use esp_hal::uart::{Config, RxConfig, Uart};
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use portable_atomic::{AtomicUsize, Ordering};

// Sizes of the software buffers. Inward is more
// important as an overrun here drops bytes. A full outward
// buffer will only block the executor.
const INWARD_BUF_SZ: usize = 512;
const OUTWARD_BUF_SZ: usize = 1024;

// Size of the buffer for hardware read/write ops.
const UART_BUF_SZ: usize = 64;

/// Bidirectional pipe buffer for UART communications
pub struct BufferedUart {
    outward: Pipe<CriticalSectionRawMutex, OUTWARD_BUF_SZ>,
    inward: Pipe<CriticalSectionRawMutex, INWARD_BUF_SZ>,
    dropped_rx_bytes: AtomicUsize,
}

impl BufferedUart {
    pub fn new() -> Self {
        BufferedUart {
            outward: Pipe::new(),
            inward: Pipe::new(),
            dropped_rx_bytes: AtomicUsize::from(0),
        }
    }

    /// Transfer data between the UART and the buffer struct.
    ///
    /// This should be awaited from an Embassy task that's run
    /// in an InterruptExecutor for lower latency.
    pub async fn run(&self, uart: Uart<'_, Async>) {
        let (mut uart_rx, mut uart_tx) = uart.split();
        let mut uart_rx_buf = [0u8; UART_BUF_SZ];
        let mut uart_tx_buf = [0u8; UART_BUF_SZ];

        loop {
            let rd_from = async {
                loop {
                    let n = match uart_rx.read_async(&mut uart_rx_buf).await {
                        Ok(n) => n,
                        Err(e) => {
                            warn!("uart rx error {:?}", e);
                            continue;
                        }
                    };

                    let mut rx_slice = &uart_rx_buf[..n];

                    // Write rx_slice to 'inward' pipe, dropping bytes rather than blocking if
                    // the pipe is full
                    while !rx_slice.is_empty() {
                        rx_slice = match self.inward.try_write(rx_slice) {
                            Ok(w) => &rx_slice[w..],
                            Err(TryWriteError::Full) => {
                                // Main loop is busy (flash commit, restart delay), drop the
                                // oldest bytes so the newest line still gets through.
                                let mut drop_buf = [0u8; UART_BUF_SZ];
                                let dropped = self
                                    .inward
                                    .try_read(&mut drop_buf[..rx_slice.len()])
                                    .unwrap_or_default();
                                let _ = self.dropped_rx_bytes.fetch_update(
                                    Ordering::Relaxed,
                                    Ordering::Relaxed,
                                    |d| Some(d.saturating_add(dropped)),
                                );
                                rx_slice
                            }
                        };
                    }
                }
            };
            let rd_to = async {
                loop {
                    let n = self.outward.read(&mut uart_tx_buf).await;
                    if let Err(e) = uart_tx.write_async(&uart_tx_buf[..n]).await {
                        warn!("uart tx error {:?}", e);
                    }
                }
            };
            select(rd_from, rd_to).await;
        }
    }

    pub async fn read(&self, buf: &mut [u8]) -> usize {
        self.inward.read(buf).await
    }

    pub async fn write(&self, buf: &[u8]) {
        self.outward.write_all(buf).await;
    }

    /// Wait until everything written so far has been handed to the UART.
    pub async fn drain(&self) {
        while !self.outward.is_empty() {
            embassy_time::Timer::after_millis(5).await;
        }
    }

    /// Return the number of dropped bytes (if any) since the last check,
    /// and reset the internal count to 0.
    pub fn check_dropped_bytes(&self) -> usize {
        self.dropped_rx_bytes.swap(0, Ordering::Relaxed)
    }
}

impl Default for BufferedUart {
    fn default() -> Self {
        Self::new()
    }
}

#[embassy_executor::task]
pub async fn uart_task(
    buffer: &'static BufferedUart,
    uart_periph: UART0<'static>,
    rx: AnyPin<'static>,
    tx: AnyPin<'static>,
    baud_rate: u32,
) {
    debug!("UART task started");
    let uart_config = Config::default().with_baudrate(baud_rate).with_rx(
        RxConfig::default()
            .with_fifo_full_threshold(16)
            .with_timeout(1),
    );

    let uart = match Uart::new(uart_periph, uart_config) {
        Ok(uart) => uart.with_rx(rx).with_tx(tx).into_async(),
        Err(e) => {
            error!("UART config error {:?}", e);
            return;
        }
    };

    // Run the main buffered TX/RX loop
    buffer.run(uart).await;
}
