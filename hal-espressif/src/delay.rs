// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

use embassy_time::{Duration, Timer};

#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyDelay;

impl hal::Delay for EmbassyDelay {
    async fn delay_ms(&mut self, ms: u32) {
        Timer::after(Duration::from_millis(u64::from(ms))).await
    }
}
