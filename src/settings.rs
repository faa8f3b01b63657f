// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

// Static settings

use core::net::Ipv4Addr;

use crate::retry::RetryPolicy;

// Wi-Fi defaults, overridable at build time
pub(crate) const AP_SSID_PREFIX: &str = "ESP32-";
/// Stored AP SSID equal to this is treated as "not generated yet".
pub(crate) const AP_SSID_PLACEHOLDER: &str = "ESP32-XXXX";
pub(crate) const DEFAULT_AP_PASSWORD: &str = match option_env!("CAM_AP_PASSWORD") {
    Some(pw) => pw,
    None => "12345678",
};
pub(crate) const DEFAULT_STA_SSID: &str = match option_env!("CAM_STA_SSID") {
    Some(ssid) => ssid,
    None => "YourWiFi",
};
pub(crate) const DEFAULT_STA_PASSWORD: &str = match option_env!("CAM_STA_PASSWORD") {
    Some(pw) => pw,
    None => "YourPassword",
};

/// WPA2 passphrase minimum
pub const MIN_PASSWORD_LEN: usize = 8;

// Defaults must survive their own validation, otherwise every boot repairs
const _: () = assert!(char_count(DEFAULT_AP_PASSWORD) >= MIN_PASSWORD_LEN);
const _: () = assert!(DEFAULT_AP_PASSWORD.len() <= 31);
const _: () = assert!(char_count(DEFAULT_STA_PASSWORD) >= MIN_PASSWORD_LEN);
const _: () = assert!(DEFAULT_STA_PASSWORD.len() <= 63);
const _: () = assert!(!DEFAULT_STA_SSID.is_empty() && DEFAULT_STA_SSID.len() <= 31);
const _: () = assert!(!has_control(DEFAULT_AP_PASSWORD));
const _: () = assert!(!has_control(DEFAULT_STA_SSID));
const _: () = assert!(!has_control(DEFAULT_STA_PASSWORD));

/// Characters in `s`, counted the way `str::chars` does.
const fn char_count(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        // continuation bytes are 0b10xx_xxxx
        if bytes[i] & 0xC0 != 0x80 {
            count += 1;
        }
        i += 1;
    }
    count
}

/// Whether `s` holds any character `char::is_control` matches.
const fn has_control(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        // C1 controls U+0080..U+009F encode as 0xC2 0x80..0x9F
        if b < 0x20 || b == 0x7F || (b == 0xC2 && i + 1 < bytes.len() && bytes[i + 1] < 0xA0) {
            return true;
        }
        i += 1;
    }
    false
}

// Network
pub const AP_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
pub const AP_PREFIX_LEN: u8 = 24;
pub const HTTP_PORT: u16 = 80;
pub const STREAM_PORT: u16 = 81;

/// Station association: 20 polls, half a second apart.
pub const STA_CONNECT_POLICY: RetryPolicy = RetryPolicy::fixed(20, 500);

// Console
pub const BAUD_RATE: u32 = 115200;
/// Longest accepted command line, terminator excluded.
pub const LINE_MAX: usize = 128;
/// Room for the longest reply (HELP).
pub const REPLY_MAX: usize = 1024;

/// Delay before a scheduled restart so pending serial output drains.
pub const RESTART_DELAY_MS: u32 = 1000;

// Status LED
pub const BLINK_COUNT: u8 = 3;
pub const BLINK_MS: u32 = 100;
