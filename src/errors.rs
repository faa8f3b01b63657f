// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

use snafu::Snafu;

use crate::settings::{AP_SSID_PLACEHOLDER, MIN_PASSWORD_LEN};

/// Rejected setting value. Shown to the operator as `ERROR: <display>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ValidationError {
    #[snafu(display("value must not be empty"))]
    Empty,
    #[snafu(display("password must be minimum {MIN_PASSWORD_LEN} characters"))]
    PasswordTooShort,
    #[snafu(display("value longer than {max} bytes"))]
    TooLong { max: usize },
    #[snafu(display("value must not contain control characters"))]
    ControlCharacter,
    #[snafu(display("{AP_SSID_PLACEHOLDER} is reserved"))]
    ReservedSsid,
    #[snafu(display("mode must be 1 (AP) or 0 (Station)"))]
    InvalidMode,
}

/// Faults surfaced while bringing the device up. None of them stop the boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BootError {
    #[snafu(display("camera init failed: {source}"))]
    Camera { source: hal::HalError },
    #[snafu(display("access point failed to start: {source}"))]
    AccessPoint { source: hal::HalError },
    #[snafu(display("station not connected after {attempts} attempts"))]
    StationTimeout { attempts: u8 },
    #[snafu(display("station setup failed: {source}"))]
    Station { source: hal::HalError },
    #[snafu(display("video service failed to start: {source}"))]
    Service { source: hal::HalError },
}
