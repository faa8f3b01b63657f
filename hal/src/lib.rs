#![cfg_attr(not(test), no_std)]
// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Peripheral traits the cam-stamp core is written against.
//!
//! Any target hardware vendor supporting cam-stamp requires an implementation
//! of these traits. The core (settings, console, boot sequence) only ever talks
//! to the hardware through them, so it can be exercised on the host with fakes.

use core::future::Future;
use core::net::Ipv4Addr;

use snafu::Snafu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
pub enum HalError {
    #[snafu(display("storage medium could not be opened"))]
    MediumOpen,
    #[snafu(display("storage medium read failed"))]
    MediumRead,
    #[snafu(display("storage medium write failed"))]
    MediumWrite,
    #[snafu(display("camera sensor not detected"))]
    CameraNotFound,
    #[snafu(display("camera sensor rejected configuration"))]
    CameraConfig,
    #[snafu(display("wifi driver error"))]
    Wifi,
    #[snafu(display("service failed to start"))]
    Service,
}

pub type HalResult<T> = Result<T, HalError>;

/// Byte-addressable durable region, EEPROM style.
///
/// The region is always handled as a whole: [`NvMedium::read`] fills the
/// caller's image and [`NvMedium::program`] replaces the durable content with
/// it in a single commit.
pub trait NvMedium {
    /// Reserve `capacity` bytes. Must be called once before any other call.
    fn open(&mut self, capacity: usize) -> HalResult<()>;

    fn read(&mut self, buf: &mut [u8]) -> HalResult<()>;

    /// Replace the durable content with `data`.
    ///
    /// On failure the previous content is whatever the medium left behind.
    fn program(&mut self, data: &[u8]) -> HalResult<()>;
}

/// Chip level services: identity, entropy, reset and the status LED.
pub trait SystemControl {
    /// Turn off the supply brownout detector so current spikes from the
    /// camera and flash LED don't reset the chip during boot.
    fn disable_brownout(&mut self);

    /// Factory programmed station MAC, if the chip exposes one.
    fn mac_address(&self) -> Option<[u8; 6]>;

    fn random_u32(&mut self) -> u32;

    /// External RAM is fitted and usable for frame buffers.
    fn has_psram(&self) -> bool;

    fn set_status_led(&mut self, on: bool);

    /// Hard reset. Real hardware never returns from this.
    fn restart(&mut self);
}

pub trait Delay {
    fn delay_ms(&mut self, ms: u32) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    /// 800x600
    Svga,
    /// 1600x1200
    Uxga,
}

/// Sensor setup derived from the memory available for frame buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraPreset {
    pub frame_size: FrameSize,
    /// JPEG quality, 0-63, lower is better.
    pub jpeg_quality: u8,
    pub fb_count: u8,
}

impl CameraPreset {
    pub const fn for_memory(psram: bool) -> Self {
        if psram {
            Self {
                frame_size: FrameSize::Uxga,
                jpeg_quality: 10,
                fb_count: 2,
            }
        } else {
            Self {
                frame_size: FrameSize::Svga,
                jpeg_quality: 12,
                fb_count: 1,
            }
        }
    }
}

pub trait Camera {
    fn init(&mut self, preset: &CameraPreset) -> HalResult<()>;
}

/// Wi-Fi bring-up.
pub trait Network {
    /// Start a WPA2 access point and return the address it serves on.
    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> impl Future<Output = HalResult<Ipv4Addr>>;

    /// Configure station credentials and kick off the association.
    fn begin_station(&mut self, ssid: &str, password: &str)
    -> impl Future<Output = HalResult<()>>;

    /// Address leased to the station, `None` while not connected.
    fn station_ip(&mut self) -> impl Future<Output = Option<Ipv4Addr>>;
}

/// Web/video front end. Frame serving itself lives behind this trait.
pub trait VideoService {
    fn start(&mut self, ip: Ipv4Addr) -> impl Future<Output = HalResult<()>>;
}
