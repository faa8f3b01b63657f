#![no_std]
// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! ESP32 implementations of the cam-stamp `hal` traits.

#[cfg(target_os = "none")]
extern crate alloc;

// When you are okay with using a nightly compiler it's better to use https://docs.rs/static_cell/2.1.0/static_cell/macro.make_static.html
#[cfg(target_os = "none")]
macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

#[cfg(target_os = "none")]
pub mod camera;
#[cfg(target_os = "none")]
pub mod delay;
#[cfg(target_os = "none")]
pub mod net;
#[cfg(target_os = "none")]
pub mod system;
#[cfg(target_os = "none")]
pub mod web;
