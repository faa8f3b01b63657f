#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod boot;
pub mod config;
pub mod errors;
pub mod fsm;
pub mod retry;
pub mod serial;
pub mod settings;

#[cfg(target_os = "none")]
pub mod espressif;
