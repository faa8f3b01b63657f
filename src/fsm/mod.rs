// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

// State machines in the style of https://hoverbear.org/blog/rust-state-machine-pattern/
//
// Tenets:
//  1. Lightweight and easy to understand/change.
//  2. Transitions are pure functions, side effects happen in the caller.
//  3. Non intrusive in application code.

pub mod app;
pub mod console;
