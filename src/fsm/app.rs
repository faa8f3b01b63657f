// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Boot phases, logged as the device comes up so a serial capture shows how
//! far it got.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PowerOn,
    StoreReady,
    SettingsReady,
    CameraReady,
    NetworkReady,
    ServiceReady,
    /// Console and video service up.
    Running,
    /// A peripheral failed, only the console is served.
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Ok,
    Fail,
}

impl Phase {
    pub fn next(self, event: Event) -> Phase {
        match (self, event) {
            // store and settings failures fall back to RAM, boot goes on
            (Phase::PowerOn, _) => Phase::StoreReady,
            (Phase::StoreReady, _) => Phase::SettingsReady,
            (Phase::SettingsReady, Event::Ok) => Phase::CameraReady,
            (Phase::CameraReady, Event::Ok) => Phase::NetworkReady,
            (Phase::NetworkReady, Event::Ok) => Phase::ServiceReady,
            (Phase::ServiceReady, _) => Phase::Running,
            (Phase::Running, Event::Ok) => Phase::Running,
            (_, Event::Fail) => Phase::Degraded,
            (Phase::Degraded, Event::Ok) => Phase::Degraded,
        }
    }

    /// Whether the console is the only thing left to serve.
    pub fn is_degraded(self) -> bool {
        self == Phase::Degraded
    }
}
