// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Boot sequence and the console main loop.
//!
//! [`boot`] runs once after power on and never fails outright: every fault is
//! logged, recorded in the [`BootReport`] and the device carries on with
//! whatever still works. The serial console is always left running.

use core::fmt::{self, Write};
use core::net::Ipv4Addr;

use hal::{Camera, CameraPreset, Delay, Network, NvMedium, SystemControl, VideoService};
use heapless::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use snafu::ResultExt;
use storage::Store;

use crate::config::{Configuration, DeviceIdentity, WifiMode};
use crate::errors::{
    AccessPointSnafu, BootError, CameraSnafu, ServiceSnafu, StationSnafu, StationTimeoutSnafu,
};
use crate::fsm::app::{Event, Phase};
use crate::fsm::console::{Console, SessionInfo, State};
use crate::retry::RetryPolicy;
use crate::serial::LineBuffer;
use crate::settings::{BLINK_COUNT, BLINK_MS, RESTART_DELAY_MS};

/// Everything the device talks to besides the settings store.
pub struct Board<S, C, N, V, D> {
    pub system: S,
    pub camera: C,
    pub network: N,
    pub video: V,
    pub delay: D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    AccessPoint(Ipv4Addr),
    Station(Ipv4Addr),
    /// Station mode kept without an association.
    Unconnected,
    /// Network never brought up.
    Down,
}

impl Link {
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match *self {
            Link::AccessPoint(ip) | Link::Station(ip) => Some(ip),
            Link::Unconnected | Link::Down => None,
        }
    }
}

#[derive(Debug)]
pub struct BootReport {
    pub phase: Phase,
    pub link: Link,
    pub errors: Vec<BootError, 4>,
}

impl BootReport {
    fn advance(&mut self, event: Event) {
        self.phase = self.phase.next(event);
        info!("boot phase {:?}", self.phase);
    }

    fn fail(&mut self, err: BootError) {
        error!("{}", err);
        // at most one error per peripheral step
        let _ = self.errors.push(err);
        self.advance(Event::Fail);
    }
}

pub async fn boot<M, S, C, N, V, D>(
    medium: M,
    board: &mut Board<S, C, N, V, D>,
    policy: &RetryPolicy,
) -> (Runtime<M>, BootReport)
where
    M: NvMedium,
    S: SystemControl,
    C: Camera,
    N: Network,
    V: VideoService,
    D: Delay,
{
    let mut report = BootReport {
        phase: Phase::PowerOn,
        link: Link::Down,
        errors: Vec::new(),
    };

    board.system.disable_brownout();

    let mut store = match Store::initialize(medium) {
        Ok(store) => {
            report.advance(Event::Ok);
            store
        }
        Err(e) => {
            error!("{}, settings will not survive a restart", e);
            report.advance(Event::Fail);
            Store::detached()
        }
    };

    let identity = DeviceIdentity::from_system(&mut board.system);
    let config = Configuration::load_or_create(&mut store, &identity);
    report.advance(Event::Ok);

    let mut runtime = Runtime::new(store, config, identity);

    let preset = CameraPreset::for_memory(board.system.has_psram());
    info!("camera preset {:?}", preset);
    if let Err(e) = board.camera.init(&preset).context(CameraSnafu) {
        report.fail(e);
        return (runtime, report);
    }
    report.advance(Event::Ok);

    let settings = runtime.config.settings().clone();
    let link = match settings.mode {
        WifiMode::AccessPoint => {
            info!("starting access point {}", settings.ap_ssid);
            board
                .network
                .start_access_point(&settings.ap_ssid, &settings.ap_password)
                .await
                .context(AccessPointSnafu)
                .map(Link::AccessPoint)
        }
        WifiMode::Station => {
            info!("joining {}", settings.sta_ssid);
            connect_station(board, &settings.sta_ssid, &settings.sta_password, policy)
                .await
                .map(Link::Station)
        }
    };
    let ip = match link {
        Ok(link) => {
            report.link = link;
            runtime.ip = link.ip();
            report.advance(Event::Ok);
            link.ip()
        }
        Err(e) => {
            if matches!(e, BootError::StationTimeout { .. }) {
                report.link = Link::Unconnected;
            }
            report.fail(e);
            None
        }
    };
    let Some(ip) = ip else {
        return (runtime, report);
    };

    blink(&mut board.system, &mut board.delay).await;

    match board.video.start(ip).await.context(ServiceSnafu) {
        Ok(()) => {
            info!("Camera ready! Use 'http://{}' to connect", ip);
            report.advance(Event::Ok);
            report.advance(Event::Ok);
        }
        Err(e) => report.fail(e),
    }
    (runtime, report)
}

async fn connect_station<S, C, N, V, D>(
    board: &mut Board<S, C, N, V, D>,
    ssid: &str,
    password: &str,
    policy: &RetryPolicy,
) -> Result<Ipv4Addr, BootError>
where
    N: Network,
    D: Delay,
{
    board
        .network
        .begin_station(ssid, password)
        .await
        .context(StationSnafu)?;

    for attempt in policy.attempts() {
        if let Some(ip) = board.network.station_ip().await {
            info!("connected after {} polls, IP {}", attempt, ip);
            return Ok(ip);
        }
        debug!("not connected yet ({}/{})", attempt, policy.max_attempts);
        board.delay.delay_ms(policy.delay_ms).await;
    }
    StationTimeoutSnafu {
        attempts: policy.max_attempts,
    }
    .fail()
}

async fn blink<S: SystemControl, D: Delay>(system: &mut S, delay: &mut D) {
    for _ in 0..BLINK_COUNT {
        system.set_status_led(true);
        delay.delay_ms(BLINK_MS).await;
        system.set_status_led(false);
        delay.delay_ms(BLINK_MS).await;
    }
}

/// State owned by the main loop after boot.
pub struct Runtime<M> {
    store: Store<M>,
    config: Configuration,
    identity: DeviceIdentity,
    console: Console,
    lines: LineBuffer,
    ip: Option<Ipv4Addr>,
}

impl<M: NvMedium> Runtime<M> {
    pub fn new(store: Store<M>, config: Configuration, identity: DeviceIdentity) -> Self {
        Self {
            store,
            config,
            identity,
            console: Console::new(),
            lines: LineBuffer::new(),
            ip: None,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn store(&self) -> &Store<M> {
        &self.store
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    pub fn console_state(&self) -> &State {
        self.console.state()
    }

    /// Feed one serial byte, true once a whole line is waiting.
    pub fn receive(&mut self, byte: u8) -> bool {
        self.lines.push(byte)
    }

    /// Run the waiting line, if any, through the console.
    pub fn dispatch_line<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        let Some(line) = self.lines.take_line() else {
            return Ok(());
        };
        match line {
            Ok(line) => {
                let session = SessionInfo {
                    ip: self.ip,
                    identity: &self.identity,
                };
                self.console
                    .handle_line(&line, &mut self.config, &session, out)
            }
            Err(e) => self.console.reject_line(e, out),
        }
    }

    /// Save changed settings. Saving always schedules a restart.
    pub fn persist_if_needed<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        if !self.config.take_needs_persist() {
            return Ok(());
        }
        match self.config.save(&mut self.store) {
            Ok(()) => Ok(()),
            Err(e) => write!(out, "ERROR: settings not saved: {e}\r\n"),
        }
    }

    /// One main loop step: handle a waiting line, then save what it changed.
    /// Returns true when a restart is due, so the caller can drain its output
    /// before [`restart_if_pending`](Self::restart_if_pending).
    pub fn poll_once<W: Write>(&mut self, out: &mut W) -> Result<bool, fmt::Error> {
        self.dispatch_line(out)?;
        self.persist_if_needed(out)?;
        Ok(self.config.pending().pending_restart)
    }

    pub async fn restart_if_pending<S: SystemControl, D: Delay>(
        &mut self,
        system: &mut S,
        delay: &mut D,
    ) {
        if !self.config.take_pending_restart() {
            return;
        }
        info!("restarting in {} ms", RESTART_DELAY_MS);
        delay.delay_ms(RESTART_DELAY_MS).await;
        system.restart();
    }
}
