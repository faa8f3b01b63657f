// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::net::{Ipv4Addr, SocketAddrV4};

use embassy_executor::Spawner;
use embassy_net::{Ipv4Cidr, Runner, Stack, StackResources, StaticConfigV4};
use embassy_sync::once_lock::OnceLock;
use embassy_time::{Duration, Timer};
#[allow(unused_imports)]
use log::{debug, error, info, warn};

use esp_radio::wifi::{
    AccessPointConfig, AuthMethod, ClientConfig, Interfaces, ModeConfig, WifiController,
    WifiDevice,
};

use edge_dhcp::{
    io::{self, DEFAULT_SERVER_PORT},
    server::{Server, ServerOptions},
};
use edge_nal::UdpBind;
use edge_nal_embassy::{Udp, UdpBuffers};

use hal::{HalError, HalResult, Network};

/// Stack of whichever interface came up, for the services running on it.
pub static NET_STACK: OnceLock<Stack<'static>> = OnceLock::new();

pub struct EspNetwork {
    spawner: Spawner,
    controller: WifiController<'static>,
    interfaces: Option<Interfaces<'static>>,
    seed: u64,
    ap_address: Ipv4Addr,
    ap_prefix_len: u8,
    stack: Option<Stack<'static>>,
}

impl EspNetwork {
    pub fn new(
        spawner: Spawner,
        controller: WifiController<'static>,
        interfaces: Interfaces<'static>,
        seed: u64,
        ap_address: Ipv4Addr,
        ap_prefix_len: u8,
    ) -> Self {
        Self {
            spawner,
            controller,
            interfaces: Some(interfaces),
            seed,
            ap_address,
            ap_prefix_len,
            stack: None,
        }
    }

    fn take_interfaces(&mut self) -> HalResult<Interfaces<'static>> {
        self.interfaces.take().ok_or_else(|| {
            error!("wifi interfaces already in use");
            HalError::Wifi
        })
    }

    fn publish(&mut self, stack: Stack<'static>) {
        self.stack = Some(stack);
        if NET_STACK.init(stack).is_err() {
            warn!("network stack published twice");
        }
    }
}

fn wifi_err<E: core::fmt::Debug>(e: E) -> HalError {
    error!("wifi: {:?}", e);
    HalError::Wifi
}

impl Network for EspNetwork {
    async fn start_access_point(&mut self, ssid: &str, password: &str) -> HalResult<Ipv4Addr> {
        let interfaces = self.take_interfaces()?;
        let gw = self.ap_address;

        let net_config = embassy_net::Config::ipv4_static(StaticConfigV4 {
            address: Ipv4Cidr::new(gw, self.ap_prefix_len),
            gateway: Some(gw),
            dns_servers: Default::default(),
        });
        let (stack, runner) = embassy_net::new(
            interfaces.ap,
            net_config,
            mk_static!(StackResources<4>, StackResources::<4>::new()),
            self.seed,
        );

        let ap_config = AccessPointConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into())
            .with_auth_method(AuthMethod::Wpa2Personal);
        self.controller
            .set_config(&ModeConfig::AccessPoint(ap_config))
            .map_err(wifi_err)?;
        info!("starting wifi");
        self.controller.start_async().await.map_err(wifi_err)?;

        self.spawner.spawn(net_up(runner)).map_err(wifi_err)?;
        self.spawner.spawn(dhcp_server(stack, gw)).map_err(wifi_err)?;

        while !stack.is_link_up() {
            debug!("waiting for AP link");
            Timer::after(Duration::from_millis(500)).await;
        }
        info!("AP {} up, connect as a DHCP client, gateway {}", ssid, gw);

        self.publish(stack);
        Ok(gw)
    }

    async fn begin_station(&mut self, ssid: &str, password: &str) -> HalResult<()> {
        let interfaces = self.take_interfaces()?;

        let (stack, runner) = embassy_net::new(
            interfaces.sta,
            embassy_net::Config::dhcpv4(Default::default()),
            mk_static!(StackResources<4>, StackResources::<4>::new()),
            self.seed,
        );

        let client_config = ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into());
        self.controller
            .set_config(&ModeConfig::Client(client_config))
            .map_err(wifi_err)?;
        self.controller.start_async().await.map_err(wifi_err)?;
        self.spawner.spawn(net_up(runner)).map_err(wifi_err)?;

        // association completes in the background, station_ip() reports it
        if let Err(e) = self.controller.connect() {
            warn!("wifi connect request failed: {:?}", e);
        }

        self.publish(stack);
        Ok(())
    }

    async fn station_ip(&mut self) -> Option<Ipv4Addr> {
        let stack = self.stack?;
        stack.config_v4().map(|c| c.address.address())
    }
}

#[embassy_executor::task]
async fn net_up(mut runner: Runner<'static, WifiDevice<'static>>) {
    info!("bringing up network stack");
    runner.run().await
}

#[embassy_executor::task]
async fn dhcp_server(stack: Stack<'static>, ip: Ipv4Addr) {
    let mut buf = [0u8; 1500];

    let mut gw_buf = [Ipv4Addr::UNSPECIFIED];

    let buffers = UdpBuffers::<3, 1024, 1024, 10>::new();
    let unbound_socket = Udp::new(stack, &buffers);
    let mut bound_socket = match unbound_socket
        .bind(core::net::SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::UNSPECIFIED,
            DEFAULT_SERVER_PORT,
        )))
        .await
    {
        Ok(socket) => socket,
        Err(e) => {
            error!("DHCP server could not bind: {:?}", e);
            return;
        }
    };

    loop {
        let _ = io::server::run(
            &mut Server::<_, 64>::new_with_et(ip),
            &ServerOptions::new(ip, Some(&mut gw_buf)),
            &mut bound_socket,
            &mut buf,
        )
        .await
        .inspect_err(|e| warn!("DHCP server error: {e:?}"));
        Timer::after(Duration::from_millis(500)).await;
    }
}
