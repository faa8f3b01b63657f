// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Minimal HTTP front page. Frame streaming is provided by the video pipeline
//! and is not served from here.

use core::fmt::Write as _;
use core::net::Ipv4Addr;

use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpListenEndpoint, Stack};
use embassy_time::Duration;
use embedded_io_async::Write;
use heapless::String;
#[allow(unused_imports)]
use log::{debug, error, info, warn};

use hal::{HalError, HalResult, VideoService};

use crate::net::NET_STACK;

pub struct WebService {
    spawner: Spawner,
    port: u16,
    stream_port: u16,
}

impl WebService {
    pub fn new(spawner: Spawner, port: u16, stream_port: u16) -> Self {
        Self {
            spawner,
            port,
            stream_port,
        }
    }
}

impl VideoService for WebService {
    async fn start(&mut self, ip: Ipv4Addr) -> HalResult<()> {
        let Some(stack) = NET_STACK.try_get() else {
            error!("no network stack for the web service");
            return Err(HalError::Service);
        };
        self.spawner
            .spawn(http_task(*stack, ip, self.port, self.stream_port))
            .map_err(|e| {
                error!("web task: {:?}", e);
                HalError::Service
            })
    }
}

#[embassy_executor::task]
async fn http_task(stack: Stack<'static>, ip: Ipv4Addr, port: u16, stream_port: u16) {
    let rx_buffer = mk_static!([u8; 1536], [0; 1536]);
    let tx_buffer = mk_static!([u8; 1536], [0; 1536]);

    let mut page: String<512> = String::new();
    if write!(
        page,
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
         <html><body><h1>cam-stamp</h1>\
         <p>Stream: <a href=\"http://{ip}:{stream_port}/stream\">http://{ip}:{stream_port}/stream</a></p>\
         </body></html>"
    )
    .is_err()
    {
        error!("front page does not fit");
        return;
    }

    loop {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(10)));

        if let Err(e) = socket
            .accept(IpListenEndpoint { addr: None, port })
            .await
        {
            warn!("accept error: {:?}", e);
            continue;
        }
        debug!("http client {:?}", socket.remote_endpoint());

        // request content is irrelevant, wait for the header terminator
        let mut req = [0u8; 512];
        let mut seen = 0;
        while seen < req.len() {
            match socket.read(&mut req[seen..]).await {
                Ok(0) | Err(_) => break,
                Ok(n) => seen += n,
            }
            if req[..seen].windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        if let Err(e) = socket.write_all(page.as_bytes()).await {
            warn!("http write error: {:?}", e);
        }
        let _ = socket.flush().await;
        socket.close();
    }
}
