//! Single-address layer-2 discovery
//!
//! One `ArpClient` owns the datalink channel for a scanning or monitoring
//! session. A background thread reads replies off the wire and completes
//! per-address waiters; `probe` sends one request and waits for its reply
//! under the caller's timeout.

use anyhow::{anyhow, Result};
use pnet::datalink::{self, Channel, DataLinkSender};
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::Packet;
use pnet::util::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::network::InterfaceInfo;

/// Broadcast destination for ARP requests
const BROADCAST_MAC: MacAddr = MacAddr(0xff, 0xff, 0xff, 0xff, 0xff, 0xff);

/// Receiver read timeout; bounds how long shutdown and drop can take
const READ_TIMEOUT: Duration = Duration::from_millis(100);

type WaiterMap = Arc<Mutex<HashMap<Ipv4Addr, oneshot::Sender<MacAddr>>>>;

pub struct ArpClient {
    source_mac: MacAddr,
    source_ip: Ipv4Addr,
    tx: Mutex<Box<dyn DataLinkSender>>,
    waiters: WaiterMap,
    shutdown: Arc<AtomicBool>,
    receiver: Option<thread::JoinHandle<()>>,
}

/// Builds a broadcast ARP request frame (14-byte Ethernet header followed
/// by the 28-byte ARP payload).
fn build_request(source_mac: MacAddr, source_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; 42];

    {
        let mut ethernet = MutableEthernetPacket::new(&mut buffer[..14])
            .ok_or_else(|| anyhow!("failed to construct Ethernet frame buffer"))?;
        ethernet.set_destination(BROADCAST_MAC);
        ethernet.set_source(source_mac);
        ethernet.set_ethertype(EtherTypes::Arp);
    }

    {
        let mut arp = MutableArpPacket::new(&mut buffer[14..42])
            .ok_or_else(|| anyhow!("failed to construct ARP packet buffer"))?;
        arp.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp.set_protocol_type(EtherTypes::Ipv4);
        arp.set_hw_addr_len(6);
        arp.set_proto_addr_len(4);
        arp.set_operation(ArpOperations::Request);
        arp.set_sender_hw_addr(source_mac);
        arp.set_sender_proto_addr(source_ip);
        arp.set_target_hw_addr(MacAddr::zero());
        arp.set_target_proto_addr(target_ip);
    }

    Ok(buffer)
}

fn receiver_loop(
    mut rx: Box<dyn datalink::DataLinkReceiver>,
    waiters: WaiterMap,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let frame = match rx.next() {
            Ok(frame) => frame,
            // Read timeouts and transient errors just re-check shutdown.
            Err(_) => continue,
        };

        let Some(ethernet) = EthernetPacket::new(frame) else {
            continue;
        };
        if ethernet.get_ethertype() != EtherTypes::Arp {
            continue;
        }
        let Some(arp) = ArpPacket::new(ethernet.payload()) else {
            continue;
        };
        if arp.get_operation() != ArpOperations::Reply {
            continue;
        }

        let sender_ip = arp.get_sender_proto_addr();
        let sender_mac = arp.get_sender_hw_addr();

        let waiter = match waiters.lock() {
            Ok(mut map) => map.remove(&sender_ip),
            Err(_) => {
                tracing::warn!("ARP waiter map lock poisoned; stopping receiver");
                break;
            }
        };
        if let Some(waiter) = waiter {
            // The prober may have timed out and dropped its end already.
            let _ = waiter.send(sender_mac);
        }
    }
}

impl ArpClient {
    /// Opens the datalink channel on `interface` and starts the reply
    /// receiver. Fails when the channel cannot be opened (insufficient
    /// privileges are the common cause).
    pub fn new(interface: &InterfaceInfo) -> Result<Self> {
        let config = datalink::Config {
            read_timeout: Some(READ_TIMEOUT),
            ..Default::default()
        };

        let (tx, rx) = match datalink::channel(&interface.pnet_interface, config) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => return Err(anyhow!("unsupported datalink channel type")),
            Err(e) => return Err(anyhow!("failed to open datalink channel: {}", e)),
        };

        let waiters: WaiterMap = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let receiver = {
            let waiters = Arc::clone(&waiters);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || receiver_loop(rx, waiters, shutdown))
        };

        Ok(Self {
            source_mac: interface.mac,
            source_ip: interface.ip,
            tx: Mutex::new(tx),
            waiters,
            shutdown,
            receiver: Some(receiver),
        })
    }

    /// Probes one address, returning its hardware address and round-trip
    /// time on reply.
    ///
    /// One outstanding probe per address: a newer probe for the same
    /// target supersedes the previous waiter.
    pub async fn probe(&self, target: Ipv4Addr, timeout: Duration) -> Option<(MacAddr, Duration)> {
        let (reply_tx, reply_rx) = oneshot::channel();

        match self.waiters.lock() {
            Ok(mut map) => {
                map.insert(target, reply_tx);
            }
            Err(_) => {
                tracing::warn!("ARP waiter map lock poisoned; skipping probe of {}", target);
                return None;
            }
        }

        let request = match build_request(self.source_mac, self.source_ip, target) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("failed to build ARP request for {}: {}", target, e);
                self.forget_waiter(target);
                return None;
            }
        };

        let started = Instant::now();
        let sent = match self.tx.lock() {
            Ok(mut tx) => matches!(tx.send_to(&request, None), Some(Ok(()))),
            Err(_) => false,
        };
        if !sent {
            tracing::debug!("failed to send ARP request for {}", target);
            self.forget_waiter(target);
            return None;
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(mac)) => Some((mac, started.elapsed())),
            _ => {
                self.forget_waiter(target);
                None
            }
        }
    }

    fn forget_waiter(&self, target: Ipv4Addr) {
        if let Ok(mut map) = self.waiters.lock() {
            map.remove(&target);
        }
    }
}

impl Drop for ArpClient {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
    }
}
