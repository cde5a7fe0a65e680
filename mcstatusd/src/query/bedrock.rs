use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{lookup_host, UdpSocket};
use crate::query::{BedrockStatus, QueryError};

const UNCONNECTED_PING: u8 = 0x01;
const UNCONNECTED_PONG: u8 = 0x1c;

/// RakNet offline message marker
pub const OFFLINE_MAGIC: [u8; 16] = [
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56, 0x78,
];

/// id + timestamp + server guid + magic + string length
const PONG_HEADER_LEN: usize = 1 + 8 + 8 + 16 + 2;

pub fn ping_packet(timestamp: i64, client_guid: u64) -> Vec<u8> {
    let mut packet = Vec::with_capacity(1 + 8 + 16 + 8);
    packet.push(UNCONNECTED_PING);
    packet.extend_from_slice(&timestamp.to_be_bytes());
    packet.extend_from_slice(&OFFLINE_MAGIC);
    packet.extend_from_slice(&client_guid.to_be_bytes());
    packet
}

/// Parse an unconnected pong. The payload is a `;`-separated list:
/// edition, motd, protocol, version, online, max, server id, map, game mode.
pub fn parse_pong(buf: &[u8]) -> Result<BedrockStatus, QueryError> {
    if buf.len() < PONG_HEADER_LEN || buf[0] != UNCONNECTED_PONG {
        return Err(QueryError::Malformed("not an unconnected pong".into()));
    }
    if buf[17..33] != OFFLINE_MAGIC {
        return Err(QueryError::Malformed("missing offline magic".into()));
    }

    let len = u16::from_be_bytes([buf[33], buf[34]]) as usize;
    let payload = buf
        .get(PONG_HEADER_LEN..PONG_HEADER_LEN + len)
        .ok_or_else(|| QueryError::Malformed("pong payload overruns datagram".into()))?;
    let payload = String::from_utf8_lossy(payload);

    let fields: Vec<&str> = payload.split(';').collect();
    if fields.len() < 6 {
        return Err(QueryError::Malformed(format!("pong has {} fields", fields.len())));
    }

    let count = |idx: usize| {
        fields[idx]
            .parse::<i32>()
            .map_err(|_| QueryError::Malformed(format!("bad player count {:?}", fields[idx])))
    };
    let optional = |idx: usize| {
        fields
            .get(idx)
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
    };

    Ok(BedrockStatus {
        motd: fields[1].to_string(),
        version_name: fields[3].to_string(),
        protocol: fields[2].parse().ok(),
        players_online: count(4)?,
        players_max: count(5)?,
        map: optional(7),
        game_mode: optional(8),
    })
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

async fn bind_for(target: &SocketAddr) -> std::io::Result<UdpSocket> {
    let local: SocketAddr = match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    UdpSocket::bind(local).await
}

/// Unconnected ping against `host:port`, resending up to `tries` times.
pub async fn ping(
    host: &str,
    port: u16,
    tries: u32,
    wait: Duration,
) -> Result<BedrockStatus, QueryError> {
    let addr = lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| QueryError::Unresolvable(host.to_string()))?;

    let socket = bind_for(&addr).await?;
    socket.connect(addr).await?;

    let packet = ping_packet(now_millis(), fastrand::u64(..));
    let mut buf = vec![0u8; 1500];

    for attempt in 1..=tries.max(1) {
        socket.send(&packet).await?;

        match tokio::time::timeout(wait, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => return parse_pong(&buf[..n]),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => tracing::debug!("No pong from {} (attempt {}/{})", addr, attempt, tries),
        }
    }

    Err(QueryError::Timeout(wait * tries.max(1)))
}
