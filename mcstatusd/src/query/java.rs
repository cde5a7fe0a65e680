use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use crate::query::chat;
use crate::query::varint::{decode_varint, read_varint, write_string, write_varint};
use crate::query::{JavaStatus, QueryError};

/// Protocol number sent in the handshake; servers answer status for any version
pub const HANDSHAKE_PROTOCOL: i32 = 47;

const STATUS_PACKET_ID: i32 = 0x00;
const NEXT_STATE_STATUS: i32 = 1;

/// Upper bound on a status response; icons make these a few tens of KiB
const MAX_PACKET_LEN: i32 = 1 << 21;

#[derive(Debug, Deserialize)]
struct RawStatus {
    version: RawVersion,
    players: RawPlayers,
    #[serde(default)]
    description: Value,
    #[serde(default)]
    favicon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    name: String,
    protocol: i32,
}

#[derive(Debug, Deserialize)]
struct RawPlayers {
    online: i32,
    max: i32,
    #[serde(default)]
    sample: Option<Vec<RawPlayer>>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    name: String,
}

/// Wrap a packet body in its VarInt length prefix
fn frame(body: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(body.len() + 5);
    write_varint(&mut packet, body.len() as i32);
    packet.extend_from_slice(body);
    packet
}

pub fn handshake_packet(host: &str, port: u16) -> Vec<u8> {
    let mut body = Vec::new();
    write_varint(&mut body, STATUS_PACKET_ID);
    write_varint(&mut body, HANDSHAKE_PROTOCOL);
    write_string(&mut body, host.trim_end_matches('.'));
    body.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut body, NEXT_STATE_STATUS);
    frame(&body)
}

pub fn status_request_packet() -> Vec<u8> {
    frame(&[STATUS_PACKET_ID as u8])
}

/// Read one framed packet and return its body
async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, QueryError> {
    let len = read_varint(reader).await?;
    if len <= 0 || len > MAX_PACKET_LEN {
        return Err(QueryError::Malformed(format!("packet length {} out of range", len)));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Extract the JSON string from a status response body
pub fn decode_status_body(body: &[u8]) -> Result<&str, QueryError> {
    let (packet_id, used) = decode_varint(body)?;
    if packet_id != STATUS_PACKET_ID {
        return Err(QueryError::Malformed(format!("unexpected packet id {:#x}", packet_id)));
    }

    let rest = &body[used..];
    let (len, used) = decode_varint(rest)?;
    let json = usize::try_from(len)
        .ok()
        .and_then(|len| rest.get(used..used + len))
        .ok_or_else(|| QueryError::Malformed("status string overruns packet".into()))?;

    std::str::from_utf8(json).map_err(|e| QueryError::Malformed(e.to_string()))
}

pub fn parse_status(json: &str) -> Result<JavaStatus, QueryError> {
    let raw: RawStatus = serde_json::from_str(json)?;

    Ok(JavaStatus {
        description: chat::flatten(&raw.description),
        version_name: raw.version.name,
        protocol: raw.version.protocol,
        players_online: raw.players.online,
        players_max: raw.players.max,
        sample: raw
            .players
            .sample
            .map(|sample| sample.into_iter().map(|p| p.name).collect()),
        icon: raw.favicon,
    })
}

/// Server List Ping against `host:port`.
pub async fn ping(host: &str, port: u16) -> Result<JavaStatus, QueryError> {
    let mut stream = TcpStream::connect((host, port)).await?;

    stream.write_all(&handshake_packet(host, port)).await?;
    stream.write_all(&status_request_packet()).await?;
    stream.flush().await?;

    let body = read_packet(&mut stream).await?;
    parse_status(decode_status_body(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    fn response_packet(json: &str) -> Vec<u8> {
        let mut body = Vec::new();
        write_varint(&mut body, STATUS_PACKET_ID);
        write_string(&mut body, json);
        frame(&body)
    }

    #[test]
    fn test_handshake_layout() {
        let packet = handshake_packet("mc.example.org.", 25565);

        // length, id, protocol 47, "mc.example.org", port, next state
        let mut expected = vec![0x00, 0x2f, 0x0e];
        expected.extend_from_slice(b"mc.example.org");
        expected.extend_from_slice(&[0x63, 0xdd, 0x01]);
        assert_eq!(packet[0] as usize, expected.len());
        assert_eq!(&packet[1..], expected.as_slice());
    }

    #[test]
    fn test_parse_status_with_sample_and_icon() {
        let json = json!({
            "version": {"name": "Paper 1.20.4", "protocol": 765},
            "players": {"online": 2, "max": 50, "sample": [
                {"name": "alex", "id": "00000000-0000-0000-0000-000000000001"},
                {"name": "steve", "id": "00000000-0000-0000-0000-000000000002"}
            ]},
            "description": {"text": "Hub", "color": "gold"},
            "favicon": "data:image/png;base64,iVBORw0KGgo="
        })
        .to_string();

        let status = parse_status(&json).unwrap();
        assert_eq!(status.description, "§6Hub");
        assert_eq!(status.version_name, "Paper 1.20.4");
        assert_eq!(status.protocol, 765);
        assert_eq!(status.players_online, 2);
        assert_eq!(status.sample, Some(vec!["alex".to_string(), "steve".to_string()]));
        assert_eq!(status.icon.as_deref(), Some("data:image/png;base64,iVBORw0KGgo="));
    }

    #[test]
    fn test_parse_status_without_sample() {
        let json = r#"{"version":{"name":"1.8","protocol":47},"players":{"online":0,"max":20},"description":"A Minecraft Server"}"#;
        let status = parse_status(json).unwrap();

        assert_eq!(status.sample, None);
        assert_eq!(status.icon, None);
        assert_eq!(status.description, "A Minecraft Server");
    }

    #[test]
    fn test_decode_rejects_wrong_packet() {
        assert!(decode_status_body(&[0x01, 0x00]).is_err());
        assert!(decode_status_body(&[0x00, 0x05, b'{']).is_err());
        assert_eq!(decode_status_body(&[0x00, 0x02, b'{', b'}']).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_ping_against_loopback_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let handshake = read_packet(&mut socket).await.unwrap();
            let request = read_packet(&mut socket).await.unwrap();
            assert_eq!(request, vec![0x00]);

            let json = r#"{"version":{"name":"1.21","protocol":767},"players":{"online":1,"max":8,"sample":[{"name":"kai","id":"x"}]},"description":"§aHi"}"#;
            socket.write_all(&response_packet(json)).await.unwrap();
            handshake
        });

        let status = ping("127.0.0.1", port).await.unwrap();
        assert_eq!(status.version_name, "1.21");
        assert_eq!(status.sample, Some(vec!["kai".to_string()]));
        assert_eq!(status.description, "§aHi");

        let handshake = server.await.unwrap();
        assert_eq!(handshake[0], 0x00);
        assert_eq!(&handshake[handshake.len() - 3..handshake.len() - 1], &port.to_be_bytes());
    }

    #[tokio::test]
    async fn test_ping_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(matches!(ping("127.0.0.1", port).await, Err(QueryError::Io(_))));
    }
}
