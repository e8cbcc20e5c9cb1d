//! Datagram wire format.
//!
//! Every datagram is `MAGIC, opcode, payload`. Integers and floats are big-endian,
//! strings are a one-byte length followed by UTF-8.
use std::io::{Cursor, Read};

use anyhow::{anyhow, bail, Result};
use byteorder::{BigEndian, ReadBytesExt};

pub const PACKET_MAGIC: u8 = 0x4C;
/// Longest string payload; longer strings are cut at a character boundary.
pub const MAX_STRING: usize = 255;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Connect = 1,
    Accept = 2,
    Chat = 3,
    Pose = 4,
    Hit = 5,
    Disconnect = 6,
}

impl TryFrom<u8> for Opcode {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            1 => Opcode::Connect,
            2 => Opcode::Accept,
            3 => Opcode::Chat,
            4 => Opcode::Pose,
            5 => Opcode::Hit,
            6 => Opcode::Disconnect,
            other => bail!("unknown opcode {other}"),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseUpdate {
    pub player_id: u8,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Client → server handshake request.
    Connect { name: String },
    /// Server → client handshake reply carrying the assigned id.
    Accept { player_id: u8 },
    Chat { text: String },
    Pose(PoseUpdate),
    /// `player_id` was shot and must respawn.
    Hit { player_id: u8 },
    Disconnect { player_id: u8 },
}

impl Packet {
    pub fn opcode(&self) -> Opcode {
        match self {
            Packet::Connect { .. } => Opcode::Connect,
            Packet::Accept { .. } => Opcode::Accept,
            Packet::Chat { .. } => Opcode::Chat,
            Packet::Pose(_) => Opcode::Pose,
            Packet::Hit { .. } => Opcode::Hit,
            Packet::Disconnect { .. } => Opcode::Disconnect,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        buf.push(PACKET_MAGIC);
        buf.push(self.opcode() as u8);
        self.write_payload(&mut buf);
        buf
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        match self {
            Packet::Connect { name } => write_string(buf, name),
            Packet::Chat { text } => write_string(buf, text),
            Packet::Accept { player_id }
            | Packet::Hit { player_id }
            | Packet::Disconnect { player_id } => buf.push(*player_id),
            Packet::Pose(pose) => {
                buf.push(pose.player_id);
                buf.extend_from_slice(&pose.x.to_be_bytes());
                buf.extend_from_slice(&pose.y.to_be_bytes());
                buf.extend_from_slice(&pose.angle.to_be_bytes());
            }
        }
    }

    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let magic = cursor.read_u8()?;
        if magic != PACKET_MAGIC {
            bail!("bad packet magic {magic:#04x}");
        }
        let packet = match Opcode::try_from(cursor.read_u8()?)? {
            Opcode::Connect => Packet::Connect {
                name: read_string(&mut cursor)?,
            },
            Opcode::Accept => Packet::Accept {
                player_id: cursor.read_u8()?,
            },
            Opcode::Chat => Packet::Chat {
                text: read_string(&mut cursor)?,
            },
            Opcode::Pose => Packet::Pose(PoseUpdate {
                player_id: cursor.read_u8()?,
                x: cursor.read_f32::<BigEndian>()?,
                y: cursor.read_f32::<BigEndian>()?,
                angle: cursor.read_f32::<BigEndian>()?,
            }),
            Opcode::Hit => Packet::Hit {
                player_id: cursor.read_u8()?,
            },
            Opcode::Disconnect => Packet::Disconnect {
                player_id: cursor.read_u8()?,
            },
        };
        if (cursor.position() as usize) != bytes.len() {
            bail!(
                "{} trailing bytes after {:?}",
                bytes.len() - cursor.position() as usize,
                packet.opcode()
            );
        }
        Ok(packet)
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    let mut end = s.len().min(MAX_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    buf.push(end as u8);
    buf.extend_from_slice(&s.as_bytes()[..end]);
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let mut buf = vec![0; cursor.read_u8()? as usize];
    cursor.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| anyhow!("invalid UTF-8 string: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_layout() {
        let bytes = Packet::Pose(PoseUpdate {
            player_id: 3,
            x: 1.5,
            y: 2.0,
            angle: -0.5,
        })
        .to_bytes();
        assert_eq!(bytes.len(), 2 + 1 + 12);
        assert_eq!(&bytes[..3], &[PACKET_MAGIC, Opcode::Pose as u8, 3]);
        assert_eq!(&bytes[3..7], &1.5f32.to_be_bytes());
        let back = Packet::try_from_bytes(&bytes).unwrap();
        assert!(matches!(back, Packet::Pose(p) if p.player_id == 3 && p.angle == -0.5));
    }

    #[test]
    fn strings_are_length_prefixed_and_clipped() {
        let bytes = Packet::Chat { text: "hey".into() }.to_bytes();
        assert_eq!(bytes, vec![PACKET_MAGIC, 3, 3, b'h', b'e', b'y']);

        let long = "é".repeat(200);
        let bytes = Packet::Connect { name: long }.to_bytes();
        assert_eq!(bytes[2], 254);
        match Packet::try_from_bytes(&bytes).unwrap() {
            Packet::Connect { name } => assert_eq!(name.chars().count(), 127),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_datagrams() {
        assert!(Packet::try_from_bytes(&[]).is_err());
        assert!(Packet::try_from_bytes(&[0x00, 3, 0]).is_err());
        assert!(Packet::try_from_bytes(&[PACKET_MAGIC, 99]).is_err());
        assert!(Packet::try_from_bytes(&[PACKET_MAGIC, 3, 5, b'a']).is_err());
        assert!(Packet::try_from_bytes(&[PACKET_MAGIC, 4, 1, 0, 0]).is_err());
        assert!(Packet::try_from_bytes(&[PACKET_MAGIC, 2, 1, 9]).is_err());
        assert!(Packet::try_from_bytes(&[PACKET_MAGIC, 3, 2, 0xff, 0xfe]).is_err());
    }
}
