//! SNTP (RFC 4330) client packet codec

/// NTP packet length without extensions
pub const PACKET_LEN: usize = 48;

/// SNTP server port (UDP 123)
pub const NTP_PORT: u16 = 123;

/// Seconds between the NTP era 0 epoch (1900) and the Unix epoch
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// LI = 0, VN = 3, Mode = 3 (client)
const CLIENT_REQUEST: u8 = 0x1B;

const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;

/// Maximum valid stratum; 16 means unsynchronized
const MAX_STRATUM: u8 = 15;

/// Response validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NtpError {
    /// Fewer than 48 bytes received
    Truncated(usize),
    /// Not a server or broadcast packet
    UnexpectedMode(u8),
    /// Kiss-o'-death (0) or unsynchronized server
    InvalidStratum(u8),
    /// Transmit timestamp missing
    ZeroTimestamp,
}

/// Client request packet
pub fn request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_REQUEST;
    packet
}

/// Parse a server response into Unix seconds (transmit timestamp)
pub fn parse_response(packet: &[u8]) -> Result<u64, NtpError> {
    if packet.len() < PACKET_LEN {
        return Err(NtpError::Truncated(packet.len()));
    }

    let mode = packet[0] & 0x07;
    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(NtpError::UnexpectedMode(mode));
    }

    let stratum = packet[1];
    if stratum == 0 || stratum > MAX_STRATUM {
        return Err(NtpError::InvalidStratum(stratum));
    }

    let secs = u64::from(u32::from_be_bytes([
        packet[40], packet[41], packet[42], packet[43],
    ]));
    if secs == 0 {
        return Err(NtpError::ZeroTimestamp);
    }

    // Timestamps below the offset belong to era 1 (after 2036-02-07)
    Ok(if secs >= NTP_UNIX_OFFSET {
        secs - NTP_UNIX_OFFSET
    } else {
        secs + (1 << 32) - NTP_UNIX_OFFSET
    })
}
