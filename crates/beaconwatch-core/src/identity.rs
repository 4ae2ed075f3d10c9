//! Identity keys for decoded frames.

use crate::frame::Frame;

/// Derive the dedup key for an identity-bearing frame.
///
/// UID and EID frames render their identifier bytes as lowercase hex behind
/// a kind prefix; URL frames use the expanded URL. Telemetry and unknown
/// frames have no identity.
#[must_use]
pub fn resolve_key(frame: &Frame) -> Option<String> {
    match frame {
        Frame::Uid(uid) => Some(format!(
            "uid:{}{}",
            hex::encode(uid.namespace),
            hex::encode(uid.instance)
        )),
        Frame::Eid(eid) => Some(format!("eid:{}", hex::encode(eid.ephemeral_id))),
        Frame::Url(url) => Some(url.url.clone()),
        Frame::Telemetry(_) | Frame::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{self, TelemetryFrame};

    #[test]
    fn test_identical_payloads_share_a_key() {
        let data = [
            0x00, 0xEC, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
        ];
        let first = resolve_key(&frame::decode(&data));
        let mut with_other_power = data;
        with_other_power[1] = 0x00;
        let second = resolve_key(&frame::decode(&with_other_power));

        assert_eq!(first.as_deref(), Some("uid:0102030405060708090a0b0c0d0e0f10"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_eid_key() {
        let data = [0x30, 0x00, 0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02, 0x03];
        assert_eq!(
            resolve_key(&frame::decode(&data)).as_deref(),
            Some("eid:deadbeef00010203")
        );
    }

    #[test]
    fn test_url_key_is_the_url() {
        let data = frame::url_frame_bytes(0, "https://example.org/b").unwrap();
        assert_eq!(
            resolve_key(&frame::decode(&data)).as_deref(),
            Some("https://example.org/b")
        );
    }

    #[test]
    fn test_uid_and_eid_keys_never_collide() {
        let uid = [0x00, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let eid = [0x30, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_ne!(
            resolve_key(&frame::decode(&uid)),
            resolve_key(&frame::decode(&eid))
        );
    }

    #[test]
    fn test_no_key_without_identity() {
        assert_eq!(resolve_key(&Frame::Unknown), None);
        assert_eq!(
            resolve_key(&Frame::Telemetry(TelemetryFrame::new(vec![0x20, 0x00]))),
            None
        );
    }
}
