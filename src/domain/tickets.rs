use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Ticket code alphabet without the look-alike characters 0/O and 1/I.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 8;
const CODE_PREFIX: &str = "TK-";
const PAYLOAD_TAG: &str = "TICKET";

/// Fields carried by a verified QR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrTicket {
    pub ticket_code: String,
    pub trip_id: Uuid,
    pub seat_code: String,
}

pub fn generate_ticket_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let body: String = (0..CODE_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    format!("{}{}", CODE_PREFIX, body)
}

fn signer(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}

fn signed_message(ticket_code: &str, trip_id: Uuid, seat_code: &str) -> String {
    format!("{ticket_code}:{trip_id}:{seat_code}")
}

fn ticket_sig(secret: &str, ticket_code: &str, trip_id: Uuid, seat_code: &str) -> String {
    let mut mac = signer(secret);
    mac.update(signed_message(ticket_code, trip_id, seat_code).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build the string encoded into a ticket's QR code.
pub fn qr_payload(secret: &str, ticket_code: &str, trip_id: Uuid, seat_code: &str) -> String {
    let sig = ticket_sig(secret, ticket_code, trip_id, seat_code);
    format!("{PAYLOAD_TAG}|code={ticket_code}|trip={trip_id}|seat={seat_code}|sig={sig}")
}

/// Parse a QR payload and check its signature. Returns `None` for anything
/// malformed or not signed with `secret`.
pub fn verify_qr_payload(secret: &str, payload: &str) -> Option<QrTicket> {
    let mut parts = payload.trim().split('|');
    if parts.next()? != PAYLOAD_TAG {
        return None;
    }
    let ticket_code = parts.next()?.strip_prefix("code=")?;
    let trip_id = parts.next()?.strip_prefix("trip=")?.parse::<Uuid>().ok()?;
    let seat_code = parts.next()?.strip_prefix("seat=")?;
    let sig = hex::decode(parts.next()?.strip_prefix("sig=")?).ok()?;
    if parts.next().is_some() {
        return None;
    }

    let mut mac = signer(secret);
    mac.update(signed_message(ticket_code, trip_id, seat_code).as_bytes());
    mac.verify_slice(&sig).ok()?;

    Some(QrTicket {
        ticket_code: ticket_code.to_string(),
        trip_id,
        seat_code: seat_code.to_string(),
    })
}

/// Split `total` into `parts` shares that sum exactly to `total`; the
/// remainder goes to the first shares.
pub fn split_amount(total: i64, parts: usize) -> Vec<i64> {
    let Ok(n) = i64::try_from(parts) else {
        return Vec::new();
    };
    if n == 0 {
        return Vec::new();
    }
    let base = total / n;
    let remainder = total % n;
    (0..n).map(|i| if i < remainder { base + 1 } else { base }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_ticket_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_ticket_code(&mut rng);
            let body = code.strip_prefix("TK-").unwrap();
            assert_eq!(body.len(), 8);
            assert!(body.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_payload_verifies_with_same_secret() {
        let trip = Uuid::new_v4();
        let payload = qr_payload("s3cret", "TK-ABCD2345", trip, "U-B3");
        assert!(payload.starts_with("TICKET|code=TK-ABCD2345|"));

        let ticket = verify_qr_payload("s3cret", &payload).unwrap();
        assert_eq!(ticket.ticket_code, "TK-ABCD2345");
        assert_eq!(ticket.trip_id, trip);
        assert_eq!(ticket.seat_code, "U-B3");
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let trip = Uuid::new_v4();
        let payload = qr_payload("s3cret", "TK-ABCD2345", trip, "A1");

        assert!(verify_qr_payload("other", &payload).is_none());
        assert!(verify_qr_payload("s3cret", &payload.replace("seat=A1", "seat=A2")).is_none());
        assert!(verify_qr_payload("s3cret", "TICKET|code=x").is_none());
        assert!(verify_qr_payload("s3cret", &format!("{payload}|extra")).is_none());
    }

    #[test]
    fn test_split_amount() {
        assert_eq!(split_amount(100, 3), vec![34, 33, 33]);
        assert_eq!(split_amount(90, 3), vec![30, 30, 30]);
        assert_eq!(split_amount(1, 2), vec![1, 0]);
        assert!(split_amount(10, 0).is_empty());
        assert_eq!(split_amount(185_000, 2).iter().sum::<i64>(), 185_000);
    }
}
