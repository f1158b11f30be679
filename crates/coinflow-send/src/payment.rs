//! Payment request parsing (`scheme:address?amount=x&label=y`).

use coinflow_core::amount::parse_amount;
use coinflow_core::constants::DECIMALS;
use coinflow_core::error::AddressError;

use crate::error::SendError;

/// A parsed payment request. `amount` is in coin base units.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentRequest {
    pub address: String,
    pub amount: Option<u64>,
    pub label: Option<String>,
    pub message: Option<String>,
}

/// Parse a scanned or pasted payment string.
///
/// Plain addresses are accepted as-is. Unknown query parameters are
/// ignored; a malformed `amount` is an error.
///
/// # Examples
///
/// ```
/// use coinflow_send::payment::parse_payment_address;
/// let req = parse_payment_address("bitcoin:1BoatSLRHtKNngkdXEeobR76b53LETtpyT?amount=0.5").unwrap();
/// assert_eq!(req.address, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT");
/// assert_eq!(req.amount, Some(50_000_000));
/// ```
pub fn parse_payment_address(raw: &str) -> Result<PaymentRequest, SendError> {
    let (address, query) = split_payment_address(raw);
    if address.is_empty() {
        return Err(AddressError::Empty.into());
    }

    let mut request = PaymentRequest {
        address: address.to_string(),
        ..PaymentRequest::default()
    };
    for pair in query.into_iter().flat_map(|q| q.split('&')) {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "amount" => request.amount = Some(parse_amount(value, DECIMALS)?),
            "label" => request.label = Some(percent_decode(value)),
            "message" => request.message = Some(percent_decode(value)),
            _ => {}
        }
    }
    Ok(request)
}

/// Address part of a payment string, with scheme and query removed.
/// Never fails; the result may be empty.
pub fn payment_address(raw: &str) -> &str {
    split_payment_address(raw).0
}

fn split_payment_address(raw: &str) -> (&str, Option<&str>) {
    let raw = raw.trim();
    let (path, query) = match raw.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (raw, None),
    };
    let address = match path.split_once(':') {
        Some((_scheme, rest)) => rest.trim_start_matches("//"),
        None => path,
    };
    (address, query)
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
                _ => out.push(b'%'),
            },
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
