/// Device orientation listener
///
/// A phone (or any sensor bridge) streams its orientation as UDP datagrams
/// of three numbers, `alpha beta gamma` in degrees, separated by whitespace
/// or commas. `null` or `-` marks a missing axis.
///
/// The listener is an iced stream: it only exists while the subscription
/// that owns it is active, and dropping the subscription closes the socket.

use iced::futures::channel::mpsc;
use iced::futures::{SinkExt, Stream};
use tokio::net::UdpSocket;

use crate::camera::OrientationReading;

/// Parse one datagram. Returns `None` for anything that isn't three fields.
pub fn parse_datagram(text: &str) -> Option<OrientationReading> {
    let fields: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .collect();

    let [alpha, beta, gamma] = fields.as_slice() else {
        return None;
    };

    Some(OrientationReading {
        alpha: parse_axis(alpha)?,
        beta: parse_axis(beta)?,
        gamma: parse_axis(gamma)?,
    })
}

/// `Some(None)` for an explicitly missing axis, `None` for garbage
fn parse_axis(field: &str) -> Option<Option<f32>> {
    match field {
        "null" | "-" => Some(None),
        _ => field.parse::<f32>().ok().map(Some),
    }
}

/// Listen for orientation datagrams on `addr`
pub fn listen(addr: String) -> impl Stream<Item = OrientationReading> {
    iced::stream::channel(32, move |mut output: mpsc::Sender<OrientationReading>| async move {
        let socket = match UdpSocket::bind(&addr).await {
            Ok(socket) => socket,
            Err(e) => {
                log::warn!("Orientation listener could not bind {addr}: {e}");
                return;
            }
        };
        log::info!("Listening for device orientation on {addr}");

        let mut buf = [0u8; 256];
        loop {
            let len = match socket.recv_from(&mut buf).await {
                Ok((len, _)) => len,
                Err(e) => {
                    log::warn!("Orientation listener stopped: {e}");
                    return;
                }
            };

            let Some(reading) = std::str::from_utf8(&buf[..len]).ok().and_then(parse_datagram) else {
                log::warn!("Ignoring malformed orientation datagram ({len} bytes)");
                continue;
            };

            if output.send(reading).await.is_err() {
                // Subscription dropped
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whitespace_and_commas() {
        let expected = OrientationReading {
            alpha: Some(10.5),
            beta: Some(-20.0),
            gamma: Some(3.0),
        };
        assert_eq!(parse_datagram("10.5 -20 3"), Some(expected));
        assert_eq!(parse_datagram("10.5,-20,3\n"), Some(expected));
        assert_eq!(parse_datagram(" 10.5 , -20 ,\t3 "), Some(expected));
    }

    #[test]
    fn test_parse_missing_axes() {
        let reading = parse_datagram("null 45 -").unwrap();
        assert_eq!(reading.alpha, None);
        assert_eq!(reading.beta, Some(45.0));
        assert_eq!(reading.gamma, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_datagram(""), None);
        assert_eq!(parse_datagram("1 2"), None);
        assert_eq!(parse_datagram("1 2 3 4"), None);
        assert_eq!(parse_datagram("1 two 3"), None);
    }
}
