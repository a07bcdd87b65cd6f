use crate::*;

use icmpcopy_core::wire::{encode, IcmpType, MAGIC, MAX_PAYLOAD};
use icmpcopy_services::{send_stream, Transport};

/// The canonical scenario: 600 bytes in 256-byte chunks over loopback.
#[test]
fn test_loopback_transfer() {
    if !raw_sockets_available() {
        eprintln!("SKIP: raw ICMP sockets need root or CAP_NET_RAW");
        return;
    }

    let _lock = loopback_lock();

    let original: Vec<u8> = (0..600u32).map(|i| (i * 31 % 256) as u8).collect();

    let result = (|| -> Result<()> {
        let rx = spawn_receiver()?;
        let (mut sender, dest) = open_sender()?;

        let sent = send_stream(&mut sender, dest, &original[..], 256)?;
        assert_eq!(sent.data_packets, 3);
        assert_eq!(sent.close_sequence, 4);

        let (report, received) = wait_for_receiver(rx)?;
        assert_eq!(report.data_packets, 3);
        assert_eq!(report.bytes, 600);
        assert_eq!(received, original, "content mismatch");
        Ok(())
    })();

    result.unwrap();
}

/// Full-size chunks: each received datagram is 20 + 8 + 1492 bytes, more
/// than an Ethernet MTU, and must arrive whole.
#[test]
fn test_loopback_max_payload() {
    if !raw_sockets_available() {
        eprintln!("SKIP: raw ICMP sockets need root or CAP_NET_RAW");
        return;
    }

    let _lock = loopback_lock();

    let original: Vec<u8> = (0..2 * MAX_PAYLOAD as u32).map(|i| (i * 17 % 256) as u8).collect();

    let result = (|| -> Result<()> {
        let rx = spawn_receiver()?;
        let (mut sender, dest) = open_sender()?;

        let sent = send_stream(&mut sender, dest, &original[..], MAX_PAYLOAD)?;
        assert_eq!(sent.data_packets, 2);

        let (report, received) = wait_for_receiver(rx)?;
        assert_eq!(report.bytes, original.len() as u64);
        assert_eq!(received.len(), original.len());
        assert_eq!(received, original, "content mismatch");
        Ok(())
    })();

    result.unwrap();
}

/// Ordinary pings and tunnel data sent before the open signal must not
/// reach the output.
#[test]
fn test_loopback_ignores_foreign_traffic() {
    if !raw_sockets_available() {
        eprintln!("SKIP: raw ICMP sockets need root or CAP_NET_RAW");
        return;
    }

    let _lock = loopback_lock();

    let result = (|| -> Result<()> {
        let rx = spawn_receiver()?;
        let (mut sender, dest) = open_sender()?;

        let ping = encode(IcmpType::EchoRequest, 0, 0x1234, 1, b"just a ping")?;
        sender.send(&ping, dest)?;
        let early = encode(IcmpType::EchoRequest, 0, MAGIC, 1, b"too early")?;
        sender.send(&early, dest)?;

        send_stream(&mut sender, dest, &b"tunnelled"[..], 4)?;

        let (report, received) = wait_for_receiver(rx)?;
        assert_eq!(received, b"tunnelled");
        assert_eq!(report.data_packets, 3);
        Ok(())
    })();

    result.unwrap();
}
