use crate::addr::NetworkAddress;
use crate::error::Error;
use crate::proto::network::{FLAG_MORE_FRAGMENTS, MIN_HEADER_LEN};
use crate::proto::{Codec, LayerKind, NetworkCodec, NetworkHeader};

fn codec(mtu: usize) -> NetworkCodec {
    NetworkCodec::new(
        NetworkAddress::host([10, 0, 1, 2]),
        NetworkAddress::host([10, 0, 2, 10]),
    )
    .with_identification(0x1234)
    .with_mtu(mtu)
    .expect("mtu")
}

fn headers(wire: &[u8]) -> Vec<NetworkHeader> {
    let mut out = Vec::new();
    let mut rest = wire;
    while !rest.is_empty() {
        let h = NetworkHeader::parse(rest).expect("header");
        rest = &rest[h.total_length as usize..];
        out.push(h);
    }
    out
}

#[test]
fn network_fragments_25_bytes_at_mtu_30_into_8_8_9() {
    let payload: Vec<u8> = (0..25).collect();
    let c = codec(30);

    let frags = c.fragment(&payload).unwrap();
    let sizes: Vec<usize> = frags.iter().map(|(_, d)| d.len()).collect();
    let offsets: Vec<usize> = frags.iter().map(|(h, _)| h.fragment_offset_bytes()).collect();
    let more: Vec<bool> = frags.iter().map(|(h, _)| h.more_fragments()).collect();
    assert_eq!(sizes, vec![8, 8, 9]);
    assert_eq!(offsets, vec![0, 8, 16]);
    assert_eq!(more, vec![true, true, false]);

    let wire = c.encapsulate(&payload).unwrap();
    assert_eq!(wire.len(), 25 + 3 * MIN_HEADER_LEN);
    assert_eq!(c.decapsulate(&wire).unwrap(), payload);
}

#[test]
fn network_round_trips_many_lengths_and_mtus() {
    for mtu in [28, 29, 60, 576, 1500] {
        for len in [1, 7, 8, 9, 100, 1000, 3000] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let c = codec(mtu);
            let wire = c.encapsulate(&payload).unwrap();
            for h in headers(&wire) {
                assert!(h.total_length as usize <= mtu, "mtu {mtu} len {len}");
            }
            assert_eq!(c.decapsulate(&wire).unwrap(), payload, "mtu {mtu} len {len}");
        }
    }
}

#[test]
fn network_header_fields_are_written_big_endian() {
    let c = codec(1500).with_ttl(7).with_tos(0x10);
    let wire = c.encapsulate(b"abc").unwrap();
    assert_eq!(wire[0], 0x45);
    assert_eq!(wire[1], 0x10);
    assert_eq!(u16::from_be_bytes([wire[2], wire[3]]), 23);
    assert_eq!(u16::from_be_bytes([wire[4], wire[5]]), 0x1234);
    assert_eq!(wire[8], 7);
    assert_eq!(wire[9], 17);
    assert_eq!(&wire[12..16], &[10, 0, 1, 2]);
    assert_eq!(&wire[16..20], &[10, 0, 2, 10]);
    assert_eq!(&wire[20..], b"abc");
}

#[test]
fn network_more_fragments_flag_sits_in_the_middle_bit() {
    let c = codec(30);
    let wire = c.encapsulate(&[0u8; 20]).unwrap();
    // 第一个分片：flags = 0b010，偏移 0
    assert_eq!(wire[6] >> 5, FLAG_MORE_FRAGMENTS);
    assert_eq!(wire[6] & 0x1f, 0);
    assert_eq!(wire[7], 0);
}

#[test]
fn network_reassembles_fragments_presented_out_of_order() {
    let payload: Vec<u8> = (0..25).collect();
    let c = codec(30);
    let wire = c.encapsulate(&payload).unwrap();

    let mut pieces = Vec::new();
    let mut rest = &wire[..];
    while !rest.is_empty() {
        let h = NetworkHeader::parse(rest).unwrap();
        let (piece, tail) = rest.split_at(h.total_length as usize);
        pieces.push(piece.to_vec());
        rest = tail;
    }
    pieces.reverse();
    assert_eq!(c.decapsulate(&pieces.concat()).unwrap(), payload);
}

#[test]
fn network_options_are_padded_and_carried() {
    let c = codec(1500).with_options(vec![1, 2, 3, 4, 5]).unwrap();
    assert_eq!(c.header_len(), 28);
    let wire = c.encapsulate(b"hello").unwrap();
    let h = NetworkHeader::parse(&wire).unwrap();
    assert_eq!(h.ihl, 7);
    assert_eq!(h.options, vec![1, 2, 3, 4, 5, 0, 0, 0]);
    assert_eq!(c.decapsulate(&wire).unwrap(), b"hello");

    assert!(matches!(
        codec(1500).with_options(vec![0; 41]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn network_mtu_must_fit_header_plus_one_byte() {
    let c = NetworkCodec::new(NetworkAddress::UNSPECIFIED, NetworkAddress::UNSPECIFIED);
    assert_eq!(
        c.clone().with_mtu(20),
        Err(Error::Capacity { mtu: 20, needed: 21 })
    );
    assert!(c.with_mtu(21).is_ok());
}

#[test]
fn network_mtu_too_small_for_a_fragment_unit_is_capacity_error() {
    // room = 7 字节，放不下一个 8 字节的分片单位
    let c = codec(27);
    assert!(c.encapsulate(&[1; 7]).is_ok());
    assert!(matches!(c.encapsulate(&[1; 8]), Err(Error::Capacity { .. })));
}

#[test]
fn network_fragment_offset_must_fit_13_bits() {
    let c = codec(1500);
    // 最后一个分片偏移 63640 字节 = 7955 个单位
    let wire = c.encapsulate(&[7; 65_000]).unwrap();
    assert_eq!(c.decapsulate(&wire).unwrap().len(), 65_000);

    // 偏移超过 8191 个单位
    assert!(matches!(
        c.encapsulate(&[7; 70_000]),
        Err(Error::Capacity { mtu: 1500, .. })
    ));
}

#[test]
fn network_rejects_wrong_version_and_bad_lengths() {
    let c = codec(1500);
    let mut wire = c.encapsulate(b"payload").unwrap();

    let mut v6 = wire.clone();
    v6[0] = 0x65;
    assert!(matches!(
        c.decapsulate(&v6),
        Err(Error::MalformedWire { layer: LayerKind::Network, .. })
    ));

    let mut short_ihl = wire.clone();
    short_ihl[0] = 0x44;
    assert!(c.decapsulate(&short_ihl).is_err());

    // totalLength 超出剩余字节
    wire[3] += 10;
    assert!(matches!(c.decapsulate(&wire), Err(Error::MalformedWire { .. })));

    assert!(matches!(c.decapsulate(&[0x45, 0, 0]), Err(Error::MalformedWire { .. })));
}

#[test]
fn network_rejects_empty_payload_and_oversized_flags() {
    let c = codec(1500);
    assert!(matches!(c.encapsulate(&[]), Err(Error::InvalidArgument(_))));
    assert!(matches!(c.decapsulate(&[]), Err(Error::InvalidArgument(_))));
    assert!(c.clone().with_flags(0b111).is_ok());
    assert!(matches!(c.with_flags(8), Err(Error::InvalidArgument(_))));
}

#[test]
fn network_extracts_addresses_without_consuming() {
    let c = codec(1500);
    let wire = c.encapsulate(b"x").unwrap();
    assert_eq!(
        c.extract_source(&wire).unwrap().and_then(|a| a.as_network()),
        Some(NetworkAddress::host([10, 0, 1, 2]))
    );
    assert_eq!(
        c.extract_destination(&wire).unwrap().and_then(|a| a.as_network()),
        Some(NetworkAddress::host([10, 0, 2, 10]))
    );
}
