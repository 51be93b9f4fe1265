use crate::addr::{LinkAddress, NetworkAddress};
use crate::error::Error;
use crate::proto::link::{HEADER_LEN, split_frames};
use crate::proto::{Codec, LayerKind, LinkCodec, LinkHeader, NetworkCodec};

const SRC: LinkAddress = LinkAddress::new([2, 0, 0, 0, 0, 1]);
const DST: LinkAddress = LinkAddress::new([2, 0, 0, 0, 0, 2]);

fn datagrams(payload_len: usize, mtu: usize) -> Vec<u8> {
    NetworkCodec::new(
        NetworkAddress::host([10, 0, 0, 1]),
        NetworkAddress::host([10, 0, 0, 2]),
    )
    .with_mtu(mtu)
    .unwrap()
    .encapsulate(&vec![0xab; payload_len])
    .unwrap()
}

#[test]
fn link_frames_each_datagram_separately() {
    let link = LinkCodec::new(SRC, DST);
    let input = datagrams(25, 30);
    let frames = link.encapsulate(&input).unwrap();

    assert_eq!(frames.len(), input.len() + 3 * HEADER_LEN);
    let pieces = split_frames(&frames).unwrap();
    assert_eq!(pieces.len(), 3);
    for piece in &pieces {
        let h = LinkHeader::parse(piece).unwrap();
        assert_eq!(h.destination, DST);
        assert_eq!(h.source, SRC);
    }
    assert_eq!(&frames[0..6], &DST.octets());
    assert_eq!(&frames[6..12], &SRC.octets());

    assert_eq!(link.decapsulate(&frames).unwrap(), input);
}

#[test]
fn link_extracts_addresses_from_the_first_frame() {
    let link = LinkCodec::new(SRC, DST);
    let frames = link.encapsulate(&datagrams(4, 1500)).unwrap();
    assert_eq!(
        link.extract_source(&frames).unwrap().and_then(|a| a.as_link()),
        Some(SRC)
    );
    assert_eq!(
        link.extract_destination(&frames).unwrap().and_then(|a| a.as_link()),
        Some(DST)
    );
}

#[test]
fn link_slicing_rejects_lengths_that_run_past_the_input() {
    let link = LinkCodec::new(SRC, DST);
    let mut frames = link.encapsulate(&datagrams(10, 1500)).unwrap();

    // 截断
    let cut = &frames[..frames.len() - 1];
    assert!(matches!(
        split_frames(cut),
        Err(Error::MalformedWire { layer: LayerKind::Link, .. })
    ));
    // 只剩帧头
    assert!(split_frames(&frames[..HEADER_LEN + 2]).is_err());
    // 内嵌 totalLength 小于最小报头
    frames[HEADER_LEN + 3] = 4;
    frames[HEADER_LEN + 2] = 0;
    assert!(split_frames(&frames).is_err());
}

#[test]
fn link_rejects_payload_that_is_not_a_datagram() {
    let link = LinkCodec::new(SRC, DST);
    assert!(matches!(link.encapsulate(&[]), Err(Error::InvalidArgument(_))));
    assert!(link.encapsulate(b"not a datagram").is_err());
}
