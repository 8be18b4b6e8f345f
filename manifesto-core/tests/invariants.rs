use manifesto_core::descriptor::{align4, DescriptorType, MANIFEST_MAX_SIZE};
use manifesto_core::{EncodeError, ManifestEncoder};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Interface(u8, u8),
    Str(u8, String),
    Bundle(u8, u8),
    Cport(u16, u8, u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u8>()).prop_map(|(v, p)| Op::Interface(v, p)),
        (any::<u8>(), "[a-zA-Z0-9 é]{0,120}").prop_map(|(id, s)| Op::Str(id, s)),
        (any::<u8>(), any::<u8>()).prop_map(|(id, c)| Op::Bundle(id, c)),
        (any::<u16>(), any::<u8>(), any::<u8>()).prop_map(|(id, b, p)| Op::Cport(id, b, p)),
    ]
}

fn apply(enc: &mut ManifestEncoder, op: &Op) -> Result<(), EncodeError> {
    match op {
        Op::Interface(v, p) => enc.add_interface_descriptor(*v, *p),
        Op::Str(id, s) => enc.add_string_descriptor(*id, s),
        Op::Bundle(id, c) => enc.add_bundle_descriptor(*id, *c),
        Op::Cport(id, b, p) => enc.add_cport_descriptor(*id, *b, *p),
    }
}

proptest! {
    #[test]
    fn every_descriptor_is_aligned_and_sized(ops in proptest::collection::vec(op(), 0..64),
                                             vid in any::<u32>(), pid in any::<u32>()) {
        let mut enc = ManifestEncoder::new();
        let mut ends = Vec::new();
        for op in &ops {
            apply(&mut enc, op).unwrap();
            prop_assert_eq!(enc.offset() % 4, 0);
            ends.push(enc.offset());
        }
        enc.add_vid_pid(vid, pid).unwrap();
        ends.push(enc.offset());
        let m = enc.finalize();
        let b = m.as_bytes();

        prop_assert_eq!(m.total_size() as usize, b.len());
        prop_assert_eq!(*ends.last().unwrap(), b.len());

        // walk the descriptors back out
        let mut off = 4;
        for (op, end) in ops.iter().zip(&ends) {
            let size = u16::from_le_bytes([b[off], b[off + 1]]) as usize;
            let tag = b[off + 2];
            match op {
                Op::Interface(v, p) => {
                    prop_assert_eq!(tag, DescriptorType::Interface.tag());
                    prop_assert_eq!((b[off + 4], b[off + 5]), (*v, *p));
                }
                Op::Str(id, s) => {
                    prop_assert_eq!(tag, DescriptorType::String.tag());
                    prop_assert_eq!(size, 6 + s.len());
                    prop_assert_eq!(b[off + 5], *id);
                    prop_assert_eq!(&b[off + 6..off + 6 + s.len()], s.as_bytes());
                }
                Op::Bundle(id, c) => {
                    prop_assert_eq!(tag, DescriptorType::Bundle.tag());
                    prop_assert_eq!((b[off + 4], b[off + 5]), (*id, *c));
                }
                Op::Cport(id, bundle, proto) => {
                    prop_assert_eq!(tag, DescriptorType::Cport.tag());
                    prop_assert_eq!(u16::from_le_bytes([b[off + 4], b[off + 5]]), *id);
                    prop_assert_eq!((b[off + 6], b[off + 7]), (*bundle, *proto));
                }
            }
            // padding bytes are zero
            prop_assert!(b[off + size..off + align4(size)].iter().all(|&x| x == 0));
            off += align4(size);
            prop_assert_eq!(off, *end);
        }
        prop_assert_eq!(b[off + 2], DescriptorType::VidPid.tag());
        prop_assert_eq!(off + 12, b.len());
    }

    #[test]
    fn failed_append_changes_nothing(len in 0usize..400) {
        let mut enc = ManifestEncoder::new();
        enc.add_bundle_descriptor(1, 1).unwrap();
        let before = enc.offset();
        let res = enc.add_string_descriptor(9, &"q".repeat(len));
        if len > 255 {
            let rejected = matches!(res, Err(EncodeError::StringTooLong { .. }));
            prop_assert!(rejected);
            prop_assert_eq!(enc.offset(), before);
        } else {
            prop_assert!(res.is_ok());
            prop_assert_eq!(enc.offset(), before + align4(6 + len));
        }
        prop_assert!(enc.offset() < MANIFEST_MAX_SIZE);
    }
}
