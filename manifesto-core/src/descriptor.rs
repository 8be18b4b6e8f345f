//! Binary manifest layout constants and descriptor encoding (.mnfb)

use crate::encode::{preview, EncodeError};

pub const MANIFEST_MAX_SIZE: usize = 0xFFFF;
pub const MANIFEST_HEADER_SIZE: usize = 4; // size(u16) + major + minor
pub const MANIFEST_VERSION_MAJOR: u8 = 0;
pub const MANIFEST_VERSION_MINOR: u8 = 2;

/// Every descriptor starts with: size (u16 LE) + type (u8) + pad (u8)
pub const DESCRIPTOR_HEADER_SIZE: usize = 4;

pub const INTERFACE_DESC_SIZE: usize = 8;
pub const BUNDLE_DESC_SIZE: usize = 8;
pub const CPORT_DESC_SIZE: usize = 8;
pub const VID_PID_DESC_SIZE: usize = 12;

/// String payload length is a single byte on the wire.
pub const STRING_MAX_LEN: usize = 255;
pub const STRING_DESC_BASE_SIZE: usize = DESCRIPTOR_HEADER_SIZE + 2; // + len + id
pub const STRING_DESC_MAX_SIZE: usize = STRING_DESC_BASE_SIZE + STRING_MAX_LEN;

/// Round `n` up to the next multiple of 4.
pub const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DescriptorType {
    Interface = 0x01,
    String = 0x02,
    Bundle = 0x03,
    Cport = 0x04,
    VidPid = 0x05,
}

impl DescriptorType {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// One descriptor, with every field already at its wire width.
///
/// String text is kept as raw UTF-8 bytes and must fit the 1-byte length
/// field; [`Descriptor::validate`] rejects anything longer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Descriptor {
    Interface { vendor_string_id: u8, product_string_id: u8 },
    String { id: u8, text: Vec<u8> },
    Bundle { id: u8, class: u8 },
    Cport { id: u16, bundle: u8, protocol: u8 },
    VidPid { vendor_id: u32, product_id: u32 },
}

impl Descriptor {
    pub fn kind(&self) -> DescriptorType {
        match self {
            Descriptor::Interface { .. } => DescriptorType::Interface,
            Descriptor::String { .. } => DescriptorType::String,
            Descriptor::Bundle { .. } => DescriptorType::Bundle,
            Descriptor::Cport { .. } => DescriptorType::Cport,
            Descriptor::VidPid { .. } => DescriptorType::VidPid,
        }
    }

    /// Value stored in the size field: meaningful bytes, header included,
    /// alignment padding excluded.
    pub fn size(&self) -> usize {
        match self {
            Descriptor::Interface { .. } => INTERFACE_DESC_SIZE,
            Descriptor::String { text, .. } => STRING_DESC_BASE_SIZE + text.len(),
            Descriptor::Bundle { .. } => BUNDLE_DESC_SIZE,
            Descriptor::Cport { .. } => CPORT_DESC_SIZE,
            Descriptor::VidPid { .. } => VID_PID_DESC_SIZE,
        }
    }

    /// Bytes occupied in the manifest, padding included.
    pub fn encoded_size(&self) -> usize {
        align4(self.size())
    }

    /// Check that every variable-length field fits its wire width.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if let Descriptor::String { text, .. } = self {
            if text.len() > STRING_MAX_LEN {
                return Err(EncodeError::StringTooLong {
                    size: self.size(),
                    max: STRING_DESC_MAX_SIZE,
                    preview: preview(&String::from_utf8_lossy(text)),
                });
            }
        }
        Ok(())
    }

    /// Append the descriptor to `out`: exactly `encoded_size()` bytes.
    /// Nothing is written if the descriptor does not validate.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.validate()?;
        let start = out.len();
        // size field fits u16: the largest descriptor is STRING_DESC_MAX_SIZE
        out.extend_from_slice(&(self.size() as u16).to_le_bytes());
        out.push(self.kind().tag());
        out.push(0);
        match self {
            Descriptor::Interface { vendor_string_id, product_string_id } => {
                out.push(*vendor_string_id);
                out.push(*product_string_id);
            }
            Descriptor::String { id, text } => {
                out.push(text.len() as u8);
                out.push(*id);
                out.extend_from_slice(text);
            }
            Descriptor::Bundle { id, class } => {
                out.push(*id);
                out.push(*class);
            }
            Descriptor::Cport { id, bundle, protocol } => {
                out.extend_from_slice(&id.to_le_bytes());
                out.push(*bundle);
                out.push(*protocol);
            }
            Descriptor::VidPid { vendor_id, product_id } => {
                out.extend_from_slice(&product_id.to_le_bytes());
                out.extend_from_slice(&vendor_id.to_le_bytes());
            }
        }
        out.resize(start + self.encoded_size(), 0);
        Ok(())
    }
}
