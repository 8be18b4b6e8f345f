use log::debug;
use thiserror::Error;

use crate::descriptor::{
    Descriptor, MANIFEST_HEADER_SIZE, MANIFEST_MAX_SIZE, MANIFEST_VERSION_MAJOR,
    MANIFEST_VERSION_MINOR,
};

/// How many characters of an oversized string end up in the error message.
const PREVIEW_CHARS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("string descriptor too long ({size} > {max} bytes): {preview:?}")]
    StringTooLong { size: usize, max: usize, preview: String },

    #[error("manifest would exceed maximum size of {max} bytes")]
    ManifestTooLarge { max: usize },

    #[error("{field} value {value} out of range (max {max})")]
    FieldOutOfRange { field: &'static str, value: u64, max: u64 },
}

pub(crate) fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Append-only builder for a binary manifest.
///
/// Descriptors land in call order right after the 4-byte header. The header
/// itself is only written by [`ManifestEncoder::finalize`], which consumes the
/// encoder.
#[derive(Debug)]
pub struct ManifestEncoder {
    buf: Vec<u8>,
}

impl Default for ManifestEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestEncoder {
    pub fn new() -> Self {
        Self { buf: vec![0u8; MANIFEST_HEADER_SIZE] }
    }

    /// Current write offset (header included).
    pub fn offset(&self) -> usize {
        self.buf.len()
    }

    pub fn add_interface_descriptor(
        &mut self,
        vendor_string_id: u8,
        product_string_id: u8,
    ) -> Result<(), EncodeError> {
        self.append(Descriptor::Interface { vendor_string_id, product_string_id })
    }

    pub fn add_string_descriptor(&mut self, id: u8, text: &str) -> Result<(), EncodeError> {
        self.append(Descriptor::String { id, text: text.as_bytes().to_vec() })
    }

    pub fn add_bundle_descriptor(&mut self, id: u8, class: u8) -> Result<(), EncodeError> {
        self.append(Descriptor::Bundle { id, class })
    }

    pub fn add_cport_descriptor(
        &mut self,
        id: u16,
        bundle: u8,
        protocol: u8,
    ) -> Result<(), EncodeError> {
        self.append(Descriptor::Cport { id, bundle, protocol })
    }

    /// Trailer descriptor; by convention the last thing appended.
    pub fn add_vid_pid(&mut self, vendor_id: u32, product_id: u32) -> Result<(), EncodeError> {
        self.append(Descriptor::VidPid { vendor_id, product_id })
    }

    fn append(&mut self, desc: Descriptor) -> Result<(), EncodeError> {
        desc.validate()?;
        let offset = self.buf.len();
        let next = offset + desc.encoded_size();
        if next >= MANIFEST_MAX_SIZE {
            return Err(EncodeError::ManifestTooLarge { max: MANIFEST_MAX_SIZE });
        }
        desc.write_to(&mut self.buf)?;
        assert!(
            self.buf.len() == next && next % 4 == 0,
            "{:?} descriptor left offset {} misaligned",
            desc.kind(),
            self.buf.len()
        );
        debug!("{:?} descriptor at offset {} (size {})", desc.kind(), offset, desc.size());
        Ok(())
    }

    /// Write the header and hand back the finished manifest.
    pub fn finalize(mut self) -> Manifest {
        // append() keeps the offset below MANIFEST_MAX_SIZE, so it fits u16
        let total = self.buf.len() as u16;
        self.buf[0..2].copy_from_slice(&total.to_le_bytes());
        self.buf[2] = MANIFEST_VERSION_MAJOR;
        self.buf[3] = MANIFEST_VERSION_MINOR;
        debug!("manifest finalized: {} bytes", total);
        Manifest { bytes: self.buf }
    }
}

/// A completed, immutable .mnfb image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    bytes: Vec<u8>,
}

impl Manifest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Total size as recorded in the header.
    pub fn total_size(&self) -> u16 {
        u16::from_le_bytes([self.bytes[0], self.bytes[1]])
    }

    /// (major, minor) as recorded in the header.
    pub fn version(&self) -> (u8, u8) {
        (self.bytes[2], self.bytes[3])
    }
}

impl AsRef<[u8]> for Manifest {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
