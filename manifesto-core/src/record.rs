use log::{info, trace};

use crate::descriptor::{MANIFEST_VERSION_MAJOR, MANIFEST_VERSION_MINOR};
use crate::encode::{EncodeError, Manifest, ManifestEncoder};
use crate::error::{invalid, Result};

/// `[manifest-header]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderRecord {
    pub version_major: u64,
    pub version_minor: u64,
    pub vendor_id: Option<u64>,
    pub product_id: Option<u64>,
}

/// `[interface-descriptor]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub vendor_string_id: u64,
    pub product_string_id: u64,
}

/// `[string-descriptor "<id>"]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringRecord {
    pub id: u64,
    pub text: String,
}

/// `[bundle-descriptor "<id>"]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleRecord {
    pub id: u64,
    pub class: u64,
}

/// `[cport-descriptor "<id>"]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CportRecord {
    pub id: u64,
    pub bundle: u64,
    pub protocol: u64,
}

/// One section of a source manifest. Numbers are kept as parsed; they are
/// checked against their wire width in [`compile`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Header(HeaderRecord),
    Interface(InterfaceRecord),
    String(StringRecord),
    Bundle(BundleRecord),
    Cport(CportRecord),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VidPid {
    pub vendor_id: u32,
    pub product_id: u32,
}

fn field_u8(field: &'static str, value: u64) -> std::result::Result<u8, EncodeError> {
    u8::try_from(value).map_err(|_| EncodeError::FieldOutOfRange {
        field,
        value,
        max: u8::MAX.into(),
    })
}

fn field_u16(field: &'static str, value: u64) -> std::result::Result<u16, EncodeError> {
    u16::try_from(value).map_err(|_| EncodeError::FieldOutOfRange {
        field,
        value,
        max: u16::MAX.into(),
    })
}

fn field_u32(field: &'static str, value: u64) -> std::result::Result<u32, EncodeError> {
    u32::try_from(value).map_err(|_| EncodeError::FieldOutOfRange {
        field,
        value,
        max: u32::MAX.into(),
    })
}

/// Reject manifests this encoder cannot represent.
pub fn check_version(header: &HeaderRecord) -> Result<()> {
    if header.version_major != u64::from(MANIFEST_VERSION_MAJOR)
        || header.version_minor > u64::from(MANIFEST_VERSION_MINOR)
    {
        return Err(invalid!(
            "unsupported manifest version {}.{} (supported: {}.0 to {}.{})",
            header.version_major,
            header.version_minor,
            MANIFEST_VERSION_MAJOR,
            MANIFEST_VERSION_MAJOR,
            MANIFEST_VERSION_MINOR
        ));
    }
    Ok(())
}

fn resolve_vid_pid(header: &HeaderRecord, overrides: Option<VidPid>) -> Result<VidPid> {
    if let Some(ids) = overrides {
        trace!("using vid/pid override {:#x}/{:#x}", ids.vendor_id, ids.product_id);
        return Ok(ids);
    }
    let vendor_id =
        header.vendor_id.ok_or_else(|| invalid!("manifest-header: missing vendor-id"))?;
    let product_id =
        header.product_id.ok_or_else(|| invalid!("manifest-header: missing product-id"))?;
    Ok(VidPid {
        vendor_id: field_u32("vendor-id", vendor_id)?,
        product_id: field_u32("product-id", product_id)?,
    })
}

/// Encode `records` (in order) followed by the VID/PID trailer.
///
/// `overrides`, when present, replaces the vendor/product ids from the header.
/// Nothing is encoded unless the header is present and its version supported.
pub fn compile(records: &[Record], overrides: Option<VidPid>) -> Result<Manifest> {
    let mut headers = records.iter().filter_map(|r| match r {
        Record::Header(h) => Some(h),
        _ => None,
    });
    let header = headers.next().ok_or_else(|| invalid!("missing [manifest-header] section"))?;
    if headers.next().is_some() {
        return Err(invalid!("more than one [manifest-header] section"));
    }
    check_version(header)?;
    let ids = resolve_vid_pid(header, overrides)?;

    let mut enc = ManifestEncoder::new();
    for record in records {
        trace!("dispatch {:?}", record);
        match record {
            Record::Header(_) => {}
            Record::Interface(r) => enc.add_interface_descriptor(
                field_u8("vendor-string-id", r.vendor_string_id)?,
                field_u8("product-string-id", r.product_string_id)?,
            )?,
            Record::String(r) => {
                enc.add_string_descriptor(field_u8("string id", r.id)?, &r.text)?
            }
            Record::Bundle(r) => enc.add_bundle_descriptor(
                field_u8("bundle id", r.id)?,
                field_u8("class", r.class)?,
            )?,
            Record::Cport(r) => enc.add_cport_descriptor(
                field_u16("cport id", r.id)?,
                field_u8("bundle", r.bundle)?,
                field_u8("protocol", r.protocol)?,
            )?,
        }
    }
    enc.add_vid_pid(ids.vendor_id, ids.product_id)?;

    let manifest = enc.finalize();
    info!(
        "compiled {} record(s) into {} bytes (vid {:#06x}, pid {:#06x})",
        records.len(),
        manifest.len(),
        ids.vendor_id,
        ids.product_id
    );
    Ok(manifest)
}
