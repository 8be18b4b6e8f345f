//! Reader for the `.mnfs` source format.
//!
//! ```text
//! [manifest-header]
//! version-major = 0
//! version-minor = 1
//! vendor-id = 0x1234
//! product-id = 0x5678
//!
//! [interface-descriptor]
//! vendor-string-id = 1
//! product-string-id = 2
//!
//! [string-descriptor "1"]
//! string = Project Ara
//!
//! [bundle-descriptor "1"]
//! class = 0x0a
//!
//! [cport-descriptor "2"]
//! bundle = 1
//! protocol = 0x02
//! ```

use log::warn;

use crate::error::{invalid, Result};
use crate::record::{
    BundleRecord, CportRecord, HeaderRecord, InterfaceRecord, Record, StringRecord,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SectionKind {
    ManifestHeader,
    Interface,
    String,
    Bundle,
    Cport,
}

impl SectionKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "manifest-header" => Some(Self::ManifestHeader),
            "interface-descriptor" => Some(Self::Interface),
            "string-descriptor" => Some(Self::String),
            "bundle-descriptor" => Some(Self::Bundle),
            "cport-descriptor" => Some(Self::Cport),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::ManifestHeader => "manifest-header",
            Self::Interface => "interface-descriptor",
            Self::String => "string-descriptor",
            Self::Bundle => "bundle-descriptor",
            Self::Cport => "cport-descriptor",
        }
    }

    fn takes_id(self) -> bool {
        matches!(self, Self::String | Self::Bundle | Self::Cport)
    }
}

struct Entry {
    key: String,
    value: String,
    line: usize,
}

struct Section {
    kind: SectionKind,
    id: Option<u64>,
    line: usize,
    entries: Vec<Entry>,
}

impl Section {
    fn label(&self) -> String {
        match self.id {
            Some(id) => format!("[{} \"{}\"]", self.kind.name(), id),
            None => format!("[{}]", self.kind.name()),
        }
    }

    fn take(&mut self, key: &str) -> Option<Entry> {
        let pos = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(pos))
    }

    fn required(&mut self, key: &str) -> Result<Entry> {
        self.take(key)
            .ok_or_else(|| invalid!("{} (line {}): missing '{}'", self.label(), self.line, key))
    }

    fn number(&mut self, key: &str) -> Result<u64> {
        let e = self.required(key)?;
        parse_number(&e.value)
            .ok_or_else(|| invalid!("line {}: '{}' is not a number: {:?}", e.line, key, e.value))
    }

    fn hex(&mut self, key: &str) -> Result<Option<u64>> {
        let Some(e) = self.take(key) else {
            return Ok(None);
        };
        parse_hex(&e.value).map(Some).ok_or_else(|| {
            invalid!("line {}: '{}' is not a hex number: {:?}", e.line, key, e.value)
        })
    }

    fn finish(self, record: Record) -> Record {
        for e in &self.entries {
            warn!("line {}: ignoring unknown key '{}' in {}", e.line, e.key, self.label());
        }
        record
    }
}

/// Bare digits only: `from_str_radix` alone would also take a leading `+`.
fn digits(s: &str, radix: u32) -> Option<u64> {
    if s.is_empty() || !s.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(s, radix).ok()
}

/// Decimal, or hexadecimal with a `0x` prefix.
pub fn parse_number(s: &str) -> Option<u64> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => digits(hex, 16),
        None => digits(s, 10),
    }
}

/// Hexadecimal, `0x` prefix optional.
pub fn parse_hex(s: &str) -> Option<u64> {
    let s = s.trim();
    digits(s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s), 16)
}

fn parse_section_header(inner: &str, line: usize) -> Result<(SectionKind, Option<u64>)> {
    let inner = inner.trim();
    let (name, rest) = match inner.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim())),
        None => (inner, None),
    };
    let kind = SectionKind::from_name(name)
        .ok_or_else(|| invalid!("line {}: unknown section [{}]", line, inner))?;
    match (kind.takes_id(), rest) {
        (false, None) => Ok((kind, None)),
        (false, Some(_)) => {
            Err(invalid!("line {}: section [{}] does not take an id", line, kind.name()))
        }
        (true, None) => Err(invalid!(
            "line {}: section [{}] needs a quoted id, e.g. [{} \"1\"]",
            line,
            kind.name(),
            kind.name()
        )),
        (true, Some(quoted)) => {
            let id = quoted
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .and_then(|s| digits(s, 10))
                .ok_or_else(|| invalid!("line {}: bad section id {} in [{}]", line, quoted, inner))?;
            Ok((kind, Some(id)))
        }
    }
}

fn split_sections(text: &str) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let l = raw.trim();
        if l.is_empty() || l.starts_with('#') || l.starts_with(';') {
            continue;
        }
        if let Some(inner) = l.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| invalid!("line {}: unterminated section header", line))?;
            let (kind, id) = parse_section_header(inner, line)?;
            if let Some(prev) = sections.iter().find(|s| s.kind == kind && s.id == id) {
                return Err(invalid!(
                    "line {}: duplicate section {} (first at line {})",
                    line,
                    prev.label(),
                    prev.line
                ));
            }
            sections.push(Section { kind, id, line, entries: Vec::new() });
            continue;
        }
        let sep = l
            .find(['=', ':'])
            .ok_or_else(|| invalid!("line {}: expected 'key = value', got {:?}", line, l))?;
        let key = l[..sep].trim().to_ascii_lowercase();
        let value = l[sep + 1..].trim().to_string();
        if key.is_empty() {
            return Err(invalid!("line {}: empty key", line));
        }
        let section = sections
            .last_mut()
            .ok_or_else(|| invalid!("line {}: entry before any section header", line))?;
        if section.entries.iter().any(|e| e.key == key) {
            return Err(invalid!("line {}: duplicate key '{}' in {}", line, key, section.label()));
        }
        section.entries.push(Entry { key, value, line });
    }
    Ok(sections)
}

fn to_record(mut s: Section) -> Result<Record> {
    let record = match s.kind {
        SectionKind::ManifestHeader => Record::Header(HeaderRecord {
            version_major: s.number("version-major")?,
            version_minor: s.number("version-minor")?,
            vendor_id: s.hex("vendor-id")?,
            product_id: s.hex("product-id")?,
        }),
        SectionKind::Interface => Record::Interface(InterfaceRecord {
            vendor_string_id: s.number("vendor-string-id")?,
            product_string_id: s.number("product-string-id")?,
        }),
        SectionKind::String => Record::String(StringRecord {
            id: s.id.unwrap_or_default(),
            text: s.required("string")?.value,
        }),
        SectionKind::Bundle => Record::Bundle(BundleRecord {
            id: s.id.unwrap_or_default(),
            class: s.number("class")?,
        }),
        SectionKind::Cport => Record::Cport(CportRecord {
            id: s.id.unwrap_or_default(),
            bundle: s.number("bundle")?,
            protocol: s.number("protocol")?,
        }),
    };
    Ok(s.finish(record))
}

/// Parse `.mnfs` text into records, in file order.
pub fn parse(text: &str) -> Result<Vec<Record>> {
    split_sections(text)?.into_iter().map(to_record).collect()
}
