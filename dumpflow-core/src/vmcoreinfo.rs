/*!
VMCOREINFO side channel.

Kernel crash captures embed a text blob mapping symbol names to
sizes, offsets and values. Drivers for such formats consume the
lookups to translate virtual to physical addresses; this module only
parses and serves the key/value pairs.
*/

use crate::error::Result;

use std::collections::HashMap;

/// Parsed VMCOREINFO key/value pairs.
#[derive(Debug, Default)]
pub struct VmCoreInfo {
    raw: String,
    pairs: HashMap<String, String>,
}

impl VmCoreInfo {
    /// Parses the `KEY=value` lines of a VMCOREINFO blob.
    ///
    /// Malformed lines are ignored; lookups on missing keys return
    /// `None`.
    pub fn parse(text: &str) -> Self {
        let mut pairs = HashMap::new();
        for line in text.lines() {
            if let Some(idx) = line.find('=') {
                let (key, value) = line.split_at(idx);
                pairs.insert(key.to_string(), value[1..].to_string());
            }
        }
        Self {
            raw: text.to_string(),
            pairs,
        }
    }

    /// Parses a VMCOREINFO blob from raw note bytes.
    ///
    /// A trailing NUL terminator is tolerated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = match bytes.iter().position(|&b| b == 0) {
            Some(idx) => &bytes[..idx],
            None => bytes,
        };
        Ok(Self::parse(std::str::from_utf8(bytes)?))
    }

    /// The unparsed blob.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Raw value for a full key, e.g. `"SYMBOL(lowcore_ptr)"`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// Virtual address of a kernel symbol (`SYMBOL(name)=hex`).
    pub fn symbol(&self, name: &str) -> Option<u64> {
        let value = self.get(&format!("SYMBOL({})", name))?;
        u64::from_str_radix(value, 16).ok()
    }

    /// Field offset within a structure (`OFFSET(type.member)=dec`).
    pub fn offset(&self, name: &str) -> Option<u64> {
        self.get(&format!("OFFSET({})", name))?.parse().ok()
    }

    /// Size of a type or object (`SIZE(name)=dec`).
    pub fn size(&self, name: &str) -> Option<u64> {
        self.get(&format!("SIZE({})", name))?.parse().ok()
    }

    /// Length of an array (`LENGTH(name)=dec`).
    pub fn length(&self, name: &str) -> Option<u64> {
        self.get(&format!("LENGTH({})", name))?.parse().ok()
    }

    /// Plain numeric value (`NUMBER(name)=dec`).
    pub fn number(&self, name: &str) -> Option<i64> {
        self.get(&format!("NUMBER({})", name))?.parse().ok()
    }

    /// Kernel release string.
    pub fn osrelease(&self) -> Option<&str> {
        self.get("OSRELEASE")
    }
}
