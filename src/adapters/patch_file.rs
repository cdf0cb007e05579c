//! Text patch-file adapter.
//!
//! Implements [`PatchSource`] over a patch file held in memory. One record
//! per line, hex octets separated by whitespace:
//!
//! ```text
//! # address    len  data
//! 00 20 01 00  04   DE AD BE EF
//! ```
//!
//! The address is big-endian. `#` starts a comment; blank lines are
//! skipped. Parsing happens up front so a malformed file is rejected
//! before the controller sees a single poke.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};

use crate::error::NvmError;
use crate::nvm::{POKE_MAX_DATA, PatchRecord, PatchSource};

#[derive(Debug, Clone, Default)]
pub struct PatchFile {
    records: Vec<PatchRecord>,
    cursor: usize,
    open: bool,
}

impl PatchFile {
    pub fn from_records(records: Vec<PatchRecord>) -> Self {
        Self {
            records,
            cursor: 0,
            open: false,
        }
    }

    /// Read and parse a patch file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading patch file {}", path.display()))?;
        let file = Self::parse_str(&text)
            .with_context(|| format!("parsing patch file {}", path.display()))?;
        info!("NVM: {} records from {}", file.len(), path.display());
        Ok(file)
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let mut records = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let record = parse_line(line).with_context(|| format!("line {}", idx + 1))?;
            records.push(record);
        }
        if records.len() > usize::from(u16::MAX) {
            bail!("too many records ({})", records.len());
        }
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PatchRecord] {
        &self.records
    }
}

fn parse_line(line: &str) -> Result<PatchRecord> {
    let octets = line
        .split_whitespace()
        .map(|tok| u8::from_str_radix(tok, 16).map_err(|_| anyhow!("bad hex octet {:?}", tok)))
        .collect::<Result<Vec<u8>>>()?;

    let [a0, a1, a2, a3, len, data @ ..] = octets.as_slice() else {
        bail!("record shorter than address and length");
    };
    if usize::from(*len) != data.len() {
        bail!("length {} but {} data octets", len, data.len());
    }
    if data.len() > POKE_MAX_DATA {
        bail!("{} data octets exceed a single poke", data.len());
    }
    Ok(PatchRecord {
        address: u32::from_be_bytes([*a0, *a1, *a2, *a3]),
        data: data.to_vec(),
    })
}

impl PatchSource for PatchFile {
    fn open(&mut self) -> Result<u16, NvmError> {
        let count = u16::try_from(self.records.len()).map_err(|_| NvmError::MalformedRecord)?;
        self.cursor = 0;
        self.open = true;
        debug!("NVM: patch file opened, {} records", count);
        Ok(count)
    }

    fn next_record(&mut self) -> Result<PatchRecord, NvmError> {
        if !self.open {
            return Err(NvmError::SourceFailed);
        }
        let record = self
            .records
            .get(self.cursor)
            .cloned()
            .ok_or(NvmError::SourceFailed)?;
        self.cursor += 1;
        Ok(record)
    }

    fn close(&mut self) {
        self.open = false;
    }
}
