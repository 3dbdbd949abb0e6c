// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zip packaging for operations that return several files.

use std::io::{Cursor, Read, Write};

use blattwerk_core::error::{BlattwerkError, Result};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// One file destined for an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), data }
    }
}

/// Deflate `entries` into an in-memory zip, in the order given.
pub fn pack(entries: &[Entry]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)
            .map_err(|err| BlattwerkError::Archive(format!("failed to start entry {}: {}", entry.name, err)))?;
        zip.write_all(&entry.data)
            .map_err(|err| BlattwerkError::Archive(format!("failed to write entry {}: {}", entry.name, err)))?;
    }

    let cursor = zip
        .finish()
        .map_err(|err| BlattwerkError::Archive(format!("failed to finalise zip: {}", err)))?;
    let bytes = cursor.into_inner();
    debug!(entries = entries.len(), zip_len = bytes.len(), "archive packed");
    Ok(bytes)
}

/// Read every entry back out of a zip, in archive order.
pub fn unpack(bytes: &[u8]) -> Result<Vec<Entry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| BlattwerkError::Archive(format!("not a zip archive: {}", err)))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|err| BlattwerkError::Archive(format!("entry #{}: {}", index, err)))?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.push(Entry::new(file.name(), data));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_names_and_order() {
        let packed = pack(&[
            Entry::new("b.pdf", b"second".to_vec()),
            Entry::new("a.pdf", vec![0u8; 4096]),
        ])
        .expect("pack");

        let entries = unpack(&packed).expect("unpack");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b.pdf", "a.pdf"]);
        assert_eq!(entries[0].data, b"second");
        assert_eq!(entries[1].data.len(), 4096);
        // deflated zeros should be far smaller than the raw entry
        assert!(packed.len() < 1024);
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let err = unpack(b"definitely not a zip").err().expect("error");
        assert!(matches!(err, BlattwerkError::Archive(_)));
    }
}
