// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password protection through the PDF standard security handler.

use blattwerk_core::ValidationError;
use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::pdf::pages;

/// RC4 key length used for protection, in bits.
const KEY_LENGTH: usize = 128;

/// Encrypt the document so `password` is needed to open it.
///
/// Owner and user passwords are the same, and every permission is granted
/// once the document is open.
#[instrument(skip_all, fields(input_len = input.len()))]
pub fn protect(input: &[u8], password: &str) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(ValidationError::MissingInput("password".into()).into());
    }

    let mut doc = Document::load_mem(input)
        .map_err(|err| BlattwerkError::CorruptInput(format!("failed to load PDF: {}", err)))?;
    if doc.is_encrypted() {
        return Err(BlattwerkError::CorruptInput("document is already password protected".into()));
    }

    ensure_file_id(&mut doc, input);
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: password,
        user_password: password,
        key_length: KEY_LENGTH,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|err| BlattwerkError::PdfError(format!("failed to derive encryption key: {}", err)))?;
    doc.encrypt(&state)
        .map_err(|err| BlattwerkError::PdfError(format!("failed to encrypt PDF: {}", err)))?;

    let output = pages::save_to_bytes(&mut doc)?;
    info!(output_len = output.len(), "PDF protected");
    Ok(output)
}

/// Remove password protection.
///
/// A document that is not encrypted comes back re-serialised. A wrong
/// password is an authentication failure.
#[instrument(skip_all, fields(input_len = input.len()))]
pub fn unlock(input: &[u8], password: &str) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(ValidationError::MissingInput("password".into()).into());
    }

    let mut doc = Document::load_mem(input)
        .map_err(|err| BlattwerkError::CorruptInput(format!("failed to load PDF: {}", err)))?;

    if !doc.is_encrypted() {
        info!("Document is not encrypted, returning it unchanged");
        return pages::save_to_bytes(&mut doc);
    }

    doc.decrypt(password).map_err(|err| {
        warn!(%err, "PDF password rejected");
        BlattwerkError::Authentication
    })?;

    // Rebuild from the decrypted objects so nothing re-encrypts on save.
    let mut plain = Document::with_version(doc.version.clone());
    plain.objects = doc.objects;
    plain.max_id = doc.max_id;
    plain.trailer = doc.trailer;
    plain.trailer.remove(b"Encrypt");
    plain.prune_objects();

    let output = pages::save_to_bytes(&mut plain)?;
    info!(output_len = output.len(), "PDF unlocked");
    Ok(output)
}

/// The standard security handler keys off the first /ID entry; derive one
/// from the content when the producer left it out.
fn ensure_file_id(doc: &mut Document, input: &[u8]) {
    if doc.trailer.has(b"ID") {
        return;
    }
    let digest = Sha256::digest(input);
    let id = digest[..16].to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn protected_document_needs_the_password() {
        let input = fixtures::pdf_bytes(2, 300.0, 300.0);
        let locked = protect(&input, "s3cret").expect("protect");
        assert!(Document::load_mem(&locked).expect("load").is_encrypted());

        let err = unlock(&locked, "wrong").err().expect("error");
        assert!(matches!(err, BlattwerkError::Authentication));

        let opened = unlock(&locked, "s3cret").expect("unlock");
        let doc = Document::load_mem(&opened).expect("load");
        assert!(!doc.is_encrypted());
        assert_eq!(fixtures::page_labels(&doc), vec!["Page 1", "Page 2"]);
    }

    #[test]
    fn empty_password_is_a_validation_error() {
        let input = fixtures::pdf_bytes(1, 300.0, 300.0);
        assert!(matches!(
            protect(&input, "").err(),
            Some(BlattwerkError::Validation(ValidationError::MissingInput(_)))
        ));
        assert!(matches!(
            unlock(&input, "").err(),
            Some(BlattwerkError::Validation(ValidationError::MissingInput(_)))
        ));
    }

    #[test]
    fn unlocking_a_plain_document_passes_it_through() {
        let input = fixtures::pdf_bytes(3, 300.0, 300.0);
        let out = unlock(&input, "anything").expect("unlock");
        assert_eq!(fixtures::labels_of(&out).len(), 3);
    }

    fn first_id(doc: &Document) -> Vec<u8> {
        let ids = doc.trailer.get(b"ID").and_then(Object::as_array).expect("id array");
        ids[0].as_str().expect("id string").to_vec()
    }

    #[test]
    fn file_id_is_added_once() {
        let mut doc = fixtures::document(1, 100.0, 100.0);
        ensure_file_id(&mut doc, b"abc");
        let first = first_id(&doc);
        assert_eq!(first.len(), 16);
        ensure_file_id(&mut doc, b"different");
        assert_eq!(first_id(&doc), first);
    }
}
