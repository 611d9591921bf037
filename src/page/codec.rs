//! Versioned binary page record
//!
//! Each record is framed with a little-endian `u32` byte length followed by
//! the body:
//!
//! ```text
//! u8 version | url | hash[16] | score f64 | priority f64 | last_attempt i64
//! | last_success i64 | retries u32 | distance u32 | num_inlinks u32
//! | parents | anchors
//! [ last_change i64 | is_local u8 | emitted u8 | signature u64 ]  -- only if last_success > 0
//! ```
//!
//! Strings are `u32` length + UTF-8, sets are `u32` count + strings. Only
//! versions >= 5 are readable.

use crate::page::{Page, Signature, UrlHash, URL_HASH_LEN};
use crate::store::StoreError;
use std::collections::BTreeSet;
use std::io::{ErrorKind, Read, Write};

/// Version written by [`write_page`]
pub const PAGE_FORMAT_VERSION: u8 = 5;

/// Oldest version [`read_page`] accepts
pub const MIN_READABLE_VERSION: u8 = 5;

/// Upper bound on a single record, guards against reading garbage lengths
const MAX_RECORD_LEN: usize = 64 * 1024 * 1024;

/// Serializes a page body (without the length frame)
pub fn encode_page(page: &Page) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + page.url.len());
    buf.push(PAGE_FORMAT_VERSION);
    put_str(&mut buf, &page.url);
    buf.extend_from_slice(page.url_hash.as_bytes());
    buf.extend_from_slice(&page.score.to_le_bytes());
    buf.extend_from_slice(&page.priority.to_le_bytes());
    buf.extend_from_slice(&page.last_attempt.to_le_bytes());
    buf.extend_from_slice(&page.last_success.to_le_bytes());
    buf.extend_from_slice(&page.retries.to_le_bytes());
    buf.extend_from_slice(&page.distance.to_le_bytes());
    buf.extend_from_slice(&page.num_inlinks.to_le_bytes());
    put_set(&mut buf, &page.parents);
    put_set(&mut buf, &page.anchors);

    if page.is_fetched() {
        buf.extend_from_slice(&page.last_change.to_le_bytes());
        buf.push(page.is_local as u8);
        buf.push(page.emitted as u8);
        buf.extend_from_slice(&page.signature.0.to_le_bytes());
    }

    buf
}

/// Deserializes a page body produced by [`encode_page`]
pub fn decode_page(body: &[u8]) -> Result<Page, StoreError> {
    let mut cursor = Cursor { buf: body, pos: 0 };

    let version = cursor.u8()?;
    if version < MIN_READABLE_VERSION {
        return Err(StoreError::IncompatibleVersion(version));
    }

    let url = cursor.string()?;
    let mut hash = [0u8; URL_HASH_LEN];
    hash.copy_from_slice(cursor.take(URL_HASH_LEN)?);

    let mut page = Page::new(url);
    page.url_hash = UrlHash(hash);
    page.score = f64::from_le_bytes(cursor.array()?);
    page.priority = f64::from_le_bytes(cursor.array()?);
    page.last_attempt = i64::from_le_bytes(cursor.array()?);
    page.last_success = i64::from_le_bytes(cursor.array()?);
    page.retries = u32::from_le_bytes(cursor.array()?);
    page.distance = u32::from_le_bytes(cursor.array()?);
    page.num_inlinks = u32::from_le_bytes(cursor.array()?);
    page.parents = cursor.set()?;
    page.anchors = cursor.set()?;

    if page.is_fetched() {
        page.last_change = i64::from_le_bytes(cursor.array()?);
        page.is_local = cursor.u8()? != 0;
        page.emitted = cursor.u8()? != 0;
        page.signature = Signature(u64::from_le_bytes(cursor.array()?));
    }

    Ok(page)
}

/// Writes one framed record
pub fn write_page<W: Write>(writer: &mut W, page: &Page) -> Result<usize, StoreError> {
    let body = encode_page(page);
    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(&body)?;
    Ok(body.len() + 4)
}

/// Reads one framed record; `Ok(None)` on a clean end of input
pub fn read_page<R: Read>(reader: &mut R) -> Result<Option<Page>, StoreError> {
    let mut len_bytes = [0u8; 4];
    match read_full(reader, &mut len_bytes)? {
        0 => return Ok(None),
        4 => {}
        n => {
            return Err(StoreError::Corrupt(format!(
                "truncated record header ({} of 4 bytes)",
                n
            )))
        }
    }

    let len = u32::from_le_bytes(len_bytes) as usize;
    if len == 0 || len > MAX_RECORD_LEN {
        return Err(StoreError::Corrupt(format!("invalid record length {}", len)));
    }

    let mut body = vec![0u8; len];
    let got = read_full(reader, &mut body)?;
    if got != len {
        return Err(StoreError::Corrupt(format!(
            "truncated record body ({} of {} bytes)",
            got, len
        )));
    }

    decode_page(&body).map(Some)
}

/// Like `read_exact`, but reports how many bytes were read before EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, StoreError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_set(buf: &mut Vec<u8>, set: &BTreeSet<String>) {
    buf.extend_from_slice(&(set.len() as u32).to_le_bytes());
    for item in set {
        put_str(buf, item);
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], StoreError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(StoreError::Corrupt(format!(
                "record ends at byte {} while reading {} more",
                self.buf.len(),
                n
            ))),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], StoreError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, StoreError> {
        Ok(self.take(1)?[0])
    }

    fn string(&mut self) -> Result<String, StoreError> {
        let len = u32::from_le_bytes(self.array()?) as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StoreError::Corrupt(format!("invalid UTF-8 in record: {}", e)))
    }

    fn set(&mut self) -> Result<BTreeSet<String>, StoreError> {
        let count = u32::from_le_bytes(self.array()?) as usize;
        let mut set = BTreeSet::new();
        for _ in 0..count {
            set.insert(self.string()?);
        }
        Ok(set)
    }
}
