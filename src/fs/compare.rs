//! Byte-for-byte comparison of a backup against freshly committed content.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::constants::COMPARE_BUFFER;

use super::meta::same_file;

/// Return true if `a` and `b` have the same content.
///
/// Sizes are compared first; two names for the same inode are equal without
/// reading; otherwise both files are read in lockstep blocks until a mismatch or
/// a simultaneous end of stream.
///
/// # Errors
///
/// Returns an IO error if either file cannot be stat'ed or read.
pub fn same_contents(a: &Path, b: &Path) -> std::io::Result<bool> {
    if std::fs::metadata(a)?.len() != std::fs::metadata(b)?.len() {
        return Ok(false);
    }
    if same_file(a, b) {
        return Ok(true);
    }
    let mut fa = BufReader::new(File::open(a)?);
    let mut fb = BufReader::new(File::open(b)?);
    let mut ba = vec![0u8; COMPARE_BUFFER];
    let mut bb = vec![0u8; COMPARE_BUFFER];
    loop {
        let na = read_block(&mut fa, &mut ba)?;
        let nb = read_block(&mut fb, &mut bb)?;
        if ba[..na] != bb[..nb] {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the stream allows; short only at end of stream.
fn read_block(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
