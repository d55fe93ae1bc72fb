//! The `_VBA_PROJECT` identifier-table extractor and the idCode resolver.
use crate::cursor::{Endian, Reader};
use crate::reserved::RESERVED_NAMES;
use std::io;
use tracing::debug;
use utf8dec_rs::decode_win_str;

const MAGIC: u16 = 0x61CC;

/// Reads a `(type, length)` pair whose byte order flips with endianness, mirroring the
/// original `getTypeAndLength` helper.
fn type_and_length(buf: &[u8], offset: usize, endian: Endian) -> io::Result<(u8, u8)> {
    let a = crate::cursor::u8_at(buf, offset)?;
    let b = crate::cursor::u8_at(buf, offset + 1)?;
    Ok(match endian {
        Endian::Big => (a, b),
        Endian::Little => (b, a),
    })
}

/// Extracts the ordered list of user-defined identifier names from a `_VBA_PROJECT`
/// stream.
///
/// On magic mismatch, or on a parse error partway through, returns whatever identifiers
/// were recovered so far (possibly none) - the extractor never fails outright, per the
/// partial-result error handling for this stream.
pub fn extract_identifiers(data: &[u8], codepage: u16) -> Vec<String> {
    let mut identifiers = Vec::new();
    if let Err(e) = extract_identifiers_inner(data, codepage, &mut identifiers) {
        eprintln!("Error parsing _VBA_PROJECT: {e}.");
    }
    identifiers
}

fn extract_identifiers_inner(
    data: &[u8],
    codepage: u16,
    identifiers: &mut Vec<String>,
) -> io::Result<()> {
    let magic = crate::cursor::u16_at(data, 0, Endian::Little)?;
    if magic != MAGIC {
        return Ok(());
    }
    let version = crate::cursor::u16_at(data, 2, Endian::Little)?;
    let unicode_ref = (version >= 0x5B && !matches!(version, 0x60 | 0x62 | 0x63)) || version == 0x4E;
    let unicode_name = (version >= 0x59 && !matches!(version, 0x60 | 0x62 | 0x63)) || version == 0x4E;
    // Kept verbatim: this predicate is vacuous (no integer satisfies both bounds), but
    // that matches observed behavior of the original parser and must not be "fixed".
    #[allow(unused_comparisons)]
    let non_unicode_name = (version <= 0x59 && version != 0x4E) || (0x5F > version && version > 0x6B);

    let endian = if crate::cursor::u16_at(data, 5, Endian::Little)? == 0x000E {
        Endian::Big
    } else {
        Endian::Little
    };
    debug!("_VBA_PROJECT version {:#06x}, endian {:?}", version, endian);

    let mut r = Reader::with_pos(data, 0x1E);
    let num_refs = r.var(false, endian)?;
    r.advance(2);
    for _ in 0..num_refs {
        let ref_length = r.var(false, endian)?;
        if ref_length == 0 {
            r.advance(6);
        } else {
            let too_short = if unicode_ref { ref_length < 5 } else { ref_length < 3 };
            if too_short {
                r.advance(ref_length as usize);
            } else {
                let discriminator_offset = r.pos() + if unicode_ref { 4 } else { 2 };
                let c = crate::cursor::u8_at(data, discriminator_offset)?;
                r.advance(ref_length as usize);
                if c == b'C' || c == b'D' {
                    r.skip_array(false, 1, endian, false)?;
                }
            }
        }
        r.advance(10);
        let word = r.var(false, endian)?;
        if word != 0 {
            r.skip_array(false, 1, endian, false)?;
            let w_length = r.var(false, endian)?;
            if w_length != 0 {
                r.advance(2);
            }
            r.advance(w_length as usize + 30);
        }
    }
    // Number of entries in the class/user forms table
    r.skip_array(false, 2, endian, false)?;
    // Number of compile-time identifier-value pairs
    r.skip_array(false, 4, endian, false)?;
    r.advance(2);
    // Typeinfo typeID
    r.skip_array(false, 1, endian, true)?;
    // Project description
    r.skip_array(false, 1, endian, true)?;
    // Project help file name
    r.skip_array(false, 1, endian, true)?;
    r.advance(0x64);

    let num_projects = r.var(false, endian)?;
    for _ in 0..num_projects {
        let mut w_length = r.var(false, endian)?;
        // Code module name
        if unicode_name {
            r.advance(w_length as usize);
        }
        if non_unicode_name {
            if w_length != 0 {
                w_length = r.var(false, endian)?;
            }
            r.advance(w_length as usize);
        }
        // Stream time
        r.skip_array(false, 1, endian, false)?;
        r.skip_array(false, 1, endian, true)?;
        r.var(false, endian)?;
        if version >= 0x6B {
            r.skip_array(false, 1, endian, true)?;
        }
        r.skip_array(false, 1, endian, true)?;
        r.advance(2);
        if version != 0x51 {
            r.advance(4);
        }
        r.skip_array(false, 8, endian, false)?;
        r.advance(11);
    }
    r.advance(6);
    r.skip_array(true, 1, endian, false)?;
    r.advance(6);
    let w0 = r.var(false, endian)?;
    let num_ids_raw = r.var(false, endian)?;
    let w1 = r.var(false, endian)?;
    r.advance(4);
    // Matches Python's itertools.repeat(None, n) for negative n: zero iterations.
    let num_junk_ids = (num_ids_raw as i64 + w1 as i64 - w0 as i64).max(0);
    let num_ids = (w0 as i64 - w1 as i64).max(0);
    debug!("numJunkIds={num_junk_ids} numIDs={num_ids}");

    for _ in 0..num_junk_ids {
        r.advance(4);
        let (id_type, id_length) = type_and_length(data, r.pos(), endian)?;
        r.advance(2);
        if id_type > 0x7F {
            r.advance(6);
        }
        r.advance(id_length as usize);
    }

    for _ in 0..num_ids {
        let mut is_kwd = false;
        let (mut id_type, mut id_length) = type_and_length(data, r.pos(), endian)?;
        r.advance(2);
        if id_length == 0 && id_type == 0 {
            r.advance(2);
            (id_type, id_length) = type_and_length(data, r.pos(), endian)?;
            r.advance(2);
            is_kwd = true;
        }
        if id_type & 0x80 != 0 {
            r.advance(6);
        }
        if id_length != 0 {
            let bytes = r.bytes(id_length as usize)?;
            identifiers.push(decode_win_str(bytes, codepage));
        }
        if !is_kwd {
            r.advance(4);
        }
    }
    debug!("identifiers: {:?}", identifiers);
    Ok(())
}

/// Resolves a 16-bit idCode to either a reserved keyword or an entry of the identifier
/// table, applying the version-dependent index shifts.
///
/// Out-of-range accesses (malformed project, or an idCode beyond what either table
/// holds) fall back to the `id_XXXX` placeholder rather than panicking.
pub fn resolve(id_code: u16, identifiers: &[String], vba_ver: u8, is64bit: bool) -> String {
    let shifted = id_code >> 1;
    if shifted >= 0x100 {
        let mut idx = shifted as i32 - 0x100;
        if vba_ver >= 7 {
            idx -= 4;
            if is64bit {
                idx -= 3;
            }
            if idx > 0xBE {
                idx -= 1;
            }
        }
        usize::try_from(idx)
            .ok()
            .and_then(|i| identifiers.get(i))
            .cloned()
            .unwrap_or_else(|| format!("id_{id_code:04X}"))
    } else {
        let mut idx = shifted;
        if vba_ver >= 7 && idx >= 0xC3 {
            idx -= 1;
        }
        RESERVED_NAMES
            .get(idx as usize)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("id_{id_code:04X}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_project_on_bad_magic() {
        let data = [0u8; 16];
        assert!(extract_identifiers(&data, 1252).is_empty());
    }

    #[test]
    fn reserved_name_resolution() {
        // idCode = 2 * 1 -> reserved[1] = "0"
        let ids: Vec<String> = Vec::new();
        assert_eq!(resolve(2, &ids, 6, false), "0");
    }

    #[test]
    fn out_of_range_falls_back_to_placeholder() {
        let ids: Vec<String> = Vec::new();
        // shifted = 0x150, well beyond any populated identifier table
        assert_eq!(resolve(0x2A0, &ids, 6, false), "id_02A0");
    }
}
