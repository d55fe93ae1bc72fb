//! Parses the decompressed `dir` stream: tag-length-value records describing a
//! project's modules, codepage and target bitness.
use crate::cursor::{Endian, Reader};

/// Result of walking a `dir` stream.
#[derive(Debug, Default, Clone)]
pub struct DirInfo {
    /// Module stream names, in the order the `dir` stream lists them.
    pub code_modules: Vec<String>,
    /// The project's codepage, latched from the `PROJ_CODEPAGE` record; defaults to
    /// 1252 (Windows Latin-1) when the record is absent, matching the original parser's
    /// `'latin1'` default.
    pub codepage: u16,
    pub is_64bit: bool,
}

/// Walks the records of a decompressed `dir` stream.
///
/// The stream is always little-endian, regardless of the project's own endianness.
/// Unknown tags are tolerated and skipped by their declared length; any read error stops
/// the walk cleanly and returns whatever was accumulated so far.
pub fn parse_dir(data: &[u8]) -> DirInfo {
    let mut info = DirInfo { codepage: 1252, ..Default::default() };
    let mut r = Reader::new(data);
    while r.remaining() > 0 {
        let Ok(tag) = r.u16(Endian::Little) else { break };
        // The on-disk length field is a 4-byte dword; only its low word is ever
        // meaningfully non-zero, but the high word still has to be skipped.
        let Ok(mut length) = r.u16(Endian::Little) else { break };
        r.advance(2);
        // The following corrections exist because the declared length for these two
        // tags does not match reality.
        match tag {
            9 => length = 6,
            3 => length = 2,
            _ => {}
        }
        if length == 0 {
            continue;
        }
        let Ok(payload) = r.bytes(length as usize) else { break };
        match tag {
            3 => {
                // PROJ_CODEPAGE
                if let [lo, hi, ..] = payload {
                    info.codepage = u16::from_le_bytes([*lo, *hi]);
                }
            }
            50 => {
                // MOD_UNICODESTREAM
                info.code_modules.push(utf8dec_rs::decode_utf16le_str(payload));
            }
            1 => {
                // PROJ_SYSKIND
                if payload.len() >= 4 {
                    let sys_kind = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                    info.is_64bit = sys_kind == 3;
                }
            }
            _ => {}
        }
    }
    info
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_stream() {
        let info = parse_dir(&[]);
        assert!(info.code_modules.is_empty());
        assert_eq!(info.codepage, 1252);
        assert!(!info.is_64bit);
    }

    #[test]
    fn codepage_and_syskind() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            3, 0, 2, 0, 0, 0, 0xE4, 0x04, // PROJ_CODEPAGE = 1252 (overridden length ignored)
            1, 0, 4, 0, 0, 0, 3, 0, 0, 0, // PROJ_SYSKIND = 3 (Win64)
        ];
        let info = parse_dir(&data);
        assert_eq!(info.codepage, 1252);
        assert!(info.is_64bit);
    }

    #[test]
    fn module_stream_name() {
        let name_utf16: Vec<u8> = "Module1".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut data = vec![50, 0, name_utf16.len() as u8, 0, 0, 0];
        data.extend_from_slice(&name_utf16);
        let info = parse_dir(&data);
        assert_eq!(info.code_modules, vec!["Module1".to_string()]);
    }
}
