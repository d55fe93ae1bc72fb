//! Disassembler for the compiled p-code of VBA-bearing compound documents.
//!
//! [`process_file`] is the single entry point: it opens a compound-file container, locates
//! each embedded VBA project, and renders every module's p-code to a writer. Everything
//! else in this crate is a supporting collaborator, invoked in this order:
//! [`dirstream`] → [`identifiers`] → [`module`], with [`decomp`] expanding compressed
//! streams and [`cursor`]/[`opcodes`]/[`translate`]/[`reserved`] underpinning all three.
use ctxole::Ole;
use std::io::{self, Read, Seek, Write};

pub mod cursor;
pub mod decomp;
pub mod dirstream;
pub mod identifiers;
pub mod module;
pub mod opcodes;
pub mod reserved;
pub mod translate;

use cursor::Endian;

/// Rendering options, threaded explicitly rather than read from global state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub disasm_only: bool,
    pub verbose: bool,
}

fn banner(out: &mut dyn Write, c: char) -> io::Result<()> {
    writeln!(out, "{}", c.to_string().repeat(79))
}

fn read_stream<R: Read + Seek>(ole: &Ole<R>, path: &str) -> io::Result<Vec<u8>> {
    let entry = ole.get_entry_by_name(path)?;
    let mut reader = ole.get_stream_reader(&entry);
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

fn decompress_stream<R: Read + Seek>(ole: &Ole<R>, path: &str) -> io::Result<Vec<u8>> {
    let entry = ole.get_entry_by_name(path)?;
    let reader = ole.get_stream_reader(&entry);
    let mut decomp = decomp::CompressContainerReader::new(reader, entry.size)?;
    let mut buf = Vec::new();
    decomp.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Finds the storage holding a single VBA project within a container.
///
/// Mirrors the layout real-world documents use: a dedicated `Macros` storage (newer Word/
/// Excel binary formats), a `_VBA_PROJECT_CUR` storage (older formats), or - when neither
/// is present - the VBA project sitting directly at the container root.
fn find_macro_root<R: Read + Seek>(ole: &Ole<R>) -> &'static str {
    if ole.get_entry_by_name("Macros").is_ok() {
        "Macros"
    } else if ole.get_entry_by_name("_VBA_PROJECT_CUR").is_ok() {
        "_VBA_PROJECT_CUR"
    } else {
        ""
    }
}

fn join(root: &str, rest: &str) -> String {
    if root.is_empty() {
        rest.to_string()
    } else {
        format!("{root}/{rest}")
    }
}

/// Disassembles every module of the single VBA project found in `reader`, writing the
/// rendered listing to `out`.
///
/// Container-level failures (no VBA project present, a stream is unreadable, the
/// compressed `dir` payload is malformed) abandon the whole project and surface as an
/// `Err`; per-module failures are caught internally, reported to stderr, and do not stop
/// sibling modules.
pub fn process_project<R: Read + Seek>(reader: R, out: &mut dyn Write, opts: Options) -> io::Result<()> {
    let ole = Ole::new(reader)?;
    let macro_root = find_macro_root(&ole);
    let vba_root = join(macro_root, "VBA");

    let dir_raw = decompress_stream(&ole, &join(&vba_root, "dir"))?;
    let dir_info = dirstream::parse_dir(&dir_raw);

    let vba_project_data = read_stream(&ole, &join(&vba_root, "_VBA_PROJECT"))?;
    let identifiers = identifiers::extract_identifiers(&vba_project_data, dir_info.codepage);

    banner(out, '=')?;
    writeln!(out, "VBA project in storage '{}'", if macro_root.is_empty() { "/" } else { macro_root })?;
    banner(out, '=')?;

    for module_name in &dir_info.code_modules {
        let module_path = join(&vba_root, module_name);
        writeln!(out, "{}", "-".repeat(79))?;
        writeln!(out, "Module: {module_name}")?;
        writeln!(out, "{}", "-".repeat(79))?;
        match disassemble_one_module(&ole, &module_path, &vba_project_data, &identifiers, &dir_info, opts, out) {
            Ok(()) => {}
            Err(e) => eprintln!("Error disassembling module '{module_name}': {e}."),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn disassemble_one_module<R: Read + Seek>(
    ole: &Ole<R>,
    module_path: &str,
    vba_project_data: &[u8],
    identifiers: &[String],
    dir_info: &dirstream::DirInfo,
    opts: Options,
    out: &mut dyn Write,
) -> io::Result<()> {
    let module_data = read_stream(ole, module_path)?;

    if opts.verbose && !opts.disasm_only {
        writeln!(out, "{}", module::hexdump(&module_data))?;
    }

    let endian = if crate::cursor::u16_at(&module_data, 2, Endian::Little)? > 0xFF {
        Endian::Big
    } else {
        Endian::Little
    };

    let Some((tables, vba_ver, line_index_start, num_lines, pcode_start)) =
        module::locate_module(&module_data, vba_project_data, dir_info.is_64bit, endian)?
    else {
        return Ok(());
    };

    let ctx = module::DisasmContext {
        identifiers,
        tables,
        vba_ver,
        is64bit: dir_info.is_64bit,
        endian,
        codepage: dir_info.codepage,
        verbose: opts.verbose,
    };

    let mut r = cursor::Reader::with_pos(&module_data, line_index_start);
    for line_number in 0..num_lines {
        r.advance(4);
        let line_length = r.u16(endian)?;
        r.advance(2);
        let line_offset = r.u32(endian)?;
        module::dump_line(out, &module_data, &ctx, pcode_start + line_offset as usize, line_length, line_number)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn macro_root_falls_back_to_container_root() {
        // Exercised indirectly through process_project in integration-style tests;
        // find_macro_root itself only needs a valid Ole handle, which requires a real
        // container, so its three branches are covered via fixtures in tests/.
        let _ = find_macro_root::<std::io::Cursor<Vec<u8>>>;
    }

    #[test]
    fn join_handles_root_storage() {
        assert_eq!(join("", "VBA/dir"), "VBA/dir");
        assert_eq!(join("Macros", "VBA/dir"), "Macros/VBA/dir");
    }
}
