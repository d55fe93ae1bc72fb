//! Module header parsing, operand decoding and the per-line disassembler.
//!
//! This is where the bulk of the format's idiosyncrasies live: every operand kind reads
//! a different auxiliary table, at an offset whose meaning depends on bitness and on the
//! mnemonic currently being decoded.
use crate::cursor::{Endian, Reader};
use crate::identifiers::resolve;
use crate::opcodes::{OperandKind, OPCODES};
use crate::translate::translate_opcode;
use std::io::{self, Write};
use utf8dec_rs::decode_win_str;

fn eof(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, format!("{what} out of bounds"))
}

fn slice<'a>(buf: &'a [u8], start: usize, end: usize) -> io::Result<&'a [u8]> {
    buf.get(start..end).ok_or_else(|| eof("table slice"))
}

/// The three in-module auxiliary tables consulted when rendering operands.
pub struct AuxTables<'a> {
    pub declaration: &'a [u8],
    pub indirect: &'a [u8],
    pub object: &'a [u8],
}

/// Below this internal `_VBA_PROJECT` version, the module layout is the still-undocumented
/// VBA3 one; every version actually observed in the wild for VBA5+ module streams sits at
/// or above the lowest version literal the original parser special-cases (0x51).
const VBA3_VERSION_CEILING: u16 = 0x51;

/// Locates the three auxiliary tables and the p-code line-index table within a module
/// stream.
///
/// `version` is the `_VBA_PROJECT` version word (read using the *module's* endianness -
/// this mirrors the original parser, which reuses the module's endianness to read a
/// value out of a wholly different stream). Returns `Ok(None)` when the version indicates
/// an unsupported VBA3 layout, or when the CAFE magic is absent (both are treated as
/// "nothing to disassemble here", not hard errors).
pub fn locate_module<'a>(
    module_data: &'a [u8],
    vba_project_data: &[u8],
    is64bit: bool,
    endian: Endian,
) -> io::Result<Option<(AuxTables<'a>, u8, usize, u32, usize)>> {
    let version = crate::cursor::u16_at(vba_project_data, 2, endian)?;
    if version < VBA3_VERSION_CEILING {
        eprintln!("unsupported VBA3 module");
        return Ok(None);
    }
    let vba_ver: u8 = if version >= 0x6B {
        if version >= 0x97 {
            7
        } else {
            6
        }
    } else {
        5
    };

    let (declaration, indirect, object, header_end_offset);
    if vba_ver >= 6 {
        let (decl_len_off, decl_data_off, tail_add) = if is64bit {
            (0x0043usize, 0x0047usize, 12usize)
        } else {
            (0x003Fusize, 0x0043usize, 10usize)
        };
        let dw_length = crate::cursor::u32_at(module_data, decl_len_off, endian)? as usize;
        declaration = slice(module_data, decl_data_off, decl_data_off + dw_length)?;
        let base = crate::cursor::u32_at(module_data, 0x0011, endian)? as usize;
        let mut table_start = base + tail_add;
        let dw_length = crate::cursor::u32_at(module_data, table_start, endian)? as usize;
        table_start += 4;
        indirect = slice(module_data, table_start, table_start + dw_length)?;
        let dw_length = crate::cursor::u32_at(module_data, 0x0005, endian)? as usize;
        let mut obj_base = dw_length + 0x8A;
        let dw_length = crate::cursor::u32_at(module_data, obj_base, endian)? as usize;
        obj_base += 4;
        object = slice(module_data, obj_base, obj_base + dw_length)?;
        header_end_offset = 0x0019;
    } else {
        // VBA5
        let mut r = Reader::with_pos(module_data, 11);
        let dw_length = crate::cursor::u32_at(module_data, r.pos(), endian)? as usize;
        let offs = r.pos() + 4;
        declaration = slice(module_data, offs, offs + dw_length)?;
        r.skip_array(true, 1, endian, false)?;
        r.advance(64);
        r.skip_array(false, 16, endian, false)?;
        r.skip_array(true, 1, endian, false)?;
        r.advance(6);
        r.skip_array(true, 1, endian, false)?;
        let offs = r.pos() + 8;
        let dw_length = crate::cursor::u32_at(module_data, offs, endian)? as usize;
        let table_start = dw_length + 14;
        let offs2 = dw_length + 10;
        let dw_length2 = crate::cursor::u32_at(module_data, offs2, endian)? as usize;
        indirect = slice(module_data, table_start, table_start + dw_length2)?;
        let dw_length = crate::cursor::u32_at(module_data, r.pos(), endian)? as usize;
        let mut obj_base = dw_length + 0x8A;
        let dw_length = crate::cursor::u32_at(module_data, obj_base, endian)? as usize;
        obj_base += 4;
        object = slice(module_data, obj_base, obj_base + dw_length)?;
        r.advance(77);
        header_end_offset = r.pos();
    }

    let dw_length = crate::cursor::u32_at(module_data, header_end_offset, endian)? as usize;
    let mut offset = dw_length + 0x3C;
    let magic = crate::cursor::u16_at(module_data, offset, endian)?;
    if magic != 0xCAFE {
        return Ok(None);
    }
    offset += 2;
    let num_lines = crate::cursor::u16_at(module_data, offset, endian)?;
    offset += 2;
    let line_index_start = offset;
    let pcode_start = offset + num_lines as usize * 12 + 10;
    tracing::debug!(
        "module: vbaVer={vba_ver} numLines={num_lines} decl={} indirect={} object={}",
        declaration.len(),
        indirect.len(),
        object.len()
    );

    Ok(Some((
        AuxTables { declaration, indirect, object },
        vba_ver,
        line_index_start,
        num_lines as u32,
        pcode_start,
    )))
}

fn get_name(buf: &[u8], identifiers: &[String], offset: usize, endian: Endian, vba_ver: u8, is64bit: bool) -> io::Result<String> {
    let id = crate::cursor::u16_at(buf, offset, endian)?;
    Ok(resolve(id, identifiers, vba_ver, is64bit))
}

const VAR_TYPE_SUFFIXES: [&str; 14] =
    ["", "?", "%", "&", "!", "#", "@", "?", "$", "?", "?", "?", "?", "?"];

/// Decodes a `name` operand: resolves the idCode and applies the opType-selected type
/// suffix or mnemonic-specific override.
fn disasm_name(word: u16, identifiers: &[String], mnemonic: &str, op_type: u16, vba_ver: u8, is64bit: bool) -> String {
    let mut var_name = resolve(word, identifiers, vba_ver, is64bit);
    let mut str_type = "";
    if (op_type as usize) < VAR_TYPE_SUFFIXES.len() {
        str_type = VAR_TYPE_SUFFIXES[op_type as usize];
    } else if op_type == 32 {
        var_name = format!("[{var_name}]");
    }
    match mnemonic {
        "OnError" => {
            str_type = "";
            if op_type == 1 {
                var_name = "(Resume Next)".to_string();
            } else if op_type == 2 {
                var_name = "(GoTo 0)".to_string();
            }
        }
        "Resume" => {
            str_type = "";
            if op_type == 1 {
                var_name = "(Next)".to_string();
            } else if op_type != 0 {
                var_name = String::new();
            }
        }
        _ => {}
    }
    format!("{var_name}{str_type} ")
}

/// Decodes an `imm16`/`imp_` operand. `Open` is special-cased into a bit-field render;
/// everything else either resolves through the object table (`imp_`) or renders as hex.
fn disasm_imp(
    object_table: &[u8],
    identifiers: &[String],
    kind: OperandKind,
    word: u16,
    mnemonic: &str,
    endian: Endian,
    vba_ver: u8,
    is64bit: bool,
) -> io::Result<String> {
    if mnemonic != "Open" {
        if kind == OperandKind::Imp && object_table.len() >= word as usize + 8 {
            return get_name(object_table, identifiers, word as usize + 6, endian, vba_ver, is64bit);
        }
        let arg = if kind == OperandKind::Imp { "imp_" } else { "0x" };
        return Ok(format!("{arg}{word:04X} "));
    }
    const ACCESS_MODE: [&str; 3] = ["Read", "Write", "Read Write"];
    const LOCK_MODE: [&str; 3] = ["Read Write", "Write", "Read"];
    let mode = word & 0x00FF;
    let access = (word & 0x0F00) >> 8;
    let lock = (word & 0xF000) >> 12;
    let mut s = String::from("(For ");
    if mode & 0x01 != 0 {
        s.push_str("Input");
    } else if mode & 0x02 != 0 {
        s.push_str("Output");
    } else if mode & 0x04 != 0 {
        s.push_str("Random");
    } else if mode & 0x08 != 0 {
        s.push_str("Append");
    } else if mode == 0x20 {
        s.push_str("Binary");
    }
    if access != 0 && (access as usize) <= ACCESS_MODE.len() {
        s.push_str(" Access ");
        s.push_str(ACCESS_MODE[access as usize - 1]);
    }
    if lock != 0 {
        if lock & 0x04 != 0 {
            s.push_str(" Shared");
        } else if (lock as usize) <= LOCK_MODE.len() {
            s.push_str(" Lock ");
            s.push_str(LOCK_MODE[lock as usize - 1]);
        }
    }
    s.push(')');
    Ok(s)
}

fn disasm_rec(indirect_table: &[u8], identifiers: &[String], dword: u32, endian: Endian, vba_ver: u8, is64bit: bool) -> io::Result<String> {
    let name = get_name(indirect_table, identifiers, dword as usize + 2, endian, vba_ver, is64bit)?;
    let options = crate::cursor::u16_at(indirect_table, dword as usize + 18, endian)?;
    Ok(if options & 1 == 0 { format!("(Private) {name}") } else { name })
}

const DIM_TYPES: [&str; 18] = [
    "", "Null", "Integer", "Long", "Single", "Double", "Currency", "Date", "String", "Object",
    "Error", "Boolean", "Variant", "", "Decimal", "", "", "Byte",
];

fn get_type_name(type_id: u8) -> String {
    let type_flags = type_id & 0xE0;
    let type_id = type_id & !0xE0;
    let mut name = DIM_TYPES.get(type_id as usize).copied().unwrap_or("").to_string();
    if type_flags & 0x80 != 0 {
        name.push_str("Ptr");
    }
    name
}

fn disasm_type(indirect_table: &[u8], dword: u32) -> io::Result<String> {
    let type_id = crate::cursor::u8_at(indirect_table, dword as usize + 6)?;
    Ok(match DIM_TYPES.get(type_id as usize) {
        Some(name) => name.to_string(),
        None => format!("type_{dword:08X}"),
    })
}

fn disasm_object(
    indirect_table: &[u8],
    object_table: &[u8],
    identifiers: &[String],
    offset: usize,
    endian: Endian,
    vba_ver: u8,
    is64bit: bool,
) -> io::Result<String> {
    if is64bit {
        // Dim declarations in 64-bit Office documents aren't handled by this decoder.
        return Ok(String::new());
    }
    let type_desc = crate::cursor::u32_at(indirect_table, offset, endian)? as usize;
    let flags = crate::cursor::u16_at(indirect_table, type_desc, endian)?;
    if flags & 0x02 != 0 {
        return disasm_type(indirect_table, type_desc as u32);
    }
    let word = crate::cursor::u16_at(indirect_table, type_desc + 2, endian)?;
    if word == 0 {
        return Ok(String::new());
    }
    let offs = (word as usize >> 2) * 10;
    if offs + 4 > object_table.len() {
        return Ok(String::new());
    }
    let hl_name = crate::cursor::u16_at(object_table, offs + 6, endian)?;
    Ok(resolve(hl_name, identifiers, vba_ver, is64bit))
}

fn disasm_var(
    indirect_table: &[u8],
    object_table: &[u8],
    identifiers: &[String],
    dword: u32,
    endian: Endian,
    vba_ver: u8,
    is64bit: bool,
) -> io::Result<String> {
    let dword = dword as usize;
    let b_flag1 = crate::cursor::u8_at(indirect_table, dword)?;
    let b_flag2 = crate::cursor::u8_at(indirect_table, dword + 1)?;
    let has_as = b_flag1 & 0x20 != 0;
    let has_new = b_flag2 & 0x20 != 0;
    let mut var_name = get_name(indirect_table, identifiers, dword + 2, endian, vba_ver, is64bit)?;
    if has_new || has_as {
        let mut var_type = String::new();
        if has_new {
            var_type.push_str("New");
            if has_as {
                var_type.push(' ');
            }
        }
        if has_as {
            let offs = if is64bit { 16 } else { 12 };
            let word = crate::cursor::u16_at(indirect_table, dword + offs + 2, endian)?;
            let type_name = if word == 0xFFFF {
                let type_id = crate::cursor::u8_at(indirect_table, dword + offs)?;
                get_type_name(type_id)
            } else {
                disasm_object(indirect_table, object_table, identifiers, dword + offs, endian, vba_ver, is64bit)?
            };
            if !type_name.is_empty() {
                var_type.push_str("As ");
                var_type.push_str(&type_name);
            }
        }
        if !var_type.is_empty() {
            var_name.push_str(&format!(" ({var_type})"));
        }
    }
    Ok(var_name)
}

fn disasm_arg(indirect_table: &[u8], identifiers: &[String], arg_offset: u32, endian: Endian, vba_ver: u8, is64bit: bool) -> io::Result<String> {
    let arg_offset = arg_offset as usize;
    let flags = crate::cursor::u16_at(indirect_table, arg_offset, endian)?;
    let offs = if is64bit { 4 } else { 0 };
    let mut arg_name = get_name(indirect_table, identifiers, arg_offset + 2, endian, vba_ver, is64bit)?;
    let arg_type = crate::cursor::u32_at(indirect_table, arg_offset + offs + 12, endian)?;
    let arg_opts = crate::cursor::u16_at(indirect_table, arg_offset + offs + 24, endian)?;
    if arg_opts & 0x0004 != 0 {
        arg_name = format!("ByVal {arg_name}");
    }
    if arg_opts & 0x0002 != 0 {
        arg_name = format!("ByRef {arg_name}");
    }
    if arg_opts & 0x0200 != 0 {
        arg_name = format!("Optional {arg_name}");
    }
    // ParamArray rendering is known-incorrect upstream and stays disabled.
    if flags & 0x0020 != 0 {
        arg_name.push_str(" As ");
        if arg_type & 0xFFFF_0000 != 0 {
            let type_id = (arg_type & 0x0000_00FF) as u8;
            arg_name.push_str(&get_type_name(type_id));
        }
        // Custom-type arguments are known-incorrect upstream and stay disabled.
    }
    Ok(arg_name)
}

#[allow(clippy::too_many_arguments)]
fn disasm_func(
    indirect_table: &[u8],
    declaration_table: &[u8],
    identifiers: &[String],
    dword: u32,
    op_type: u16,
    endian: Endian,
    vba_ver: u8,
    is64bit: bool,
) -> io::Result<String> {
    let dword = dword as usize;
    let flags = crate::cursor::u16_at(indirect_table, dword, endian)?;
    let sub_name = get_name(indirect_table, identifiers, dword + 2, endian, vba_ver, is64bit)?;
    let mut offs2 = if vba_ver > 5 { 4 } else { 0 };
    if is64bit {
        offs2 += 16;
    }
    let arg_offset = crate::cursor::u32_at(indirect_table, dword + offs2 + 36, endian)?;
    let ret_type = crate::cursor::u32_at(indirect_table, dword + offs2 + 40, endian)?;
    let decl_offset = crate::cursor::u16_at(indirect_table, dword + offs2 + 44, endian)?;
    let c_options = crate::cursor::u8_at(indirect_table, dword + offs2 + 54)?;
    let new_flags = crate::cursor::u8_at(indirect_table, dword + offs2 + 57)?;

    let mut decl = String::from("(");
    let mut has_declare = false;
    if vba_ver > 5 {
        if new_flags & 0x0002 == 0 && !is64bit {
            decl.push_str("Private ");
        }
        if new_flags & 0x0004 != 0 {
            decl.push_str("Friend ");
        }
    } else if flags & 0x0008 == 0 {
        decl.push_str("Private ");
    }
    if op_type & 0x04 != 0 {
        decl.push_str("Public ");
    }
    if flags & 0x0080 != 0 {
        decl.push_str("Static ");
    }
    if c_options & 0x90 == 0 && decl_offset != 0xFFFF && !is64bit {
        has_declare = true;
        decl.push_str("Declare ");
    }
    if vba_ver > 5 && new_flags & 0x20 != 0 {
        decl.push_str("PtrSafe ");
    }
    let has_as = flags & 0x0020 != 0;
    if flags & 0x1000 != 0 {
        decl.push_str(if matches!(op_type, 2 | 6) { "Function " } else { "Sub " });
    } else if flags & 0x2000 != 0 {
        decl.push_str("Property Get ");
    } else if flags & 0x4000 != 0 {
        decl.push_str("Property Let ");
    } else if flags & 0x8000 != 0 {
        decl.push_str("Property Set ");
    }
    decl.push_str(&sub_name);
    if has_declare {
        let lib_name = get_name(declaration_table, identifiers, decl_offset as usize + 2, endian, vba_ver, is64bit)?;
        decl.push_str(&format!(" Lib \"{lib_name}\" "));
    }

    let mut args = Vec::new();
    let mut offset = arg_offset;
    while offset != 0xFFFF_FFFF && offset != 0 && (offset as usize + 26) < indirect_table.len() {
        args.push(disasm_arg(indirect_table, identifiers, offset, endian, vba_ver, is64bit)?);
        offset = crate::cursor::u32_at(indirect_table, offset as usize + 20, endian)?;
    }
    decl.push('(');
    decl.push_str(&args.join(", "));
    decl.push(')');

    if has_as {
        decl.push_str(" As ");
        let type_name = if ret_type & 0xFFFF_0000 == 0xFFFF_0000 {
            let type_id = (ret_type & 0x0000_00FF) as u8;
            get_type_name(type_id)
        } else {
            get_name(indirect_table, identifiers, ret_type as usize + 6, endian, vba_ver, is64bit)?
        };
        decl.push_str(&type_name);
    }
    decl.push(')');
    Ok(decl)
}

fn disasm_var_arg(
    module_data: &[u8],
    identifiers: &[String],
    offset: usize,
    w_length: u16,
    mnemonic: &str,
    endian: Endian,
    vba_ver: u8,
    is64bit: bool,
    codepage: u16,
) -> io::Result<String> {
    let substring = slice(module_data, offset, offset + w_length as usize)?;
    let mut out = format!("0x{w_length:04X} ");
    match mnemonic {
        "LitStr" | "QuoteRem" | "Rem" | "Reparse" => {
            out.push('"');
            out.push_str(&decode_win_str(substring, codepage));
            out.push('"');
        }
        "OnGosub" | "OnGoto" => {
            let mut r = Reader::new(substring);
            let mut names = Vec::new();
            while r.remaining() >= 2 {
                let word = r.u16(endian)?;
                names.push(resolve(word, identifiers, vba_ver, is64bit));
            }
            out.push_str(&names.join(", "));
            out.push(' ');
        }
        _ => {
            let hex: Vec<String> = substring.iter().map(|b| format!("{b:02X}")).collect();
            out.push_str(&hex.join(" "));
        }
    }
    Ok(out)
}

const OP_TYPE_VAR_TYPES_LONG: [&str; 13] =
    ["Var", "?", "Int", "Lng", "Sng", "Dbl", "Cur", "Date", "Str", "Obj", "Err", "Bool", "Var"];
const LIT_VAR_SPECIALS: [&str; 4] = ["False", "True", "Null", "Empty"];
const OPTION_NAMES: [&str; 6] =
    ["Base 0", "Base 1", "Compare Text", "Compare Binary", "Explicit", "Private Module"];

/// Context shared across every line of one module.
pub struct DisasmContext<'a> {
    pub identifiers: &'a [String],
    pub tables: AuxTables<'a>,
    pub vba_ver: u8,
    pub is64bit: bool,
    pub endian: Endian,
    pub codepage: u16,
    pub verbose: bool,
}

/// What a single decoded opcode word renders to.
enum Rendered {
    /// The fully rendered instruction text, including its trailing newline.
    Text(String),
    /// The raw opcode didn't translate to any canonical entry.
    Unrecognized { opcode: u16, offset: usize },
}

/// Decodes and renders exactly one opcode word, advancing `r` past it and its operands.
///
/// Any operand-decode failure (a table read landing outside its slice despite passing the
/// length checks below, a malformed auxiliary-table record, ...) propagates as an
/// `io::Error`; the caller treats that the same as an unrecognized opcode and terminates
/// the line, rather than the whole module.
fn render_instruction(r: &mut Reader, module_data: &[u8], ctx: &DisasmContext) -> io::Result<Rendered> {
    use std::fmt::Write as _;

    let raw = r.u16(ctx.endian)?;
    let mut op_type = (raw & !0x03FFu16) >> 10;
    let opcode = raw & 0x03FF;
    let Some(translated) = translate_opcode(opcode, ctx.vba_ver, ctx.is64bit) else {
        return Ok(Rendered::Unrecognized { opcode, offset: r.pos() });
    };
    let instr = &OPCODES[translated];

    let mut s = String::new();
    let _ = write!(s, "\t");
    if ctx.verbose {
        let _ = write!(s, "{raw:04X} ");
    }
    let _ = write!(s, "{} ", instr.mnemonic);
    match instr.mnemonic {
        "Coerce" | "CoerceVar" | "DefType" => {
            if (op_type as usize) < OP_TYPE_VAR_TYPES_LONG.len() {
                let _ = write!(s, "({}) ", OP_TYPE_VAR_TYPES_LONG[op_type as usize]);
            } else if op_type == 17 {
                let _ = write!(s, "(Byte) ");
            } else {
                let _ = write!(s, "({op_type}) ");
            }
        }
        "Dim" | "DimImplicit" | "Type" => {
            let mut parts = Vec::new();
            if op_type & 0x04 != 0 {
                parts.push("Global");
            } else if op_type & 0x08 != 0 {
                parts.push("Public");
            } else if op_type & 0x10 != 0 {
                parts.push("Private");
            } else if op_type & 0x20 != 0 {
                parts.push("Static");
            }
            if op_type & 0x01 != 0 && instr.mnemonic != "Type" {
                parts.push("Const");
            }
            if !parts.is_empty() {
                let _ = write!(s, "({}) ", parts.join(" "));
            }
        }
        "LitVarSpecial" => {
            if let Some(name) = LIT_VAR_SPECIALS.get(op_type as usize) {
                let _ = write!(s, "({name})");
            }
        }
        "ArgsCall" | "ArgsMemCall" | "ArgsMemCallWith" => {
            if op_type < 16 {
                let _ = write!(s, "(Call) ");
            } else {
                op_type -= 16;
            }
        }
        "Option" => {
            if let Some(name) = OPTION_NAMES.get(op_type as usize) {
                let _ = write!(s, " ({name})");
            }
        }
        "Redim" | "RedimAs" => {
            if op_type & 16 != 0 {
                let _ = write!(s, "(Preserve) ");
            }
        }
        _ => {}
    }

    for &kind in instr.operands {
        match kind {
            OperandKind::Name => {
                let word = r.u16(ctx.endian)?;
                let name = disasm_name(word, ctx.identifiers, instr.mnemonic, op_type, ctx.vba_ver, ctx.is64bit);
                let _ = write!(s, "{name}");
            }
            OperandKind::Imm16 | OperandKind::Imp => {
                let word = r.u16(ctx.endian)?;
                let rendered = disasm_imp(ctx.tables.object, ctx.identifiers, kind, word, instr.mnemonic, ctx.endian, ctx.vba_ver, ctx.is64bit)?;
                let _ = write!(s, "{rendered}");
            }
            OperandKind::Rec => {
                let dword = r.u32(ctx.endian)?;
                if ctx.tables.indirect.len() as u32 >= dword + 20 {
                    let _ = write!(s, "{}", disasm_rec(ctx.tables.indirect, ctx.identifiers, dword, ctx.endian, ctx.vba_ver, ctx.is64bit)?);
                } else {
                    let _ = write!(s, "rec_{dword:08X} ");
                }
            }
            OperandKind::Type => {
                let dword = r.u32(ctx.endian)?;
                if ctx.tables.indirect.len() as u32 >= dword + 7 {
                    let _ = write!(s, "(As {})", disasm_type(ctx.tables.indirect, dword)?);
                } else {
                    let _ = write!(s, "type_{dword:08X} ");
                }
            }
            OperandKind::Var => {
                let dword = r.u32(ctx.endian)?;
                if ctx.tables.indirect.len() as u32 >= dword + 16 {
                    if op_type & 0x20 != 0 {
                        let _ = write!(s, "(WithEvents) ");
                    }
                    let _ = write!(s, "{}", disasm_var(ctx.tables.indirect, ctx.tables.object, ctx.identifiers, dword, ctx.endian, ctx.vba_ver, ctx.is64bit)?);
                    if op_type & 0x10 != 0 {
                        let word = r.u16(ctx.endian)?;
                        let _ = write!(s, " 0x{word:04X}");
                    }
                } else {
                    let _ = write!(s, "var_{dword:08X} ");
                }
            }
            OperandKind::Func => {
                let dword = r.u32(ctx.endian)?;
                if ctx.tables.indirect.len() as u32 >= dword + 61 {
                    let _ = write!(s, "{}", disasm_func(ctx.tables.indirect, ctx.tables.declaration, ctx.identifiers, dword, op_type, ctx.endian, ctx.vba_ver, ctx.is64bit)?);
                } else {
                    let _ = write!(s, "func_{dword:08X} ");
                }
            }
            OperandKind::Context => {
                let dword = r.u32(ctx.endian)?;
                let _ = write!(s, "context_{dword:08X} ");
                if ctx.is64bit {
                    let dword2 = r.u32(ctx.endian)?;
                    let _ = write!(s, "{dword2:08X} ");
                }
            }
        }
    }

    if instr.has_variable_tail {
        let w_length = r.u16(ctx.endian)?;
        let rendered = disasm_var_arg(module_data, ctx.identifiers, r.pos(), w_length, instr.mnemonic, ctx.endian, ctx.vba_ver, ctx.is64bit, ctx.codepage)?;
        let _ = write!(s, "{rendered}");
        r.advance(w_length as usize);
        if w_length & 1 != 0 {
            r.advance(1);
        }
    }
    s.push('\n');
    Ok(Rendered::Text(s))
}

/// Disassembles a single p-code line, writing its rendering to `out`.
///
/// On an unrecognized opcode, or on any operand-decode failure, writes a diagnostic and
/// returns - the caller moves on to the next line rather than aborting the whole module.
pub fn dump_line(out: &mut dyn Write, module_data: &[u8], ctx: &DisasmContext, line_start: usize, line_length: u16, line_number: u32) -> io::Result<()> {
    if ctx.verbose && line_length > 0 {
        write!(out, "{line_start:04X}: ")?;
    }
    writeln!(out, "Line #{line_number}:")?;
    if line_length == 0 {
        return Ok(());
    }
    if ctx.verbose {
        // Mirrors Python's lenient slice semantics: an out-of-range line length just
        // truncates the dump rather than erroring the whole module.
        let end = (line_start + line_length as usize).min(module_data.len());
        let start = line_start.min(end);
        writeln!(out, "{}", hexdump(&module_data[start..end]))?;
    }
    let mut r = Reader::with_pos(module_data, line_start);
    let end_of_line = line_start + line_length as usize;
    while r.pos() < end_of_line {
        let start = r.pos();
        match render_instruction(&mut r, module_data, ctx) {
            Ok(Rendered::Text(text)) => write!(out, "{text}")?,
            Ok(Rendered::Unrecognized { opcode, offset }) => {
                writeln!(out, "Unrecognized opcode 0x{opcode:04X} at offset 0x{offset:08X}.")?;
                return Ok(());
            }
            Err(e) => {
                writeln!(out, "Error disassembling opcode at offset 0x{start:08X}: {e}.")?;
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Formats a hex + ASCII dump, 16 bytes per row, matching the verbose stream dumps
/// emitted throughout.
pub fn hexdump(buf: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in buf.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if (32..127).contains(&b) { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08X}   {:<47}    {}\n", row * 16, hex.join(" "), ascii));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn open_bitfield_binary_read_write_shared() {
        let identifiers: Vec<String> = Vec::new();
        let object_table: [u8; 0] = [];
        let rendered = disasm_imp(&object_table, &identifiers, OperandKind::Imm16, 0x4320, "Open", Endian::Little, 6, false).unwrap();
        assert_eq!(rendered, "(For Binary Access Read Write Shared)");
    }

    #[test]
    fn get_type_name_with_ptr_suffix() {
        assert_eq!(get_type_name(0x82), "IntegerPtr");
        assert_eq!(get_type_name(0x03), "Long");
    }

    #[test]
    fn dim_flags_render_in_priority_order() {
        // opcode 93 ("Dim"), op_type 0x0C has both Global (0x04) and Public (0x08) set;
        // Global takes precedence and Public must not also appear.
        let module_data: [u8; 2] = [0x5D, 0x30];
        let identifiers: Vec<String> = Vec::new();
        let mut ctx = empty_ctx(&identifiers);
        ctx.is64bit = true;
        let mut out = Vec::new();
        dump_line(&mut out, &module_data, &ctx, 0, 2, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Dim (Global) "), "{text}");
        assert!(!text.contains("Public"), "{text}");
    }

    fn empty_ctx<'a>(identifiers: &'a [String]) -> DisasmContext<'a> {
        DisasmContext {
            identifiers,
            tables: AuxTables { declaration: &[], indirect: &[], object: &[] },
            vba_ver: 7,
            is64bit: false,
            endian: Endian::Little,
            codepage: 1252,
            verbose: false,
        }
    }

    #[test]
    fn reserved_name_opcode_renders_ld_0() {
        // opcode 32 ("Ld", [Name]), idCode 2 -> reserved[1] = "0".
        let module_data: [u8; 4] = [0x20, 0x00, 0x02, 0x00];
        let identifiers: Vec<String> = Vec::new();
        let ctx = empty_ctx(&identifiers);
        let mut out = Vec::new();
        dump_line(&mut out, &module_data, &ctx, 0, 4, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Ld 0"), "{text}");
    }

    #[test]
    fn lit_str_renders_quoted_tail_with_length() {
        // opcode 185 ("LitStr", varg) is only the identity translation on 64-bit VBA7.
        let mut module_data = vec![0xB9, 0x00, 0x02, 0x00];
        module_data.extend_from_slice(b"Hi");
        let identifiers: Vec<String> = Vec::new();
        let mut ctx = empty_ctx(&identifiers);
        ctx.is64bit = true;
        let mut out = Vec::new();
        let len = module_data.len() as u16;
        dump_line(&mut out, &module_data, &ctx, 0, len, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(r#"LitStr 0x0002 "Hi""#), "{text}");
    }

    #[test]
    fn lit_str_odd_length_tail_pads_to_even() {
        let mut module_data = vec![0xB9, 0x00, 0x01, 0x00];
        module_data.push(b'H');
        module_data.push(0xAA); // pad byte, must be skipped rather than reparsed
        let identifiers: Vec<String> = Vec::new();
        let mut ctx = empty_ctx(&identifiers);
        ctx.is64bit = true;
        let mut out = Vec::new();
        let len = module_data.len() as u16;
        dump_line(&mut out, &module_data, &ctx, 0, len, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(r#"LitStr 0x0001 "H""#), "{text}");
    }

    #[test]
    fn unknown_opcode_halts_line_with_diagnostic() {
        // Raw word 0x03FF under VBA6 32-bit: opcode 0x03FF is out of every translation
        // range, so the line terminates with the diagnostic instead of a mnemonic.
        let module_data: [u8; 2] = [0xFF, 0x03];
        let identifiers: Vec<String> = Vec::new();
        let mut ctx = empty_ctx(&identifiers);
        ctx.vba_ver = 6;
        let mut out = Vec::new();
        dump_line(&mut out, &module_data, &ctx, 0, 2, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Unrecognized opcode 0x03FF"), "{text}");
    }

    #[test]
    fn property_get_declaration_renders_from_func_record() {
        // flags bit 0x2000 (Property Get), opType = 6.
        let mut indirect = vec![0u8; 64];
        indirect[0..2].copy_from_slice(&0x2000u16.to_le_bytes()); // flags
        indirect[2..4].copy_from_slice(&0x0200u16.to_le_bytes()); // sub_name idCode
        indirect[61] = 0x02; // new_flags: bit 0x0002 set -> skip "Private "
        indirect[48..50].copy_from_slice(&0xFFFFu16.to_le_bytes()); // decl_offset absent
        indirect[40..44].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // arg_offset: no args
        let identifiers = vec!["Total".to_string()];
        let rendered = disasm_func(&indirect, &[], &identifiers, 0, 6, Endian::Little, 6, false).unwrap();
        assert!(rendered.contains("Property Get Total"), "{rendered}");
    }
}
