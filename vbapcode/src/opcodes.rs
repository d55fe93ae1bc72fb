//! The canonical VBA7 opcode table.
//!
//! All other version numbering schemes (VBA3, VBA5, VBA6, VBA7-32bit) are normalized onto
//! this 264-entry table by [`crate::translate::translate_opcode`] before a lookup here is
//! attempted.

/// The shape of a single operand of an opcode, in the order it is encoded in the p-code
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// A 16-bit identifier code, resolved via the identifier resolver.
    Name,
    /// A 16-bit immediate value, rendered as hex unless special-cased by mnemonic.
    Imm16,
    /// A 16-bit value naming an entry of the object table (`Open` uses it differently).
    Imp,
    /// A 32-bit offset into the indirect table, naming a function/sub/property record.
    Func,
    /// A 32-bit offset into the indirect table, naming a variable record.
    Var,
    /// A 32-bit offset into the indirect table, naming a user-defined type record.
    Rec,
    /// A 32-bit offset into the indirect table, naming a type descriptor.
    Type,
    /// A 32-bit context value; doubled to 64 bits on 64-bit hosts.
    Context,
}

/// A single canonical opcode's mnemonic, operand shape and variable-tail flag.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeDescriptor {
    pub mnemonic: &'static str,
    pub operands: &'static [OperandKind],
    pub has_variable_tail: bool,
}

use OperandKind::*;

macro_rules! op {
    ($mnem:literal) => {
        OpcodeDescriptor { mnemonic: $mnem, operands: &[], has_variable_tail: false }
    };
    ($mnem:literal, varg) => {
        OpcodeDescriptor { mnemonic: $mnem, operands: &[], has_variable_tail: true }
    };
    ($mnem:literal, [$($k:expr),+ $(,)?]) => {
        OpcodeDescriptor { mnemonic: $mnem, operands: &[$($k),+], has_variable_tail: false }
    };
    ($mnem:literal, [$($k:expr),+ $(,)?], varg) => {
        OpcodeDescriptor { mnemonic: $mnem, operands: &[$($k),+], has_variable_tail: true }
    };
}

/// Canonical opcode table, indexed by translated opcode (`0..=263`).
pub const OPCODES: [OpcodeDescriptor; 264] = [
    /*  0 */ op!("Imp"),
    /*  1 */ op!("Eqv"),
    /*  2 */ op!("Xor"),
    /*  3 */ op!("Or"),
    /*  4 */ op!("And"),
    /*  5 */ op!("Eq"),
    /*  6 */ op!("Ne"),
    /*  7 */ op!("Le"),
    /*  8 */ op!("Ge"),
    /*  9 */ op!("Lt"),
    /* 10 */ op!("Gt"),
    /* 11 */ op!("Add"),
    /* 12 */ op!("Sub"),
    /* 13 */ op!("Mod"),
    /* 14 */ op!("IDiv"),
    /* 15 */ op!("Mul"),
    /* 16 */ op!("Div"),
    /* 17 */ op!("Concat"),
    /* 18 */ op!("Like"),
    /* 19 */ op!("Pwr"),
    /* 20 */ op!("Is"),
    /* 21 */ op!("Not"),
    /* 22 */ op!("UMi"),
    /* 23 */ op!("FnAbs"),
    /* 24 */ op!("FnFix"),
    /* 25 */ op!("FnInt"),
    /* 26 */ op!("FnSgn"),
    /* 27 */ op!("FnLen"),
    /* 28 */ op!("FnLenB"),
    /* 29 */ op!("Paren"),
    /* 30 */ op!("Sharp"),
    /* 31 */ op!("LdLHS", [Name]),
    /* 32 */ op!("Ld", [Name]),
    /* 33 */ op!("MemLd", [Name]),
    /* 34 */ op!("DictLd", [Name]),
    /* 35 */ op!("IndexLd", [Imm16]),
    /* 36 */ op!("ArgsLd", [Name, Imm16]),
    /* 37 */ op!("ArgsMemLd", [Name, Imm16]),
    /* 38 */ op!("ArgsDictLd", [Name, Imm16]),
    /* 39 */ op!("St", [Name]),
    /* 40 */ op!("MemSt", [Name]),
    /* 41 */ op!("DictSt", [Name]),
    /* 42 */ op!("IndexSt", [Imm16]),
    /* 43 */ op!("ArgsSt", [Name, Imm16]),
    /* 44 */ op!("ArgsMemSt", [Name, Imm16]),
    /* 45 */ op!("ArgsDictSt", [Name, Imm16]),
    /* 46 */ op!("Set", [Name]),
    /* 47 */ op!("Memset", [Name]),
    /* 48 */ op!("Dictset", [Name]),
    /* 49 */ op!("Indexset", [Imm16]),
    /* 50 */ op!("ArgsSet", [Name, Imm16]),
    /* 51 */ op!("ArgsMemSet", [Name, Imm16]),
    /* 52 */ op!("ArgsDictSet", [Name, Imm16]),
    /* 53 */ op!("MemLdWith", [Name]),
    /* 54 */ op!("DictLdWith", [Name]),
    /* 55 */ op!("ArgsMemLdWith", [Name, Imm16]),
    /* 56 */ op!("ArgsDictLdWith", [Name, Imm16]),
    /* 57 */ op!("MemStWith", [Name]),
    /* 58 */ op!("DictStWith", [Name]),
    /* 59 */ op!("ArgsMemStWith", [Name, Imm16]),
    /* 60 */ op!("ArgsDictStWith", [Name, Imm16]),
    /* 61 */ op!("MemSetWith", [Name]),
    /* 62 */ op!("DictSetWith", [Name]),
    /* 63 */ op!("ArgsMemSetWith", [Name, Imm16]),
    /* 64 */ op!("ArgsDictSetWith", [Name, Imm16]),
    /* 65 */ op!("ArgsCall", [Name, Imm16]),
    /* 66 */ op!("ArgsMemCall", [Name, Imm16]),
    /* 67 */ op!("ArgsMemCallWith", [Name, Imm16]),
    /* 68 */ op!("ArgsArray", [Name, Imm16]),
    /* 69 */ op!("Assert"),
    /* 70 */ op!("BoS", [Imm16]),
    /* 71 */ op!("BoSImplicit"),
    /* 72 */ op!("BoL"),
    /* 73 */ op!("LdAddressOf", [Name]),
    /* 74 */ op!("MemAddressOf", [Name]),
    /* 75 */ op!("Case"),
    /* 76 */ op!("CaseTo"),
    /* 77 */ op!("CaseGt"),
    /* 78 */ op!("CaseLt"),
    /* 79 */ op!("CaseGe"),
    /* 80 */ op!("CaseLe"),
    /* 81 */ op!("CaseNe"),
    /* 82 */ op!("CaseEq"),
    /* 83 */ op!("CaseElse"),
    /* 84 */ op!("CaseDone"),
    /* 85 */ op!("Circle", [Imm16]),
    /* 86 */ op!("Close", [Imm16]),
    /* 87 */ op!("CloseAll"),
    /* 88 */ op!("Coerce"),
    /* 89 */ op!("CoerceVar"),
    /* 90 */ op!("Context", [Context]),
    /* 91 */ op!("Debug"),
    /* 92 */ op!("DefType", [Imm16, Imm16]),
    /* 93 */ op!("Dim"),
    /* 94 */ op!("DimImplicit"),
    /* 95 */ op!("Do"),
    /* 96 */ op!("DoEvents"),
    /* 97 */ op!("DoUnitil"),
    /* 98 */ op!("DoWhile"),
    /* 99 */ op!("Else"),
    /*100 */ op!("ElseBlock"),
    /*101 */ op!("ElseIfBlock"),
    /*102 */ op!("ElseIfTypeBlock", [Imp]),
    /*103 */ op!("End"),
    /*104 */ op!("EndContext"),
    /*105 */ op!("EndFunc"),
    /*106 */ op!("EndIf"),
    /*107 */ op!("EndIfBlock"),
    /*108 */ op!("EndImmediate"),
    /*109 */ op!("EndProp"),
    /*110 */ op!("EndSelect"),
    /*111 */ op!("EndSub"),
    /*112 */ op!("EndType"),
    /*113 */ op!("EndWith"),
    /*114 */ op!("Erase", [Imm16]),
    /*115 */ op!("Error"),
    /*116 */ op!("EventDecl", [Func]),
    /*117 */ op!("RaiseEvent", [Name, Imm16]),
    /*118 */ op!("ArgsMemRaiseEvent", [Name, Imm16]),
    /*119 */ op!("ArgsMemRaiseEventWith", [Name, Imm16]),
    /*120 */ op!("ExitDo"),
    /*121 */ op!("ExitFor"),
    /*122 */ op!("ExitFunc"),
    /*123 */ op!("ExitProp"),
    /*124 */ op!("ExitSub"),
    /*125 */ op!("FnCurDir"),
    /*126 */ op!("FnDir"),
    /*127 */ op!("Empty0"),
    /*128 */ op!("Empty1"),
    /*129 */ op!("FnError"),
    /*130 */ op!("FnFormat"),
    /*131 */ op!("FnFreeFile"),
    /*132 */ op!("FnInStr"),
    /*133 */ op!("FnInStr3"),
    /*134 */ op!("FnInStr4"),
    /*135 */ op!("FnInStrB"),
    /*136 */ op!("FnInStrB3"),
    /*137 */ op!("FnInStrB4"),
    /*138 */ op!("FnLBound", [Imm16]),
    /*139 */ op!("FnMid"),
    /*140 */ op!("FnMidB"),
    /*141 */ op!("FnStrComp"),
    /*142 */ op!("FnStrComp3"),
    /*143 */ op!("FnStringVar"),
    /*144 */ op!("FnStringStr"),
    /*145 */ op!("FnUBound", [Imm16]),
    /*146 */ op!("For"),
    /*147 */ op!("ForEach"),
    /*148 */ op!("ForEachAs", [Imp]),
    /*149 */ op!("ForStep"),
    /*150 */ op!("FuncDefn", [Func]),
    /*151 */ op!("FuncDefnSave", [Func]),
    /*152 */ op!("GetRec"),
    /*153 */ op!("GoSub", [Name]),
    /*154 */ op!("GoTo", [Name]),
    /*155 */ op!("If"),
    /*156 */ op!("IfBlock"),
    /*157 */ op!("TypeOf", [Imp]),
    /*158 */ op!("IfTypeBlock", [Imp]),
    /*159 */ op!("Implements", [Imm16, Imm16, Imm16, Imm16]),
    /*160 */ op!("Input"),
    /*161 */ op!("InputDone"),
    /*162 */ op!("InputItem"),
    /*163 */ op!("Label", [Name]),
    /*164 */ op!("Let"),
    /*165 */ op!("Line", [Imm16]),
    /*166 */ op!("LineCont", varg),
    /*167 */ op!("LineInput"),
    /*168 */ op!("LineNum", [Name]),
    /*169 */ op!("LitCy", [Imm16, Imm16, Imm16, Imm16]),
    /*170 */ op!("LitDate", [Imm16, Imm16, Imm16, Imm16]),
    /*171 */ op!("LitDefault"),
    /*172 */ op!("LitDI2", [Imm16]),
    /*173 */ op!("LitDI4", [Imm16, Imm16]),
    /*174 */ op!("LitDI8", [Imm16, Imm16, Imm16, Imm16]),
    /*175 */ op!("LitHI2", [Imm16]),
    /*176 */ op!("LitHI4", [Imm16, Imm16]),
    /*177 */ op!("LitHI8", [Imm16, Imm16, Imm16, Imm16]),
    /*178 */ op!("LitNothing"),
    /*179 */ op!("LitOI2", [Imm16]),
    /*180 */ op!("LitOI4", [Imm16, Imm16]),
    /*181 */ op!("LitOI8", [Imm16, Imm16, Imm16, Imm16]),
    /*182 */ op!("LitR4", [Imm16, Imm16]),
    /*183 */ op!("LitR8", [Imm16, Imm16, Imm16, Imm16]),
    /*184 */ op!("LitSmallI2"),
    /*185 */ op!("LitStr", varg),
    /*186 */ op!("LitVarSpecial"),
    /*187 */ op!("Lock"),
    /*188 */ op!("Loop"),
    /*189 */ op!("LoopUntil"),
    /*190 */ op!("LoopWhile"),
    /*191 */ op!("LSet"),
    /*192 */ op!("Me"),
    /*193 */ op!("MeImplicit"),
    /*194 */ op!("MemRedim", [Name, Imm16, Type]),
    /*195 */ op!("MemRedimWith", [Name, Imm16, Type]),
    /*196 */ op!("MemRedimAs", [Name, Imm16, Type]),
    /*197 */ op!("MemRedimAsWith", [Name, Imm16, Type]),
    /*198 */ op!("Mid"),
    /*199 */ op!("MidB"),
    /*200 */ op!("Name"),
    /*201 */ op!("New", [Imp]),
    /*202 */ op!("Next"),
    /*203 */ op!("NextVar"),
    /*204 */ op!("OnError", [Name]),
    /*205 */ op!("OnGosub", varg),
    /*206 */ op!("OnGoto", varg),
    /*207 */ op!("Open", [Imm16]),
    /*208 */ op!("Option"),
    /*209 */ op!("OptionBase"),
    /*210 */ op!("ParamByVal"),
    /*211 */ op!("ParamOmitted"),
    /*212 */ op!("ParamNamed", [Name]),
    /*213 */ op!("PrintChan"),
    /*214 */ op!("PrintComma"),
    /*215 */ op!("PrintEoS"),
    /*216 */ op!("PrintItemComma"),
    /*217 */ op!("PrintItemNL"),
    /*218 */ op!("PrintItemSemi"),
    /*219 */ op!("PrintNL"),
    /*220 */ op!("PrintObj"),
    /*221 */ op!("PrintSemi"),
    /*222 */ op!("PrintSpc"),
    /*223 */ op!("PrintTab"),
    /*224 */ op!("PrintTabComma"),
    /*225 */ op!("PSet", [Imm16]),
    /*226 */ op!("PutRec"),
    /*227 */ op!("QuoteRem", [Imm16], varg),
    /*228 */ op!("Redim", [Name, Imm16, Type]),
    /*229 */ op!("RedimAs", [Name, Imm16, Type]),
    /*230 */ op!("Reparse", varg),
    /*231 */ op!("Rem", varg),
    /*232 */ op!("Resume", [Name]),
    /*233 */ op!("Return"),
    /*234 */ op!("RSet"),
    /*235 */ op!("Scale", [Imm16]),
    /*236 */ op!("Seek"),
    /*237 */ op!("SelectCase"),
    /*238 */ op!("SelectIs", [Imp]),
    /*239 */ op!("SelectType"),
    /*240 */ op!("SetStmt"),
    /*241 */ op!("Stack", [Imm16, Imm16]),
    /*242 */ op!("Stop"),
    /*243 */ op!("Type", [Rec]),
    /*244 */ op!("Unlock"),
    /*245 */ op!("VarDefn", [Var]),
    /*246 */ op!("Wend"),
    /*247 */ op!("While"),
    /*248 */ op!("With"),
    /*249 */ op!("WriteChan"),
    /*250 */ op!("ConstFuncExpr"),
    /*251 */ op!("LbConst", [Name]),
    /*252 */ op!("LbIf"),
    /*253 */ op!("LbElse"),
    /*254 */ op!("LbElseIf"),
    /*255 */ op!("LbEndIf"),
    /*256 */ op!("LbMark"),
    /*257 */ op!("EndForVariable"),
    /*258 */ op!("StartForVariable"),
    /*259 */ op!("NewRedim"),
    /*260 */ op!("StartWithExpr"),
    /*261 */ op!("SetOrSt", [Name]),
    /*262 */ op!("EndEnum"),
    /*263 */ op!("Illegal"),
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_fully_specified() {
        for (i, desc) in OPCODES.iter().enumerate() {
            assert!(!desc.mnemonic.is_empty(), "entry {i} has an empty mnemonic");
        }
    }

    #[test]
    fn lowercase_mnemonics_preserved() {
        assert_eq!(OPCODES[47].mnemonic, "Memset");
        assert_eq!(OPCODES[48].mnemonic, "Dictset");
    }

    #[test]
    fn spot_check_operand_shapes() {
        assert_eq!(OPCODES[32].mnemonic, "Ld");
        assert_eq!(OPCODES[32].operands, &[Name]);
        assert_eq!(OPCODES[185].mnemonic, "LitStr");
        assert!(OPCODES[185].has_variable_tail);
        assert_eq!(OPCODES[263].mnemonic, "Illegal");
    }
}
