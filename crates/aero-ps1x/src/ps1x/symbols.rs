//! ps.1.x grammar symbols and their native codes.

use bitflags::bitflags;

use crate::compiler2pass::rules::{SymbolDef, SymbolId};
use crate::native::*;

bitflags! {
    /// Active-context bits gating which symbols the ps.1.x grammar recognises.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Ps1xContext: u32 {
        const BASE = 0x01;
        const PS_1_1 = 0x02;
        const PS_1_2 = 0x04;
        const PS_1_3 = 0x08;
        const PS_1_4 = 0x10;
        /// Cleared by the `phase` marker.
        const PHASE1 = 0x20;
    }
}

macro_rules! symbols {
    ($($name:ident),* $(,)?) => {
        /// Terminals and non-terminals of the ps.1.x grammar.
        ///
        /// The discriminant is the [`SymbolId`] used in the rule table.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Symbol {
            $($name),*
        }

        impl Symbol {
            pub const ALL: &'static [Symbol] = &[$(Symbol::$name),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Symbol::$name => stringify!($name)),*
                }
            }
        }
    };
}

symbols! {
    // Non-terminals.
    Program,
    ProgramType,
    Constants,
    DefStmt,
    DefOp,
    NumVal,
    Separator,
    PhaseTwo,
    PhaseMarker,
    TexBlock,
    TexStatement,
    TexStmtPs14,
    TexOpPs14,
    TexSource,
    TexCoordReg,
    TexSwizzle,
    TexStmtPs11,
    TexOpPs11,
    TexRegPs11,
    TexCiscStmt,
    TexCiscOp,
    TexSpecStmt,
    TexSpecOp,
    AluBlock,
    AluStatement,
    CoIssueMark,
    AluOp,
    UnaryStmt,
    UnaryOp,
    BinaryStmt,
    BinaryOp,
    TernaryStmt,
    TernaryOp,
    DestInfo,
    DstMod,
    DstSat,
    DstMask,
    SrcArg,
    PreSrcMod,
    SrcReg,
    PostSrcMod,
    SrcRep,
    TempReg,
    ConstReg,
    ColorReg,

    // Program versions.
    Ps14,
    Ps11,
    Ps12,
    Ps13,

    // Punctuation, literals and markers.
    Def,
    Comma,
    Value,
    Phase,
    CoIssue,

    // ps.1.4 registers.
    R0, R1, R2, R3, R4, R5,
    T0, T1, T2, T3, T4, T5,
    // ps.1.1 - ps.1.3 registers.
    Ps11R0, Ps11R1,
    Ps11T0, Ps11T1, Ps11T2, Ps11T3,
    // Shared registers.
    C0, C1, C2, C3, C4, C5, C6, C7,
    V0, V1,

    // ALU opcodes.
    Add, Sub, Mul, Mad, Lrp, Mov, Cmp, Cnd, Dp2Add, Dp3, Dp4,

    // Texture opcodes.
    Texcrd, Texld, Tex, Texcoord,
    Texreg2ar, Texreg2gb, Texdp3, Texdp3tex,
    Texm3x2pad, Texm3x2tex, Texm3x3pad, Texm3x3tex, Texm3x3spec,

    // Destination modifiers.
    X2, X4, X8, D2, D4, D8, Sat,

    // Destination masks.
    MaskR, MaskG, MaskB, MaskA,
    MaskRg, MaskRb, MaskRa, MaskGb, MaskGa, MaskBa,
    MaskRgb, MaskRga, MaskRba, MaskGba,
    MaskRgba,

    // Source modifiers.
    Negate, Invert, Bias, SrcX2, Bx2,

    // Source replicates.
    RepR, RepG, RepB, RepA,

    // Texture coordinate swizzles.
    SwizzleStr, SwizzleStq, SwizzleStrq, SwizzleStrDr, SwizzleStqDq,
}

/// ps.1.4 temp registers by ordinal.
pub(crate) const PS14_TEMP_REGS: [Symbol; 6] = [
    Symbol::R0,
    Symbol::R1,
    Symbol::R2,
    Symbol::R3,
    Symbol::R4,
    Symbol::R5,
];

/// ps.1.1 - ps.1.3 texture registers by ordinal (native `REG_0` - `REG_3`).
pub(crate) const PS11_TEX_REGS: [Symbol; 4] = [
    Symbol::Ps11T0,
    Symbol::Ps11T1,
    Symbol::Ps11T2,
    Symbol::Ps11T3,
];

pub(crate) const CONST_REGS: [Symbol; 8] = [
    Symbol::C0,
    Symbol::C1,
    Symbol::C2,
    Symbol::C3,
    Symbol::C4,
    Symbol::C5,
    Symbol::C6,
    Symbol::C7,
];

impl Symbol {
    pub const fn id(self) -> SymbolId {
        self as SymbolId
    }

    pub fn from_id(id: SymbolId) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Symbol table entry for this symbol.
    pub fn def(self) -> SymbolDef {
        use Symbol::*;

        let base = Ps1xContext::BASE.bits();
        let ps14 = Ps1xContext::PS_1_4.bits();
        let ps11 = Ps1xContext::PS_1_1.bits();
        let ps12 = Ps1xContext::PS_1_2.bits();

        let (native, key) = match self {
            // Statement forms that only exist in one dialect family.
            TexStmtPs14 | PhaseTwo => (GL_NONE, ps14),
            TexStmtPs11 | TexCiscStmt | TexSpecStmt => (GL_NONE, ps11),

            Ps14 => {
                let set = Ps1xContext::PS_1_4 | Ps1xContext::PHASE1;
                return SymbolDef::new(self.id(), GL_NONE, base).with_context(set.bits(), 0);
            }
            Ps11 | Ps12 | Ps13 => {
                let set = match self {
                    Ps11 => Ps1xContext::PS_1_1,
                    Ps12 => Ps1xContext::PS_1_1 | Ps1xContext::PS_1_2,
                    _ => Ps1xContext::PS_1_1 | Ps1xContext::PS_1_2 | Ps1xContext::PS_1_3,
                };
                return SymbolDef::new(self.id(), GL_NONE, base).with_context(set.bits(), 0);
            }
            Phase => {
                let phase1 = Ps1xContext::PHASE1.bits();
                return SymbolDef::new(self.id(), GL_NONE, phase1).with_context(0, phase1);
            }

            R0 | R1 | R2 | R3 | R4 | R5 => (TEMP_REGISTERS[self.ordinal_from(R0)], ps14),
            T0 | T1 | T2 | T3 | T4 | T5 => (TEXTURE_UNITS[self.ordinal_from(T0)], ps14),
            Ps11R0 => (GL_REG_4_ATI, ps11),
            Ps11R1 => (GL_REG_5_ATI, ps11),
            Ps11T0 | Ps11T1 | Ps11T2 | Ps11T3 => {
                (TEMP_REGISTERS[self.ordinal_from(Ps11T0)], ps11)
            }
            C0 | C1 | C2 | C3 | C4 | C5 | C6 | C7 => {
                (CONSTANT_REGISTERS[self.ordinal_from(C0)], base)
            }
            V0 => (GL_PRIMARY_COLOR_ARB, base),
            V1 => (GL_SECONDARY_INTERPOLATOR_ATI, base),

            Add => (GL_ADD_ATI, base),
            Sub => (GL_SUB_ATI, base),
            Mul => (GL_MUL_ATI, base),
            Mad => (GL_MAD_ATI, base),
            Lrp => (GL_LERP_ATI, base),
            Mov => (GL_MOV_ATI, base),
            Cnd => (GL_CND_ATI, base),
            Cmp => (GL_CND0_ATI, ps12 | ps14),
            Dp3 => (GL_DOT3_ATI, base),
            Dp4 => (GL_DOT4_ATI, ps12 | ps14),
            Dp2Add => (GL_DOT2_ADD_ATI, ps14),

            Texcrd | Texld => (GL_NONE, ps14),
            Tex | Texcoord => (GL_NONE, ps11),
            Texreg2ar | Texreg2gb | Texm3x2pad | Texm3x2tex | Texm3x3pad | Texm3x3tex
            | Texm3x3spec => (GL_NONE, ps11),
            Texdp3 | Texdp3tex => (GL_NONE, ps12),

            X2 => (GL_2X_BIT_ATI, base),
            X4 => (GL_4X_BIT_ATI, base),
            X8 => (GL_8X_BIT_ATI, base),
            D2 => (GL_HALF_BIT_ATI, base),
            D4 => (GL_QUARTER_BIT_ATI, base),
            D8 => (GL_EIGHTH_BIT_ATI, base),
            Sat => (GL_SATURATE_BIT_ATI, base),

            MaskR => (GL_RED_BIT_ATI, base),
            MaskG => (GL_GREEN_BIT_ATI, base),
            MaskB => (GL_BLUE_BIT_ATI, base),
            MaskA => (ALPHA_BIT, base),
            MaskRg => (GL_RED_BIT_ATI | GL_GREEN_BIT_ATI, base),
            MaskRb => (GL_RED_BIT_ATI | GL_BLUE_BIT_ATI, base),
            MaskRa => (GL_RED_BIT_ATI | ALPHA_BIT, base),
            MaskGb => (GL_GREEN_BIT_ATI | GL_BLUE_BIT_ATI, base),
            MaskGa => (GL_GREEN_BIT_ATI | ALPHA_BIT, base),
            MaskBa => (GL_BLUE_BIT_ATI | ALPHA_BIT, base),
            MaskRgb => (RGB_BITS, base),
            MaskRga => (GL_RED_BIT_ATI | GL_GREEN_BIT_ATI | ALPHA_BIT, base),
            MaskRba => (GL_RED_BIT_ATI | GL_BLUE_BIT_ATI | ALPHA_BIT, base),
            MaskGba => (GL_GREEN_BIT_ATI | GL_BLUE_BIT_ATI | ALPHA_BIT, base),
            MaskRgba => (RGBA_BITS, base),

            Negate => (GL_NEGATE_BIT_ATI, base),
            Invert => (GL_COMP_BIT_ATI, base),
            Bias => (GL_BIAS_BIT_ATI, base),
            SrcX2 => (GL_2X_BIT_ATI, base),
            Bx2 => (GL_BIAS_BIT_ATI | GL_2X_BIT_ATI, base),

            RepR => (GL_RED, base),
            RepG => (GL_GREEN, base),
            RepB => (GL_BLUE, base),
            RepA => (GL_ALPHA, base),

            SwizzleStr => (GL_SWIZZLE_STR_ATI, base),
            SwizzleStq => (GL_SWIZZLE_STQ_ATI, base),
            SwizzleStrq => (GL_SWIZZLE_STRQ_ATI, base),
            SwizzleStrDr => (GL_SWIZZLE_STR_DR_ATI, base),
            SwizzleStqDq => (GL_SWIZZLE_STQ_DQ_ATI, base),

            // Remaining non-terminals and punctuation.
            _ => (GL_NONE, base),
        };
        SymbolDef::new(self.id(), native, key)
    }

    fn ordinal_from(self, first: Symbol) -> usize {
        usize::from(self.id() - first.id())
    }
}

/// The full symbol table, indexed by [`SymbolId`].
pub(crate) fn symbol_defs() -> Vec<SymbolDef> {
    Symbol::ALL.iter().map(|s| s.def()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense() {
        for (i, s) in Symbol::ALL.iter().enumerate() {
            assert_eq!(usize::from(s.id()), i);
            assert_eq!(Symbol::from_id(s.id()), Some(*s));
        }
        assert_eq!(Symbol::from_id(Symbol::ALL.len() as SymbolId), None);
    }

    #[test]
    fn register_natives() {
        assert_eq!(Symbol::R3.def().native, GL_REG_3_ATI);
        assert_eq!(Symbol::T5.def().native, GL_TEXTURE5_ARB);
        assert_eq!(Symbol::Ps11T2.def().native, GL_REG_2_ATI);
        assert_eq!(Symbol::Ps11R0.def().native, GL_REG_4_ATI);
        assert_eq!(Symbol::C6.def().native, GL_CON_6_ATI);
    }

    #[test]
    fn version_contexts() {
        let def = Symbol::Ps13.def();
        assert_eq!(
            Ps1xContext::from_bits_truncate(def.context_set),
            Ps1xContext::PS_1_1 | Ps1xContext::PS_1_2 | Ps1xContext::PS_1_3
        );
        let def = Symbol::Phase.def();
        assert_eq!(def.context_key, Ps1xContext::PHASE1.bits());
        assert_eq!(def.context_clear, Ps1xContext::PHASE1.bits());
    }
}
