//! Expansion templates for the ps.1.1 - ps.1.3 CISC texture opcodes.
//!
//! Each template is a token sequence written against placeholder registers, together with a
//! table of register slots to patch from the CISC instruction's operands. Expansion works on a
//! copy; the shared templates are never modified.
//!
//! Legacy texture registers `t(n)` are temp registers `REG_n` on the target, so a template can
//! address the same register through the ps.1.4 `r(n)` symbols. `r4`/`r5` are scratch space for
//! the matrix ops (the legacy `r0`/`r1` are not live yet during texture addressing).

use super::symbols::{Symbol, CONST_REGS, PS11_TEX_REGS, PS14_TEMP_REGS};
use crate::compiler2pass::TokenInstruction;
use crate::error::CompileError;
use crate::native::{constant_register_ordinal, temp_register_ordinal};

use Symbol::*;

/// How a native register maps onto a template symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RegisterBank {
    /// ps.1.4 `r0` - `r5`.
    Temp,
    /// ps.1.1 `t0` - `t3`.
    LegacyTexture,
    Constant,
}

impl RegisterBank {
    fn symbol_for(self, native: u32) -> Option<Symbol> {
        match self {
            Self::Temp => temp_register_ordinal(native).map(|i| PS14_TEMP_REGS[i]),
            Self::LegacyTexture => {
                temp_register_ordinal(native).and_then(|i| PS11_TEX_REGS.get(i).copied())
            }
            Self::Constant => constant_register_ordinal(native).map(|i| CONST_REGS[i]),
        }
    }

    /// Rule a template token must be produced by to sit in a slot of this bank.
    pub(crate) fn rule(self) -> Symbol {
        match self {
            Self::Temp => TempReg,
            Self::LegacyTexture => TexRegPs11,
            Self::Constant => ConstReg,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct RegisterFixup {
    /// Token index in the template.
    pub offset: usize,
    pub bank: RegisterBank,
    /// Operand slot of the CISC instruction supplying the register.
    pub operand: usize,
}

const fn fix(offset: usize, bank: RegisterBank, operand: usize) -> RegisterFixup {
    RegisterFixup {
        offset,
        bank,
        operand,
    }
}

#[derive(Debug)]
pub(crate) struct CiscMacro {
    /// `(terminal, producing rule)` pairs.
    pub template: &'static [(Symbol, Symbol)],
    pub fixups: &'static [RegisterFixup],
    /// Destination mask slot chosen per invocation (`texm3x3pad` rows).
    pub row_mask: Option<usize>,
}

impl CiscMacro {
    /// Copies the template and patches in the operand registers.
    ///
    /// `operand` yields the native register of a CISC operand slot, if filled. `row_mask` fills the
    /// row mask slot for templates that have one.
    pub(crate) fn expand(
        &self,
        operand: impl Fn(usize) -> Option<u32>,
        row_mask: Symbol,
        line: u32,
        offset: usize,
    ) -> Result<Vec<TokenInstruction>, CompileError> {
        let mut tokens: Vec<TokenInstruction> = self
            .template
            .iter()
            .map(|&(id, rule)| TokenInstruction {
                id: id.id(),
                rule: rule.id(),
                line,
                offset,
            })
            .collect();

        for fixup in self.fixups {
            let register = operand(fixup.operand).ok_or(CompileError::MissingOperand {
                operand: fixup.operand,
                line,
                offset,
            })?;
            let symbol = fixup
                .bank
                .symbol_for(register)
                .ok_or(CompileError::MacroOperand {
                    operand: fixup.operand,
                    register,
                })?;
            if let Some(token) = tokens.get_mut(fixup.offset) {
                token.id = symbol.id();
            }
        }
        if let Some(token) = self.row_mask.and_then(|slot| tokens.get_mut(slot)) {
            token.id = row_mask.id();
        }
        Ok(tokens)
    }
}

use RegisterBank::{Constant, LegacyTexture, Temp};

#[rustfmt::skip]
const TEXREG2AR: CiscMacro = CiscMacro {
    template: &[
        // mov r(x).r, r(y).a
        (Mov, UnaryOp), (R0, TempReg), (MaskR, DstMask), (Comma, Separator), (R0, TempReg), (RepA, SrcRep),
        // mov r(x).g, r(y).r
        (Mov, UnaryOp), (R0, TempReg), (MaskG, DstMask), (Comma, Separator), (R0, TempReg), (RepR, SrcRep),
        // texld r(x), r(x)
        (Texld, TexOpPs14), (R0, TempReg), (Comma, Separator), (R0, TempReg),
    ],
    fixups: &[
        fix(1, Temp, 0), fix(7, Temp, 0), fix(13, Temp, 0), fix(15, Temp, 0),
        fix(4, Temp, 1), fix(10, Temp, 1),
    ],
    row_mask: None,
};

#[rustfmt::skip]
const TEXREG2GB: CiscMacro = CiscMacro {
    template: &[
        // mov r(x).r, r(y).g
        (Mov, UnaryOp), (R0, TempReg), (MaskR, DstMask), (Comma, Separator), (R0, TempReg), (RepG, SrcRep),
        // mov r(x).g, r(y).b
        (Mov, UnaryOp), (R0, TempReg), (MaskG, DstMask), (Comma, Separator), (R0, TempReg), (RepB, SrcRep),
        // texld r(x), r(x)
        (Texld, TexOpPs14), (R0, TempReg), (Comma, Separator), (R0, TempReg),
    ],
    fixups: &[
        fix(1, Temp, 0), fix(7, Temp, 0), fix(13, Temp, 0), fix(15, Temp, 0),
        fix(4, Temp, 1), fix(10, Temp, 1),
    ],
    row_mask: None,
};

#[rustfmt::skip]
const TEXDP3: CiscMacro = CiscMacro {
    template: &[
        // texcoord t(x)
        (Texcoord, TexOpPs11), (Ps11T0, TexRegPs11),
        // dp3 r(x), r(x), r(y)
        (Dp3, BinaryOp), (R0, TempReg), (Comma, Separator), (R0, TempReg), (Comma, Separator), (R0, TempReg),
    ],
    fixups: &[fix(1, LegacyTexture, 0), fix(3, Temp, 0), fix(5, Temp, 0), fix(7, Temp, 1)],
    row_mask: None,
};

#[rustfmt::skip]
const TEXDP3TEX: CiscMacro = CiscMacro {
    template: &[
        // texcoord t(x)
        (Texcoord, TexOpPs11), (Ps11T0, TexRegPs11),
        // dp3 r(x), r(x), r(y)
        (Dp3, BinaryOp), (R0, TempReg), (Comma, Separator), (R0, TempReg), (Comma, Separator), (R0, TempReg),
        // texld r(x), r(x)
        (Texld, TexOpPs14), (R0, TempReg), (Comma, Separator), (R0, TempReg),
    ],
    fixups: &[
        fix(1, LegacyTexture, 0), fix(3, Temp, 0), fix(5, Temp, 0), fix(7, Temp, 1),
        fix(9, Temp, 0), fix(11, Temp, 0),
    ],
    row_mask: None,
};

#[rustfmt::skip]
const TEXM3X2PAD: CiscMacro = CiscMacro {
    template: &[
        // texcoord t(x)
        (Texcoord, TexOpPs11), (Ps11T0, TexRegPs11),
        // dp3 r5.r, r(x), r(y)
        (Dp3, BinaryOp), (R5, TempReg), (MaskR, DstMask), (Comma, Separator), (R0, TempReg), (Comma, Separator), (R0, TempReg),
    ],
    fixups: &[fix(1, LegacyTexture, 0), fix(6, Temp, 0), fix(8, Temp, 1)],
    row_mask: None,
};

#[rustfmt::skip]
const TEXM3X2TEX: CiscMacro = CiscMacro {
    template: &[
        // texcoord t(x)
        (Texcoord, TexOpPs11), (Ps11T0, TexRegPs11),
        // dp3 r5.g, r(x), r(y)
        (Dp3, BinaryOp), (R5, TempReg), (MaskG, DstMask), (Comma, Separator), (R0, TempReg), (Comma, Separator), (R0, TempReg),
        // texld r(x), r5
        (Texld, TexOpPs14), (R0, TempReg), (Comma, Separator), (R5, TempReg),
    ],
    fixups: &[fix(1, LegacyTexture, 0), fix(6, Temp, 0), fix(8, Temp, 1), fix(10, Temp, 0)],
    row_mask: None,
};

#[rustfmt::skip]
const TEXM3X3PAD: CiscMacro = CiscMacro {
    template: &[
        // texcoord t(x)
        (Texcoord, TexOpPs11), (Ps11T0, TexRegPs11),
        // dp3 r5.<row>, r(x), r(y)
        (Dp3, BinaryOp), (R5, TempReg), (MaskR, DstMask), (Comma, Separator), (R0, TempReg), (Comma, Separator), (R0, TempReg),
    ],
    fixups: &[fix(1, LegacyTexture, 0), fix(6, Temp, 0), fix(8, Temp, 1)],
    row_mask: Some(4),
};

#[rustfmt::skip]
const TEXM3X3TEX: CiscMacro = CiscMacro {
    template: &[
        // texcoord t(x)
        (Texcoord, TexOpPs11), (Ps11T0, TexRegPs11),
        // dp3 r5.b, r(x), r(y)
        (Dp3, BinaryOp), (R5, TempReg), (MaskB, DstMask), (Comma, Separator), (R0, TempReg), (Comma, Separator), (R0, TempReg),
        // texld r(x), r5
        (Texld, TexOpPs14), (R0, TempReg), (Comma, Separator), (R5, TempReg),
    ],
    fixups: &[fix(1, LegacyTexture, 0), fix(6, Temp, 0), fix(8, Temp, 1), fix(10, Temp, 0)],
    row_mask: None,
};

/// `texm3x3spec t(x), t(y), c(z)`: reflects the eye vector `c(z)` about the normal assembled in
/// `r5` by the two preceding `texm3x3pad` rows plus this one, then samples with the result.
#[rustfmt::skip]
const TEXM3X3SPEC: CiscMacro = CiscMacro {
    template: &[
        // texcoord t(x)
        (Texcoord, TexOpPs11), (Ps11T0, TexRegPs11),
        // dp3 r5.b, r(x), r(y)
        (Dp3, BinaryOp), (R5, TempReg), (MaskB, DstMask), (Comma, Separator), (R0, TempReg), (Comma, Separator), (R0, TempReg),
        // dp3_x2 r4.rgb, r5, c(z)
        (Dp3, BinaryOp), (X2, DstMod), (R4, TempReg), (MaskRgb, DstMask), (Comma, Separator), (R5, TempReg), (Comma, Separator), (C0, ConstReg),
        // mul r4.rgb, r4, r5
        (Mul, BinaryOp), (R4, TempReg), (MaskRgb, DstMask), (Comma, Separator), (R4, TempReg), (Comma, Separator), (R5, TempReg),
        // dp3 r(x).rgb, r5, r5
        (Dp3, BinaryOp), (R0, TempReg), (MaskRgb, DstMask), (Comma, Separator), (R5, TempReg), (Comma, Separator), (R5, TempReg),
        // mad r5.rgb, -c(z), r(x), r4
        (Mad, TernaryOp), (R5, TempReg), (MaskRgb, DstMask), (Comma, Separator), (Negate, PreSrcMod), (C0, ConstReg),
        (Comma, Separator), (R0, TempReg), (Comma, Separator), (R4, TempReg),
        // texld r(x), r5
        (Texld, TexOpPs14), (R0, TempReg), (Comma, Separator), (R5, TempReg),
    ],
    fixups: &[
        fix(1, LegacyTexture, 0), fix(6, Temp, 0), fix(8, Temp, 1), fix(16, Constant, 2),
        fix(25, Temp, 0), fix(36, Constant, 2), fix(38, Temp, 0), fix(42, Temp, 0),
    ],
    row_mask: None,
};

/// Expansion for a CISC opcode symbol.
pub(crate) fn cisc_macro(opcode: Symbol) -> Option<&'static CiscMacro> {
    Some(match opcode {
        Texreg2ar => &TEXREG2AR,
        Texreg2gb => &TEXREG2GB,
        Texdp3 => &TEXDP3,
        Texdp3tex => &TEXDP3TEX,
        Texm3x2pad => &TEXM3X2PAD,
        Texm3x2tex => &TEXM3X2TEX,
        Texm3x3pad => &TEXM3X3PAD,
        Texm3x3tex => &TEXM3X3TEX,
        Texm3x3spec => &TEXM3X3SPEC,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::*;
    use pretty_assertions::assert_eq;

    const ALL: [Symbol; 9] = [
        Texreg2ar,
        Texreg2gb,
        Texdp3,
        Texdp3tex,
        Texm3x2pad,
        Texm3x2tex,
        Texm3x3pad,
        Texm3x3tex,
        Texm3x3spec,
    ];

    #[test]
    fn fixups_address_register_slots() {
        for opcode in ALL {
            let cisc = cisc_macro(opcode).unwrap();
            for fixup in cisc.fixups {
                let (_, rule) = cisc.template[fixup.offset];
                assert_eq!(rule, fixup.bank.rule(), "{opcode:?} slot {}", fixup.offset);
            }
            if let Some(slot) = cisc.row_mask {
                assert_eq!(cisc.template[slot].1, DstMask, "{opcode:?}");
            }
        }
    }

    #[test]
    fn expansion_patches_a_copy() {
        let operands = [GL_REG_2_ATI, GL_REG_1_ATI, GL_CON_3_ATI];
        let tokens = TEXM3X3SPEC
            .expand(|i| operands.get(i).copied(), MaskR, 7, 40)
            .unwrap();

        assert_eq!(tokens[1].id, Ps11T2.id());
        assert_eq!(tokens[6].id, R2.id());
        assert_eq!(tokens[8].id, R1.id());
        assert_eq!(tokens[16].id, C3.id());
        assert_eq!(tokens[36].id, C3.id());
        assert_eq!(tokens[42].id, R2.id());
        assert!(tokens.iter().all(|t| t.line == 7 && t.offset == 40));

        // The shared template still holds its placeholders.
        assert_eq!(TEXM3X3SPEC.template[6].0, R0);
        assert_eq!(TEXM3X3SPEC.template[16].0, C0);
    }

    #[test]
    fn row_mask_slot() {
        let operands = [GL_REG_1_ATI, GL_REG_0_ATI];
        let tokens = TEXM3X3PAD
            .expand(|i| operands.get(i).copied(), MaskG, 1, 0)
            .unwrap();
        assert_eq!(tokens[4].id, MaskG.id());
    }

    #[test]
    fn operand_errors() {
        let err = TEXREG2AR.expand(|_| None, MaskR, 3, 9).unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingOperand {
                operand: 0,
                line: 3,
                offset: 9
            }
        );

        // t4 does not exist in the legacy dialect.
        let operands = [GL_REG_4_ATI, GL_REG_0_ATI];
        let err = TEXDP3
            .expand(|i| operands.get(i).copied(), MaskR, 1, 0)
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::MacroOperand {
                operand: 0,
                register: GL_REG_4_ATI
            }
        );
    }
}
