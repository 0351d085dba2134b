//! The ps.1.x rule table.
//!
//! ```text
//! Program      ::= ProgramType [Constants] [TexBlock] [AluBlock] [PhaseTwo]
//! PhaseTwo     ::= PhaseMarker [TexBlock] [AluBlock]
//! DefStmt      ::= "def" ConstReg "," Value "," Value "," Value "," Value
//! TexStatement ::= TexStmtPs14 | TexCiscStmt | TexSpecStmt | TexStmtPs11
//! AluStatement ::= ["+"] (UnaryStmt | BinaryStmt | TernaryStmt)
//! DestInfo     ::= [DstMod] [DstSat] TempReg [DstMask]
//! SrcArg       ::= [PreSrcMod] SrcReg [PostSrcMod] [SrcRep]
//! ```
//!
//! Every terminal is wrapped in a small non-terminal naming its role (opcode, register, mask,
//! ...), so Pass 2 can classify tokens by their producing rule alone. Alternatives sharing a
//! prefix list the longest literal first.

use std::sync::{Arc, OnceLock};

use tracing::error;

use super::symbols::{symbol_defs, Ps1xContext, Symbol};
use crate::compiler2pass::rules::{RuleStep, RuleTable};
use crate::error::GrammarError;

use Symbol::*;

const fn rule(s: Symbol) -> RuleStep {
    RuleStep::rule(s.id())
}

const fn is(s: Symbol) -> RuleStep {
    RuleStep::is(s.id())
}

const fn is_text(s: Symbol, text: &'static str) -> RuleStep {
    RuleStep::is_text(s.id(), text)
}

const fn or(s: Symbol) -> RuleStep {
    RuleStep::or(s.id())
}

const fn or_text(s: Symbol, text: &'static str) -> RuleStep {
    RuleStep::or_text(s.id(), text)
}

const fn opt(s: Symbol) -> RuleStep {
    RuleStep::optional(s.id())
}

const fn repeat(s: Symbol) -> RuleStep {
    RuleStep::repeat(s.id())
}

const fn end() -> RuleStep {
    RuleStep::end()
}

#[rustfmt::skip]
const RULES: &[RuleStep] = &[
    rule(Program), is(ProgramType), opt(Constants), opt(TexBlock), opt(AluBlock), opt(PhaseTwo), end(),

    rule(ProgramType),
        is_text(Ps14, "ps.1.4"), or_text(Ps11, "ps.1.1"), or_text(Ps12, "ps.1.2"), or_text(Ps13, "ps.1.3"),
    end(),

    // Constant definitions.
    rule(Constants), repeat(DefStmt), end(),
    rule(DefStmt),
        is(DefOp), is(ConstReg),
        is(Separator), is(NumVal), is(Separator), is(NumVal),
        is(Separator), is(NumVal), is(Separator), is(NumVal),
    end(),
    rule(DefOp), is_text(Def, "def"), end(),
    rule(NumVal), is(Value), end(),
    rule(Separator), is_text(Comma, ","), end(),

    // ps.1.4 second phase.
    rule(PhaseTwo), is(PhaseMarker), opt(TexBlock), opt(AluBlock), end(),
    rule(PhaseMarker), is_text(Phase, "phase"), end(),

    // Texture addressing.
    rule(TexBlock), repeat(TexStatement), end(),
    rule(TexStatement), is(TexStmtPs14), or(TexCiscStmt), or(TexSpecStmt), or(TexStmtPs11), end(),

    rule(TexStmtPs14),
        is(TexOpPs14), is(TempReg), opt(DstMask), is(Separator), is(TexSource), opt(TexSwizzle),
    end(),
    rule(TexOpPs14), is_text(Texcrd, "texcrd"), or_text(Texld, "texld"), end(),
    rule(TexSource), is(TexCoordReg), or(TempReg), end(),
    rule(TexCoordReg),
        is_text(T0, "t0"), or_text(T1, "t1"), or_text(T2, "t2"),
        or_text(T3, "t3"), or_text(T4, "t4"), or_text(T5, "t5"),
    end(),
    rule(TexSwizzle),
        is_text(SwizzleStrq, ".xyzw"), or_text(SwizzleStrq, ".rgba"),
        or_text(SwizzleStr, ".xyz"), or_text(SwizzleStr, ".rgb"),
        or_text(SwizzleStq, ".xyw"), or_text(SwizzleStq, ".rga"),
        or_text(SwizzleStrDr, "_dz"), or_text(SwizzleStrDr, "_db"),
        or_text(SwizzleStqDq, "_dw"), or_text(SwizzleStqDq, "_da"),
    end(),

    rule(TexStmtPs11), is(TexOpPs11), is(TexRegPs11), end(),
    rule(TexOpPs11), is_text(Texcoord, "texcoord"), or_text(Tex, "tex"), end(),
    rule(TexRegPs11),
        is_text(Ps11T0, "t0"), or_text(Ps11T1, "t1"), or_text(Ps11T2, "t2"), or_text(Ps11T3, "t3"),
    end(),

    rule(TexCiscStmt), is(TexCiscOp), is(TexRegPs11), is(Separator), is(TexRegPs11), end(),
    rule(TexCiscOp),
        is_text(Texreg2ar, "texreg2ar"), or_text(Texreg2gb, "texreg2gb"),
        or_text(Texdp3tex, "texdp3tex"), or_text(Texdp3, "texdp3"),
        or_text(Texm3x2pad, "texm3x2pad"), or_text(Texm3x2tex, "texm3x2tex"),
        or_text(Texm3x3pad, "texm3x3pad"), or_text(Texm3x3tex, "texm3x3tex"),
    end(),
    rule(TexSpecStmt),
        is(TexSpecOp), is(TexRegPs11), is(Separator), is(TexRegPs11), is(Separator), is(ConstReg),
    end(),
    rule(TexSpecOp), is_text(Texm3x3spec, "texm3x3spec"), end(),

    // Arithmetic.
    rule(AluBlock), repeat(AluStatement), end(),
    rule(AluStatement), opt(CoIssueMark), is(AluOp), end(),
    rule(CoIssueMark), is_text(CoIssue, "+"), end(),
    rule(AluOp), is(UnaryStmt), or(BinaryStmt), or(TernaryStmt), end(),

    rule(UnaryStmt), is(UnaryOp), is(DestInfo), is(Separator), is(SrcArg), end(),
    rule(UnaryOp), is_text(Mov, "mov"), end(),

    rule(BinaryStmt),
        is(BinaryOp), is(DestInfo), is(Separator), is(SrcArg), is(Separator), is(SrcArg),
    end(),
    rule(BinaryOp),
        is_text(Add, "add"), or_text(Sub, "sub"), or_text(Mul, "mul"),
        or_text(Dp3, "dp3"), or_text(Dp4, "dp4"),
    end(),

    rule(TernaryStmt),
        is(TernaryOp), is(DestInfo),
        is(Separator), is(SrcArg), is(Separator), is(SrcArg), is(Separator), is(SrcArg),
    end(),
    rule(TernaryOp),
        is_text(Mad, "mad"), or_text(Lrp, "lrp"), or_text(Cnd, "cnd"),
        or_text(Cmp, "cmp"), or_text(Dp2Add, "dp2add"),
    end(),

    rule(DestInfo), opt(DstMod), opt(DstSat), is(TempReg), opt(DstMask), end(),
    rule(DstMod),
        is_text(X2, "_x2"), or_text(X4, "_x4"), or_text(X8, "_x8"),
        or_text(D2, "_d2"), or_text(D4, "_d4"), or_text(D8, "_d8"),
    end(),
    rule(DstSat), is_text(Sat, "_sat"), end(),
    rule(DstMask),
        is_text(MaskRgba, ".rgba"), or_text(MaskRgba, ".xyzw"),
        or_text(MaskRgb, ".rgb"), or_text(MaskRgb, ".xyz"),
        or_text(MaskRga, ".rga"), or_text(MaskRga, ".xyw"),
        or_text(MaskRba, ".rba"), or_text(MaskRba, ".xzw"),
        or_text(MaskGba, ".gba"), or_text(MaskGba, ".yzw"),
        or_text(MaskRg, ".rg"), or_text(MaskRg, ".xy"),
        or_text(MaskRb, ".rb"), or_text(MaskRb, ".xz"),
        or_text(MaskRa, ".ra"), or_text(MaskRa, ".xw"),
        or_text(MaskGb, ".gb"), or_text(MaskGb, ".yz"),
        or_text(MaskGa, ".ga"), or_text(MaskGa, ".yw"),
        or_text(MaskBa, ".ba"), or_text(MaskBa, ".zw"),
        or_text(MaskR, ".r"), or_text(MaskR, ".x"),
        or_text(MaskG, ".g"), or_text(MaskG, ".y"),
        or_text(MaskB, ".b"), or_text(MaskB, ".z"),
        or_text(MaskA, ".a"), or_text(MaskA, ".w"),
    end(),

    rule(SrcArg), opt(PreSrcMod), is(SrcReg), opt(PostSrcMod), opt(SrcRep), end(),
    rule(PreSrcMod), is_text(Invert, "1-"), or_text(Negate, "-"), end(),
    rule(SrcReg), is(TempReg), or(ConstReg), or(ColorReg), end(),
    rule(PostSrcMod), is_text(Bx2, "_bx2"), or_text(Bias, "_bias"), or_text(SrcX2, "_x2"), end(),
    rule(SrcRep),
        is_text(RepR, ".r"), or_text(RepR, ".x"), or_text(RepG, ".g"), or_text(RepG, ".y"),
        or_text(RepB, ".b"), or_text(RepB, ".z"), or_text(RepA, ".a"), or_text(RepA, ".w"),
    end(),

    // Registers. Dialect gating on the symbols keeps ps.1.4 and ps.1.1 spellings apart.
    rule(TempReg),
        is_text(R0, "r0"), or_text(R1, "r1"), or_text(R2, "r2"),
        or_text(R3, "r3"), or_text(R4, "r4"), or_text(R5, "r5"),
        or_text(Ps11R0, "r0"), or_text(Ps11R1, "r1"),
        or(Ps11T0), or(Ps11T1), or(Ps11T2), or(Ps11T3),
    end(),
    rule(ConstReg),
        is_text(C0, "c0"), or_text(C1, "c1"), or_text(C2, "c2"), or_text(C3, "c3"),
        or_text(C4, "c4"), or_text(C5, "c5"), or_text(C6, "c6"), or_text(C7, "c7"),
    end(),
    rule(ColorReg), is_text(V0, "v0"), or_text(V1, "v1"), end(),
];

/// The shared ps.1.x rule table, cross-linked on first use.
pub fn grammar() -> Result<Arc<RuleTable>, GrammarError> {
    static GRAMMAR: OnceLock<Result<Arc<RuleTable>, GrammarError>> = OnceLock::new();
    GRAMMAR
        .get_or_init(|| {
            let table = RuleTable::new(
                &symbol_defs(),
                RULES,
                Value.id(),
                Ps1xContext::BASE.bits(),
            )
            .map(Arc::new);
            if let Err(err) = &table {
                error!(%err, "ps.1.x rule table is malformed");
            }
            table
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_table_cross_links() {
        let table = grammar().unwrap();
        assert_eq!(table.symbol(Program.id()).unwrap().rule_index, Some(0));
        assert!(table.symbol(TempReg.id()).unwrap().rule_index.is_some());
        assert!(table.symbol(R0.id()).unwrap().rule_index.is_none());
        assert_eq!(table.default_text(Ps11T2.id()), Some("t2"));
        assert_eq!(table.default_text(MaskRgb.id()), Some(".rgb"));
        assert_eq!(table.value_symbol(), Value.id());
    }

    #[test]
    fn grammar_is_shared() {
        assert!(Arc::ptr_eq(&grammar().unwrap(), &grammar().unwrap()));
    }
}
