//! Pass 2: turns the Pass-1 token list into machine instruction queues.
//!
//! Tokens are classified by the rule that produced them. An opcode token starts a new pending
//! instruction after building the previous one; operand tokens fill the pending operand slots.
//!
//! The target runs a program as up to two passes, each a texture stage followed by an ALU stage.
//! A temp register written in pass 1 is not visible in pass 2 unless it is routed through the pass-2
//! texture stage, so reads in the pass-2 ALU stage are checked against the pass the register was
//! written in.

use tracing::{debug, trace};

use super::macros::{cisc_macro, CiscMacro};
use super::queue::{
    AlphaDst, ColorDst, MachineInstruction, MachineOpcode, MachineQueues, Phase, SrcOperand,
};
use super::symbols::{Ps1xContext, Symbol};
use crate::compiler2pass::rules::{RuleTable, SymbolId};
use crate::compiler2pass::{Pass1Output, Pass2, TokenInstruction};
use crate::error::CompileError;
use crate::limits::{MAX_OP_PARAMS, TEMP_REGISTER_COUNT};
use crate::native::{
    temp_register_ordinal, ALPHA_BIT, GL_NONE, GL_REG_0_ATI, GL_SWIZZLE_STR_ATI, RGBA_BITS,
    RGB_BITS, TEXTURE_UNITS,
};

/// How Pass 2 treats a token, keyed by its producing rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Role {
    Opcode,
    Separator,
    Register,
    MaskOrReplicate,
    Modifier,
    Value,
    Ignore,
}

fn role(rule: Symbol) -> Option<Role> {
    use Symbol::*;

    Some(match rule {
        DefOp | PhaseMarker | TexOpPs14 | TexOpPs11 | TexCiscOp | TexSpecOp | UnaryOp
        | BinaryOp | TernaryOp => Role::Opcode,
        Separator => Role::Separator,
        TempReg | TexCoordReg | TexRegPs11 | ConstReg | ColorReg => Role::Register,
        DstMask | SrcRep | TexSwizzle => Role::MaskOrReplicate,
        DstMod | DstSat | PreSrcMod | PostSrcMod => Role::Modifier,
        NumVal => Role::Value,
        ProgramType | CoIssueMark => Role::Ignore,
        _ => return None,
    })
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct OpParam {
    arg: u32,
    filled: bool,
    mask_rep: u32,
    modifier: u32,
}

#[derive(Debug, Clone, Default)]
struct PendingInstruction {
    opcode: Option<Symbol>,
    rule: SymbolId,
    native: u32,
    /// Index of the operand slot being filled; equals the number of separators seen.
    arg_count: usize,
    params: [OpParam; MAX_OP_PARAMS],
    /// Constant pool entries recognised before this instruction.
    constant_index: usize,
    line: u32,
    offset: usize,
}

impl PendingInstruction {
    fn operand(&self, index: usize) -> Result<OpParam, CompileError> {
        self.params
            .get(index)
            .copied()
            .filter(|p| p.filled)
            .ok_or(CompileError::MissingOperand {
                operand: index,
                line: self.line,
                offset: self.offset,
            })
    }

    fn expect_sources(&self, range: std::ops::RangeInclusive<usize>) -> Result<(), CompileError> {
        if !range.contains(&self.arg_count) {
            return Err(CompileError::BadOperandCount {
                count: self.arg_count,
                line: self.line,
                offset: self.offset,
            });
        }
        (0..=self.arg_count).try_for_each(|i| self.operand(i).map(drop))
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct RegisterUsage {
    phase1_write: bool,
    phase2_write: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InstructionBuilder {
    queues: MachineQueues,
    register_usage: [RegisterUsage; TEMP_REGISTER_COUNT],
    pending: PendingInstruction,
    phase_marker_found: bool,
    macro_active: bool,
    /// ps.1.1 - ps.1.3 program.
    legacy: bool,
    constants_seen: usize,
    constant_pool_len: usize,
    texm3x3pad_count: u8,
    last_alu: Option<usize>,
    second_last_alu: Option<usize>,
}

impl InstructionBuilder {
    pub fn queues(&self) -> &MachineQueues {
        &self.queues
    }

    pub fn phase_marker_found(&self) -> bool {
        self.phase_marker_found
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn scan(&mut self, rules: &RuleTable, tokens: &[TokenInstruction]) -> Result<(), CompileError> {
        for token in tokens {
            self.process_token(rules, token)?;
        }
        self.flush(rules)
    }

    /// Builds the pending instruction, if any.
    fn flush(&mut self, rules: &RuleTable) -> Result<(), CompileError> {
        if self.pending.opcode.is_some() {
            self.build_machine_instruction(rules)?;
        }
        if self.pending.opcode.is_some() {
            return Err(CompileError::PipeNotCleared {
                line: self.pending.line,
                offset: self.pending.offset,
            });
        }
        Ok(())
    }

    fn process_token(
        &mut self,
        rules: &RuleTable,
        token: &TokenInstruction,
    ) -> Result<(), CompileError> {
        let unexpected = CompileError::UnexpectedToken {
            id: token.id,
            rule: token.rule,
            line: token.line,
            offset: token.offset,
        };
        let (Some(symbol), Some(rule)) = (Symbol::from_id(token.id), Symbol::from_id(token.rule))
        else {
            return Err(unexpected);
        };
        let native = rules.native(token.id);
        let slot = self.pending.arg_count;

        match role(rule).ok_or(unexpected)? {
            Role::Opcode => {
                self.flush(rules)?;
                self.pending = PendingInstruction {
                    opcode: Some(symbol),
                    rule: token.rule,
                    native,
                    constant_index: self.constants_seen,
                    line: token.line,
                    offset: token.offset,
                    ..Default::default()
                };
            }
            Role::Separator => {
                if slot + 1 >= MAX_OP_PARAMS {
                    return Err(CompileError::OperandOverflow {
                        line: token.line,
                        offset: token.offset,
                    });
                }
                self.pending.arg_count = slot + 1;
            }
            Role::Register => {
                let param = &mut self.pending.params[slot];
                param.arg = native;
                param.filled = true;
            }
            Role::MaskOrReplicate => self.pending.params[slot].mask_rep = native,
            Role::Modifier => self.pending.params[slot].modifier |= native,
            Role::Value => self.constants_seen += 1,
            Role::Ignore => {}
        }
        Ok(())
    }

    fn build_machine_instruction(&mut self, rules: &RuleTable) -> Result<(), CompileError> {
        use Symbol::*;

        let inst = std::mem::take(&mut self.pending);
        let Some(opcode) = inst.opcode else {
            return Ok(());
        };

        match opcode {
            Add | Sub | Mul | Mad | Lrp | Mov | Cmp | Cnd | Dp2Add | Dp3 | Dp4 => {
                self.build_alu(&inst)
            }
            Texcrd | Texld => self.build_texture_op(&inst, opcode),
            Tex | Texcoord => self.build_legacy_texture_op(&inst, opcode),
            Def => self.build_set_constants(&inst),
            Symbol::Phase => {
                self.phase_marker_found = true;
                Ok(())
            }
            _ => match cisc_macro(opcode) {
                Some(cisc) => self.expand_macro(rules, cisc, &inst, opcode),
                None => Err(CompileError::UnexpectedToken {
                    id: opcode.id(),
                    rule: inst.rule,
                    line: inst.line,
                    offset: inst.offset,
                }),
            },
        }
    }

    fn build_alu(&mut self, inst: &PendingInstruction) -> Result<(), CompileError> {
        inst.expect_sources(1..=3)?;

        let phase = if (self.legacy && !self.macro_active) || self.phase_marker_found {
            Phase::Phase2Alu
        } else {
            Phase::Phase1Alu
        };

        let dst = inst.params[0];
        let mask = match dst.mask_rep {
            GL_NONE => RGBA_BITS,
            mask => mask,
        };
        let args: Vec<SrcOperand> = inst.params[1..=inst.arg_count]
            .iter()
            .map(|p| SrcOperand {
                arg: p.arg,
                rep: p.mask_rep,
                modifier: p.modifier,
            })
            .collect();

        if mask & RGB_BITS != 0 {
            let color = MachineInstruction::ColorOp {
                op: inst.native,
                dst: ColorDst {
                    reg: dst.arg,
                    mask: mask & RGB_BITS,
                    modifier: dst.modifier,
                },
                args: args.clone(),
            };
            self.commit(phase, &color, inst)?;
        }
        if mask & ALPHA_BIT != 0 {
            let alpha = MachineInstruction::AlphaOp {
                op: inst.native,
                dst: AlphaDst {
                    reg: dst.arg,
                    modifier: dst.modifier,
                },
                args,
            };
            self.commit(phase, &alpha, inst)?;
        }
        Ok(())
    }

    /// ps.1.4 `texcrd` / `texld`.
    fn build_texture_op(
        &mut self,
        inst: &PendingInstruction,
        opcode: Symbol,
    ) -> Result<(), CompileError> {
        inst.expect_sources(1..=1)?;
        let dst = inst.params[0].arg;
        let src = inst.params[1];
        let swizzle = match src.mask_rep {
            GL_NONE => GL_SWIZZLE_STR_ATI,
            swizzle => swizzle,
        };

        // Sampling from a temp register is a dependent read and needs the second pass.
        let dependent_read = opcode == Symbol::Texld && temp_register_ordinal(src.arg).is_some();
        let phase = if self.phase_marker_found || dependent_read {
            Phase::Phase2Tex
        } else {
            Phase::Phase1Tex
        };

        let mi = if opcode == Symbol::Texcrd {
            MachineInstruction::PassTexCoord {
                dst,
                coord: src.arg,
                swizzle,
            }
        } else {
            MachineInstruction::SampleMap {
                dst,
                interp: src.arg,
                swizzle,
            }
        };
        self.commit(phase, &mi, inst)
    }

    /// ps.1.1 - ps.1.3 `tex` / `texcoord`: the interpolator is implied by the destination.
    fn build_legacy_texture_op(
        &mut self,
        inst: &PendingInstruction,
        opcode: Symbol,
    ) -> Result<(), CompileError> {
        let dst = inst.operand(0)?.arg;
        let interp = temp_register_ordinal(dst)
            .and_then(|i| TEXTURE_UNITS.get(i).copied())
            .ok_or(CompileError::MissingOperand {
                operand: 0,
                line: inst.line,
                offset: inst.offset,
            })?;

        let mi = if opcode == Symbol::Texcoord {
            MachineInstruction::PassTexCoord {
                dst,
                coord: interp,
                swizzle: GL_SWIZZLE_STR_ATI,
            }
        } else {
            MachineInstruction::SampleMap {
                dst,
                interp,
                swizzle: GL_SWIZZLE_STR_ATI,
            }
        };
        self.commit(Phase::Phase1Tex, &mi, inst)
    }

    fn build_set_constants(&mut self, inst: &PendingInstruction) -> Result<(), CompileError> {
        let dst = inst.operand(0)?.arg;
        let index = inst.constant_index;
        if index + 4 > self.constant_pool_len {
            return Err(CompileError::MissingConstants {
                index,
                available: self.constant_pool_len,
            });
        }
        let mi = MachineInstruction::SetConstants {
            dst,
            constant_index: index as u32,
        };
        self.commit(Phase::Phase1Tex, &mi, inst)
    }

    fn expand_macro(
        &mut self,
        rules: &RuleTable,
        cisc: &CiscMacro,
        inst: &PendingInstruction,
        opcode: Symbol,
    ) -> Result<(), CompileError> {
        let row_mask = if opcode == Symbol::Texm3x3pad {
            let row = if self.texm3x3pad_count == 0 {
                Symbol::MaskR
            } else {
                Symbol::MaskG
            };
            self.texm3x3pad_count ^= 1;
            row
        } else {
            Symbol::MaskR
        };

        let tokens = cisc.expand(
            |i| inst.operand(i).ok().map(|p| p.arg),
            row_mask,
            inst.line,
            inst.offset,
        )?;
        trace!(opcode = opcode.name(), tokens = tokens.len(), "expanding macro");

        let outer = self.macro_active;
        self.macro_active = true;
        let result = self.scan(rules, &tokens);
        self.macro_active = outer;
        result
    }

    /// Appends `mi` to the queue for `phase` and records its destination write.
    fn commit(
        &mut self,
        phase: Phase,
        mi: &MachineInstruction,
        inst: &PendingInstruction,
    ) -> Result<(), CompileError> {
        if phase == Phase::Phase2Alu {
            if let MachineInstruction::ColorOp { args, .. } | MachineInstruction::AlphaOp { args, .. } =
                mi
            {
                for arg in args {
                    self.check_register_read(arg.arg, inst)?;
                }
            }
        }

        let offset = self
            .queues
            .get_mut(phase)
            .push(mi)
            .ok_or(CompileError::BadOperandCount {
                count: inst.arg_count,
                line: inst.line,
                offset: inst.offset,
            })?;
        if phase == Phase::Phase2Alu {
            self.second_last_alu = self.last_alu;
            self.last_alu = Some(offset);
        }
        self.update_register_write_state(phase, mi.destination());
        trace!(%phase, %mi, "commit");
        Ok(())
    }

    /// Validates a pass-2 ALU read of `register`, routing pass-1 results into pass 2 as needed.
    fn check_register_read(
        &mut self,
        register: u32,
        inst: &PendingInstruction,
    ) -> Result<(), CompileError> {
        let Some(index) = temp_register_ordinal(register) else {
            return Ok(());
        };
        let usage = self.register_usage[index];
        if usage.phase2_write {
            return Ok(());
        }
        if !usage.phase1_write {
            return Err(CompileError::UndefinedRegisterRead {
                register,
                line: inst.line,
                offset: inst.offset,
            });
        }

        // Without pass-1 ALU work the program runs as a single pass and needs no routing.
        if !self.queues.phase1_alu.is_empty() {
            self.queues
                .phase2_tex
                .push(&MachineInstruction::PassTexCoord {
                    dst: register,
                    coord: register,
                    swizzle: GL_SWIZZLE_STR_ATI,
                });
            self.register_usage[index].phase2_write = true;
            trace!(register, "routing pass 1 register into pass 2");
        }
        Ok(())
    }

    fn update_register_write_state(&mut self, phase: Phase, register: u32) {
        let Some(index) = temp_register_ordinal(register) else {
            return;
        };
        let usage = &mut self.register_usage[index];
        match phase.pass() {
            1 => usage.phase1_write = true,
            _ => usage.phase2_write = true,
        }
    }

    /// Legacy programs write their result to `r0` (`REG_4` on the target) but the target reads the
    /// final color from `REG_0`, so the last instruction (both halves of a split op) is retargeted.
    fn optimize(&mut self) {
        let Some(last) = self.last_alu else {
            return;
        };
        let queue = &mut self.queues.phase2_alu;
        queue.set_destination(last, GL_REG_0_ATI);
        if queue.opcode_at(last).is_some_and(MachineOpcode::is_alpha_op) {
            if let Some(second) = self.second_last_alu {
                queue.set_destination(second, GL_REG_0_ATI);
            }
        }
    }
}

impl Pass2 for InstructionBuilder {
    fn do_pass2(&mut self, pass1: &Pass1Output<'_>) -> Result<(), CompileError> {
        self.reset();
        self.legacy = pass1.active_contexts & Ps1xContext::PS_1_1.bits() != 0;
        self.constant_pool_len = pass1.constants.len();

        self.scan(pass1.rules, pass1.tokens)?;
        if self.legacy {
            self.optimize();
        }

        debug!(
            legacy = self.legacy,
            phase1_tex = self.queues.phase1_tex.words().len(),
            phase1_alu = self.queues.phase1_alu.words().len(),
            phase2_tex = self.queues.phase2_tex.words().len(),
            phase2_alu = self.queues.phase2_alu.words().len(),
            "pass 2 complete"
        );
        Ok(())
    }
}
