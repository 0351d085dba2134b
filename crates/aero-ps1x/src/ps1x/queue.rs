//! Machine instruction queues.
//!
//! Each queue is a flat `u32` stream of tagged records so instructions already committed can be
//! patched in place (the ps.1.1 output-register rewrite). [`MachineInstruction`] is the typed view
//! used to build and walk the stream.

use std::fmt;

use crate::native;

/// Record tags.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum MachineOpcode {
    ColorOp1 = 0,
    ColorOp2 = 1,
    ColorOp3 = 2,
    AlphaOp1 = 3,
    AlphaOp2 = 4,
    AlphaOp3 = 5,
    SetConstants = 6,
    PassTexCoord = 7,
    SampleMap = 8,
}

impl MachineOpcode {
    pub fn from_u32(tag: u32) -> Option<Self> {
        Some(match tag {
            0 => Self::ColorOp1,
            1 => Self::ColorOp2,
            2 => Self::ColorOp3,
            3 => Self::AlphaOp1,
            4 => Self::AlphaOp2,
            5 => Self::AlphaOp3,
            6 => Self::SetConstants,
            7 => Self::PassTexCoord,
            8 => Self::SampleMap,
            _ => return None,
        })
    }

    /// Record length in words, tag included.
    pub fn record_len(self) -> usize {
        match self {
            Self::ColorOp1 => 8,
            Self::ColorOp2 => 11,
            Self::ColorOp3 => 14,
            Self::AlphaOp1 => 7,
            Self::AlphaOp2 => 10,
            Self::AlphaOp3 => 13,
            Self::SetConstants => 3,
            Self::PassTexCoord | Self::SampleMap => 4,
        }
    }

    pub fn is_alu_op(self) -> bool {
        !matches!(
            self,
            Self::SetConstants | Self::PassTexCoord | Self::SampleMap
        )
    }

    pub fn is_alpha_op(self) -> bool {
        matches!(self, Self::AlphaOp1 | Self::AlphaOp2 | Self::AlphaOp3)
    }
}

/// One ALU source argument.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SrcOperand {
    pub arg: u32,
    /// Channel replicate (`GL_RED` .. `GL_ALPHA`) or `GL_NONE`.
    pub rep: u32,
    pub modifier: u32,
}

/// Destination of a color op.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ColorDst {
    pub reg: u32,
    /// RGB write mask bits.
    pub mask: u32,
    pub modifier: u32,
}

/// Destination of an alpha op.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AlphaDst {
    pub reg: u32,
    pub modifier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineInstruction {
    /// 1 to 3 arguments.
    ColorOp {
        op: u32,
        dst: ColorDst,
        args: Vec<SrcOperand>,
    },
    /// 1 to 3 arguments.
    AlphaOp {
        op: u32,
        dst: AlphaDst,
        args: Vec<SrcOperand>,
    },
    /// Loads four consecutive constant-pool values starting at `constant_index` into `dst`.
    SetConstants { dst: u32, constant_index: u32 },
    PassTexCoord { dst: u32, coord: u32, swizzle: u32 },
    SampleMap { dst: u32, interp: u32, swizzle: u32 },
}

impl MachineInstruction {
    /// Record tag, or `None` for ALU ops without 1 to 3 arguments.
    pub fn opcode(&self) -> Option<MachineOpcode> {
        Some(match self {
            Self::ColorOp { args, .. } => match args.len() {
                1 => MachineOpcode::ColorOp1,
                2 => MachineOpcode::ColorOp2,
                3 => MachineOpcode::ColorOp3,
                _ => return None,
            },
            Self::AlphaOp { args, .. } => match args.len() {
                1 => MachineOpcode::AlphaOp1,
                2 => MachineOpcode::AlphaOp2,
                3 => MachineOpcode::AlphaOp3,
                _ => return None,
            },
            Self::SetConstants { .. } => MachineOpcode::SetConstants,
            Self::PassTexCoord { .. } => MachineOpcode::PassTexCoord,
            Self::SampleMap { .. } => MachineOpcode::SampleMap,
        })
    }

    /// Register (or constant) written by the instruction.
    pub fn destination(&self) -> u32 {
        match self {
            Self::ColorOp { dst, .. } => dst.reg,
            Self::AlphaOp { dst, .. } => dst.reg,
            Self::SetConstants { dst, .. }
            | Self::PassTexCoord { dst, .. }
            | Self::SampleMap { dst, .. } => *dst,
        }
    }

    fn encode(&self, tag: MachineOpcode, out: &mut Vec<u32>) {
        out.push(tag as u32);
        match self {
            Self::ColorOp { op, dst, args } => {
                out.extend([*op, dst.reg, dst.mask, dst.modifier]);
                for a in args {
                    out.extend([a.arg, a.rep, a.modifier]);
                }
            }
            Self::AlphaOp { op, dst, args } => {
                out.extend([*op, dst.reg, dst.modifier]);
                for a in args {
                    out.extend([a.arg, a.rep, a.modifier]);
                }
            }
            Self::SetConstants {
                dst,
                constant_index,
            } => out.extend([*dst, *constant_index]),
            Self::PassTexCoord {
                dst,
                coord,
                swizzle,
            } => out.extend([*dst, *coord, *swizzle]),
            Self::SampleMap {
                dst,
                interp,
                swizzle,
            } => out.extend([*dst, *interp, *swizzle]),
        }
    }

    /// Decodes one full record (tag included).
    fn decode(tag: MachineOpcode, words: &[u32]) -> Self {
        let args = |from: usize, count: usize| -> Vec<SrcOperand> {
            words[from..from + 3 * count]
                .chunks_exact(3)
                .map(|c| SrcOperand {
                    arg: c[0],
                    rep: c[1],
                    modifier: c[2],
                })
                .collect()
        };
        match tag {
            MachineOpcode::ColorOp1 | MachineOpcode::ColorOp2 | MachineOpcode::ColorOp3 => {
                Self::ColorOp {
                    op: words[1],
                    dst: ColorDst {
                        reg: words[2],
                        mask: words[3],
                        modifier: words[4],
                    },
                    args: args(5, (tag.record_len() - 5) / 3),
                }
            }
            MachineOpcode::AlphaOp1 | MachineOpcode::AlphaOp2 | MachineOpcode::AlphaOp3 => {
                Self::AlphaOp {
                    op: words[1],
                    dst: AlphaDst {
                        reg: words[2],
                        modifier: words[3],
                    },
                    args: args(4, (tag.record_len() - 4) / 3),
                }
            }
            MachineOpcode::SetConstants => Self::SetConstants {
                dst: words[1],
                constant_index: words[2],
            },
            MachineOpcode::PassTexCoord => Self::PassTexCoord {
                dst: words[1],
                coord: words[2],
                swizzle: words[3],
            },
            MachineOpcode::SampleMap => Self::SampleMap {
                dst: words[1],
                interp: words[2],
                swizzle: words[3],
            },
        }
    }
}

fn fmt_args(f: &mut fmt::Formatter<'_>, args: &[SrcOperand]) -> fmt::Result {
    for a in args {
        f.write_str(", ")?;
        if a.modifier & native::GL_NEGATE_BIT_ATI != 0 {
            f.write_str("-")?;
        }
        if a.modifier & native::GL_COMP_BIT_ATI != 0 {
            f.write_str("1-")?;
        }
        f.write_str(&native::register_name(a.arg))?;
        match a.modifier & (native::GL_BIAS_BIT_ATI | native::GL_2X_BIT_ATI) {
            0 => {}
            native::GL_BIAS_BIT_ATI => f.write_str("_bias")?,
            native::GL_2X_BIT_ATI => f.write_str("_x2")?,
            _ => f.write_str("_bx2")?,
        }
        f.write_str(native::replicate_suffix(a.rep))?;
    }
    Ok(())
}

/// Assembly-like disassembly, e.g. `color add_sat r0.rgb, r1, c0`.
impl fmt::Display for MachineInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColorOp { op, dst, args } => {
                write!(
                    f,
                    "color {}{} {}{}",
                    native::opcode_name(*op),
                    native::dst_mod_suffix(dst.modifier),
                    native::register_name(dst.reg),
                    native::mask_suffix(dst.mask),
                )?;
                fmt_args(f, args)
            }
            Self::AlphaOp { op, dst, args } => {
                write!(
                    f,
                    "alpha {}{} {}",
                    native::opcode_name(*op),
                    native::dst_mod_suffix(dst.modifier),
                    native::register_name(dst.reg),
                )?;
                fmt_args(f, args)
            }
            Self::SetConstants {
                dst,
                constant_index,
            } => write!(
                f,
                "setconst {}, pool[{constant_index}]",
                native::register_name(*dst)
            ),
            Self::PassTexCoord {
                dst,
                coord,
                swizzle,
            } => write!(
                f,
                "passtexcoord {}, {}.{}",
                native::register_name(*dst),
                native::register_name(*coord),
                native::swizzle_name(*swizzle)
            ),
            Self::SampleMap {
                dst,
                interp,
                swizzle,
            } => write!(
                f,
                "samplemap {}, {}.{}",
                native::register_name(*dst),
                native::register_name(*interp),
                native::swizzle_name(*swizzle)
            ),
        }
    }
}

/// Decoding failure while walking a queue.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordError {
    UnknownTag { offset: usize, tag: u32 },
    Truncated { offset: usize, tag: MachineOpcode },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionQueue {
    words: Vec<u32>,
}

impl InstructionQueue {
    /// Wraps an already encoded record stream.
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// Appends `inst` and returns the word offset of its record.
    ///
    /// ALU ops without 1 to 3 arguments have no record form and are dropped (`None`).
    pub fn push(&mut self, inst: &MachineInstruction) -> Option<usize> {
        let tag = inst.opcode()?;
        let offset = self.words.len();
        inst.encode(tag, &mut self.words);
        Some(offset)
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn opcode_at(&self, offset: usize) -> Option<MachineOpcode> {
        MachineOpcode::from_u32(*self.words.get(offset)?)
    }

    /// Rewrites the destination register of the ALU op recorded at `offset`.
    pub fn set_destination(&mut self, offset: usize, reg: u32) -> bool {
        if !self.opcode_at(offset).is_some_and(MachineOpcode::is_alu_op) {
            return false;
        }
        match self.words.get_mut(offset + 2) {
            Some(word) => {
                *word = reg;
                true
            }
            None => false,
        }
    }

    /// Walks the records in order. Iteration ends after the first malformed record.
    pub fn iter(&self) -> QueueIter<'_> {
        QueueIter {
            words: &self.words,
            offset: 0,
        }
    }

    /// Decodes every record, stopping silently at the first malformed one.
    pub fn instructions(&self) -> Vec<MachineInstruction> {
        self.iter().map_while(Result::ok).collect()
    }
}

pub struct QueueIter<'a> {
    words: &'a [u32],
    offset: usize,
}

impl Iterator for QueueIter<'_> {
    type Item = Result<MachineInstruction, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let &raw = self.words.get(offset)?;
        let Some(tag) = MachineOpcode::from_u32(raw) else {
            self.offset = self.words.len();
            return Some(Err(RecordError::UnknownTag { offset, tag: raw }));
        };
        let Some(record) = self.words.get(offset..offset + tag.record_len()) else {
            self.offset = self.words.len();
            return Some(Err(RecordError::Truncated { offset, tag }));
        };
        self.offset += tag.record_len();
        Some(Ok(MachineInstruction::decode(tag, record)))
    }
}

/// Hardware phase/stage a queue feeds, in binding order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Phase1Tex,
    Phase1Alu,
    Phase2Tex,
    Phase2Alu,
}

impl Phase {
    pub const BIND_ORDER: [Phase; 4] = [
        Phase::Phase1Tex,
        Phase::Phase1Alu,
        Phase::Phase2Tex,
        Phase::Phase2Alu,
    ];

    /// Hardware pass (1 or 2).
    pub fn pass(self) -> u8 {
        match self {
            Phase::Phase1Tex | Phase::Phase1Alu => 1,
            Phase::Phase2Tex | Phase::Phase2Alu => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Phase1Tex => "phase 1 texture",
            Phase::Phase1Alu => "phase 1 alu",
            Phase::Phase2Tex => "phase 2 texture",
            Phase::Phase2Alu => "phase 2 alu",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineQueues {
    pub phase1_tex: InstructionQueue,
    pub phase1_alu: InstructionQueue,
    pub phase2_tex: InstructionQueue,
    pub phase2_alu: InstructionQueue,
}

impl MachineQueues {
    pub fn get(&self, phase: Phase) -> &InstructionQueue {
        match phase {
            Phase::Phase1Tex => &self.phase1_tex,
            Phase::Phase1Alu => &self.phase1_alu,
            Phase::Phase2Tex => &self.phase2_tex,
            Phase::Phase2Alu => &self.phase2_alu,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut InstructionQueue {
        match phase {
            Phase::Phase1Tex => &mut self.phase1_tex,
            Phase::Phase1Alu => &mut self.phase1_alu,
            Phase::Phase2Tex => &mut self.phase2_tex,
            Phase::Phase2Alu => &mut self.phase2_alu,
        }
    }

    pub fn clear(&mut self) {
        for phase in Phase::BIND_ORDER {
            self.get_mut(phase).clear();
        }
    }

    /// Queues paired with their phase, in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, &InstructionQueue)> {
        Phase::BIND_ORDER.into_iter().map(|p| (p, self.get(p)))
    }
}

impl fmt::Display for MachineQueues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (phase, queue) in self.iter() {
            writeln!(f, "; {phase}")?;
            for record in queue.iter() {
                match record {
                    Ok(inst) => writeln!(f, "  {inst}")?,
                    Err(err) => writeln!(f, "  <{err:?}>")?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::*;
    use pretty_assertions::assert_eq;

    fn add_rgb() -> MachineInstruction {
        MachineInstruction::ColorOp {
            op: GL_ADD_ATI,
            dst: ColorDst {
                reg: GL_REG_0_ATI,
                mask: RGB_BITS,
                modifier: GL_SATURATE_BIT_ATI,
            },
            args: vec![
                SrcOperand {
                    arg: GL_REG_1_ATI,
                    rep: GL_NONE,
                    modifier: GL_NONE,
                },
                SrcOperand {
                    arg: GL_CON_0_ATI,
                    rep: GL_ALPHA,
                    modifier: GL_NEGATE_BIT_ATI,
                },
            ],
        }
    }

    #[test]
    fn record_layout() {
        let mut queue = InstructionQueue::default();
        assert_eq!(queue.push(&add_rgb()), Some(0));
        assert_eq!(
            queue.push(&MachineInstruction::SampleMap {
                dst: GL_REG_1_ATI,
                interp: GL_TEXTURE1_ARB,
                swizzle: GL_SWIZZLE_STR_ATI,
            }),
            Some(11)
        );
        assert_eq!(
            queue.words(),
            &[
                MachineOpcode::ColorOp2 as u32,
                GL_ADD_ATI,
                GL_REG_0_ATI,
                RGB_BITS,
                GL_SATURATE_BIT_ATI,
                GL_REG_1_ATI,
                GL_NONE,
                GL_NONE,
                GL_CON_0_ATI,
                GL_ALPHA,
                GL_NEGATE_BIT_ATI,
                MachineOpcode::SampleMap as u32,
                GL_REG_1_ATI,
                GL_TEXTURE1_ARB,
                GL_SWIZZLE_STR_ATI,
            ]
        );
        assert_eq!(queue.instructions().len(), 2);
        assert_eq!(queue.instructions()[0], add_rgb());
    }

    #[test]
    fn alu_ops_need_one_to_three_args() {
        let mut queue = InstructionQueue::default();
        let inst = MachineInstruction::AlphaOp {
            op: GL_MOV_ATI,
            dst: AlphaDst::default(),
            args: vec![],
        };
        assert_eq!(queue.push(&inst), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn malformed_records_end_iteration() {
        let mut queue = InstructionQueue::default();
        queue.push(&add_rgb());
        queue.words.push(42);
        let records: Vec<_> = queue.iter().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1],
            Err(RecordError::UnknownTag {
                offset: 11,
                tag: 42
            })
        );

        let queue = InstructionQueue {
            words: vec![MachineOpcode::PassTexCoord as u32, GL_REG_0_ATI],
        };
        assert_eq!(
            queue.iter().next(),
            Some(Err(RecordError::Truncated {
                offset: 0,
                tag: MachineOpcode::PassTexCoord
            }))
        );
    }

    #[test]
    fn every_record_kind_walks_back_in_order() {
        let src = |arg| SrcOperand {
            arg,
            rep: GL_NONE,
            modifier: GL_NONE,
        };
        let mut stream = Vec::new();
        for count in 1..=3 {
            let args: Vec<SrcOperand> = [GL_REG_1_ATI, GL_REG_2_ATI, GL_CON_1_ATI][..count]
                .iter()
                .map(|&r| src(r))
                .collect();
            stream.push(MachineInstruction::ColorOp {
                op: GL_MAD_ATI,
                dst: ColorDst {
                    reg: GL_REG_0_ATI,
                    mask: RGB_BITS,
                    modifier: GL_NONE,
                },
                args: args.clone(),
            });
            stream.push(MachineInstruction::AlphaOp {
                op: GL_LERP_ATI,
                dst: AlphaDst {
                    reg: GL_REG_3_ATI,
                    modifier: GL_SATURATE_BIT_ATI,
                },
                args,
            });
        }
        stream.push(MachineInstruction::SetConstants {
            dst: GL_CON_2_ATI,
            constant_index: 4,
        });
        stream.push(MachineInstruction::PassTexCoord {
            dst: GL_REG_4_ATI,
            coord: GL_TEXTURE2_ARB,
            swizzle: GL_SWIZZLE_STQ_ATI,
        });
        stream.push(MachineInstruction::SampleMap {
            dst: GL_REG_5_ATI,
            interp: GL_REG_4_ATI,
            swizzle: GL_SWIZZLE_STR_ATI,
        });

        let mut queue = InstructionQueue::default();
        for inst in &stream {
            let before = queue.words().len();
            let at = queue.push(inst).unwrap();
            assert_eq!(at, before);
            let tag = inst.opcode().unwrap();
            assert_eq!(queue.words().len() - before, tag.record_len(), "{tag:?}");
            assert_eq!(queue.opcode_at(at), Some(tag));
        }
        assert!(queue.iter().all(|r| r.is_ok()));
        assert_eq!(queue.instructions(), stream);
    }

    #[test]
    fn destination_rewrite() {
        let mut queue = InstructionQueue::default();
        let at = queue.push(&add_rgb()).unwrap();
        assert!(queue.set_destination(at, GL_REG_5_ATI));
        let MachineInstruction::ColorOp { dst, .. } = &queue.instructions()[0] else {
            panic!("expected color op");
        };
        assert_eq!(dst.reg, GL_REG_5_ATI);
    }

    #[test]
    fn disassembly() {
        assert_eq!(add_rgb().to_string(), "color add_sat r0.rgb, r1, -c0.a");
        let inst = MachineInstruction::PassTexCoord {
            dst: GL_REG_2_ATI,
            coord: GL_TEXTURE0_ARB,
            swizzle: GL_SWIZZLE_STQ_DQ_ATI,
        };
        assert_eq!(inst.to_string(), "passtexcoord r2, t0.stq_dq");
    }
}
