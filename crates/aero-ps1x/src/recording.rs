//! A [`FragmentShaderApi`] that records calls instead of driving hardware.
//!
//! Used to inspect what a compiled program would issue (the dump tool prints the recording) and
//! by tests, which can also inject an API error at a chosen call.

use std::fmt;

use crate::binder::FragmentShaderApi;
use crate::native;
use crate::ps1x::{AlphaDst, ColorDst, SrcOperand};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Create(u32),
    Bind(u32),
    Unbind,
    Begin,
    End,
    Destroy(u32),
    ColorOp {
        op: u32,
        dst: ColorDst,
        args: Vec<SrcOperand>,
    },
    AlphaOp {
        op: u32,
        dst: AlphaDst,
        args: Vec<SrcOperand>,
    },
    SetConstant {
        dst: u32,
        value: [f32; 4],
    },
    PassTexCoord {
        dst: u32,
        coord: u32,
        swizzle: u32,
    },
    SampleMap {
        dst: u32,
        interp: u32,
        swizzle: u32,
    },
}

impl fmt::Display for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiCall::Create(id) => write!(f, "create -> {id}"),
            ApiCall::Bind(id) => write!(f, "bind {id}"),
            ApiCall::Unbind => f.write_str("unbind"),
            ApiCall::Begin => f.write_str("begin"),
            ApiCall::End => f.write_str("end"),
            ApiCall::Destroy(id) => write!(f, "destroy {id}"),
            ApiCall::ColorOp { op, dst, args } => write!(
                f,
                "color_op{}({}, {}, {:#x}, {:#x}{})",
                args.len(),
                native::opcode_name(*op),
                native::register_name(dst.reg),
                dst.mask,
                dst.modifier,
                ArgList(args)
            ),
            ApiCall::AlphaOp { op, dst, args } => write!(
                f,
                "alpha_op{}({}, {}, {:#x}{})",
                args.len(),
                native::opcode_name(*op),
                native::register_name(dst.reg),
                dst.modifier,
                ArgList(args)
            ),
            ApiCall::SetConstant { dst, value } => {
                write!(f, "set_constant({}, {value:?})", native::register_name(*dst))
            }
            ApiCall::PassTexCoord {
                dst,
                coord,
                swizzle,
            } => write!(
                f,
                "pass_tex_coord({}, {}, {})",
                native::register_name(*dst),
                native::register_name(*coord),
                native::swizzle_name(*swizzle)
            ),
            ApiCall::SampleMap {
                dst,
                interp,
                swizzle,
            } => write!(
                f,
                "sample_map({}, {}, {})",
                native::register_name(*dst),
                native::register_name(*interp),
                native::swizzle_name(*swizzle)
            ),
        }
    }
}

struct ArgList<'a>(&'a [SrcOperand]);

impl fmt::Display for ArgList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for a in self.0 {
            write!(
                f,
                ", {}, {:#x}, {:#x}",
                native::register_name(a.arg),
                a.rep,
                a.modifier
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingApi {
    pub calls: Vec<ApiCall>,
    /// Raise an error right after the call at this index in [`Self::calls`] is recorded.
    pub fail_at: Option<usize>,
    error_pending: bool,
    next_program: u32,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    fn record(&mut self, call: ApiCall) {
        if self.fail_at == Some(self.calls.len()) {
            self.error_pending = true;
        }
        self.calls.push(call);
    }
}

impl FragmentShaderApi for RecordingApi {
    fn create(&mut self) -> u32 {
        self.next_program += 1;
        let id = self.next_program;
        self.record(ApiCall::Create(id));
        id
    }

    fn bind(&mut self, program: u32) {
        self.record(ApiCall::Bind(program));
    }

    fn unbind(&mut self) {
        self.record(ApiCall::Unbind);
    }

    fn begin(&mut self) {
        self.record(ApiCall::Begin);
    }

    fn end(&mut self) {
        self.record(ApiCall::End);
    }

    fn destroy(&mut self, program: u32) {
        self.record(ApiCall::Destroy(program));
    }

    fn color_op1(&mut self, op: u32, dst: ColorDst, arg1: SrcOperand) {
        self.record(ApiCall::ColorOp {
            op,
            dst,
            args: vec![arg1],
        });
    }

    fn color_op2(&mut self, op: u32, dst: ColorDst, arg1: SrcOperand, arg2: SrcOperand) {
        self.record(ApiCall::ColorOp {
            op,
            dst,
            args: vec![arg1, arg2],
        });
    }

    fn color_op3(
        &mut self,
        op: u32,
        dst: ColorDst,
        arg1: SrcOperand,
        arg2: SrcOperand,
        arg3: SrcOperand,
    ) {
        self.record(ApiCall::ColorOp {
            op,
            dst,
            args: vec![arg1, arg2, arg3],
        });
    }

    fn alpha_op1(&mut self, op: u32, dst: AlphaDst, arg1: SrcOperand) {
        self.record(ApiCall::AlphaOp {
            op,
            dst,
            args: vec![arg1],
        });
    }

    fn alpha_op2(&mut self, op: u32, dst: AlphaDst, arg1: SrcOperand, arg2: SrcOperand) {
        self.record(ApiCall::AlphaOp {
            op,
            dst,
            args: vec![arg1, arg2],
        });
    }

    fn alpha_op3(
        &mut self,
        op: u32,
        dst: AlphaDst,
        arg1: SrcOperand,
        arg2: SrcOperand,
        arg3: SrcOperand,
    ) {
        self.record(ApiCall::AlphaOp {
            op,
            dst,
            args: vec![arg1, arg2, arg3],
        });
    }

    fn set_constant(&mut self, dst: u32, value: &[f32; 4]) {
        self.record(ApiCall::SetConstant { dst, value: *value });
    }

    fn pass_tex_coord(&mut self, dst: u32, coord: u32, swizzle: u32) {
        self.record(ApiCall::PassTexCoord {
            dst,
            coord,
            swizzle,
        });
    }

    fn sample_map(&mut self, dst: u32, interp: u32, swizzle: u32) {
        self.record(ApiCall::SampleMap {
            dst,
            interp,
            swizzle,
        });
    }

    fn poll_error(&mut self) -> bool {
        std::mem::take(&mut self.error_pending)
    }
}
