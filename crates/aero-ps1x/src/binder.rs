//! Hands compiled machine instructions to the fragment shader API.

use tracing::{trace, warn};

use crate::error::BindError;
use crate::ps1x::{AlphaDst, ColorDst, MachineInstruction, MachineQueues, SrcOperand};

/// The ATI_fragment_shader style binding surface.
///
/// Instruction calls are only valid between [`begin`](Self::begin) and [`end`](Self::end) with a
/// program bound. Native codes are passed through exactly as the compiler produced them.
pub trait FragmentShaderApi {
    /// Allocates a program handle.
    fn create(&mut self) -> u32;
    /// Makes `program` current and enables fragment shading.
    fn bind(&mut self, program: u32);
    /// Disables fragment shading.
    fn unbind(&mut self);
    fn begin(&mut self);
    fn end(&mut self);
    fn destroy(&mut self, program: u32);

    fn color_op1(&mut self, op: u32, dst: ColorDst, arg1: SrcOperand);
    fn color_op2(&mut self, op: u32, dst: ColorDst, arg1: SrcOperand, arg2: SrcOperand);
    fn color_op3(
        &mut self,
        op: u32,
        dst: ColorDst,
        arg1: SrcOperand,
        arg2: SrcOperand,
        arg3: SrcOperand,
    );
    fn alpha_op1(&mut self, op: u32, dst: AlphaDst, arg1: SrcOperand);
    fn alpha_op2(&mut self, op: u32, dst: AlphaDst, arg1: SrcOperand, arg2: SrcOperand);
    fn alpha_op3(
        &mut self,
        op: u32,
        dst: AlphaDst,
        arg1: SrcOperand,
        arg2: SrcOperand,
        arg3: SrcOperand,
    );
    fn set_constant(&mut self, dst: u32, value: &[f32; 4]);
    fn pass_tex_coord(&mut self, dst: u32, coord: u32, swizzle: u32);
    fn sample_map(&mut self, dst: u32, interp: u32, swizzle: u32);

    /// Reports (and clears) an error raised by the preceding calls.
    fn poll_error(&mut self) -> bool;
}

/// Issues every queued instruction, phase 1 texture through phase 2 ALU.
///
/// A malformed record ends the walk of its queue. The first error reported by the API aborts
/// binding; calls already issued are not undone.
pub fn bind_machine_instructions<A: FragmentShaderApi + ?Sized>(
    api: &mut A,
    queues: &MachineQueues,
    constants: &[f32],
) -> Result<(), BindError> {
    for (phase, queue) in queues.iter() {
        for (instruction, record) in queue.iter().enumerate() {
            let mi = match record {
                Ok(mi) => mi,
                Err(err) => {
                    warn!(%phase, ?err, "malformed machine instruction record");
                    break;
                }
            };
            if !issue(api, &mi, constants) {
                warn!(%phase, instruction, %mi, "machine instruction cannot be issued");
                break;
            }
            trace!(%phase, %mi, "bound");
            if api.poll_error() {
                return Err(BindError::Api { phase, instruction });
            }
        }
    }
    Ok(())
}

fn issue<A: FragmentShaderApi + ?Sized>(
    api: &mut A,
    mi: &MachineInstruction,
    constants: &[f32],
) -> bool {
    match mi {
        MachineInstruction::ColorOp { op, dst, args } => match *args.as_slice() {
            [a] => api.color_op1(*op, *dst, a),
            [a, b] => api.color_op2(*op, *dst, a, b),
            [a, b, c] => api.color_op3(*op, *dst, a, b, c),
            _ => return false,
        },
        MachineInstruction::AlphaOp { op, dst, args } => match *args.as_slice() {
            [a] => api.alpha_op1(*op, *dst, a),
            [a, b] => api.alpha_op2(*op, *dst, a, b),
            [a, b, c] => api.alpha_op3(*op, *dst, a, b, c),
            _ => return false,
        },
        MachineInstruction::SetConstants {
            dst,
            constant_index,
        } => {
            let start = *constant_index as usize;
            let Some(value) = constants
                .get(start..start + 4)
                .and_then(|v| <&[f32; 4]>::try_from(v).ok())
            else {
                return false;
            };
            api.set_constant(*dst, value);
        }
        MachineInstruction::PassTexCoord {
            dst,
            coord,
            swizzle,
        } => api.pass_tex_coord(*dst, *coord, *swizzle),
        MachineInstruction::SampleMap {
            dst,
            interp,
            swizzle,
        } => api.sample_map(*dst, *interp, *swizzle),
    }
    true
}
