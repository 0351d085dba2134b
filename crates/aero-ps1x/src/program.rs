//! Fragment program lifecycle on top of the compiler and binder.

use tracing::debug;

use crate::binder::{bind_machine_instructions, FragmentShaderApi};
use crate::error::ProgramError;
use crate::limits::MAX_PROGRAM_CONSTANTS;
use crate::native::CONSTANT_REGISTERS;
use crate::ps1x::Ps1xCompiler;

/// A ps.1.x program compiled and loaded into a [`FragmentShaderApi`].
#[derive(Debug, Clone, Default)]
pub struct FragmentProgram {
    compiler: Ps1xCompiler,
    program: Option<u32>,
}

impl FragmentProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiler(&self) -> &Ps1xCompiler {
        &self.compiler
    }

    /// API handle, once loaded.
    pub fn handle(&self) -> Option<u32> {
        self.program
    }

    /// Compiles `source` and records the resulting instructions into the program object.
    ///
    /// The program object is created on first use and reused by later loads. A compile failure is
    /// returned before any API call is made.
    pub fn load_from_source<A: FragmentShaderApi + ?Sized>(
        &mut self,
        api: &mut A,
        source: &str,
    ) -> Result<(), ProgramError> {
        self.compiler.compile(source)?;

        let program = match self.program {
            Some(program) => program,
            None => {
                let program = api.create();
                self.program = Some(program);
                program
            }
        };

        api.bind(program);
        api.begin();
        let result = bind_machine_instructions(
            api,
            self.compiler.queues(),
            self.compiler.constants(),
        );
        api.end();
        result?;

        debug!(program, "loaded ps.1.x fragment program");
        Ok(())
    }

    pub fn bind<A: FragmentShaderApi + ?Sized>(&self, api: &mut A) -> Result<(), ProgramError> {
        let program = self.program.ok_or(ProgramError::NotLoaded)?;
        api.bind(program);
        Ok(())
    }

    pub fn unbind<A: FragmentShaderApi + ?Sized>(&self, api: &mut A) {
        api.unbind();
    }

    /// Uploads program constants `c0`.. from `constants`; entries past `c7` are ignored.
    pub fn bind_parameters<A: FragmentShaderApi + ?Sized>(
        &self,
        api: &mut A,
        constants: &[[f32; 4]],
    ) -> Result<(), ProgramError> {
        if self.program.is_none() {
            return Err(ProgramError::NotLoaded);
        }
        for (value, &reg) in constants
            .iter()
            .take(MAX_PROGRAM_CONSTANTS)
            .zip(CONSTANT_REGISTERS.iter())
        {
            api.set_constant(reg, value);
        }
        Ok(())
    }

    /// Releases the API program object.
    pub fn unload<A: FragmentShaderApi + ?Sized>(&mut self, api: &mut A) {
        if let Some(program) = self.program.take() {
            api.destroy(program);
        }
    }
}
