//! Native codes understood by the ATI_fragment_shader style binding surface.
//!
//! Grammar symbols carry these values verbatim, and the binder passes them through unchanged.
//! Register files are exposed as ordinal lookup tables instead of base-plus-offset arithmetic so
//! that register classes can be translated into one another by index.

use std::borrow::Cow;

pub const GL_NONE: u32 = 0;

pub const GL_REG_0_ATI: u32 = 0x8921;
pub const GL_REG_1_ATI: u32 = 0x8922;
pub const GL_REG_2_ATI: u32 = 0x8923;
pub const GL_REG_3_ATI: u32 = 0x8924;
pub const GL_REG_4_ATI: u32 = 0x8925;
pub const GL_REG_5_ATI: u32 = 0x8926;

pub const GL_CON_0_ATI: u32 = 0x8941;
pub const GL_CON_1_ATI: u32 = 0x8942;
pub const GL_CON_2_ATI: u32 = 0x8943;
pub const GL_CON_3_ATI: u32 = 0x8944;
pub const GL_CON_4_ATI: u32 = 0x8945;
pub const GL_CON_5_ATI: u32 = 0x8946;
pub const GL_CON_6_ATI: u32 = 0x8947;
pub const GL_CON_7_ATI: u32 = 0x8948;

pub const GL_MOV_ATI: u32 = 0x8961;
pub const GL_ADD_ATI: u32 = 0x8963;
pub const GL_MUL_ATI: u32 = 0x8964;
pub const GL_SUB_ATI: u32 = 0x8965;
pub const GL_DOT3_ATI: u32 = 0x8966;
pub const GL_DOT4_ATI: u32 = 0x8967;
pub const GL_MAD_ATI: u32 = 0x8968;
pub const GL_LERP_ATI: u32 = 0x8969;
pub const GL_CND_ATI: u32 = 0x896A;
pub const GL_CND0_ATI: u32 = 0x896B;
pub const GL_DOT2_ADD_ATI: u32 = 0x896C;

pub const GL_SECONDARY_INTERPOLATOR_ATI: u32 = 0x896D;
pub const GL_PRIMARY_COLOR_ARB: u32 = 0x8577;

pub const GL_SWIZZLE_STR_ATI: u32 = 0x8976;
pub const GL_SWIZZLE_STQ_ATI: u32 = 0x8977;
pub const GL_SWIZZLE_STR_DR_ATI: u32 = 0x8978;
pub const GL_SWIZZLE_STQ_DQ_ATI: u32 = 0x8979;
pub const GL_SWIZZLE_STRQ_ATI: u32 = 0x897A;
pub const GL_SWIZZLE_STRQ_DQ_ATI: u32 = 0x897B;

/// Destination mask bits. The API only defines red/green/blue; alpha is tracked by the compiler
/// to decide whether a companion alpha op is needed and never reaches the API.
pub const GL_RED_BIT_ATI: u32 = 0x1;
pub const GL_GREEN_BIT_ATI: u32 = 0x2;
pub const GL_BLUE_BIT_ATI: u32 = 0x4;
pub const ALPHA_BIT: u32 = 0x8;
pub const RGB_BITS: u32 = GL_RED_BIT_ATI | GL_GREEN_BIT_ATI | GL_BLUE_BIT_ATI;
pub const RGBA_BITS: u32 = RGB_BITS | ALPHA_BIT;

// Destination modifiers.
pub const GL_2X_BIT_ATI: u32 = 0x1;
pub const GL_4X_BIT_ATI: u32 = 0x2;
pub const GL_8X_BIT_ATI: u32 = 0x4;
pub const GL_HALF_BIT_ATI: u32 = 0x8;
pub const GL_QUARTER_BIT_ATI: u32 = 0x10;
pub const GL_EIGHTH_BIT_ATI: u32 = 0x20;
pub const GL_SATURATE_BIT_ATI: u32 = 0x40;

// Argument modifiers.
pub const GL_COMP_BIT_ATI: u32 = 0x2;
pub const GL_NEGATE_BIT_ATI: u32 = 0x4;
pub const GL_BIAS_BIT_ATI: u32 = 0x8;

// Argument replicates.
pub const GL_RED: u32 = 0x1903;
pub const GL_GREEN: u32 = 0x1904;
pub const GL_BLUE: u32 = 0x1905;
pub const GL_ALPHA: u32 = 0x1906;

pub const GL_TEXTURE0_ARB: u32 = 0x84C0;
pub const GL_TEXTURE1_ARB: u32 = 0x84C1;
pub const GL_TEXTURE2_ARB: u32 = 0x84C2;
pub const GL_TEXTURE3_ARB: u32 = 0x84C3;
pub const GL_TEXTURE4_ARB: u32 = 0x84C4;
pub const GL_TEXTURE5_ARB: u32 = 0x84C5;

/// Temp registers by ordinal.
pub const TEMP_REGISTERS: [u32; 6] = [
    GL_REG_0_ATI,
    GL_REG_1_ATI,
    GL_REG_2_ATI,
    GL_REG_3_ATI,
    GL_REG_4_ATI,
    GL_REG_5_ATI,
];

/// Constant registers by ordinal.
pub const CONSTANT_REGISTERS: [u32; 8] = [
    GL_CON_0_ATI,
    GL_CON_1_ATI,
    GL_CON_2_ATI,
    GL_CON_3_ATI,
    GL_CON_4_ATI,
    GL_CON_5_ATI,
    GL_CON_6_ATI,
    GL_CON_7_ATI,
];

/// Texture coordinate interpolators by ordinal.
pub const TEXTURE_UNITS: [u32; 6] = [
    GL_TEXTURE0_ARB,
    GL_TEXTURE1_ARB,
    GL_TEXTURE2_ARB,
    GL_TEXTURE3_ARB,
    GL_TEXTURE4_ARB,
    GL_TEXTURE5_ARB,
];

pub fn temp_register_ordinal(native: u32) -> Option<usize> {
    TEMP_REGISTERS.iter().position(|&r| r == native)
}

pub fn constant_register_ordinal(native: u32) -> Option<usize> {
    CONSTANT_REGISTERS.iter().position(|&r| r == native)
}

pub fn texture_unit_ordinal(native: u32) -> Option<usize> {
    TEXTURE_UNITS.iter().position(|&r| r == native)
}

/// Readable name for an operand register or interpolator.
pub fn register_name(native: u32) -> Cow<'static, str> {
    if let Some(i) = temp_register_ordinal(native) {
        return Cow::Owned(format!("r{i}"));
    }
    if let Some(i) = constant_register_ordinal(native) {
        return Cow::Owned(format!("c{i}"));
    }
    if let Some(i) = texture_unit_ordinal(native) {
        return Cow::Owned(format!("t{i}"));
    }
    match native {
        GL_PRIMARY_COLOR_ARB => Cow::Borrowed("v0"),
        GL_SECONDARY_INTERPOLATOR_ATI => Cow::Borrowed("v1"),
        other => Cow::Owned(format!("{other:#x}")),
    }
}

pub fn opcode_name(native: u32) -> Cow<'static, str> {
    Cow::Borrowed(match native {
        GL_MOV_ATI => "mov",
        GL_ADD_ATI => "add",
        GL_MUL_ATI => "mul",
        GL_SUB_ATI => "sub",
        GL_DOT3_ATI => "dot3",
        GL_DOT4_ATI => "dot4",
        GL_MAD_ATI => "mad",
        GL_LERP_ATI => "lerp",
        GL_CND_ATI => "cnd",
        GL_CND0_ATI => "cnd0",
        GL_DOT2_ADD_ATI => "dot2_add",
        other => return Cow::Owned(format!("{other:#x}")),
    })
}

pub fn swizzle_name(native: u32) -> Cow<'static, str> {
    Cow::Borrowed(match native {
        GL_SWIZZLE_STR_ATI => "str",
        GL_SWIZZLE_STQ_ATI => "stq",
        GL_SWIZZLE_STR_DR_ATI => "str_dr",
        GL_SWIZZLE_STQ_DQ_ATI => "stq_dq",
        GL_SWIZZLE_STRQ_ATI => "strq",
        GL_SWIZZLE_STRQ_DQ_ATI => "strq_dq",
        other => return Cow::Owned(format!("{other:#x}")),
    })
}

/// Suffix for a destination mask; empty for a full write.
pub fn mask_suffix(mask: u32) -> String {
    if mask == GL_NONE || mask & RGBA_BITS == RGBA_BITS {
        return String::new();
    }
    let mut out = String::from(".");
    for (bit, c) in [
        (GL_RED_BIT_ATI, 'r'),
        (GL_GREEN_BIT_ATI, 'g'),
        (GL_BLUE_BIT_ATI, 'b'),
        (ALPHA_BIT, 'a'),
    ] {
        if mask & bit != 0 {
            out.push(c);
        }
    }
    out
}

pub fn replicate_suffix(rep: u32) -> &'static str {
    match rep {
        GL_RED => ".r",
        GL_GREEN => ".g",
        GL_BLUE => ".b",
        GL_ALPHA => ".a",
        _ => "",
    }
}

/// Suffix for destination modifier bits, e.g. `_x2_sat`.
pub fn dst_mod_suffix(modifier: u32) -> String {
    let mut out = String::new();
    for (bit, s) in [
        (GL_2X_BIT_ATI, "_x2"),
        (GL_4X_BIT_ATI, "_x4"),
        (GL_8X_BIT_ATI, "_x8"),
        (GL_HALF_BIT_ATI, "_d2"),
        (GL_QUARTER_BIT_ATI, "_d4"),
        (GL_EIGHTH_BIT_ATI, "_d8"),
        (GL_SATURATE_BIT_ATI, "_sat"),
    ] {
        if modifier & bit != 0 {
            out.push_str(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_tables_round_trip() {
        for (i, &r) in TEMP_REGISTERS.iter().enumerate() {
            assert_eq!(temp_register_ordinal(r), Some(i));
        }
        assert_eq!(temp_register_ordinal(GL_CON_0_ATI), None);
        assert_eq!(constant_register_ordinal(GL_CON_7_ATI), Some(7));
        assert_eq!(texture_unit_ordinal(GL_TEXTURE3_ARB), Some(3));
    }

    #[test]
    fn names() {
        assert_eq!(register_name(GL_REG_5_ATI), "r5");
        assert_eq!(register_name(GL_CON_2_ATI), "c2");
        assert_eq!(register_name(GL_PRIMARY_COLOR_ARB), "v0");
        assert_eq!(mask_suffix(RGB_BITS), ".rgb");
        assert_eq!(mask_suffix(RGBA_BITS), "");
        assert_eq!(dst_mod_suffix(GL_2X_BIT_ATI | GL_SATURATE_BIT_ATI), "_x2_sat");
    }
}
