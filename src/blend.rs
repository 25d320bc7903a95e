use image::Rgba;
use std::fmt;
use std::str::FromStr;

use crate::error::TransformError;

/// How a composite step combines the mask (source) with the image (destination).
///
/// Pixels are straight (unpremultiplied) RGBA8. Apart from `Clear` and `Multiply`
/// every mode is a plain Porter-Duff operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Replaces the region the mask covers with transparency.
    Clear,
    Source,
    Over,
    Dest,
    DestIn,
    DestOut,
    Multiply,
}

impl BlendMode {
    pub const ALL: [BlendMode; 7] = [
        BlendMode::Clear,
        BlendMode::Source,
        BlendMode::Over,
        BlendMode::Dest,
        BlendMode::DestIn,
        BlendMode::DestOut,
        BlendMode::Multiply,
    ];

    pub fn as_token(&self) -> &'static str {
        match self {
            BlendMode::Clear => "clear",
            BlendMode::Source => "source",
            BlendMode::Over => "over",
            BlendMode::Dest => "dest",
            BlendMode::DestIn => "dest-in",
            BlendMode::DestOut => "dest-out",
            BlendMode::Multiply => "multiply",
        }
    }

    /// Combines one source pixel with one destination pixel.
    pub fn apply(&self, src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
        let sa = unit(src[3]);
        let da = unit(dst[3]);

        match self {
            // Bounded clear: only the covered part of the destination goes away.
            BlendMode::Clear => Rgba([dst[0], dst[1], dst[2], byte(da * (1.0 - sa))]),
            BlendMode::Source => porter_duff(src, dst, 1.0, 0.0),
            BlendMode::Over => porter_duff(src, dst, 1.0, 1.0 - sa),
            BlendMode::Dest => dst,
            BlendMode::DestIn => porter_duff(src, dst, 0.0, sa),
            BlendMode::DestOut => porter_duff(src, dst, 0.0, 1.0 - sa),
            BlendMode::Multiply => multiply(src, dst),
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for BlendMode {
    type Err = TransformError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let normalized = token.trim().to_ascii_lowercase().replace('_', "-");
        BlendMode::ALL
            .into_iter()
            .find(|mode| mode.as_token() == normalized)
            .ok_or_else(|| {
                TransformError::UnsupportedOperation(format!("unknown blend mode '{}'", token))
            })
    }
}

fn unit(v: u8) -> f32 {
    v as f32 / 255.0
}

fn byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn porter_duff(src: Rgba<u8>, dst: Rgba<u8>, fa: f32, fb: f32) -> Rgba<u8> {
    let sa = unit(src[3]);
    let da = unit(dst[3]);
    let out_a = sa * fa + da * fb;
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let premul = unit(src[c]) * sa * fa + unit(dst[c]) * da * fb;
        out[c] = byte(premul / out_a);
    }
    out[3] = byte(out_a);
    Rgba(out)
}

fn multiply(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = unit(src[3]);
    let da = unit(dst[3]);
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let cs = unit(src[c]);
        let cd = unit(dst[c]);
        let premul = cs * sa * (1.0 - da) + cd * da * (1.0 - sa) + sa * da * cs * cd;
        out[c] = byte(premul / out_a);
    }
    out[3] = byte(out_a);
    Rgba(out)
}
