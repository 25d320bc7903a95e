use std::sync::Arc;

/// Immutable SVG markup used as a compositing stencil.
///
/// Clones share the same bytes, so a request (and any engine job working on it)
/// keeps the mask alive for as long as it needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskDescriptor {
    bytes: Arc<[u8]>,
}

impl MaskDescriptor {
    /// Rounded rectangle covering `width` x `height` with `rx = ry = radius`.
    pub fn rounded_rect(width: u32, height: u32, radius: u32) -> Self {
        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
                r#"<rect x="0" y="0" width="{w}" height="{h}" rx="{r}" ry="{r}"/>"#,
                "</svg>"
            ),
            w = width,
            h = height,
            r = radius
        );
        Self::from_bytes(svg.into_bytes())
    }

    /// Wraps arbitrary bytes. Nothing is checked here; a bad mask only fails
    /// once an engine tries to rasterise it.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into().into_boxed_slice()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
