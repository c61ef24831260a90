//! Framebuffer and triangle rasterization for the software backend.

use super::glsl::Value;

/// An RGBA float color buffer.
///
/// Pixels are addressed with a top-left origin, like image files; the
/// rasterizer converts from GL's bottom-left window coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 4]>,
}

impl Framebuffer {
    /// Creates a framebuffer cleared to transparent black.
    ///
    /// # Panics
    ///
    /// Panics with a capacity overflow if `width * height` pixels cannot be
    /// allocated. `SoftwareSurface` checks the size before getting here.
    pub fn new(width: usize, height: usize) -> Self {
        let len = width.checked_mul(height).unwrap_or(usize::MAX);
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; len],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Fills every pixel with `color`.
    pub fn clear(&mut self, color: [f32; 4]) {
        self.pixels.fill(color);
    }

    /// The color at column `x`, row `y` (row 0 at the top).
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the framebuffer.
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 4] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.pixels[y * self.width + x]
    }

    /// All pixels, row-major from the top row.
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Quantizes to RGBA8, four bytes per pixel, rows from the top.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|px| px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }

    fn write_window(&mut self, x: usize, y_from_bottom: usize, color: [f32; 4]) {
        let row = self.height - 1 - y_from_bottom;
        self.pixels[row * self.width + x] = color.map(|c| c.clamp(0.0, 1.0));
    }
}

/// A vertex after the vertex stage: clip-space position plus varyings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipVertex {
    pub position: Value,
    pub varyings: Vec<Value>,
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Fills one triangle, calling `shade` with the interpolated varyings of
/// every covered pixel center.
///
/// Both windings are drawn. Triangles with a vertex at or behind the eye
/// (`w <= 0`) are skipped since there is no clipper.
pub fn rasterize_triangle<F>(target: &mut Framebuffer, vertices: &[ClipVertex; 3], mut shade: F)
where
    F: FnMut(&[Value]) -> [f32; 4],
{
    let width = target.width as f32;
    let height = target.height as f32;

    let mut screen = [[0.0_f32; 2]; 3];
    let mut inv_w = [0.0_f32; 3];
    for (i, vertex) in vertices.iter().enumerate() {
        let [x, y, _, w] = vertex.position;
        if w <= 0.0 || !w.is_finite() {
            return;
        }
        inv_w[i] = 1.0 / w;
        screen[i] = [
            (x * inv_w[i] + 1.0) * 0.5 * width,
            (y * inv_w[i] + 1.0) * 0.5 * height,
        ];
        if !screen[i].iter().all(|c| c.is_finite()) {
            return;
        }
    }

    let area = edge(screen[0], screen[1], screen[2]);
    if area == 0.0 {
        return;
    }

    let min_x = screen.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min);
    let max_x = screen.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max);
    let min_y = screen.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min);
    let max_y = screen.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max);

    let x0 = min_x.floor().max(0.0) as usize;
    let x1 = max_x.ceil().min(width) as usize;
    let y0 = min_y.floor().max(0.0) as usize;
    let y1 = max_y.ceil().min(height) as usize;

    let varying_count = vertices[0].varyings.len();
    let mut interpolated = vec![[0.0_f32; 4]; varying_count];

    for py in y0..y1 {
        for px in x0..x1 {
            let p = [px as f32 + 0.5, py as f32 + 0.5];
            let bary = [
                edge(screen[1], screen[2], p) / area,
                edge(screen[2], screen[0], p) / area,
                edge(screen[0], screen[1], p) / area,
            ];
            if bary.iter().any(|b| *b < 0.0) {
                continue;
            }

            // Perspective-correct weights.
            let q = [bary[0] * inv_w[0], bary[1] * inv_w[1], bary[2] * inv_w[2]];
            let sum = q[0] + q[1] + q[2];
            let weights = q.map(|v| v / sum);

            for (k, slot) in interpolated.iter_mut().enumerate() {
                for (c, lane) in slot.iter_mut().enumerate() {
                    *lane = (0..3).map(|i| weights[i] * vertices[i].varyings[k][c]).sum();
                }
            }

            let color = shade(&interpolated);
            target.write_window(px, py, color);
        }
    }
}
