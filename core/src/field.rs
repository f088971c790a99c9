//! Toroidal gradient-noise field.
//!
//! The lattice holds one signed gradient pair per cell. Heights are blended
//! between the four surrounding corners with smoothstep weights, and the
//! gradient comes from the same blend, so both are continuous across cells.

use crate::constants::{FIELD_BYTES, LEVEL, MAP_SIZE, SCALE};
use crate::fixed_point::{mul_su, mul_uu, MathTables};

/// Cell extent in the 22-bit in-cell coordinate.
const CELL_SPAN: i32 = 1 << 22;
/// Gradient used for row 0 of every column.
pub const FLAT_GRADIENT: [i8; 2] = [0, 127];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub height: i16,
    /// Both components are odd, never zero.
    pub gradient: [i16; 2],
}

/// Gradient lattice indexed `[column][row]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    cells: [[[i8; 2]; MAP_SIZE]; MAP_SIZE],
}

impl Default for Field {
    fn default() -> Self {
        Self {
            cells: [[[0; 2]; MAP_SIZE]; MAP_SIZE],
        }
    }
}

impl Field {
    /// Cell (col, row) lives at byte `(col * 16 + row) * 2`, x first.
    pub fn from_bytes(bytes: &[u8; FIELD_BYTES]) -> Self {
        let mut field = Self::default();
        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            field.cells[i / MAP_SIZE][i % MAP_SIZE] = [pair[0] as i8, pair[1] as i8];
        }
        field
    }

    pub fn to_bytes(&self) -> [u8; FIELD_BYTES] {
        let mut out = [0u8; FIELD_BYTES];
        for (col, column) in self.cells.iter().enumerate() {
            for (row, cell) in column.iter().enumerate() {
                let offset = (col * MAP_SIZE + row) * 2;
                out[offset] = cell[0] as u8;
                out[offset + 1] = cell[1] as u8;
            }
        }
        out
    }

    pub fn cell(&self, col: usize, row: usize) -> [i8; 2] {
        self.cells[col % MAP_SIZE][row % MAP_SIZE]
    }

    pub fn set_cell(&mut self, col: usize, row: usize, gradient: [i8; 2]) {
        self.cells[col % MAP_SIZE][row % MAP_SIZE] = gradient;
    }

    pub fn flatten_first_row(&mut self) {
        for column in self.cells.iter_mut() {
            column[0] = FLAT_GRADIENT;
        }
    }

    /// Height and gradient at a world position.
    pub fn sample(&self, t: &MathTables, pos: [i32; 2]) -> Sample {
        let c = Corners::locate(self, t, pos);
        let (q00, q01, q10, q11) = c.heights();

        let q1 = q10.wrapping_sub(q00);
        let q2 = q01.wrapping_sub(q00);
        let q3 = (q00 as i32 - q01 as i32 - q10 as i32 + q11 as i32) as i16;
        let q4 = q2.wrapping_add(mul_su(q3, c.sx));
        let q5 = q1.wrapping_add(mul_su(q3, c.sy));
        let height = (q00 as i32 + mul_su(q1, c.sx) as i32 + mul_su(q4, c.sy) as i32) as i16;

        let sxsy = mul_uu(c.sx, c.sy);
        let blend = |k: usize| -> i32 {
            let g00 = c.g[0][0][k];
            let g01 = c.g[0][1][k];
            let g10 = c.g[1][0][k];
            let g11 = c.g[1][1][k];
            g00 + mul_su((g10 - g00) as i16, c.sx) as i32
                + mul_su((g01 - g00) as i16, c.sy) as i32
                + mul_su((g00 - g01 - g10 + g11) as i16, sxsy) as i32
        };
        let gx = (((blend(0) << 5) + mul_su(q5, t.smooth_slope(c.x_bucket)) as i32) as i16) | 1;
        let gy = (((blend(1) << 5) + mul_su(q4, t.smooth_slope(c.y_bucket)) as i32) as i16) | 1;

        Sample {
            height,
            gradient: [gx, gy],
        }
    }

    /// Height only; the walkability grid needs nothing else.
    pub fn height(&self, t: &MathTables, pos: [i32; 2]) -> i16 {
        let c = Corners::locate(self, t, pos);
        let (q00, q01, q10, q11) = c.heights();
        let q1 = q10.wrapping_sub(q00);
        let q2 = q01.wrapping_sub(q00);
        let q3 = (q00 as i32 - q01 as i32 - q10 as i32 + q11 as i32) as i16;
        let q4 = q2.wrapping_add(mul_su(q3, c.sx));
        (q00 as i32 + mul_su(q1, c.sx) as i32 + mul_su(q4, c.sy) as i32) as i16
    }

    /// Distance from `pos` to the ground surface in units of 1/65536 of the
    /// map scale. Zero when `pos` is inside the ground.
    pub fn ground_distance(&self, t: &MathTables, pos: [i32; 2]) -> i32 {
        let s = self.sample(t, pos);
        ground_distance_of(t, &s)
    }

    /// Renderer query: sample at a lattice coordinate in Q16.16 cell units.
    /// The integer part wraps at `MAP_SIZE`.
    pub fn sample_cell_fraction(&self, t: &MathTables, col_q16: u32, row_q16: u32) -> Sample {
        self.sample(
            t,
            [(col_q16 << 12) as i32, (row_q16 << 12) as i32],
        )
    }
}

/// Ground distance for an existing sample, shared with the stepper.
pub(crate) fn ground_distance_of(t: &MathTables, s: &Sample) -> i32 {
    let height = s.height as i32;
    if height > LEVEL {
        return 0;
    }
    let inv = t.inv_length(magnitude_sq(s.gradient));
    (((LEVEL - height) as i64 * SCALE * inv) >> 15) as i32
}

#[inline]
pub(crate) fn magnitude_sq(g: [i16; 2]) -> i64 {
    let gx = g[0] as i64;
    let gy = g[1] as i64;
    gx * gx + gy * gy
}

struct Corners {
    /// `g[dx][dy]` is the gradient at corner (i0 + dx, j0 + dy).
    g: [[[i32; 2]; 2]; 2],
    x: i32,
    y: i32,
    x_bucket: u16,
    y_bucket: u16,
    sx: u16,
    sy: u16,
}

impl Corners {
    fn locate(field: &Field, t: &MathTables, pos: [i32; 2]) -> Self {
        let x64 = pos[0] as u32 as u64 * MAP_SIZE as u64;
        let y64 = pos[1] as u32 as u64 * MAP_SIZE as u64;
        let i0 = (x64 >> 32) as usize;
        let j0 = (y64 >> 32) as usize;
        let i1 = (i0 + 1) % MAP_SIZE;
        let j1 = (j0 + 1) % MAP_SIZE;

        let x = ((x64 & 0xFFFF_FFFF) >> 10) as i32;
        let y = ((y64 & 0xFFFF_FFFF) >> 10) as i32;
        let x_bucket = (x >> 6) as u16;
        let y_bucket = (y >> 6) as u16;

        let widen = |c: [i8; 2]| [c[0] as i32, c[1] as i32];
        Self {
            g: [
                [widen(field.cells[i0][j0]), widen(field.cells[i0][j1])],
                [widen(field.cells[i1][j0]), widen(field.cells[i1][j1])],
            ],
            x,
            y,
            x_bucket,
            y_bucket,
            sx: t.smooth(x_bucket),
            sy: t.smooth(y_bucket),
        }
    }

    /// Corner heights as (q00, q01, q10, q11).
    fn heights(&self) -> (i16, i16, i16, i16) {
        let (x, y) = (self.x, self.y);
        let g = &self.g;
        let q00 = ((g[0][0][0] * x + g[0][0][1] * y) >> 16) as i16;
        let q01 = ((g[0][1][0] * x + g[0][1][1] * (y - CELL_SPAN)) >> 16) as i16;
        let q11 = ((g[1][1][0] * (x - CELL_SPAN) + g[1][1][1] * (y - CELL_SPAN)) >> 16) as i16;
        let q10 = ((g[1][0][0] * (x - CELL_SPAN) + g[1][0][1] * y) >> 16) as i16;
        (q00, q01, q10, q11)
    }
}
