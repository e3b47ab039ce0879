//! Triangle index delta decoding.
//!
//! Indices are stored as a chained delta stream: every value is relative to
//! the previous index, and the last index of one triangle is the base for the
//! first index of the next. Arithmetic wraps at 16 bits, matching the width of
//! the stored deltas and of the vertex count.

/// Rebuilds triangles from `deltas`. A trailing partial triangle is ignored;
/// callers check the count beforehand.
pub fn decode_faces(deltas: &[i16]) -> Vec<[u32; 3]> {
    let mut z = 0u16;
    deltas
        .chunks_exact(3)
        .map(|d| {
            let x = z.wrapping_add(d[0] as u16);
            let y = x.wrapping_add(d[1] as u16);
            z = y.wrapping_add(d[2] as u16);
            [x as u32, y as u32, z as u32]
        })
        .collect()
}
