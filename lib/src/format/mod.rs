pub mod faces;
pub mod mesh;
pub mod node;
pub mod object;
pub mod pig;
pub mod vertex;

use binrw::binrw;
use serde_derive::Serialize;

/// Ident value that opens every record in the stream.
pub const K_IDENT: u32 = 100;

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct CVector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CVector3f {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0 };

    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self { Self { x, y, z } }

    #[inline]
    pub fn to_array(self) -> [f32; 3] { [self.x, self.y, self.z] }
}

/// Quaternion in stream component order.
#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct CQuaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[binrw]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct CMatrix4f {
    pub m: [f32; 16],
}

impl CMatrix4f {
    /// Rows in stream order.
    pub fn rows(&self) -> [[f32; 4]; 4] {
        let m = &self.m;
        [
            [m[0], m[1], m[2], m[3]],
            [m[4], m[5], m[6], m[7]],
            [m[8], m[9], m[10], m[11]],
            [m[12], m[13], m[14], m[15]],
        ]
    }
}

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct CAABox {
    pub min: CVector3f,
    pub max: CVector3f,
}
