pub mod f32;
pub mod s16;
pub mod s32;
