pub mod psola;
pub mod pyin;

// Constants for PYIN and PSOLA
pub const FRAME_LENGTH: usize = 2048;
pub const HOP_LENGTH: usize = 256;

// Constants for just PYIN
pub const PYIN_THRESHOLD: f32 = 0.1;
pub const PYIN_SIGMA: f32 = 0.2;
pub const MIN_F0: f32 = 50.0;
pub const MAX_F0: f32 = 2000.0;
