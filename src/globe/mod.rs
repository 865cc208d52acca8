mod assembler;
mod column;
mod projection;

pub use assembler::{assemble, scan_stats, ScanError, ScanStats, SceneBuffers};
pub use column::{INDICES_PER_COLUMN, VERTICES_PER_COLUMN};
