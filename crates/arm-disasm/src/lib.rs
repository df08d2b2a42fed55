pub mod analyze;
pub mod listing;
pub mod model;

pub use analyze::{analyze_entries, report, synth_labels, Block, EdgeKind, EdgeOut, LabelKV, Report};
pub use listing::{listing, ListingLine};
pub use model::{load_raw_bin, read_u32, Image};
