pub mod majority;

pub use majority::{MajorityConfig, MajorityLabelModel};
