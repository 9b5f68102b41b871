pub mod fill_loop;

pub use fill_loop::{FillLoop, FillParams};
