pub mod blocks;
pub mod color;
pub mod kernel;
pub mod limits;
pub mod overlay;
pub mod pixel_sort;
pub mod resample;
pub mod resize;
