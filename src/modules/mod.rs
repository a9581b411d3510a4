pub mod job;
pub mod video;
