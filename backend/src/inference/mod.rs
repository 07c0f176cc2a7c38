pub mod classifier;
pub mod dispatch;
pub mod voice;
