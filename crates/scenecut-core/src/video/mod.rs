pub mod buffer_source;
pub mod decoder;
pub mod file_source;
pub mod frame;
pub mod source;
pub mod timecode;

pub use buffer_source::{BufferFrameSource, DEFAULT_FRAME_RATE};
pub use file_source::FileFrameSource;
pub use frame::Frame;
pub use source::{FrameSource, SeekTarget};
pub use timecode::Timecode;
