pub mod barcode;
pub mod connectivity;
pub mod frame_source;

pub use barcode::{BarcodeReader, NoBarcode};
pub use connectivity::{Connectivity, SharedConnectivity};
pub use frame_source::{ChannelFrameSource, FrameSource, StillImageSource};
