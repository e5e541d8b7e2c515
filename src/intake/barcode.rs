use crate::pipeline::types::RawFrame;

/// Supplies an optional decoded barcode for a frame.
pub trait BarcodeReader: Send {
    fn read(&mut self, frame: &RawFrame) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoBarcode;

impl BarcodeReader for NoBarcode {
    fn read(&mut self, _frame: &RawFrame) -> Option<String> {
        None
    }
}
