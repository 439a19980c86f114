pub mod stream;

#[cfg(feature = "host-pumps")]
pub mod pump;

pub use stream::{ShiReceive, ShiTransmit, WordReader, WordSink, WordSource, WordWriter};
