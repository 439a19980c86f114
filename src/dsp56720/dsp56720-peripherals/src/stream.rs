use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;

use dsp56720_core::peripherals::ShiHost;
use dsp56720_core::{QueueShutdown, Word, WordQueue};

/// Bytes per word on the host side (little-endian u32)
pub const WORD_BYTES: usize = 4;

/// Stream endpoint the host reads words from
pub trait WordSource {
    /// Next word, waiting for one
    fn take(&self) -> Result<Word, QueueShutdown>;
    fn try_take(&self) -> Result<Option<Word>, QueueShutdown>;
}

/// Stream endpoint the host writes words to
pub trait WordSink {
    fn put(&self, word: Word) -> Result<(), QueueShutdown>;
}

impl WordSource for WordQueue {
    fn take(&self) -> Result<Word, QueueShutdown> {
        self.pop()
    }

    fn try_take(&self) -> Result<Option<Word>, QueueShutdown> {
        self.try_pop()
    }
}

impl WordSink for WordQueue {
    fn put(&self, word: Word) -> Result<(), QueueShutdown> {
        self.push(word)
    }
}

impl<T: WordSource + ?Sized> WordSource for Arc<T> {
    fn take(&self) -> Result<Word, QueueShutdown> {
        (**self).take()
    }

    fn try_take(&self) -> Result<Option<Word>, QueueShutdown> {
        (**self).try_take()
    }
}

impl<T: WordSink + ?Sized> WordSink for Arc<T> {
    fn put(&self, word: Word) -> Result<(), QueueShutdown> {
        (**self).put(word)
    }
}

/// Words the DSP writes to HTX
pub struct ShiTransmit(pub ShiHost);

impl WordSource for ShiTransmit {
    fn take(&self) -> Result<Word, QueueShutdown> {
        self.0.read_tx()
    }

    fn try_take(&self) -> Result<Option<Word>, QueueShutdown> {
        self.0.try_read_tx()
    }
}

/// Words the DSP reads from HRX
pub struct ShiReceive(pub ShiHost);

impl WordSink for ShiReceive {
    fn put(&self, word: Word) -> Result<(), QueueShutdown> {
        self.0.write_rx(&[word])
    }
}

fn short_buffer() -> io::Error {
    io::Error::new(ErrorKind::InvalidInput, "buffer shorter than one word")
}

/// Byte view of a [`WordSource`]. A shut down source reads as end of stream.
pub struct WordReader<S> {
    source: S,
}

impl<S: WordSource> WordReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: WordSource> Read for WordReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.len() < WORD_BYTES {
            return Err(short_buffer());
        }

        let first = match self.source.take() {
            Ok(word) => word,
            Err(QueueShutdown) => return Ok(0),
        };

        let mut chunks = buf.chunks_exact_mut(WORD_BYTES);
        let mut filled = 0;
        let mut next = Some(first);
        while let Some(word) = next {
            let chunk = match chunks.next() {
                Some(chunk) => chunk,
                None => break,
            };
            chunk.copy_from_slice(&word.to_le_bytes());
            filled += WORD_BYTES;

            if chunks.len() == 0 {
                break;
            }
            // Whatever is already queued, without waiting for more
            next = self.source.try_take().unwrap_or(None);
        }
        Ok(filled)
    }
}

/// Byte view of a [`WordSink`]. A shut down sink accepts nothing.
pub struct WordWriter<S> {
    sink: S,
}

impl<S: WordSink> WordWriter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: WordSink> Write for WordWriter<S> {
    /// Consumes whole words only; a trailing partial word is left to the caller
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() < WORD_BYTES {
            return Err(short_buffer());
        }

        let mut written = 0;
        for chunk in buf.chunks_exact(WORD_BYTES) {
            let word = Word::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if self.sink.put(word).is_err() {
                break;
            }
            written += WORD_BYTES;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
