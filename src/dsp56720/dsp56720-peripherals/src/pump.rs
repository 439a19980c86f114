use std::io::{self, ErrorKind, Read, Write};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};

use crate::stream::{WordReader, WordSink, WordSource, WordWriter, WORD_BYTES};

const BUFFER_SIZE: usize = 4096;

/// Completion report of a pump thread
#[derive(Debug)]
pub enum PumpEvent {
    Finished { name: String, bytes: u64 },
    Failed { name: String, error: io::Error },
}

fn report(events: &Sender<PumpEvent>, name: String, result: io::Result<u64>) {
    let event = match result {
        Ok(bytes) => {
            info!("{}: {} bytes transferred", name, bytes);
            PumpEvent::Finished { name, bytes }
        }
        Err(error) => {
            error!("{}: {}", name, error);
            PumpEvent::Failed { name, error }
        }
    };

    if events.send(event).is_err() {
        debug!("Pump event dropped: no listener");
    }
}

// Copies whole words from `reader` until it ends or the sink shuts down
fn feed<R: Read, S: WordSink>(name: &str, mut reader: R, sink: S) -> io::Result<u64> {
    let mut writer = WordWriter::new(sink);
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut pending = 0;
    let mut total = 0;

    loop {
        let read = match reader.read(&mut buffer[pending..]) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let filled = pending + read;
        let mut offset = 0;
        while filled - offset >= WORD_BYTES {
            let written = writer.write(&buffer[offset..filled])?;
            if written == 0 {
                debug!("{}: stream shut down", name);
                return Ok(total);
            }
            offset += written;
            total += written as u64;
        }

        buffer.copy_within(offset..filled, 0);
        pending = filled - offset;
    }

    if pending > 0 {
        warn!("{}: dropping {} trailing bytes", name, pending);
    }
    Ok(total)
}

/// Streams `reader` into `sink` on a background thread
pub fn spawn_source<R, S>(
    name: &str,
    reader: R,
    sink: S,
    events: Sender<PumpEvent>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
    S: WordSink + Send + 'static,
{
    let name = name.to_string();
    thread::Builder::new().name(name.clone()).spawn(move || {
        let result = feed(&name, reader, sink);
        report(&events, name, result);
    })
}

/// Streams `source` into `writer` on a background thread until the source shuts down
pub fn spawn_drain<S, W>(
    name: &str,
    source: S,
    mut writer: W,
    events: Sender<PumpEvent>,
) -> io::Result<JoinHandle<()>>
where
    S: WordSource + Send + 'static,
    W: Write + Send + 'static,
{
    let name = name.to_string();
    thread::Builder::new().name(name.clone()).spawn(move || {
        let mut reader = WordReader::new(source);
        let result = io::copy(&mut reader, &mut writer).and_then(|bytes| {
            writer.flush()?;
            Ok(bytes)
        });
        report(&events, name, result);
    })
}
