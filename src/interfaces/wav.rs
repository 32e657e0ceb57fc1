//! RIFF/WAVE container I/O for 16-bit linear PCM

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, info};

use crate::core::AudioBuffer;
use crate::protocols::dtmf::PCM_BITS_PER_SAMPLE;
use crate::{Error, Result};

/// Size of the canonical RIFF header hound writes for PCM.
pub const WAV_HEADER_BYTES: usize = 44;

pub fn wav_spec(buffer: &AudioBuffer) -> WavSpec {
    WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: PCM_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// Write `buffer` to a WAV file at `path`.
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &AudioBuffer) -> Result<()> {
    let path = path.as_ref();
    let writer = WavWriter::create(path, wav_spec(buffer))?;
    write_samples(writer, buffer)?;

    info!(
        "Wrote {} ({} frames, {} Hz, {} channel(s))",
        path.display(),
        buffer.len(),
        buffer.sample_rate(),
        buffer.channels()
    );
    Ok(())
}

/// Encode `buffer` as an in-memory WAV file.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_BYTES + buffer.data_bytes()));
    let writer = WavWriter::new(&mut cursor, wav_spec(buffer))?;
    write_samples(writer, buffer)?;
    Ok(cursor.into_inner())
}

pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let buffer = read_samples(WavReader::open(path)?)?;
    debug!("Read {} frames from {}", buffer.len(), path.display());
    Ok(buffer)
}

pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    read_samples(WavReader::new(Cursor::new(bytes))?)
}

fn write_samples<W: Write + Seek>(mut writer: WavWriter<W>, buffer: &AudioBuffer) -> Result<()> {
    for &sample in buffer.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn read_samples<R: Read>(reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != PCM_BITS_PER_SAMPLE {
        return Err(Error::configuration_mismatch(format!(
            "expected {}-bit integer PCM, found {}-bit {:?}",
            PCM_BITS_PER_SAMPLE, spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    AudioBuffer::from_interleaved(spec.sample_rate, spec.channels, samples)
}
