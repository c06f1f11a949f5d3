//! Music playback plumbing.
//!
//! The tune itself comes from a [`TrackerDecoder`]; [`MusicStream`] turns it
//! into the interleaved 16-bit stereo bytes an audio backend pulls, and
//! [`MusicPlayback`] starts a backend once and shrugs off its failures.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_VOLUME: f64 = 0.5;

const DECODE_CHUNK: usize = 4096;
const BYTES_PER_FRAME: usize = 4;

/// Mono PCM source, e.g. a chiptune replayer.
pub trait TrackerDecoder: Send {
    /// Fills `out` with the next samples. Returns false once the tune has
    /// ended; the tail of `out` is then silence.
    fn compute(&mut self, out: &mut [i16]) -> bool;
}

struct StreamState<D> {
    decoder: D,
    scratch: Vec<i16>,
    looping: bool,
    volume: f64,
    position: u64,
    finished: bool,
}

/// Pull-based stereo s16le stream over a decoder. Safe to read from the
/// audio thread while the frame loop holds a shared reference.
pub struct MusicStream<D> {
    state: Mutex<StreamState<D>>,
}

impl<D: TrackerDecoder> MusicStream<D> {
    pub fn new(decoder: D, looping: bool, volume: f64) -> Self {
        Self {
            state: Mutex::new(StreamState {
                decoder,
                scratch: vec![0; DECODE_CHUNK],
                looping,
                volume,
                position: 0,
                finished: false,
            }),
        }
    }

    /// Samples (per channel) produced so far.
    pub fn position(&self) -> u64 {
        self.state.lock().map(|state| state.position).unwrap_or(0)
    }

    /// Fills whole stereo frames of `buf`. Returns 0 once a non-looping
    /// tune has been fully delivered.
    pub fn fill(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "music stream lock poisoned"))?;
        let state = &mut *guard;
        if state.finished {
            return Ok(0);
        }

        let frames_needed = buf.len() / BYTES_PER_FRAME;
        let mut processed = 0;
        while processed < frames_needed {
            let chunk = (frames_needed - processed).min(state.scratch.len());
            let more = state.decoder.compute(&mut state.scratch[..chunk]);
            if !more && !state.looping {
                buf[processed * BYTES_PER_FRAME..frames_needed * BYTES_PER_FRAME].fill(0);
                state.finished = true;
                break;
            }

            for (i, &sample) in state.scratch[..chunk].iter().enumerate() {
                let scaled = (sample as f64 * state.volume) as i16;
                let at = (processed + i) * BYTES_PER_FRAME;
                let bytes = scaled.to_le_bytes();
                buf[at..at + 2].copy_from_slice(&bytes);
                buf[at + 2..at + 4].copy_from_slice(&bytes);
            }
            processed += chunk;
            state.position += chunk as u64;
        }

        Ok(frames_needed * BYTES_PER_FRAME)
    }
}

impl<D: TrackerDecoder> Read for MusicStream<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill(buf)
    }
}

/// An audio output that plays a music stream.
pub trait AudioSink {
    fn play(&mut self) -> Result<()>;

    /// Offline backends advance by `sample_frames` per host frame;
    /// real-time ones pull on their own and ignore this.
    fn pull(&mut self, _sample_frames: usize) -> Result<()> {
        Ok(())
    }
}

/// Owns the optional audio sink and makes starting it idempotent.
pub struct MusicPlayback {
    sink: Option<Box<dyn AudioSink>>,
    started: bool,
}

impl MusicPlayback {
    pub fn new(sink: Option<Box<dyn AudioSink>>) -> Self {
        Self {
            sink,
            started: false,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.sink.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn start(&mut self) {
        if self.started {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        match sink.play() {
            Ok(()) => self.started = true,
            Err(error) => {
                warn!("audio playback failed to start, continuing without music: {error:#}");
                self.sink = None;
            }
        }
    }

    pub fn pump(&mut self, sample_frames: usize) {
        if !self.started {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(error) = sink.pull(sample_frames) {
            warn!("audio output failed, disabling music: {error:#}");
            self.sink = None;
        }
    }
}

/// Headless backend: appends raw s16le stereo PCM to a file.
pub struct PcmFileSink<D> {
    stream: MusicStream<D>,
    out: BufWriter<File>,
    buffer: Vec<u8>,
    playing: bool,
}

impl<D: TrackerDecoder> PcmFileSink<D> {
    pub fn create(path: &Path, stream: MusicStream<D>) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create audio output {}", path.display()))?;
        Ok(Self {
            stream,
            out: BufWriter::new(file),
            buffer: Vec::new(),
            playing: false,
        })
    }
}

impl<D: TrackerDecoder> AudioSink for PcmFileSink<D> {
    fn play(&mut self) -> Result<()> {
        self.playing = true;
        info!("music started");
        Ok(())
    }

    fn pull(&mut self, sample_frames: usize) -> Result<()> {
        if !self.playing {
            return Ok(());
        }
        self.buffer.resize(sample_frames * BYTES_PER_FRAME, 0);
        let written = self.stream.fill(&mut self.buffer)?;
        self.out
            .write_all(&self.buffer[..written])
            .context("failed to write audio samples")?;
        self.out.flush().context("failed to flush audio samples")
    }
}

/// Built-in square-wave tune: a bass line with a VBL-rate major arpeggio on
/// top, in the spirit of a three-voice PSG chip.
#[derive(Debug, Clone)]
pub struct PsgTune {
    sample_rate: u32,
    looping: bool,
    cursor: u64,
}

const TUNE_BASS: [i32; 16] = [0, 0, 12, 0, 3, 3, 15, 3, 5, 5, 17, 5, 7, 7, 19, 10];
const TUNE_ARPEGGIO: [i32; 3] = [0, 4, 7];
const TUNE_STEPS_PER_SECOND: u64 = 8;
const TUNE_PASSES: u64 = 4;
const TUNE_BASE_HZ: f64 = 110.0;
const TUNE_AMPLITUDE: i16 = 6000;

impl PsgTune {
    pub fn new(sample_rate: u32, looping: bool) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            looping,
            cursor: 0,
        }
    }

    fn samples_per_step(&self) -> u64 {
        (self.sample_rate as u64 / TUNE_STEPS_PER_SECOND).max(1)
    }

    /// Length of the tune before it loops or ends.
    pub fn length_samples(&self) -> u64 {
        self.samples_per_step() * TUNE_BASS.len() as u64 * TUNE_PASSES
    }

    fn sample_at(&self, cursor: u64) -> i16 {
        let rate = self.sample_rate as u64;
        let step = (cursor / self.samples_per_step()) as usize % TUNE_BASS.len();
        let vbl = (cursor * 50 / rate) as usize;
        let t = cursor as f64 / rate as f64;

        let square = |semitones: i32| {
            let hz = TUNE_BASE_HZ * 2f64.powf(semitones as f64 / 12.0);
            if (t * hz).fract() < 0.5 {
                1
            } else {
                -1
            }
        };
        let bass = square(TUNE_BASS[step]);
        let lead = square(TUNE_BASS[step] + 24 + TUNE_ARPEGGIO[vbl % TUNE_ARPEGGIO.len()]);
        (bass + lead) as i16 * (TUNE_AMPLITUDE / 2)
    }
}

impl TrackerDecoder for PsgTune {
    fn compute(&mut self, out: &mut [i16]) -> bool {
        let length = self.length_samples();
        for (i, slot) in out.iter_mut().enumerate() {
            if self.cursor >= length {
                if !self.looping {
                    out[i..].fill(0);
                    return false;
                }
                self.cursor = 0;
            }
            *slot = self.sample_at(self.cursor);
            self.cursor += 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::thread;

    use anyhow::bail;
    use tempfile::tempdir;

    struct Ramp {
        next: i16,
        remaining: usize,
    }

    impl TrackerDecoder for Ramp {
        fn compute(&mut self, out: &mut [i16]) -> bool {
            for slot in out.iter_mut() {
                if self.remaining == 0 {
                    *slot = 0;
                    continue;
                }
                *slot = self.next;
                self.next += 100;
                self.remaining -= 1;
            }
            self.remaining > 0
        }
    }

    fn sample(bytes: &[u8], frame: usize, channel: usize) -> i16 {
        let at = frame * 4 + channel * 2;
        i16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    #[test]
    fn duplicates_mono_into_both_channels_at_volume() {
        let stream = MusicStream::new(Ramp { next: 1000, remaining: 100 }, false, 0.5);
        let mut buf = vec![0u8; 16];
        assert_eq!(stream.fill(&mut buf).expect("fill"), 16);
        assert_eq!(sample(&buf, 0, 0), 500);
        assert_eq!(sample(&buf, 0, 1), 500);
        assert_eq!(sample(&buf, 3, 1), 650);
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn non_looping_stream_zero_fills_then_ends() {
        let mut stream = MusicStream::new(Ramp { next: 100, remaining: 2 }, false, 1.0);
        let mut buf = vec![0xAAu8; 16];
        assert_eq!(stream.read(&mut buf).expect("read"), 16);
        assert!(buf.iter().all(|&byte| byte == 0));
        assert_eq!(stream.read(&mut buf).expect("read"), 0);
    }

    #[test]
    fn looping_stream_keeps_producing() {
        let stream = MusicStream::new(PsgTune::new(8_000, true), true, 1.0);
        let tune_bytes = PsgTune::new(8_000, true).length_samples() as usize * 4;
        let mut buf = vec![0u8; tune_bytes + 400];
        assert_eq!(stream.fill(&mut buf).expect("fill"), buf.len());
        assert_eq!(stream.fill(&mut buf).expect("fill"), buf.len());
    }

    #[test]
    fn stream_can_be_pulled_from_another_thread() {
        let stream = Arc::new(MusicStream::new(PsgTune::new(8_000, true), true, 0.5));
        let reader = Arc::clone(&stream);
        let handle = thread::spawn(move || {
            let mut buf = vec![0u8; 4096];
            reader.fill(&mut buf).expect("fill")
        });
        let mut buf = vec![0u8; 4096];
        stream.fill(&mut buf).expect("fill");
        assert_eq!(handle.join().expect("reader thread"), 4096);
        assert_eq!(stream.position(), 2048);
    }

    #[test]
    fn psg_tune_ends_when_not_looping() {
        let mut tune = PsgTune::new(800, false);
        let mut out = vec![1i16; tune.length_samples() as usize + 10];
        assert!(!tune.compute(&mut out));
        assert!(out[out.len() - 10..].iter().all(|&s| s == 0));
        assert!(out.iter().any(|&s| s != 0));
    }

    struct CountingSink {
        plays: Rc<Cell<u32>>,
        fail: bool,
    }

    impl AudioSink for CountingSink {
        fn play(&mut self) -> Result<()> {
            self.plays.set(self.plays.get() + 1);
            if self.fail {
                bail!("no device");
            }
            Ok(())
        }
    }

    #[test]
    fn start_is_idempotent() {
        let plays = Rc::new(Cell::new(0));
        let mut playback = MusicPlayback::new(Some(Box::new(CountingSink {
            plays: Rc::clone(&plays),
            fail: false,
        })));
        playback.start();
        playback.start();
        assert!(playback.is_started());
        assert_eq!(plays.get(), 1);
    }

    #[test]
    fn failed_start_disables_audio() {
        let plays = Rc::new(Cell::new(0));
        let mut playback = MusicPlayback::new(Some(Box::new(CountingSink {
            plays: Rc::clone(&plays),
            fail: true,
        })));
        playback.start();
        playback.start();
        assert!(!playback.is_available());
        assert!(!playback.is_started());
        assert_eq!(plays.get(), 1);
    }

    #[test]
    fn missing_sink_is_a_no_op() {
        let mut playback = MusicPlayback::disabled();
        playback.start();
        playback.pump(882);
        assert!(!playback.is_started());
    }

    #[test]
    fn pcm_file_sink_writes_pulled_frames() {
        let dir = tempdir().expect("tempdir should create");
        let path = dir.path().join("music.pcm");
        let stream = MusicStream::new(PsgTune::new(DEFAULT_SAMPLE_RATE, true), true, 0.5);
        let sink = PcmFileSink::create(&path, stream).expect("sink");

        let mut playback = MusicPlayback::new(Some(Box::new(sink)));
        playback.pump(882);
        playback.start();
        playback.pump(882);
        playback.pump(882);
        drop(playback);

        let written = std::fs::metadata(&path).expect("pcm file").len();
        assert_eq!(written, 2 * 882 * 4);
    }
}
