//! Frame sinks for headless renders.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;
use tiny_skia::Pixmap;

pub trait FrameSink {
    fn write_frame(&mut self, frame: &Pixmap) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Picks a sink from the output path: a directory (or a path without an
/// extension) gets a PNG sequence, anything else is encoded by ffmpeg.
pub fn open_sink(path: &Path, width: u32, height: u32, fps: u32) -> Result<Box<dyn FrameSink>> {
    if path.is_dir() || path.extension().is_none() {
        Ok(Box::new(PngSequence::create(path)?))
    } else {
        Ok(Box::new(FfmpegPipe::spawn(path, width, height, fps)?))
    }
}

/// Straight-alpha RGBA bytes of a premultiplied pixmap.
pub fn unpremultiplied_rgba(frame: &Pixmap) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frame.data().len());
    for pixel in frame.pixels() {
        let color = pixel.demultiply();
        bytes.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    bytes
}

/// One `frame_00000.png` per frame.
pub struct PngSequence {
    dir: PathBuf,
    next: u32,
}

impl PngSequence {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create frame directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            next: 0,
        })
    }

    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("frame_{index:05}.png"))
    }
}

impl FrameSink for PngSequence {
    fn write_frame(&mut self, frame: &Pixmap) -> Result<()> {
        let path = self.frame_path(self.next);
        let image = RgbaImage::from_raw(frame.width(), frame.height(), unpremultiplied_rgba(frame))
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.next += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Raw RGBA frames piped into a system ffmpeg from a writer thread.
pub struct FfmpegPipe {
    sender: Option<mpsc::SyncSender<Vec<u8>>>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl FfmpegPipe {
    pub fn spawn(output_path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        let path_str = output_path.to_string_lossy();
        if path_str.chars().any(|c| c.is_control()) {
            bail!("output path contains control characters");
        }

        let args = ffmpeg_args(&format!("{width}x{height}"), &fps.to_string(), output_path);
        let (sender, receiver) = mpsc::sync_channel::<Vec<u8>>(4);
        let worker = thread::Builder::new()
            .name("dom-intro-ffmpeg".to_owned())
            .spawn(move || run_ffmpeg_process(Path::new("ffmpeg"), receiver, &args))
            .context("failed to spawn ffmpeg writer thread")?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn join(&mut self) -> Result<()> {
        drop(self.sender.take());

        let handle = self
            .worker
            .take()
            .ok_or_else(|| anyhow!("ffmpeg worker thread missing"))?;
        match handle.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("ffmpeg worker thread panicked")),
        }
    }
}

impl FrameSink for FfmpegPipe {
    fn write_frame(&mut self, frame: &Pixmap) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("encoder has already been finalized"))?;
        if sender.send(unpremultiplied_rgba(frame)).is_ok() {
            return Ok(());
        }
        // the worker hung up early; surface its error instead
        match self.join() {
            Ok(()) => Err(anyhow!("ffmpeg stopped accepting frames")),
            Err(error) => Err(error),
        }
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.join()
    }
}

fn run_ffmpeg_process(
    ffmpeg_path: &Path,
    receiver: mpsc::Receiver<Vec<u8>>,
    args: &[String],
) -> Result<()> {
    let mut child = Command::new(ffmpeg_path)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                anyhow!(
                    "ffmpeg executable not found ({}). Install ffmpeg or render to a directory of PNGs instead.",
                    ffmpeg_path.display()
                )
            } else {
                anyhow!(
                    "failed to spawn ffmpeg (args='{}'): {error}",
                    args.join(" ")
                )
            }
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("failed to capture ffmpeg stdin"))?;
    let mut stderr_pipe = child.stderr.take();

    while let Ok(frame) = receiver.recv() {
        stdin
            .write_all(&frame)
            .context("failed to write frame to ffmpeg stdin")?;
    }

    stdin.flush().context("failed to flush ffmpeg stdin")?;
    drop(stdin);

    let status = child.wait().context("failed waiting for ffmpeg process")?;
    let stderr_tail = read_stderr_tail(&mut stderr_pipe)?;
    if !status.success() {
        bail!(
            "ffmpeg failed with status {status} (args='{}', stderr_tail='{}')",
            args.join(" "),
            stderr_tail
        );
    }

    Ok(())
}

fn ffmpeg_args(size: &str, fps: &str, output_path: &Path) -> Vec<String> {
    let mut args = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s:v",
        size,
        "-r",
        fps,
        "-i",
        "-",
        "-an",
        "-pix_fmt",
        "yuv420p",
    ]
    .map(str::to_owned)
    .to_vec();
    args.push(output_path.to_string_lossy().into_owned());
    args
}

fn read_stderr_tail(stderr: &mut Option<std::process::ChildStderr>) -> Result<String> {
    let Some(mut pipe) = stderr.take() else {
        return Ok(String::new());
    };
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)
        .context("failed reading ffmpeg stderr")?;
    let text = String::from_utf8_lossy(&buf);
    let chars = text.chars().collect::<Vec<_>>();
    let tail = &chars[chars.len().saturating_sub(500)..];
    Ok(tail.iter().collect::<String>().trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::{Color, PremultipliedColorU8};

    #[test]
    fn png_sequence_numbers_frames() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("frames");
        let mut sink = PngSequence::create(&dir).expect("sink");
        let mut frame = Pixmap::new(4, 2).expect("frame");
        frame.fill(Color::from_rgba8(10, 20, 30, 255));

        sink.write_frame(&frame).expect("first frame");
        sink.write_frame(&frame).expect("second frame");

        assert!(dir.join("frame_00000.png").is_file());
        assert!(dir.join("frame_00001.png").is_file());
        let decoded = image::open(dir.join("frame_00001.png"))
            .expect("decode")
            .into_rgba8();
        assert_eq!(decoded.dimensions(), (4, 2));
        assert_eq!(decoded.get_pixel(3, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn rgba_output_is_demultiplied() {
        let mut frame = Pixmap::new(1, 1).expect("frame");
        frame.pixels_mut()[0] = PremultipliedColorU8::from_rgba(100, 50, 0, 128).expect("color");
        let rgba = unpremultiplied_rgba(&frame);
        assert_eq!(rgba[3], 128);
        assert!(rgba[0] > 190);
    }

    #[test]
    fn ffmpeg_reads_raw_rgba_from_stdin() {
        let args = ffmpeg_args("768x540", "60", Path::new("out.mp4"));
        let input = args.iter().position(|arg| arg == "-i").expect("input flag");
        assert_eq!(args[input + 1], "-");
        assert!(args
            .windows(2)
            .any(|pair| pair[0] == "-s:v" && pair[1] == "768x540"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn extensionless_output_is_a_png_sequence() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink = open_sink(&temp.path().join("frames"), 8, 8, 60).expect("sink");
        sink.finish().expect("finish");
        assert!(temp.path().join("frames").is_dir());
    }
}
