//! Sequential frame sources.
//!
//! Frames of one video must be consumed strictly in order; a source hands
//! out each frame exactly once and reports exhaustion with `Ok(None)`.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};
use crate::RgbImage;

/// Source of decoded frames for one video.
#[async_trait]
pub trait FrameSource: Send {
    /// Pull the next frame, or `None` once the video is exhausted.
    async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>>;
}

/// Decodes a video file through an FFmpeg `rawvideo` pipe, one frame per read.
pub struct FfmpegFrameSource {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    info: VideoInfo,
    buffer: Vec<u8>,
    frames_read: u64,
    finished: bool,
}

impl FfmpegFrameSource {
    /// Probe `path` and start decoding it.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let info = probe_video(path).await?;

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-pix_fmt", "rgb24", "-f", "rawvideo", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Spawning FFmpeg decoder for {}", path.display());

        let mut child = cmd.spawn().map_err(|e| {
            MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None)
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None)
        })?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut out = String::new();
                let _ = stderr.read_to_string(&mut out).await;
                out
            })
        });

        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            "Decoding {}",
            path.display()
        );

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            stderr_task,
            buffer: vec![0u8; info.rgb_frame_len()],
            info,
            frames_read: 0,
            finished: false,
        })
    }

    /// Stream information from the probe.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    async fn finish(&mut self) -> MediaResult<()> {
        self.finished = true;

        let status = self.child.wait().await.map_err(|e| {
            MediaError::ffmpeg_failed(format!("FFmpeg process error: {}", e), None, None)
        })?;

        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with an error while decoding",
                Some(stderr),
                status.code(),
            ));
        }

        debug!("FFmpeg decoder finished after {} frames", self.frames_read);
        Ok(())
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        let filled = read_full(&mut self.stdout, &mut self.buffer).await?;
        if filled == 0 {
            self.finish().await?;
            return Ok(None);
        }
        if filled < self.buffer.len() {
            self.finished = true;
            return Err(MediaError::TruncatedFrame {
                expected: self.buffer.len(),
                got: filled,
            });
        }

        self.frames_read += 1;
        let image = RgbImage::from_raw(self.info.width, self.info.height, self.buffer.clone())
            .ok_or_else(|| MediaError::invalid_video("Frame buffer does not match dimensions"))?;
        Ok(Some(image))
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> MediaResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Frame source over frames already held in memory.
#[derive(Debug, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<RgbImage>,
}

impl MemoryFrameSource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

#[async_trait]
impl FrameSource for MemoryFrameSource {
    async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_yields_in_order_then_none() {
        let frames = (0..3u8).map(|i| RgbImage::from_pixel(2, 2, image::Rgb([i, i, i])));
        let mut source = MemoryFrameSource::new(frames);

        for expected in 0..3u8 {
            let frame = source.next_frame().await.unwrap().unwrap();
            assert_eq!(frame.get_pixel(0, 0).0, [expected; 3]);
        }
        assert!(source.next_frame().await.unwrap().is_none());
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_full_reports_partial_reads() {
        let data = vec![7u8; 10];
        let mut reader = &data[..];
        let mut buf = vec![0u8; 6];

        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 6);
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 0);
    }
}
