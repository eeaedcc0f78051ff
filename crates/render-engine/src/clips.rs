//! Clip sources for the video export path.
//!
//! Each photo slot on the video path is backed by an independently-timed
//! clip. Clips are decoded up front into frame buffers at the synthesis
//! frame rate by piping ffmpeg's rawvideo output; booth clips are a few
//! seconds long, so the whole clip fits comfortably in memory and the draw
//! loop never waits on a decoder.
//!
//! Decoding is bounded by a per-clip readiness deadline. A clip that cannot
//! produce frames in time degrades its slot to a placeholder; it never
//! stalls the job.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use framebooth_common::{BoothError, BoothResult};
use framebooth_layout_model::CapturedClip;
use image::RgbaImage;

/// Video stream metadata from ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipProbe {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

/// Probe a clip's dimensions and duration.
pub fn probe_clip(path: &Path) -> BoothResult<ClipProbe> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map_err(|e| BoothError::asset(format!("failed to start ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(BoothError::asset(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut lines = raw.lines();
    let stream_line = lines
        .next()
        .ok_or_else(|| BoothError::asset("ffprobe returned no stream info"))?;
    let (w, h) = stream_line
        .trim()
        .split_once(',')
        .ok_or_else(|| BoothError::asset(format!("unparseable ffprobe output: {stream_line}")))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| BoothError::asset(format!("bad stream width: {w}")))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| BoothError::asset(format!("bad stream height: {h}")))?;

    let duration_secs = lines
        .next()
        .and_then(|line| line.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(ClipProbe {
        width,
        height,
        duration_secs,
    })
}

/// A fully decoded, independently-playable clip.
#[derive(Debug)]
pub struct ClipSource {
    pub id: String,
    frames: Vec<RgbaImage>,
    fps: u32,
}

impl ClipSource {
    /// Decode a clip into frame buffers at `fps`.
    ///
    /// `deadline` bounds the whole decode; on overrun the ffmpeg child is
    /// killed and an error returned so the caller can degrade the slot.
    /// Mirrored clips are flipped frame-by-frame, matching how the paired
    /// still photo was mirrored at capture time.
    pub fn open(clip: &CapturedClip, fps: u32, deadline: Duration) -> BoothResult<Self> {
        let started = Instant::now();
        let probe = probe_clip(&clip.path)?;
        let frame_bytes = probe.width as usize * probe.height as usize * 4;

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(&clip.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-r", &fps.to_string()])
            .arg("pipe:1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BoothError::asset(format!("failed to start ffmpeg decode: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| BoothError::asset("failed to capture ffmpeg decode stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BoothError::asset("failed to capture ffmpeg decode stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = std::io::BufReader::new(stderr);
            let mut output = String::new();
            reader.read_to_string(&mut output).ok();
            output
        });

        let mut frames = Vec::new();
        let mut buffer = vec![0u8; frame_bytes];
        loop {
            if started.elapsed() > deadline {
                child.kill().ok();
                child.wait().ok();
                return Err(BoothError::asset(format!(
                    "clip {} did not become playable within {:.1}s",
                    clip.id,
                    deadline.as_secs_f64()
                )));
            }

            match read_exact_frame(&mut stdout, &mut buffer) {
                Ok(true) => {
                    let mut frame =
                        RgbaImage::from_raw(probe.width, probe.height, buffer.clone())
                            .ok_or_else(|| BoothError::asset("rawvideo frame size mismatch"))?;
                    if clip.mirrored {
                        image::imageops::flip_horizontal_in_place(&mut frame);
                    }
                    frames.push(frame);
                }
                Ok(false) => break,
                Err(err) => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(BoothError::asset(format!(
                        "reading decoded frames for clip {}: {err}",
                        clip.id
                    )));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| BoothError::asset(format!("waiting on ffmpeg decode: {e}")))?;
        let stderr_output = stderr_task.join().unwrap_or_default();

        if !status.success() {
            return Err(BoothError::asset(format!(
                "ffmpeg decode failed for clip {} (status {}): {}",
                clip.id,
                status,
                stderr_output.trim()
            )));
        }
        if frames.is_empty() {
            return Err(BoothError::asset(format!(
                "clip {} decoded to zero frames",
                clip.id
            )));
        }

        tracing::debug!(
            clip = %clip.id,
            frames = frames.len(),
            decode_ms = started.elapsed().as_millis(),
            "clip decoded"
        );

        Ok(Self {
            id: clip.id.clone(),
            frames,
            fps,
        })
    }

    /// Playable duration based on what actually decoded.
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.fps as f64
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The frame at media time `t`. After the clip ends the final frame is
    /// held so a short clip does not blank its slot while longer ones play
    /// out.
    pub fn frame_at(&self, t_secs: f64) -> &RgbaImage {
        let index = (t_secs.max(0.0) * self.fps as f64).floor() as usize;
        &self.frames[index.min(self.frames.len() - 1)]
    }

    /// Whether playback has run past the last decoded frame.
    pub fn has_ended(&self, t_secs: f64) -> bool {
        (t_secs.max(0.0) * self.fps as f64).floor() as usize >= self.frames.len()
    }

    /// Build a source directly from frames. Intended for tests and callers
    /// that already hold decoded video.
    pub fn from_frames(id: impl Into<String>, frames: Vec<RgbaImage>, fps: u32) -> Self {
        Self {
            id: id.into(),
            frames,
            fps,
        }
    }
}

/// Read one full frame; `Ok(false)` on clean EOF at a frame boundary.
fn read_exact_frame(reader: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated rawvideo frame",
            ));
        }
        filled += n;
    }
    Ok(true)
}

/// Open every clip in parallel, awaiting each readiness with the bounded
/// per-clip deadline. A clip that fails or times out yields `None` so its
/// slots degrade to placeholders while synthesis continues.
pub async fn open_all(
    clips: &[CapturedClip],
    fps: u32,
    ready_timeout_secs: f64,
) -> Vec<Option<ClipSource>> {
    let deadline = Duration::from_secs_f64(ready_timeout_secs.max(0.1));

    let handles: Vec<_> = clips
        .iter()
        .cloned()
        .map(|clip| tokio::task::spawn_blocking(move || ClipSource::open(&clip, fps, deadline)))
        .collect();

    let mut sources = Vec::with_capacity(handles.len());
    for (handle, clip) in handles.into_iter().zip(clips) {
        match handle.await {
            Ok(Ok(source)) => sources.push(Some(source)),
            Ok(Err(err)) => {
                tracing::warn!(clip = %clip.id, error = %err, "clip unavailable, slot degrades to placeholder");
                sources.push(None);
            }
            Err(err) => {
                tracing::warn!(clip = %clip.id, error = %err, "clip decode task panicked");
                sources.push(None);
            }
        }
    }
    sources
}
