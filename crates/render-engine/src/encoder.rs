//! Export encoding sessions.
//!
//! The encoder owns one ffmpeg child per export: raw RGBA frames go in on
//! stdin, a containerized video comes out. Container/codec selection walks
//! an ordered candidate list against the encoders the local ffmpeg build
//! actually ships; if the recorded container is not broadly interoperable a
//! single deterministic transcode to mp4/h264 runs afterwards, and a failed
//! transcode delivers the original recording instead of failing the job.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use framebooth_common::{BoothError, BoothResult, DeviceClass};
use image::RgbaImage;

/// One container/codec combination the encoder may try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecCandidate {
    pub container: &'static str,
    pub encoder: &'static str,
    pub extension: &'static str,

    /// Whether the result plays everywhere without a transcode pass.
    pub interoperable: bool,
}

/// Candidates in preference order. mp4/h264 first: it is the one
/// combination that needs no follow-up transcode.
pub const CODEC_CANDIDATES: &[CodecCandidate] = &[
    CodecCandidate {
        container: "mp4",
        encoder: "libx264",
        extension: "mp4",
        interoperable: true,
    },
    CodecCandidate {
        container: "mp4",
        encoder: "libx265",
        extension: "mp4",
        interoperable: false,
    },
    CodecCandidate {
        container: "webm",
        encoder: "libvpx-vp9",
        extension: "webm",
        interoperable: false,
    },
    CodecCandidate {
        container: "matroska",
        encoder: "libx264",
        extension: "mkv",
        interoperable: false,
    },
];

/// Bitrate ceiling in kbit/s as a monotonic step function of duration and
/// device class: shorter exports may spend more per second, constrained
/// devices always get the lower ceiling.
pub fn bitrate_kbps(duration_secs: f64, device: DeviceClass) -> u32 {
    let steps: &[(f64, u32)] = match device {
        DeviceClass::Standard => &[(4.0, 12_000), (8.0, 9_000), (15.0, 7_000)],
        DeviceClass::Constrained => &[(4.0, 6_000), (8.0, 4_500), (15.0, 3_500)],
    };
    for (limit, kbps) in steps {
        if duration_secs <= *limit {
            return *kbps;
        }
    }
    match device {
        DeviceClass::Standard => 4_500,
        DeviceClass::Constrained => 2_500,
    }
}

/// Check whether a binary is on PATH.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Names of video encoders the local ffmpeg build supports.
pub fn probe_encoders() -> BoothResult<HashSet<String>> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| BoothError::encode(format!("failed to run ffmpeg -encoders: {e}")))?;
    Ok(parse_encoder_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `ffmpeg -encoders` output into the set of video encoder names.
fn parse_encoder_list(text: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut in_listing = false;
    for line in text.lines() {
        if !in_listing {
            if line.trim_start().starts_with("------") {
                in_listing = true;
            }
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(flags), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if flags.starts_with('V') {
            names.insert(name.to_string());
        }
    }
    names
}

/// First candidate whose encoder the runtime supports.
pub fn pick_candidate(supported: &HashSet<String>) -> Option<&'static CodecCandidate> {
    CODEC_CANDIDATES
        .iter()
        .find(|candidate| supported.contains(candidate.encoder))
}

/// A finished encode.
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub bytes: Vec<u8>,
    pub container: String,
    pub codec: String,
    pub frames: u64,
    pub duration_secs: f64,
}

/// A live ffmpeg encode session consuming raw RGBA frames.
pub struct EncoderSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<std::thread::JoinHandle<String>>,
    output_path: PathBuf,
    candidate: &'static CodecCandidate,
    width: u32,
    height: u32,
    fps: u32,
    frames_written: u64,
}

impl EncoderSession {
    /// Negotiate a codec and start the ffmpeg child.
    ///
    /// Fails fast with [`BoothError::Unsupported`] when no candidate is
    /// viable — no partial file is ever delivered in that case.
    pub fn start(
        width: u32,
        height: u32,
        fps: u32,
        duration_hint_secs: f64,
        device: DeviceClass,
    ) -> BoothResult<Self> {
        if !command_exists("ffmpeg") {
            return Err(BoothError::unsupported(
                "no supported encoder found (expected ffmpeg in PATH)",
            ));
        }

        let supported = probe_encoders()?;
        let candidate = pick_candidate(&supported).ok_or_else(|| {
            BoothError::unsupported(format!(
                "no viable codec/container combination among {:?}",
                CODEC_CANDIDATES
                    .iter()
                    .map(|c| c.encoder)
                    .collect::<Vec<_>>()
            ))
        })?;

        let bitrate = bitrate_kbps(duration_hint_secs, device);
        let output_path = std::env::temp_dir().join(format!(
            "framebooth-export-{}.{}",
            std::process::id(),
            candidate.extension
        ));

        let movflags: &[&str] = if candidate.container == "mp4" {
            &["-movflags", "+faststart"]
        } else {
            &[]
        };
        let mut child = Command::new("ffmpeg")
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{width}x{height}")])
            .args(["-r", &fps.to_string()])
            .args(["-i", "pipe:0"])
            // Output is always silent.
            .arg("-an")
            .args(["-c:v", candidate.encoder])
            .args(["-b:v", &format!("{bitrate}k")])
            .args(["-pix_fmt", "yuv420p"])
            .args(movflags)
            .args(["-f", candidate.container])
            .arg(&output_path)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BoothError::encode(format!("failed to start ffmpeg encode: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BoothError::encode("failed to open ffmpeg encode stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BoothError::encode("failed to capture ffmpeg encode stderr"))?;
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = std::io::BufReader::new(stderr);
            let mut output = String::new();
            reader.read_to_string(&mut output).ok();
            output
        });

        tracing::info!(
            encoder = candidate.encoder,
            container = candidate.container,
            bitrate_kbps = bitrate,
            "encode session started"
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            output_path,
            candidate,
            width,
            height,
            fps,
            frames_written: 0,
        })
    }

    /// Feed one canonical-surface frame to the encoder.
    pub fn write_frame(&mut self, frame: &RgbaImage) -> BoothResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(BoothError::encode(format!(
                "frame size {:?} does not match session {}x{}",
                frame.dimensions(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| BoothError::encode("encode session already finished"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| BoothError::encode(format!("writing frame to encoder: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close the stream, finalize the container, and collect the artifact.
    pub fn finish(mut self) -> BoothResult<EncodedVideo> {
        // Closing stdin signals EOF; ffmpeg then finalizes the container.
        drop(self.stdin.take());

        let status = self
            .child
            .wait()
            .map_err(|e| BoothError::encode(format!("waiting on ffmpeg encode: {e}")))?;
        let stderr_output = self
            .stderr_task
            .take()
            .and_then(|task| task.join().ok())
            .unwrap_or_default();

        if !status.success() {
            std::fs::remove_file(&self.output_path).ok();
            return Err(BoothError::encode(format!(
                "ffmpeg encode failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        if self.frames_written == 0 {
            std::fs::remove_file(&self.output_path).ok();
            return Err(BoothError::encode("encode produced zero frames"));
        }

        let duration_secs = self.frames_written as f64 / self.fps as f64;
        let candidate = self.candidate;

        let (bytes, container, codec) = if candidate.interoperable {
            let bytes = std::fs::read(&self.output_path)?;
            (
                bytes,
                candidate.container.to_string(),
                candidate.encoder.to_string(),
            )
        } else {
            match transcode_to_mp4(&self.output_path) {
                Ok(transcoded_path) => {
                    let bytes = std::fs::read(&transcoded_path)?;
                    std::fs::remove_file(&transcoded_path).ok();
                    (bytes, "mp4".to_string(), "libx264".to_string())
                }
                Err(err) => {
                    // Deliver the original recording rather than failing.
                    tracing::warn!(error = %err, "transcode failed, delivering recorded container");
                    let bytes = std::fs::read(&self.output_path)?;
                    (
                        bytes,
                        candidate.container.to_string(),
                        candidate.encoder.to_string(),
                    )
                }
            }
        };

        std::fs::remove_file(&self.output_path).ok();

        tracing::info!(
            frames = self.frames_written,
            duration_secs,
            container = %container,
            size_bytes = bytes.len(),
            "encode session finished"
        );

        Ok(EncodedVideo {
            bytes,
            container,
            codec,
            frames: self.frames_written,
            duration_secs,
        })
    }

    /// Kill the session and discard partial output.
    pub fn abort(mut self) {
        drop(self.stdin.take());
        self.child.kill().ok();
        self.child.wait().ok();
        if let Some(task) = self.stderr_task.take() {
            task.join().ok();
        }
        std::fs::remove_file(&self.output_path).ok();
        tracing::info!("encode session aborted, partial output discarded");
    }
}

/// One deterministic transcode of a recorded container to mp4/h264.
fn transcode_to_mp4(input: &Path) -> BoothResult<PathBuf> {
    let output = input.with_extension("interop.mp4");
    let result = Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(input)
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-an"])
        .args(["-movflags", "+faststart"])
        .arg(&output)
        .output()
        .map_err(|e| BoothError::encode(format!("failed to start transcode: {e}")))?;

    if !result.status.success() {
        std::fs::remove_file(&output).ok();
        return Err(BoothError::encode(format!(
            "transcode failed: {}",
            String::from_utf8_lossy(&result.stderr).trim()
        )));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_is_monotonic_in_duration() {
        for device in [DeviceClass::Standard, DeviceClass::Constrained] {
            let mut last = u32::MAX;
            for secs in 1..60 {
                let kbps = bitrate_kbps(secs as f64, device);
                assert!(kbps <= last, "bitrate increased at {secs}s");
                last = kbps;
            }
        }
    }

    #[test]
    fn constrained_devices_always_get_lower_ceilings() {
        for secs in [1.0, 5.0, 10.0, 30.0] {
            assert!(
                bitrate_kbps(secs, DeviceClass::Constrained)
                    < bitrate_kbps(secs, DeviceClass::Standard)
            );
        }
    }

    #[test]
    fn shorter_exports_get_higher_ceilings() {
        assert!(
            bitrate_kbps(3.0, DeviceClass::Standard) > bitrate_kbps(30.0, DeviceClass::Standard)
        );
    }

    #[test]
    fn first_candidate_is_the_interoperable_one() {
        assert!(CODEC_CANDIDATES[0].interoperable);
        assert_eq!(CODEC_CANDIDATES[0].container, "mp4");
    }

    #[test]
    fn pick_candidate_respects_preference_order() {
        let all: HashSet<String> = CODEC_CANDIDATES
            .iter()
            .map(|c| c.encoder.to_string())
            .collect();
        assert_eq!(pick_candidate(&all).unwrap().encoder, "libx264");

        let vp9_only: HashSet<String> = ["libvpx-vp9".to_string()].into_iter().collect();
        assert_eq!(pick_candidate(&vp9_only).unwrap().encoder, "libvpx-vp9");

        let none: HashSet<String> = HashSet::new();
        assert!(pick_candidate(&none).is_none());
    }

    #[test]
    fn encoder_list_parsing() {
        let sample = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D libvpx-vp9           libvpx VP9
 A....D aac                  AAC (Advanced Audio Coding)
";
        let encoders = parse_encoder_list(sample);
        assert!(encoders.contains("libx264"));
        assert!(encoders.contains("libvpx-vp9"));
        assert!(!encoders.contains("aac"));
    }
}
