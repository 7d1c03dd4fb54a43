//! Image re-encoding through an external ImageMagick process
//!
//! Walks a fixed quality/scale ladder until the output fits the byte ceiling. When
//! nothing fits, the smallest result seen is returned instead of an error.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use shared::{run_debug, run_warn, RunId};

use crate::error::{PosterError, PosterResult};
use crate::traits::ImageEncoder;
use crate::types::EncodedImage;

pub const DEFAULT_MAGICK_PROGRAM: &str = "magick";

const START_QUALITY: u8 = 90;
const QUALITY_STEP: u8 = 10;
const QUALITY_FLOOR: u8 = 40;
const SCALE_STEP: u8 = 10;
const SCALE_FLOOR: u8 = 50;

/// One re-encode attempt: JPEG quality and resize percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub quality: u8,
    pub scale_percent: u8,
}

/// Quality first, then scale at the quality floor
pub fn attempt_ladder() -> Vec<Attempt> {
    let mut ladder = Vec::new();
    let mut quality = START_QUALITY;
    while quality >= QUALITY_FLOOR {
        ladder.push(Attempt {
            quality,
            scale_percent: 100,
        });
        quality -= QUALITY_STEP;
    }
    let mut scale = 100 - SCALE_STEP;
    while scale >= SCALE_FLOOR {
        ladder.push(Attempt {
            quality: QUALITY_FLOOR,
            scale_percent: scale,
        });
        scale -= SCALE_STEP;
    }
    ladder
}

/// Best-guess MIME type from magic bytes
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        "image/jpeg"
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else {
        "application/octet-stream"
    }
}

/// Encoder shelling out to ImageMagick (`magick` or legacy `convert`)
pub struct MagickEncoder {
    program: String,
}

impl MagickEncoder {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_MAGICK_PROGRAM)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_attempt(&self, input: &[u8], attempt: Attempt) -> PosterResult<Vec<u8>> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-")
            .arg("-auto-orient")
            .arg("-resize")
            .arg(format!("{}%", attempt.scale_percent))
            .arg("-quality")
            .arg(attempt.quality.to_string())
            .arg("jpg:-");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| PosterError::Encode {
            message: format!("failed to spawn {}: {e}", self.program),
        })?;

        // Feed stdin from a task so a large output cannot block the write
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            tokio::spawn(async move {
                let _ = stdin.write_all(&input).await;
                let _ = stdin.shutdown().await;
            })
        });

        let output = child.wait_with_output().await.map_err(|e| PosterError::Encode {
            message: format!("{} did not finish: {e}", self.program),
        })?;
        if let Some(writer) = writer {
            let _ = writer.await;
        }

        if !output.status.success() {
            return Err(PosterError::Encode {
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(output.stdout)
    }
}

impl Default for MagickEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageEncoder for MagickEncoder {
    async fn fit(&self, bytes: Vec<u8>, max_bytes: usize) -> PosterResult<EncodedImage> {
        if bytes.len() <= max_bytes {
            let mime = sniff_mime(&bytes);
            return Ok(EncodedImage::original(bytes, mime));
        }

        let mut best: Option<EncodedImage> = None;
        for attempt in attempt_ladder() {
            let encoded = self.run_attempt(&bytes, attempt).await?;
            if encoded.is_empty() {
                continue;
            }
            run_debug!(
                RunId::current(),
                "🗜️ quality {} scale {}% -> {} bytes (ceiling {})",
                attempt.quality,
                attempt.scale_percent,
                encoded.len(),
                max_bytes
            );

            let candidate = EncodedImage {
                mime: "image/jpeg".to_string(),
                quality: Some(attempt.quality),
                scale_percent: attempt.scale_percent,
                bytes: encoded,
            };
            if candidate.len() <= max_bytes {
                return Ok(candidate);
            }
            if best.as_ref().map_or(true, |b| candidate.len() < b.len()) {
                best = Some(candidate);
            }
        }

        let best = match best {
            Some(b) if b.len() < bytes.len() => b,
            _ => {
                let mime = sniff_mime(&bytes);
                EncodedImage::original(bytes, mime)
            }
        };
        run_warn!(
            RunId::current(),
            "⚠️ Could not fit image under {} bytes, using best effort of {} bytes",
            max_bytes,
            best.len()
        );
        Ok(best)
    }
}
