use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    driver::Size,
    error::{MaplapseError, MaplapseResult},
};

/// Sequence pattern matching [`frame_filename`](crate::scrape::frame_filename).
pub const SEQUENCE_PATTERN: &str = "%06d.png";

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Runs the external encoder once over a completed image sequence.
///
/// We intentionally shell out to the system `ffmpeg` binary; the image
/// sequence on disk is the real interface, and a failed encode leaves it
/// intact for manual re-encoding.
#[derive(Clone, Debug)]
pub struct VideoEncoder {
    image_dir: PathBuf,
    pattern: String,
}

impl VideoEncoder {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            pattern: SEQUENCE_PATTERN.to_string(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Build the ffmpeg argument list (everything except the program name).
    ///
    /// With `override_args` false, `extra` is appended to the fixed contract:
    /// `-f image2 -framerate <rate> -i <dir>/<pattern> -s <W>x<H> [extra] <out>`.
    /// With `override_args` true, `extra` replaces everything before `<out>`.
    pub fn build_args(
        &self,
        outfile: &Path,
        resolution: Size,
        framerate: u32,
        extra: &[String],
        override_args: bool,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if override_args {
            args.extend(extra.iter().map(OsString::from));
        } else {
            args.extend(["-f", "image2", "-framerate"].map(OsString::from));
            args.push(framerate.to_string().into());
            args.push("-i".into());
            args.push(self.image_dir.join(&self.pattern).into_os_string());
            args.push("-s".into());
            args.push(format!("{}x{}", resolution.width, resolution.height).into());
            args.extend(extra.iter().map(OsString::from));
        }
        args.push(outfile.as_os_str().to_os_string());
        args
    }

    pub fn encode(
        &self,
        outfile: &Path,
        resolution: Size,
        framerate: u32,
        extra: &[String],
        override_args: bool,
    ) -> MaplapseResult<()> {
        if !is_ffmpeg_on_path() {
            return Err(MaplapseError::encode(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let args = self.build_args(outfile, resolution, framerate, extra, override_args);
        tracing::info!(out = %outfile.display(), "running ffmpeg");

        let output = Command::new("ffmpeg")
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| MaplapseError::encode(format!("failed to spawn ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MaplapseError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
