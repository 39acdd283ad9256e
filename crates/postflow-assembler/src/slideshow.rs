//! Slideshow rendering via ffmpeg.
//!
//! Each image becomes a fixed-duration clip, letterboxed onto a black
//! 1920x1080 frame without upscaling, concatenated in natural filename
//! order. Music, when present, is looped or trimmed to the video length at
//! reduced volume.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;

use postflow_core::config::SlideshowConfig;

const TARGET_WIDTH: u32 = 1920;
const TARGET_HEIGHT: u32 = 1080;
const VIDEO_BITRATE: &str = "8000k";
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone)]
pub struct SlideshowOptions {
    pub fps: u32,
    pub seconds_per_image: f64,
    pub music_volume: f64,
}

impl From<&SlideshowConfig> for SlideshowOptions {
    fn from(cfg: &SlideshowConfig) -> Self {
        Self {
            fps: cfg.fps,
            seconds_per_image: cfg.seconds_per_image,
            music_volume: cfg.music_volume,
        }
    }
}

/// Segment of a filename for natural ordering: digit runs compare
/// numerically, everything else case-insensitively.
#[derive(Debug, PartialEq, Eq)]
enum SortSegment {
    Number(u64),
    Text(String),
}

fn natural_sort_key(s: &str) -> Vec<SortSegment> {
    let mut segments = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !text.is_empty() {
                segments.push(SortSegment::Text(std::mem::take(&mut text).to_lowercase()));
            }
            digits.push(c);
        } else {
            if !digits.is_empty() {
                let value = std::mem::take(&mut digits).parse().unwrap_or(u64::MAX);
                segments.push(SortSegment::Number(value));
            }
            text.push(c);
        }
    }
    if !digits.is_empty() {
        segments.push(SortSegment::Number(digits.parse().unwrap_or(u64::MAX)));
    }
    if !text.is_empty() {
        segments.push(SortSegment::Text(text.to_lowercase()));
    }
    segments
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ka, kb) = (natural_sort_key(a), natural_sort_key(b));
    for (sa, sb) in ka.iter().zip(kb.iter()) {
        let ord = match (sa, sb) {
            (SortSegment::Number(x), SortSegment::Number(y)) => x.cmp(y),
            (SortSegment::Text(x), SortSegment::Text(y)) => x.cmp(y),
            (SortSegment::Number(_), SortSegment::Text(_)) => Ordering::Less,
            (SortSegment::Text(_), SortSegment::Number(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ka.len().cmp(&kb.len())
}

/// Image files in `dir`, naturally sorted by filename.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read images directory {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();

    images.sort_by(|a, b| {
        let name_a = a.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let name_b = b.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        natural_cmp(name_a, name_b)
    });
    Ok(images)
}

/// Build the full ffmpeg argument list. Pure function, unit-tested
/// separately from process execution.
pub fn build_ffmpeg_args(
    images: &[PathBuf],
    music: Option<&Path>,
    output: &Path,
    options: &SlideshowOptions,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    for image in images {
        args.extend_from_slice(&[
            "-loop".to_string(),
            "1".to_string(),
            "-t".to_string(),
            format!("{}", options.seconds_per_image),
            "-i".to_string(),
            image.to_string_lossy().to_string(),
        ]);
    }
    if let Some(music) = music {
        args.extend_from_slice(&[
            "-stream_loop".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            music.to_string_lossy().to_string(),
        ]);
    }

    // Cap each image at the frame size (never upscale), letterbox onto
    // black, then concatenate.
    let mut filter = String::new();
    for i in 0..images.len() {
        filter.push_str(&format!(
            "[{i}:v]scale=w='min(iw,{w})':h='min(ih,{h})':force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps}[v{i}];",
            i = i,
            w = TARGET_WIDTH,
            h = TARGET_HEIGHT,
            fps = options.fps,
        ));
    }
    for i in 0..images.len() {
        filter.push_str(&format!("[v{}]", i));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=0[v]", images.len()));
    if music.is_some() {
        filter.push_str(&format!(
            ";[{}:a]volume={}[a]",
            images.len(),
            options.music_volume
        ));
    }

    args.extend_from_slice(&["-filter_complex".to_string(), filter]);
    args.extend_from_slice(&["-map".to_string(), "[v]".to_string()]);
    if music.is_some() {
        args.extend_from_slice(&[
            "-map".to_string(),
            "[a]".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-shortest".to_string(),
        ]);
    }
    args.extend_from_slice(&[
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "slow".to_string(),
        "-b:v".to_string(),
        VIDEO_BITRATE.to_string(),
        "-r".to_string(),
        options.fps.to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]);

    args
}

pub struct SlideshowBuilder {
    ffmpeg_path: String,
}

impl SlideshowBuilder {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Render the slideshow to `output`.
    pub async fn render(
        &self,
        images: &[PathBuf],
        music: Option<&Path>,
        output: &Path,
        options: &SlideshowOptions,
    ) -> Result<()> {
        if images.is_empty() {
            return Err(anyhow!("No images found to create a video"));
        }

        let args = build_ffmpeg_args(images, music, output, options);
        tracing::info!(
            images = images.len(),
            with_music = music.is_some(),
            output = %output.display(),
            "Rendering slideshow"
        );

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!("FFmpeg failed: {}", stderr));
        }

        tracing::info!(output = %output.display(), "Slideshow rendered");
        Ok(())
    }
}
