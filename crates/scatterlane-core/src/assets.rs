use std::{
    fs::{self, File},
    io::ErrorKind,
    path::Path,
    time::UNIX_EPOCH,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use symphonia::core::{
    codecs::DecoderOptions, errors::Error as SymphoniaError, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::model::SoundAsset;

const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "aiff", "aif", "caf"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoundFileEntry {
    pub path: String,
    pub extension: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SoundProbe {
    pub sample_rate: u32,
    pub channels: u16,
    pub total_frames: u64,
    pub duration_seconds: f64,
}

/// Reads `path` far enough to know its duration and channel layout.
#[instrument(fields(path = %path.display()))]
pub fn probe_sound_file(path: &Path) -> Result<SoundProbe> {
    let file = File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|value| value.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("no default audio track found in {}", path.display()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(48_000);
    let mut channels = track
        .codec_params
        .channels
        .map_or(2, |value| u16::try_from(value.count()).unwrap_or(u16::MAX));

    if let Some(total_frames) = track.codec_params.n_frames {
        return Ok(probe_from_frames(sample_rate, channels, total_frames));
    }

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
    let mut total_frames = 0_u64;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(error)) if error.kind() == ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(anyhow::anyhow!(
                    "audio stream reset required for {}",
                    path.display()
                ));
            }
            Err(error) => return Err(error.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => {
                continue;
            }
            Err(error) => return Err(error.into()),
        };

        sample_rate = decoded.spec().rate;
        channels = u16::try_from(decoded.spec().channels.count()).unwrap_or(u16::MAX);
        total_frames += decoded.frames() as u64;
    }

    if total_frames == 0 {
        return Err(anyhow::anyhow!(
            "decoded zero frames from {}",
            path.display()
        ));
    }

    debug!(sample_rate, channels, total_frames, "audio probe complete");
    Ok(probe_from_frames(sample_rate, channels, total_frames))
}

/// Builds a pool entry for the whole of `path`.
pub fn probe_sound_asset(path: &Path) -> Result<SoundAsset> {
    let probe = probe_sound_file(path)?;
    Ok(asset_from_probe(path, &probe))
}

/// Like [`probe_sound_asset`], keeping probe results in `cache_dir` keyed by
/// path, size and modification time.
#[instrument(fields(path = %path.display(), cache_dir = %cache_dir.display()))]
pub fn probe_sound_asset_with_cache(path: &Path, cache_dir: &Path) -> Result<SoundAsset> {
    fs::create_dir_all(cache_dir)
        .with_context(|| format!("failed to create probe cache dir: {}", cache_dir.display()))?;

    let key = probe_cache_key(path)?;
    let cache_path = cache_dir.join(format!("{key}.probe.json"));
    if cache_path.is_file() {
        let cached_bytes = fs::read(&cache_path)
            .with_context(|| format!("failed to read probe cache {}", cache_path.display()))?;
        match serde_json::from_slice::<SoundProbe>(&cached_bytes) {
            Ok(probe) => {
                debug!(path = %cache_path.display(), "probe cache hit");
                return Ok(asset_from_probe(path, &probe));
            }
            Err(error) => {
                warn!(
                    path = %cache_path.display(),
                    ?error,
                    "probe cache parse failed, probing again"
                );
            }
        }
    }

    let probe = probe_sound_file(path)?;
    let json = serde_json::to_vec_pretty(&probe).context("failed to encode probe json")?;
    fs::write(&cache_path, json)
        .with_context(|| format!("failed to write probe cache: {}", cache_path.display()))?;
    Ok(asset_from_probe(path, &probe))
}

/// Lists supported sound files under `directory`, sorted by path. Hidden
/// files and directories are ignored. A missing directory is an empty
/// library.
#[instrument(fields(directory = %directory.display()))]
pub fn scan_sound_files(directory: &Path) -> Result<Vec<SoundFileEntry>> {
    if !directory.exists() {
        debug!("sound library directory missing, nothing to scan");
        return Ok(Vec::new());
    }
    if !directory.is_dir() {
        return Err(anyhow::anyhow!(
            "sound library path is not a directory: {}",
            directory.display()
        ));
    }

    let mut entries: Vec<SoundFileEntry> = WalkDir::new(directory)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| {
            entry
                .map_err(|error| warn!(?error, "unreadable entry in sound library, ignored"))
                .ok()
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let extension = supported_extension(entry.path())?;
            let size_bytes = entry.metadata().map_or(0, |meta| meta.len());
            Some(SoundFileEntry {
                path: entry.path().display().to_string(),
                extension,
                size_bytes,
            })
        })
        .collect();

    entries.sort_by(|left, right| left.path.cmp(&right.path));
    debug!(count = entries.len(), "sound library scanned");
    Ok(entries)
}

/// Scans `directory` and probes every supported file into a content pool.
/// Files that fail to probe are logged and left out.
#[instrument(fields(directory = %directory.display(), cache_dir = %cache_dir.display()))]
pub fn load_asset_pool(directory: &Path, cache_dir: &Path) -> Result<Vec<SoundAsset>> {
    let mut pool = Vec::new();
    for entry in scan_sound_files(directory)? {
        let path = Path::new(&entry.path);
        match probe_sound_asset_with_cache(path, cache_dir) {
            Ok(asset) => pool.push(asset),
            Err(error) => warn!(path = %entry.path, ?error, "skipping unreadable sound file"),
        }
    }
    debug!(count = pool.len(), "asset pool loaded");
    Ok(pool)
}

#[allow(clippy::cast_precision_loss)]
fn probe_from_frames(sample_rate: u32, channels: u16, total_frames: u64) -> SoundProbe {
    let duration_seconds = if sample_rate == 0 {
        0.0
    } else {
        total_frames as f64 / f64::from(sample_rate)
    };
    SoundProbe {
        sample_rate,
        channels,
        total_frames,
        duration_seconds,
    }
}

fn asset_from_probe(path: &Path, probe: &SoundProbe) -> SoundAsset {
    let name = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("untitled")
        .to_string();
    SoundAsset {
        name,
        file_path: path.display().to_string(),
        length: probe.duration_seconds,
        channel_count: probe.channels,
        ..SoundAsset::default()
    }
}

/// Cache key over the canonical path, size and modification time, so an
/// edited file is probed again.
fn probe_cache_key(path: &Path) -> Result<String> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to resolve sound file path: {}", path.display()))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to stat sound file: {}", canonical.display()))?;
    let modified_nanos = metadata
        .modified()
        .ok()
        .and_then(|value| value.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |value| value.as_nanos());

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_os_str().as_encoded_bytes());
    hasher.update(metadata.len().to_le_bytes());
    hasher.update(modified_nanos.to_le_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn supported_extension(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}
