//! Archive download, digest verification, and extraction.

use anyhow::{Context, Result};
use colored::*;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha512};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// How an archive should be unpacked, decided from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    /// Fallback for anything that is not a zip; the upstream artifacts are
    /// all tar based.
    Tar,
}

impl ArchiveKind {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            ArchiveKind::Zip
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            ArchiveKind::TarGz
        } else {
            ArchiveKind::Tar
        }
    }
}

/// Stream `url` into `path` with a byte progress bar.
pub fn download_file(url: &str, path: &Path) -> Result<()> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| anyhow::anyhow!("Download of {} failed: {}", url, e))?;

    let total_size = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.blue} [{elapsed_precise}] [{bar:40.green/black}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("◐◓◑◒")
        .progress_chars("━━╸"));

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut reader = response.into_body().into_reader();
    let mut buffer = [0; 8192];

    loop {
        let n = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed while downloading {}", url))?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])?;
        pb.inc(n as u64);
    }

    pb.finish_and_clear();
    Ok(())
}

/// Verify a file's SHA512 against an expected hex digest. A missing expected
/// digest counts as valid.
pub fn verify_sha512(path: &Path, expected_hash: Option<&str>) -> Result<()> {
    let expected = match expected_hash {
        Some(h) => h,
        None => return Ok(()),
    };

    let mut file = File::open(path).with_context(|| {
        format!(
            "Failed to open file for hash verification: {}",
            path.display()
        )
    })?;

    let mut hasher = Sha512::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let actual_hash = format!("{:x}", hasher.finalize());
    if actual_hash.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "SHA512 hash mismatch for {}:\n  Expected: {}\n  Actual:   {}",
            path.display(),
            expected,
            actual_hash
        ))
    }
}

pub fn extract_archive(archive: &Path, dest: &Path, kind: ArchiveKind) -> Result<()> {
    match kind {
        ArchiveKind::Zip => extract_zip(archive, dest),
        ArchiveKind::TarGz => {
            let file = File::open(archive)
                .with_context(|| format!("Failed to open {}", archive.display()))?;
            tar::Archive::new(GzDecoder::new(file))
                .unpack(dest)
                .with_context(|| format!("Failed to extract {}", archive.display()))
        }
        ArchiveKind::Tar => {
            let file = File::open(archive)
                .with_context(|| format!("Failed to open {}", archive.display()))?;
            tar::Archive::new(file)
                .unpack(dest)
                .with_context(|| format!("Failed to extract {}", archive.display()))
        }
    }
}

fn extract_zip(archive_path: &Path, target_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read {}", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let outpath = match file.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => continue,
        };

        if file.name().ends_with('/') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent()
                && !p.exists()
            {
                fs::create_dir_all(p)?;
            }
            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)?;
        }
    }
    Ok(())
}

/// Download an archive into `dest`, verify it, unpack it there, and delete
/// the archive file afterwards. The archive file name is taken from the
/// URL's terminal path segment.
pub fn download_and_extract(url: &str, dest: &Path, sha512: Option<&str>) -> Result<()> {
    let name = url.split('?').next().unwrap_or(url);
    let name = name.rsplit('/').next().unwrap_or(name);
    download_and_extract_as(url, dest, name, sha512)
}

/// Like [`download_and_extract`], with the archive file name supplied by the
/// caller. The name picks the extraction method, so it must be the real file
/// name even when the URL path does not end in it.
pub fn download_and_extract_as(
    url: &str,
    dest: &Path,
    name: &str,
    sha512: Option<&str>,
) -> Result<()> {
    let kind = ArchiveKind::from_name(name);

    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let archive_path = dest.join(name);

    println!("   {} Downloading {}...", "📦".blue(), url);
    download_file(url, &archive_path)?;

    if let Err(err) = verify_sha512(&archive_path, sha512) {
        let _ = fs::remove_file(&archive_path);
        return Err(err);
    }

    extract_archive(&archive_path, dest, kind)?;
    fs::remove_file(&archive_path)
        .with_context(|| format!("Failed to remove {}", archive_path.display()))?;
    println!("   {} Unpacked {}", "✓".green(), name);
    Ok(())
}
