use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use crate::error::UpdateError;
use crate::status::DownloadProgress;

/// Stream `url` into `dest`, reporting progress after every chunk.
pub(crate) async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    mut on_progress: impl FnMut(DownloadProgress),
) -> Result<u64, UpdateError> {
    use futures_util::StreamExt;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| UpdateError::http("download request failed", error))?;

    if !response.status().is_success() {
        return Err(UpdateError::Invalid(format!(
            "Download failed with status {}",
            response.status()
        )));
    }

    let total = response.content_length().unwrap_or(0);
    let started = Instant::now();
    let mut transferred: u64 = 0;

    let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
        UpdateError::io_with_path("failed to create download file", dest, &error)
    })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| UpdateError::http("download stream error", error))?;
        file.write_all(&chunk).await.map_err(|error| {
            UpdateError::io_with_path("failed to write download data", dest, &error)
        })?;
        transferred += chunk.len() as u64;
        on_progress(DownloadProgress::new(
            transferred,
            total,
            bytes_per_second(transferred, started.elapsed().as_secs_f64()),
        ));
    }

    file.flush().await.map_err(|error| {
        UpdateError::io_with_path("failed to flush download file", dest, &error)
    })?;

    info!("Download complete: {transferred} bytes");
    Ok(transferred)
}

#[allow(clippy::cast_precision_loss)]
fn bytes_per_second(transferred: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        transferred as f64 / elapsed_secs
    } else {
        0.0
    }
}

pub(crate) fn verify_sha256(path: &Path, expected: &str) -> Result<(), UpdateError> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        debug!("Checksum verified for {}", path.display());
        Ok(())
    } else {
        Err(UpdateError::Invalid(format!(
            "Checksum mismatch for {}. Refusing to stage update.",
            path.display()
        )))
    }
}

fn sha256_file(path: &Path) -> Result<String, UpdateError> {
    let mut file = std::fs::File::open(path).map_err(|error| {
        UpdateError::io_with_path("failed to open file for checksum", path, &error)
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer).map_err(|error| {
            UpdateError::io_with_path("failed to read file for checksum", path, &error)
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub(crate) fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), UpdateError> {
    let file = std::fs::File::open(zip_path).map_err(|error| {
        UpdateError::io_with_path("failed to open zip file", zip_path, &error)
    })?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| UpdateError::zip("failed to read zip archive", error))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| UpdateError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                UpdateError::io_with_path("failed to create extraction directory", &out_path, &error)
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                UpdateError::io_with_path("failed to create extraction directory", parent, &error)
            })?;
        }
        let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
            UpdateError::io_with_path("failed to create extracted file", &out_path, &error)
        })?;
        std::io::copy(&mut entry, &mut outfile).map_err(|error| {
            UpdateError::io_with_path("failed to extract archive entry", &out_path, &error)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}

fn find_binary(extract_dir: &Path, app_name: &str) -> Option<PathBuf> {
    let file_name = format!("{app_name}{}", std::env::consts::EXE_SUFFIX);
    let direct = extract_dir.join(&file_name);
    if direct.is_file() {
        return Some(direct);
    }

    std::fs::read_dir(extract_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path().join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Replace the running executable with the one in `extract_dir`.
pub(crate) fn apply_update(extract_dir: &Path, app_name: &str) -> Result<(), UpdateError> {
    let new_binary = find_binary(extract_dir, app_name).ok_or_else(|| {
        UpdateError::Invalid(format!(
            "No '{app_name}' binary found in extracted archive"
        ))
    })?;

    info!("Replacing executable with {}", new_binary.display());
    self_replace::self_replace(&new_binary)
        .map_err(|error| UpdateError::io("failed to replace executable", error))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(exe) = std::env::current_exe() {
            let _ = std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755));
        }
    }

    Ok(())
}

/// Launch a fresh copy of the current executable.
pub(crate) fn restart_app() -> Result<(), UpdateError> {
    let exe = std::env::current_exe()
        .map_err(|error| UpdateError::io("failed to get current executable", error))?;

    // After self-replace on Linux, /proc/self/exe points at the unlinked inode.
    #[cfg(target_os = "linux")]
    let exe = {
        let path = exe.to_string_lossy();
        match path.strip_suffix(" (deleted)") {
            Some(stripped) => PathBuf::from(stripped),
            None => exe,
        }
    };

    info!("Restarting from: {}", exe.display());
    std::process::Command::new(&exe)
        .spawn()
        .map_err(|error| UpdateError::io("failed to restart app", error))?;
    Ok(())
}

/// Remove staging directories left behind by interrupted downloads.
pub(crate) fn cleanup_stale_staging(cache_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && entry.file_name().to_string_lossy().starts_with(".tmp") {
            debug!("Cleaning up update staging dir: {}", path.display());
            let _ = std::fs::remove_dir_all(&path);
        }
    }
}
