//! Streaming HTTP download with progress reporting

use std::path::Path;

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::{HarnessError, Result};

/// Download `url` into `dest`, streaming the body chunk by chunk.
///
/// Returns the number of bytes written. A non-success HTTP status is an
/// error; the caller owns cleanup of `dest` on failure.
pub async fn download_to(url: &str, dest: &Path) -> Result<u64> {
    let response = reqwest::get(url).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarnessError::DownloadError(format!(
            "HTTP {} fetching {}",
            status, url
        )));
    }

    let progress = make_progress_bar(response.content_length());

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        progress.set_position(written);
    }

    file.flush().await?;
    progress.finish_and_clear();

    if written == 0 {
        return Err(HarnessError::DownloadError(format!(
            "Empty response body from {}",
            url
        )));
    }

    Ok(written)
}

fn make_progress_bar(content_length: Option<u64>) -> ProgressBar {
    match content_length {
        Some(total) => {
            let bar = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar
        }
        None => ProgressBar::new_spinner(),
    }
}
