//! Concat demuxer file lists.

use std::path::{Path, PathBuf};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Render a concat list: one `file '<path>'` line per input, in order.
pub fn render_file_list(inputs: &[PathBuf]) -> String {
    let mut body = String::new();
    for path in inputs {
        body.push_str("file '");
        body.push_str(&path.to_string_lossy().replace('\'', "'\\''"));
        body.push_str("'\n");
    }
    body
}

/// Write the list next to `output` and build the concat command.
///
/// Inputs share one profile, so streams are copied.
pub async fn prepare_concat(inputs: &[PathBuf], output: &Path) -> MediaResult<FfmpegCommand> {
    if inputs.is_empty() {
        return Err(MediaError::EmptyConcat);
    }
    for input in inputs {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    let list_path = output.with_extension("concat.txt");
    tokio::fs::write(&list_path, render_file_list(inputs)).await?;

    Ok(FfmpegCommand::new(&list_path, output)
        .input_format("concat")
        .stream_copy())
}
