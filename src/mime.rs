//! Best-effort MIME type guessing from file extensions.

/// Guesses the MIME type of a path or URL from its extension. Query strings
/// and fragments are ignored. Returns `None` for unknown or missing
/// extensions.
pub fn guess_type(path: &str) -> Option<&'static str> {
    let path = path.split(|c| c == '?' || c == '#').next().unwrap_or("");
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    from_extension(&ext.to_ascii_lowercase())
}

fn from_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        // images
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",

        // audio and video, used as enclosures too
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/x-wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        "pdf" => "application/pdf",
        _ => return None,
    })
}
