// Startup error types
// Everything that can stop the window from ever being shown

use std::io;
use std::path::PathBuf;

/// Fatal errors detected before the Wayland connection is made
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The image file is not present at any candidate location
    #[error("image file '{}' does not exist (searched: {})", .path.display(), format_tried(.tried))]
    MissingResource { path: PathBuf, tried: Vec<PathBuf> },

    /// The file exists but could not be read
    #[error("failed to read image file '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a decodable image
    #[error("failed to decode image file '{}'", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn format_tried(tried: &[PathBuf]) -> String {
    tried
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
