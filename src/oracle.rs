//! Bounding-box oracle.
//!
//! The visible-content rectangle of a page is computed by an external
//! executable (Ghostscript's `bbox` device). Its output contains lines like
//!
//! ```text
//! %%BoundingBox: 54 72 558 720
//! %%HiResBoundingBox: 54.000000 72.000000 557.279986 719.999978
//! ```
//!
//! Only text after the last `HiResBoundingBox:` label is used. Ghostscript
//! prints the box on stderr, so both output streams are searched.

use crate::error::FileError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

const BBOX_LABEL: &str = "HiResBoundingBox:";

/// An axis-aligned content rectangle in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lx: f64,
    pub ly: f64,
    pub ux: f64,
    pub uy: f64,
}

impl BoundingBox {
    /// The oracle reports an all-zero box when it cannot determine one;
    /// anything whose component sum rounds to zero is treated the same way.
    pub fn is_degenerate(&self) -> bool {
        (self.lx + self.ly + self.ux + self.uy).round() == 0.0
    }
}

/// Extract the bounding box from raw oracle output.
///
/// Returns the box and any tokens found after the expected four (diagnostic
/// noise the caller should report). The last label occurrence wins.
pub fn parse_bounds(output: &str) -> Result<(BoundingBox, Option<String>), FileError> {
    let at = output
        .rfind(BBOX_LABEL)
        .ok_or(FileError::MissingBoundingBox)?;
    let tokens: Vec<&str> = output[at + BBOX_LABEL.len()..].split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(FileError::ShortBoundingBox {
            found: tokens.len(),
        });
    }
    let noise = if tokens.len() > 4 {
        Some(tokens[4..].join(" "))
    } else {
        None
    };
    let mut values = [0f64; 4];
    for (slot, token) in values.iter_mut().zip(&tokens[..4]) {
        *slot = token.parse().map_err(|_| FileError::BadBoundingBox {
            token: token.to_string(),
        })?;
    }
    Ok((
        BoundingBox {
            lx: values[0],
            ly: values[1],
            ux: values[2],
            uy: values[3],
        },
        noise,
    ))
}

/// Handle to the external bounding-box executable.
pub struct Oracle {
    program: PathBuf,
    timeout: Duration,
}

impl Oracle {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Oracle { program, timeout }
    }

    /// Run the oracle on one file.
    ///
    /// `Ok(None)` means "no usable box" — the output was missing, malformed
    /// or degenerate, or the call timed out. The condition has already been
    /// reported and the file should simply be left untouched. `Err` means
    /// the oracle process itself failed to run.
    pub async fn bounding_box(&self, path: &Path) -> Result<Option<BoundingBox>, FileError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-sDEVICE=bbox")
            .arg("-dBATCH")
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg(path)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "{}: bounding-box oracle timed out after {}s, skipping",
                    path.display(),
                    self.timeout.as_secs()
                );
                return Ok(None);
            }
        };

        if !output.status.success() {
            return Err(FileError::OracleFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let (bounds, noise) = match parse_bounds(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("{}: {}, skipping", path.display(), err);
                return Ok(None);
            }
        };
        if let Some(noise) = noise {
            warn!(
                "{}: trailing oracle output after bounding box: {}",
                path.display(),
                noise
            );
        }
        if bounds.is_degenerate() {
            warn!("{}: degenerate bounding box, skipping", path.display());
            return Ok(None);
        }
        Ok(Some(bounds))
    }
}
