//! Tracking animation.
//!
//! Every published snapshot is rendered and appended to an animated GIF in
//! the run directory by a blocking worker, so frames are not held in memory.
//! [`GifAnimation::finish`] closes the stream and waits for the file to be
//! complete.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, ImageError};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{render_frame, LiveView, TickSnapshot};

/// File name of the animation inside the run directory.
pub const ANIMATION_FILE: &str = "tracking.gif";

const FRAME_DELAY_MS: u32 = 200;

// 1 is best quality, 30 fastest
const QUANTIZE_SPEED: i32 = 10;

/// Errors writing the tracking animation.
#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    #[error("Failed to create animation {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode animation frame: {0}")]
    Encode(#[from] ImageError),

    #[error("Animation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Live view that records every tick into `tracking.gif`.
pub struct GifAnimation {
    path: PathBuf,
    tx: Mutex<Option<mpsc::UnboundedSender<TickSnapshot>>>,
    worker: Mutex<Option<JoinHandle<Result<usize, AnimationError>>>>,
}

impl GifAnimation {
    /// Create the GIF in `run_dir` and start the encoding worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create(run_dir: &Path) -> Result<Self, AnimationError> {
        let path = run_dir.join(ANIMATION_FILE);
        let file = File::create(&path).map_err(|source| AnimationError::Create {
            path: path.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::task::spawn_blocking(move || encode_frames(BufWriter::new(file), rx));

        Ok(Self {
            path,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop accepting frames and wait until the GIF is written.
    ///
    /// Returns the number of frames. Later calls return 0.
    pub async fn finish(&self) -> Result<usize, AnimationError> {
        self.tx.lock().take();
        let worker = self.worker.lock().take();
        match worker {
            Some(worker) => worker.await?,
            None => Ok(0),
        }
    }
}

impl LiveView for GifAnimation {
    fn publish(&self, snapshot: TickSnapshot) {
        if let Some(tx) = self.tx.lock().as_ref() {
            if tx.send(snapshot).is_err() {
                debug!("Animation worker gone, dropping frame");
            }
        }
    }
}

fn encode_frames(
    writer: BufWriter<File>,
    mut rx: mpsc::UnboundedReceiver<TickSnapshot>,
) -> Result<usize, AnimationError> {
    let mut encoder = GifEncoder::new_with_speed(writer, QUANTIZE_SPEED);
    encoder.set_repeat(Repeat::Infinite)?;

    let mut frames = 0;
    while let Some(snapshot) = rx.blocking_recv() {
        let rgba = DynamicImage::ImageRgb8(render_frame(&snapshot)).into_rgba8();
        let delay = Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1);
        encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
        frames += 1;
    }
    Ok(frames)
}
