/// Light-field load sequence
///
/// Runs once per user "load" action:
/// 1. read the shader (built-in or from disk)
/// 2. create the GPU pipeline with an empty array texture
/// 3. fetch every frame in index order, reporting progress
/// 4. rasterize and pack in chunks, flushing each chunk to the GPU
///
/// Progress is published as `LoadEvent`s on an iced stream; the last event
/// is always `Finished`.

use iced::futures::channel::mpsc;
use iced::futures::{SinkExt, Stream};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task;

use crate::error::{Result, ViewerError};
use crate::field::{fetch_frames, pack_frames, CameraGrid, ChunkProgress, FetchProgress, FieldBuffer};
use crate::gpu::shaders::load_shader;
use crate::gpu::RenderPipeline;

/// A fully loaded light field, ready to render
#[derive(Debug, Clone)]
pub struct LoadedField {
    pub pipeline: Arc<RenderPipeline>,
    /// CPU copy of the packed field, kept for the session
    pub field: Arc<FieldBuffer>,
    pub grid: CameraGrid,
}

#[derive(Debug, Clone)]
pub enum LoadEvent {
    Fetched(FetchProgress),
    Packed(ChunkProgress),
    Finished(std::result::Result<LoadedField, String>),
}

/// Start the load sequence for `grid`
pub fn load_light_field(grid: CameraGrid, shader_path: Option<PathBuf>) -> impl Stream<Item = LoadEvent> {
    iced::stream::channel(64, move |mut output: mpsc::Sender<LoadEvent>| async move {
        let result = run(grid, shader_path, output.clone()).await.map_err(|e| {
            log::error!("Load failed: {e}");
            e.to_string()
        });
        let _ = output.send(LoadEvent::Finished(result)).await;
    })
}

async fn run(
    grid: CameraGrid,
    shader_path: Option<PathBuf>,
    output: mpsc::Sender<LoadEvent>,
) -> Result<LoadedField> {
    grid.validate()?;

    let shader = load_shader(shader_path.as_deref()).await?;
    let pipeline = Arc::new(RenderPipeline::new(&grid, &shader).await?);
    log::info!("Pipeline ready");

    // Every frame's progress is delivered before the next frame is read
    let frames = fetch_frames(&grid, |progress| {
        let mut output = output.clone();
        async move {
            let _ = output.send(LoadEvent::Fetched(progress)).await;
        }
    })
    .await?;

    let field = task::spawn_blocking({
        let pipeline = Arc::clone(&pipeline);
        let grid = grid.clone();
        let mut output = output.clone();
        move || -> Result<FieldBuffer> {
            let mut field = FieldBuffer::new(grid.res_x, grid.res_y, grid.frame_count() as u32);
            pack_frames(frames, &mut field, |field, progress| {
                pipeline.flush(field);
                // Chunk notices are informational, a full channel drops one
                let _ = output.try_send(LoadEvent::Packed(progress));
            })?;
            Ok(field)
        }
    })
    .await
    .map_err(|e| ViewerError::Task(e.to_string()))??;

    log::info!("Packed {} layers ({} bytes)", field.layers(), field.len());

    Ok(LoadedField {
        pipeline,
        field: Arc::new(field),
        grid,
    })
}
