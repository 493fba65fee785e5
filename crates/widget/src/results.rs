//! Routing of screenshot results reported by the viewer.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cadview_ipc::ViewerResult;

use crate::error::WidgetError;

/// Notebook output area that can replace a display by id.
pub trait DisplaySink {
    fn update_display(&mut self, display_id: &str, html: &str) -> Result<(), WidgetError>;
}

/// Receiver of exported PNG bytes, used instead of writing the file
pub type ByteSink = Box<dyn FnMut(&str, Vec<u8>) + Send>;

/// Where a result ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Displayed { display_id: String },
    Delivered { filename: String, len: usize },
    Written { path: PathBuf },
    /// No sink was registered for an image result
    Dropped,
}

/// `<img>` tag shown in place of a pinned viewer
pub fn image_html(src: &str, width: u32, height: u32) -> String {
    format!(r#"<img src="{src}" width="{width}px" height="{height}px"/>"#)
}

/// Bytes of a base64 data URI (`data:image/png;base64,....`)
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>, WidgetError> {
    let (_, data) = src
        .split_once(',')
        .ok_or_else(|| WidgetError::InvalidResult("data URI without payload".into()))?;
    STANDARD
        .decode(data)
        .map_err(|e| WidgetError::InvalidResult(e.to_string()))
}

/// Hands results to the registered sinks.
#[derive(Default)]
pub struct ResultRouter {
    display: Option<Box<dyn DisplaySink + Send>>,
    bytes: Option<ByteSink>,
}

impl std::fmt::Debug for ResultRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultRouter")
            .field("display", &self.display.is_some())
            .field("bytes", &self.bytes.is_some())
            .finish()
    }
}

impl ResultRouter {
    pub fn set_display_sink(&mut self, sink: impl DisplaySink + Send + 'static) {
        self.display = Some(Box::new(sink));
    }

    pub fn set_byte_sink(&mut self, sink: impl FnMut(&str, Vec<u8>) + Send + 'static) {
        self.bytes = Some(Box::new(sink));
    }

    pub fn route(&mut self, result: &ViewerResult) -> Result<Routed, WidgetError> {
        match result {
            ViewerResult::Image {
                display_id,
                src,
                width,
                height,
            } => match self.display.as_mut() {
                Some(sink) => {
                    sink.update_display(display_id, &image_html(src, *width, *height))?;
                    tracing::info!(%display_id, "Replaced viewer output with PNG");
                    Ok(Routed::Displayed {
                        display_id: display_id.clone(),
                    })
                }
                None => {
                    tracing::warn!(%display_id, "No display sink registered, dropping image");
                    Ok(Routed::Dropped)
                }
            },
            ViewerResult::File { filename, src } => {
                let data = decode_data_uri(src)?;
                match self.bytes.as_mut() {
                    Some(sink) => {
                        let len = data.len();
                        sink(filename, data);
                        Ok(Routed::Delivered {
                            filename: filename.clone(),
                            len,
                        })
                    }
                    None => {
                        std::fs::write(filename, &data)?;
                        tracing::info!(%filename, bytes = data.len(), "Saved PNG");
                        Ok(Routed::Written {
                            path: PathBuf::from(filename),
                        })
                    }
                }
            }
        }
    }
}
