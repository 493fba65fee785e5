//! Named sidecar viewers.
//!
//! A notebook can show several viewers in side panels, each addressed by its
//! title. One of them is the default that `get(None)` returns. Viewers that
//! were disposed in the browser are pruned whenever the registry is queried.

use std::collections::BTreeMap;

use cadview_comm::Comm;
use cadview_config::{Anchor, DisplayConfig};

use crate::error::WidgetError;
use crate::viewer::CadViewer;

pub struct ViewerRegistry<C> {
    viewers: BTreeMap<String, CadViewer<C>>,
    default: Option<String>,
}

impl<C> Default for ViewerRegistry<C> {
    fn default() -> Self {
        Self {
            viewers: BTreeMap::new(),
            default: None,
        }
    }
}

impl<C: Comm> ViewerRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a viewer titled `title`, replacing an existing one of that name.
    ///
    /// The first viewer opened becomes the default. The new viewer stays
    /// registered even when closing the replaced one fails.
    pub fn open(
        &mut self,
        title: &str,
        anchor: Option<Anchor>,
        mut config: DisplayConfig,
        comm: C,
    ) -> Result<&mut CadViewer<C>, WidgetError> {
        config.title = Some(title.to_string());
        config.anchor = anchor.or(config.anchor);
        let viewer = CadViewer::new(config, comm)?;

        let previous = self.viewers.insert(title.to_string(), viewer);
        tracing::info!(%title, "Opened sidecar viewer");
        if self.default.is_none() {
            self.default = Some(title.to_string());
        }
        if let Some(mut previous) = previous {
            previous.close()?;
        }
        self.viewers.get_mut(title).ok_or(WidgetError::Disposed)
    }

    /// Viewer named `title`, or the default one for `None`
    pub fn get(&mut self, title: Option<&str>) -> Option<&mut CadViewer<C>> {
        let title = match title {
            Some(title) => title.to_string(),
            None => self.default.clone()?,
        };
        if self.viewers.get(&title)?.is_disposed() {
            tracing::debug!(%title, "Removing disposed viewer");
            self.viewers.remove(&title);
            return None;
        }
        self.viewers.get_mut(&title)
    }

    /// Existing viewer named `title`, or a new one built from `make`
    pub fn get_or_open<F>(
        &mut self,
        title: &str,
        make: F,
    ) -> Result<&mut CadViewer<C>, WidgetError>
    where
        F: FnOnce() -> (DisplayConfig, C),
    {
        if self.get(Some(title)).is_none() {
            let (config, comm) = make();
            self.open(title, None, config, comm)?;
        }
        self.get(Some(title))
            .ok_or(WidgetError::Disposed)
    }

    pub fn default_title(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Make `title` the default viewer; it does not need to be open yet
    pub fn set_default(&mut self, title: &str) {
        self.default = Some(title.to_string());
    }

    /// Titles of all live viewers
    pub fn titles(&mut self) -> Vec<String> {
        self.prune();
        self.viewers.keys().cloned().collect()
    }

    pub fn len(&mut self) -> usize {
        self.prune();
        self.viewers.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    fn prune(&mut self) {
        self.viewers.retain(|title, viewer| {
            let alive = !viewer.is_disposed();
            if !alive {
                tracing::debug!(%title, "Removing disposed viewer");
            }
            alive
        });
    }

    /// Close and remove one viewer; returns whether it existed
    pub fn close(&mut self, title: &str) -> Result<bool, WidgetError> {
        let Some(mut viewer) = self.viewers.remove(title) else {
            return Ok(false);
        };
        viewer.close()?;
        if self.default.as_deref() == Some(title) {
            self.default = None;
        }
        Ok(true)
    }

    /// Close every viewer and forget the default
    pub fn close_all(&mut self) -> Result<(), WidgetError> {
        let viewers = std::mem::take(&mut self.viewers);
        self.default = None;
        for (title, mut viewer) in viewers {
            tracing::debug!(%title, "Closing viewer");
            viewer.close()?;
        }
        Ok(())
    }
}

impl<C> std::fmt::Debug for ViewerRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerRegistry")
            .field("viewers", &self.viewers.keys().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}
