//! Remote method calls on viewer objects.

use cadview_comm::Comm;
use cadview_ipc::{ControllerToViewer, CustomContent, PathElement};
use serde_json::Value;

use crate::error::WidgetError;
use crate::path::ObjectPath;

/// A command ready to be sent. Nothing is kept once it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    pub id: u64,
    pub route: Vec<PathElement>,
    pub args: Option<Vec<Value>>,
}

impl PendingCommand {
    pub fn into_message(self) -> ControllerToViewer {
        ControllerToViewer::Custom {
            content: CustomContent::RemoteMethodCall {
                id: self.id,
                method: self.route,
                args: self.args,
            },
        }
    }
}

/// Turns method paths into `remote_method_call` messages with increasing ids.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    last_id: u64,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the most recently prepared command, 0 if none
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// Parse `method` and assign the next id.
    ///
    /// A non-list `args` value is wrapped into a one-element list. A parse
    /// failure does not consume an id.
    pub fn prepare(
        &mut self,
        method: &str,
        args: Option<Value>,
    ) -> Result<PendingCommand, WidgetError> {
        let path = ObjectPath::parse(method)?;
        let args = args.map(|args| match args {
            Value::Array(items) => items,
            single => vec![single],
        });

        self.last_id += 1;
        Ok(PendingCommand {
            id: self.last_id,
            route: path.route(),
            args,
        })
    }

    /// Prepare and send a command; returns its id
    pub fn dispatch<C: Comm>(
        &mut self,
        comm: &mut C,
        method: &str,
        args: Option<Value>,
    ) -> Result<u64, WidgetError> {
        let command = self.prepare(method, args)?;
        let id = command.id;
        tracing::debug!(id, method, "Sending remote method call");
        comm.send(command.into_message(), Vec::new())?;
        Ok(id)
    }
}
