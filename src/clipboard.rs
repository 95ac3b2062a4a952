//! Asynchronous clipboard writes with transient button feedback.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use anyhow::bail;
use kuchiki::NodeRef;

use crate::builtin;
use crate::dom;

pub trait Clipboard {
    fn write_text(&self, text: &str) -> impl Future<Output = anyhow::Result<()>>;
}

/// In-process clipboard; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Rc<RefCell<Option<String>>>,
    deny: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose writes are always refused.
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }
}

impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> anyhow::Result<()> {
        if self.deny {
            bail!("clipboard write not allowed");
        }
        *self.contents.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

/// A pending copy: what to write and which button reports the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyRequest {
    pub button: NodeRef,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Failed,
}

/// Writes the text, shows a check (or cross) on the button, then restores the
/// copy icon after `revert`.
///
/// Holds no borrow of the page, so it can run on a `LocalSet` while other
/// events are handled. A later copy on the same button simply overwrites the
/// icon; the earlier revert still fires on its own schedule.
pub async fn copy_with_feedback<C: Clipboard>(
    clipboard: &C,
    request: CopyRequest,
    revert: Duration,
) -> CopyOutcome {
    let outcome = match clipboard.write_text(&request.text).await {
        Ok(()) => {
            tracing::debug!(bytes = request.text.len(), "copied to clipboard");
            dom::set_inner(&request.button, builtin::icon(builtin::ICON_CHECK));
            CopyOutcome::Copied
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to copy");
            dom::set_inner(&request.button, builtin::icon(builtin::ICON_FAILED));
            CopyOutcome::Failed
        }
    };
    tokio::time::sleep(revert).await;
    if request.button.parent().is_some() {
        dom::set_inner(&request.button, builtin::icon(builtin::ICON_COPY));
    }
    outcome
}
