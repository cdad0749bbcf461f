//! Preview and comment widgets
//!
//! Third-party scripts are attached to named slots of a view. An attachment
//! is held as a guard: dropping it detaches the script, so a view can never
//! carry a stale or duplicated comment thread.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::config::CommentsConfig;
use crate::helpers::html_escape;

pub const EXIT_PREVIEW_PATH: &str = "/api/exit-preview";
pub const UTTERANCES_SRC: &str = "https://utteranc.es/client.js";

/// Slot the comment thread is mounted into
pub const COMMENTS_SLOT: &str = "comments";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WidgetError {
    #[error("Slot {0:?} already has a script attached")]
    SlotOccupied(String),
}

/// Link that leaves preview mode, only while previewing
pub fn exit_preview(preview: bool, label: &str) -> Option<String> {
    preview.then(|| {
        format!(
            r#"<aside class="exit-preview"><a href="{}">{}</a></aside>"#,
            EXIT_PREVIEW_PATH,
            html_escape(label)
        )
    })
}

/// utterances comment thread
#[derive(Debug, Clone)]
pub struct CommentWidget<'a> {
    config: &'a CommentsConfig,
}

impl<'a> CommentWidget<'a> {
    pub fn new(config: &'a CommentsConfig) -> Self {
        Self { config }
    }

    /// Whether comments are configured at all
    pub fn enabled(&self) -> bool {
        self.config.enable && !self.config.repo.trim().is_empty()
    }

    /// The `<script>` element that loads the thread
    pub fn script_tag(&self) -> Option<String> {
        if !self.enabled() {
            return None;
        }
        let attrs = [
            ("src", UTTERANCES_SRC),
            ("repo", self.config.repo.as_str()),
            ("issue-term", self.config.issue_term.as_str()),
            ("label", self.config.label.as_str()),
            ("theme", self.config.theme.as_str()),
            ("crossorigin", "anonymous"),
        ];
        let rendered: Vec<String> = attrs
            .iter()
            .map(|(name, value)| format!(r#"{}="{}""#, name, html_escape(value)))
            .collect();
        Some(format!("<script {} async></script>", rendered.join(" ")))
    }

    /// Mount the thread into the comments slot of a view
    pub fn attach<'s>(&self, slots: &'s ScriptSlots) -> Result<Option<Attachment<'s>>, WidgetError> {
        match self.script_tag() {
            Some(script) => slots.attach(COMMENTS_SLOT, script).map(Some),
            None => Ok(None),
        }
    }
}

/// Scripts mounted into the named slots of one view
#[derive(Debug, Default)]
pub struct ScriptSlots {
    slots: Mutex<HashMap<String, String>>,
}

impl ScriptSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a script to an empty slot
    pub fn attach(&self, slot: &str, script: String) -> Result<Attachment<'_>, WidgetError> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if slots.contains_key(slot) {
            return Err(WidgetError::SlotOccupied(slot.to_string()));
        }
        slots.insert(slot.to_string(), script);
        tracing::trace!("Attached script to slot {}", slot);
        Ok(Attachment {
            slots: self,
            slot: slot.to_string(),
        })
    }

    /// Markup currently mounted in a slot, empty when nothing is attached
    pub fn render(&self, slot: &str) -> String {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(slot).cloned().unwrap_or_default()
    }

    pub fn is_attached(&self, slot: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.contains_key(slot)
    }

    fn detach(&self, slot: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(slot);
        tracing::trace!("Detached script from slot {}", slot);
    }
}

/// A mounted script; dropping it detaches the script
#[derive(Debug)]
#[must_use = "dropping the attachment detaches the script immediately"]
pub struct Attachment<'a> {
    slots: &'a ScriptSlots,
    slot: String,
}

impl Attachment<'_> {
    pub fn slot(&self) -> &str {
        &self.slot
    }
}

impl Drop for Attachment<'_> {
    fn drop(&mut self) {
        self.slots.detach(&self.slot);
    }
}
