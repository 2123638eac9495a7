// src/monitor/hooks.rs

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use crate::monitor::{StreamName, StreamTransform, TelemetrySession};

/// Partial lines longer than this are inspected without waiting for `\n`.
pub const MAX_PENDING_LINE: usize = 64 * 1024;

/// What the run being inspected looks like.
#[derive(Clone)]
pub struct HookContext {
    pub session_id: String,
    pub command: String,
    pub args: Vec<String>,
    pub session: Arc<dyn TelemetrySession>,
}

/// Result of inspecting one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookVerdict {
    Pass,
    Replace(Vec<u8>),
    Block,
}

/// Something that looks at every line of child output.
pub trait StreamHook: Send + Sync {
    fn name(&self) -> &str;

    /// `line` never includes its line terminator.
    fn inspect(&self, ctx: &HookContext, stream: StreamName, line: &[u8]) -> HookVerdict;
}

/// Owns the hooks registered for a run and hands out stream transforms.
pub struct HookManager {
    context: Arc<HookContext>,
    hooks: Vec<Arc<dyn StreamHook>>,
}

impl HookManager {
    pub fn new(session: Arc<dyn TelemetrySession>) -> Self {
        let context = HookContext {
            session_id: session.session_id().to_string(),
            command: String::new(),
            args: Vec::new(),
            session,
        };
        Self {
            context: Arc::new(context),
            hooks: Vec::new(),
        }
    }

    /// Describe the run that the transforms will be attached to.
    pub fn create_context(&mut self, session_id: &str, command: &str, args: &[String]) {
        self.context = Arc::new(HookContext {
            session_id: session_id.to_string(),
            command: command.to_string(),
            args: args.to_vec(),
            session: Arc::clone(&self.context.session),
        });
    }

    pub fn context(&self) -> &HookContext {
        &self.context
    }

    pub fn register(&mut self, hook: Arc<dyn StreamHook>) {
        debug!(hook = hook.name(), "stream hook registered");
        self.hooks.push(hook);
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// A fresh transform for `stream`. Each call returns an independent
    /// transform with its own line buffer.
    pub fn create_stream_transform(&self, stream: StreamName) -> Box<dyn StreamTransform> {
        Box::new(LineTransform::new(
            stream,
            Arc::clone(&self.context),
            self.hooks.clone(),
        ))
    }
}

/// Runs every registered hook over each complete line.
///
/// A trailing partial line is held back until its newline arrives, it grows
/// past [`MAX_PENDING_LINE`], or [`flush`](StreamTransform::flush) is called.
pub struct LineTransform {
    stream: StreamName,
    context: Arc<HookContext>,
    hooks: Vec<Arc<dyn StreamHook>>,
    pending: Vec<u8>,
}

impl LineTransform {
    pub fn new(
        stream: StreamName,
        context: Arc<HookContext>,
        hooks: Vec<Arc<dyn StreamHook>>,
    ) -> Self {
        Self {
            stream,
            context,
            hooks,
            pending: Vec::new(),
        }
    }

    fn emit_line(&self, line: &[u8], terminated: bool, out: &mut Vec<u8>) {
        let mut current: Cow<'_, [u8]> = Cow::Borrowed(line);
        for hook in self.hooks.iter() {
            match hook.inspect(&self.context, self.stream, &current) {
                HookVerdict::Pass => {}
                HookVerdict::Replace(bytes) => current = Cow::Owned(bytes),
                HookVerdict::Block => {
                    debug!(hook = hook.name(), stream = %self.stream, "line blocked");
                    return;
                }
            }
        }
        out.extend_from_slice(&current);
        if terminated {
            out.push(b'\n');
        }
    }
}

impl StreamTransform for LineTransform {
    fn transform(&mut self, chunk: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(chunk);

        let mut out = Vec::with_capacity(self.pending.len());
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            if self.pending.len() >= MAX_PENDING_LINE {
                let line = std::mem::take(&mut self.pending);
                self.emit_line(&line, false, &mut out);
            }
            return out;
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        for line in complete[..last_newline].split(|b| *b == b'\n') {
            self.emit_line(line, true, &mut out);
        }
        if self.pending.len() >= MAX_PENDING_LINE {
            let line = std::mem::take(&mut self.pending);
            self.emit_line(&line, false, &mut out);
        }
        out
    }

    fn flush(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit_line(&line, false, &mut out);
        }
        out
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MemorySession;

    /// Upper-cases lines, blocks lines containing "drop".
    struct Shout;

    impl StreamHook for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn inspect(&self, _ctx: &HookContext, _stream: StreamName, line: &[u8]) -> HookVerdict {
            if line.windows(4).any(|w| w == b"drop") {
                HookVerdict::Block
            } else {
                HookVerdict::Replace(line.to_ascii_uppercase())
            }
        }
    }

    fn manager_with(hook: Option<Arc<dyn StreamHook>>) -> HookManager {
        let mut manager = HookManager::new(Arc::new(MemorySession::new("s", None)));
        if let Some(hook) = hook {
            manager.register(hook);
        }
        manager
    }

    #[test]
    fn no_hooks_is_a_pass_through() {
        let manager = manager_with(None);
        let mut t = manager.create_stream_transform(StreamName::Stdout);
        let mut out = t.transform(b"hello\nwor");
        out.extend(t.flush());
        assert_eq!(out, b"hello\nwor");
    }

    #[test]
    fn partial_lines_wait_for_newline() {
        let manager = manager_with(Some(Arc::new(Shout)));
        let mut t = manager.create_stream_transform(StreamName::Stdout);

        assert!(t.transform(b"ab").is_empty());
        assert!(t.has_pending());
        assert_eq!(t.transform(b"c\nde"), b"ABC\n");
        assert_eq!(t.flush(), b"DE");
        assert!(!t.has_pending());
    }

    #[test]
    fn blocked_lines_vanish_with_their_newline() {
        let manager = manager_with(Some(Arc::new(Shout)));
        let mut t = manager.create_stream_transform(StreamName::Stderr);
        assert_eq!(t.transform(b"keep\nplease drop me\nalso\n"), b"KEEP\nALSO\n");
    }

    #[test]
    fn empty_lines_are_preserved() {
        let manager = manager_with(Some(Arc::new(Shout)));
        let mut t = manager.create_stream_transform(StreamName::Stdout);
        assert_eq!(t.transform(b"a\n\nb\n"), b"A\n\nB\n");
    }

    #[test]
    fn oversized_partial_line_is_released() {
        let manager = manager_with(None);
        let mut t = manager.create_stream_transform(StreamName::Stdout);
        let big = vec![b'x'; MAX_PENDING_LINE];
        assert_eq!(t.transform(&big).len(), MAX_PENDING_LINE);
        assert!(!t.has_pending());
    }

    #[test]
    fn oversized_tail_after_a_newline_is_released() {
        let manager = manager_with(None);
        let mut t = manager.create_stream_transform(StreamName::Stdout);
        let mut chunk = b"head\n".to_vec();
        chunk.extend(vec![b'x'; MAX_PENDING_LINE]);

        let out = t.transform(&chunk);
        assert_eq!(out.len(), chunk.len());
        assert!(out.starts_with(b"head\n"));
        assert!(!t.has_pending());
    }

    #[test]
    fn context_describes_the_run() {
        let mut manager = manager_with(None);
        manager.create_context("sess-9", "npm", &["test".to_string()]);
        assert_eq!(manager.context().session_id, "sess-9");
        assert_eq!(manager.context().command, "npm");
        assert_eq!(manager.context().args, vec!["test"]);
    }
}
