use runwarden::request::RunRequest;
use runwarden::types::{ProtectionMode, Scope};

/// Builder for [`RunRequest`]s that skips CLI parsing.
///
/// Defaults: development scope, secrets and monitoring enabled, quiet.
pub struct RequestBuilder {
    request: RunRequest,
}

impl RequestBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            request: RunRequest {
                command: command.to_string(),
                args: Vec::new(),
                scope: Scope::Development,
                service: None,
                secrets_enabled: true,
                monitor_enabled: true,
                mode: None,
                redact_text: None,
                verbose: false,
                quiet: true,
                config: None,
            },
        }
    }

    /// `sh -c <script>`.
    pub fn shell(script: &str) -> Self {
        Self::new("sh").args(&["-c", script])
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.request.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.request.scope = scope;
        self
    }

    pub fn service(mut self, service: &str) -> Self {
        self.request.service = Some(service.to_string());
        self
    }

    pub fn no_secrets(mut self) -> Self {
        self.request.secrets_enabled = false;
        self
    }

    pub fn no_monitor(mut self) -> Self {
        self.request.monitor_enabled = false;
        self
    }

    pub fn mode(mut self, mode: ProtectionMode) -> Self {
        self.request.mode = Some(mode);
        self
    }

    pub fn redact_text(mut self, text: &str) -> Self {
        self.request.redact_text = Some(text.to_string());
        self
    }

    pub fn build(self) -> RunRequest {
        self.request
    }
}
