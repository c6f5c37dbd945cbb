// Content protection for the published viewer page
//
// Best-effort deterrence only: the policy decides which reader events are
// suppressed, and the same policy is emitted as document-level listeners and
// CSS in the generated page.

use crate::config::ProtectionConfig;

/// Reader interactions the policy can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    ContextMenu,
    Copy,
    Cut,
    SelectStart,
    KeyDown { key: String, ctrl: bool, meta: bool },
}

impl ViewerEvent {
    pub fn key(key: &str, ctrl: bool, meta: bool) -> Self {
        ViewerEvent::KeyDown {
            key: key.to_string(),
            ctrl,
            meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Allow,
    Suppress,
}

#[derive(Debug, Clone)]
pub struct ContentGuard {
    enabled: bool,
    blocked_keys: Vec<char>,
}

impl Default for ContentGuard {
    fn default() -> Self {
        Self::new(&ProtectionConfig::default())
    }
}

impl ContentGuard {
    pub fn new(config: &ProtectionConfig) -> Self {
        Self {
            enabled: config.enabled,
            blocked_keys: config
                .blocked_keys
                .iter()
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn disposition(&self, event: &ViewerEvent) -> Disposition {
        if !self.enabled {
            return Disposition::Allow;
        }

        match event {
            ViewerEvent::ContextMenu
            | ViewerEvent::Copy
            | ViewerEvent::Cut
            | ViewerEvent::SelectStart => Disposition::Suppress,
            ViewerEvent::KeyDown { key, ctrl, meta } => {
                let mut chars = key.chars();
                let single = match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c.to_ascii_lowercase()),
                    _ => None,
                };
                match single {
                    Some(c) if (*ctrl || *meta) && self.blocked_keys.contains(&c) => {
                        Disposition::Suppress
                    }
                    _ => Disposition::Allow,
                }
            }
        }
    }

    /// Listener script for the generated page. Empty when disabled.
    pub fn script(&self) -> String {
        if !self.enabled {
            return String::new();
        }

        let events = [
            ("contextmenu", ViewerEvent::ContextMenu),
            ("copy", ViewerEvent::Copy),
            ("cut", ViewerEvent::Cut),
            ("selectstart", ViewerEvent::SelectStart),
        ]
        .into_iter()
        .filter(|(_, event)| self.disposition(event) == Disposition::Suppress)
        .map(|(name, _)| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ");

        let keys = self
            .blocked_keys
            .iter()
            .filter(|c| {
                let event = ViewerEvent::key(&c.to_string(), true, false);
                self.disposition(&event) == Disposition::Suppress
            })
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            r#"(function () {{
  var block = function (e) {{ e.preventDefault(); }};
  [{events}].forEach(function (name) {{
    document.addEventListener(name, block);
  }});
  var keys = [{keys}];
  window.addEventListener('keydown', function (e) {{
    if ((e.ctrlKey || e.metaKey) && keys.indexOf(String(e.key).toLowerCase()) !== -1) {{
      e.preventDefault();
    }}
  }});
}})();"#,
            events = events,
            keys = keys
        )
    }

    /// Styling that disables text selection. Empty when disabled.
    pub fn stylesheet(&self) -> &'static str {
        if self.enabled {
            "body { -webkit-user-select: none; user-select: none; }\nimg { -webkit-user-drag: none; pointer-events: none; }"
        } else {
            ""
        }
    }
}
