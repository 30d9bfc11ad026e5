use std::time::Duration;

use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};

/// Environment facts that decide how hard to probe the terminal for graphics support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TerminalHints {
    pub kitty_window: bool,
    pub xterm_kitty: bool,
    pub iterm: bool,
    pub tmux: bool,
}

impl TerminalHints {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).is_some_and(|v| !v.trim().is_empty());
        let contains = |key: &str, needle: &str| lookup(key).is_some_and(|v| v.contains(needle));

        Self {
            kitty_window: non_empty("KITTY_WINDOW_ID"),
            // TERM survives ssh even when KITTY_WINDOW_ID does not.
            xterm_kitty: lookup("TERM").is_some_and(|t| t.trim().starts_with("xterm-kitty")),
            iterm: non_empty("ITERM_SESSION_ID")
                || contains("TERM_PROGRAM", "iTerm")
                || contains("LC_TERMINAL", "iTerm"),
            tmux: lookup("TMUX").is_some(),
        }
    }

    fn kitty_likely(&self) -> bool {
        self.kitty_window || self.xterm_kitty
    }

    pub fn should_query(&self) -> bool {
        self.kitty_likely() || self.iterm || self.tmux
    }

    pub fn query_timeout(&self) -> Duration {
        if self.kitty_likely() || self.iterm {
            Duration::from_millis(1500)
        } else if self.tmux {
            Duration::from_millis(300)
        } else {
            Duration::ZERO
        }
    }
}

/// Builds the picker used for page images, falling back to halfblocks.
pub(crate) fn detect_picker() -> Picker {
    let hints = TerminalHints::from_env();
    if hints.tmux {
        allow_tmux_passthrough();
    }

    let mut picker = if hints.should_query() {
        let mut options = QueryStdioOptions::default();
        options.timeout = hints.query_timeout();
        options.text_sizing_protocol = false;
        Picker::from_query_stdio_with_options(options).unwrap_or_else(|err| {
            log::debug!("terminal graphics query failed: {err:?}");
            Picker::halfblocks()
        })
    } else {
        Picker::halfblocks()
    };

    picker.set_background_color(image::Rgba([255u8, 255u8, 255u8, 255u8]));
    if prefers_kitty(&hints, &picker) {
        picker.set_protocol_type(ProtocolType::Kitty);
    }
    log::info!("image protocol: {}", protocol_label(&picker));
    picker
}

fn allow_tmux_passthrough() {
    let status = std::process::Command::new("tmux")
        .args(["set-option", "-g", "allow-passthrough", "on"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
    if let Err(err) = status {
        log::debug!("tmux passthrough not enabled: {err}");
    }
}

fn prefers_kitty(hints: &TerminalHints, picker: &Picker) -> bool {
    if hints.iterm {
        return false;
    }
    hints.kitty_window
        || picker
            .capabilities()
            .iter()
            .any(|cap| matches!(cap, Capability::Kitty))
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}
