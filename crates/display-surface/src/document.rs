use scorebridge_state_store::StorageKeys;
use serde_json::json;

/// Marker element: presence means the surface content is intact.
pub const SCORE_DISPLAY_ID: &str = "scoreDisplay";
pub const FONT_SIZE_INPUT_ID: &str = "fontSizeInput";
pub const SOUND_CHECKBOX_ID: &str = "soundCheckbox";
pub const AUTO_RELOAD_CHECKBOX_ID: &str = "autoReloadCheckbox";
pub const AUTO_RELOAD_SECONDS_ID: &str = "autoReloadSec";

/// Builds the document injected into the surface window.
///
/// The embedded script mirrors [`crate::SurfacePanel`] for hosts that execute
/// it: controls are populated from storage, control changes write storage and
/// announce `settingsChanged`, and updates arrive over the channel or through
/// storage change events.
#[derive(Clone, Debug)]
pub struct SurfaceDocument {
    pub title: String,
    pub keys: StorageKeys,
    pub channel: Option<String>,
    pub default_font_size_px: u32,
}

impl SurfaceDocument {
    pub fn new(keys: StorageKeys, channel: Option<String>) -> Self {
        Self {
            title: "Match score".into(),
            keys,
            channel,
            default_font_size_px: 60,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn render(&self) -> String {
        let font = self.default_font_size_px;
        format!(
            r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: Arial, sans-serif; text-align: center; background-color: #f0f0f0; margin: 0; padding: 8px; overflow: hidden; }}
.score {{ font-weight: bold; margin: 0; line-height: 1.1; }}
.row {{ margin: 6px 0; font-size: 14px; }}
input[type=number] {{ text-align: center; }}
.control-group {{ display: flex; align-items: center; justify-content: center; gap: 8px; }}
</style>
</head>
<body>
<div class="score" id="{score}" style="font-size: {font}px">Loading...</div>
<div class="row">
<label for="{font_input}">Font size (px)</label>
<input type="number" id="{font_input}" value="{font}" style="width:90px;margin-left:6px;">
</div>
<label class="row control-group"><input type="checkbox" id="{sound}"> Sound alert</label>
<div class="row control-group">
<label class="control-group"><input type="checkbox" id="{reload}"> Auto reload</label>
<input type="number" id="{reload_sec}" min="5" step="1" placeholder="sec" style="width:80px;">
</div>
{script}
</body>
</html>"#,
            title = escape(&self.title),
            score = SCORE_DISPLAY_ID,
            font_input = FONT_SIZE_INPUT_ID,
            sound = SOUND_CHECKBOX_ID,
            reload = AUTO_RELOAD_CHECKBOX_ID,
            reload_sec = AUTO_RELOAD_SECONDS_ID,
            font = font,
            script = self.script(),
        )
    }

    fn script(&self) -> String {
        let keys = json!({
            "fontSize": self.keys.font_size,
            "sound": self.keys.sound,
            "payload": self.keys.score_payload,
            "autoReload": self.keys.auto_reload_enabled,
            "autoReloadSec": self.keys.auto_reload_seconds,
        });
        let channel = json!(self.channel);
        let font = self.default_font_size_px;
        format!(
            r#"<script>
(() => {{
  const KEYS = {keys};
  const CHANNEL = {channel};
  const $ = (id) => document.getElementById(id);
  const el = {{ score: $('{score}'), font: $('{font_input}'), sound: $('{sound}'), reload: $('{reload}'), reloadSec: $('{reload_sec}') }};
  const chan = CHANNEL && 'BroadcastChannel' in window ? new BroadcastChannel(CHANNEL) : null;
  const announce = () => {{ try {{ chan && chan.postMessage({{ type: 'settingsChanged' }}); }} catch (e) {{}} }};
  const apply = (d) => {{
    if (d.fontSize !== undefined) {{ el.font.value = String(d.fontSize); el.score.style.fontSize = d.fontSize + 'px'; }}
    if (d.scoreTeam1 !== undefined && d.scoreTeam2 !== undefined) {{ el.score.textContent = d.scoreTeam1 + ' - ' + d.scoreTeam2; }}
  }};
  el.font.value = localStorage.getItem(KEYS.fontSize) || '{font}';
  el.score.style.fontSize = el.font.value + 'px';
  el.sound.checked = localStorage.getItem(KEYS.sound) === '1';
  el.reload.checked = localStorage.getItem(KEYS.autoReload) === '1';
  el.reloadSec.value = localStorage.getItem(KEYS.autoReloadSec) || '';
  el.font.addEventListener('input', () => {{
    localStorage.setItem(KEYS.fontSize, el.font.value || '{font}');
    el.score.style.fontSize = (el.font.value || '{font}') + 'px';
    announce();
  }});
  el.sound.addEventListener('change', () => {{ localStorage.setItem(KEYS.sound, el.sound.checked ? '1' : '0'); announce(); }});
  el.reload.addEventListener('change', () => {{ localStorage.setItem(KEYS.autoReload, el.reload.checked ? '1' : '0'); announce(); }});
  el.reloadSec.addEventListener('input', () => {{ localStorage.setItem(KEYS.autoReloadSec, el.reloadSec.value || ''); announce(); }});
  if (chan) chan.addEventListener('message', (e) => {{ const d = e.data || {{}}; if (d.type === 'update') apply(d); }});
  window.addEventListener('storage', (e) => {{
    if (e.key === KEYS.payload && e.newValue) {{ try {{ apply(JSON.parse(e.newValue)); }} catch (err) {{}} }}
  }});
}})();
</script>"#,
            keys = keys,
            channel = channel,
            score = SCORE_DISPLAY_ID,
            font_input = FONT_SIZE_INPUT_ID,
            sound = SOUND_CHECKBOX_ID,
            reload = AUTO_RELOAD_CHECKBOX_ID,
            reload_sec = AUTO_RELOAD_SECONDS_ID,
            font = font,
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_carries_marker_and_keys() {
        let html = SurfaceDocument::new(StorageKeys::default(), Some("faceit-score".into())).render();
        assert!(html.contains(r#"id="scoreDisplay""#));
        assert!(html.contains(r#"id="autoReloadSec""#));
        assert!(html.contains("\"faceitScorePayload\""));
        assert!(html.contains("\"faceit-score\""));
    }

    #[test]
    fn channel_less_document_still_wires_storage() {
        let html = SurfaceDocument::new(StorageKeys::default(), None).render();
        assert!(html.contains("const CHANNEL = null;"));
        assert!(html.contains("window.addEventListener('storage'"));
    }

    #[test]
    fn title_is_escaped() {
        let html = SurfaceDocument::new(StorageKeys::default(), None)
            .with_title("<Score>")
            .render();
        assert!(html.contains("<title>&lt;Score&gt;</title>"));
    }
}
