use scorebridge_core_types::ScorePayload;
use serde::{Deserialize, Serialize};

use crate::BusEvent;

/// Message shapes posted on the broadcast channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "update")]
    Update {
        #[serde(rename = "scoreTeam1")]
        score_team1: String,
        #[serde(rename = "scoreTeam2")]
        score_team2: String,
        #[serde(rename = "fontSize")]
        font_size: u32,
    },
    #[serde(rename = "settingsChanged")]
    SettingsChanged,
}

impl From<&BusEvent> for WireMessage {
    fn from(event: &BusEvent) -> Self {
        match event {
            BusEvent::ScoreUpdate(payload) => WireMessage::Update {
                score_team1: payload.team_a.clone(),
                score_team2: payload.team_b.clone(),
                font_size: payload.font_size_px,
            },
            BusEvent::SettingsChanged => WireMessage::SettingsChanged,
        }
    }
}

impl WireMessage {
    /// The wire update has no timestamp; receipt time stands in for it.
    pub fn into_event(self) -> BusEvent {
        match self {
            WireMessage::Update {
                score_team1,
                score_team2,
                font_size,
            } => BusEvent::ScoreUpdate(ScorePayload::new(score_team1, score_team2, font_size)),
            WireMessage::SettingsChanged => BusEvent::SettingsChanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_uses_documented_field_names() {
        let msg = WireMessage::from(&BusEvent::ScoreUpdate(ScorePayload::at("5", "3", 60, 0)));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "update", "scoreTeam1": "5", "scoreTeam2": "3", "fontSize": 60})
        );
    }

    #[test]
    fn settings_changed_is_bare_type_tag() {
        let parsed: WireMessage = serde_json::from_str(r#"{"type":"settingsChanged"}"#).unwrap();
        assert_eq!(parsed, WireMessage::SettingsChanged);
        assert_eq!(parsed.into_event(), BusEvent::SettingsChanged);
    }
}
