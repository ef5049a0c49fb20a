//! services/planner/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the planner client and the
//! service. The client forwards user input; the service answers with the form
//! state after every command, plus alerts, confirmations and navigation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trip_planner_core::domain::Notice;
use trip_planner_core::form::{FormStep, ModalState, StepFormController, SubmitPhase};

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The destination field changed.
    SetDestination { destination: String },

    OpenCalendar,
    OpenGuests,
    CloseOverlay,

    /// A day was tapped on the calendar (`YYYY-MM-DD`).
    SelectDay { date: NaiveDate },

    AddGuest { email: String },
    RemoveGuest { email: String },

    /// "Change place/date": back to the details step.
    StepBack,

    /// The primary "continue" / "confirm trip" button.
    Advance,

    /// The user's answer to an `Alert` (dismissal) or `Confirm` message.
    PromptReply { prompt_id: u64, accepted: bool },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Nothing to resume; the creation form is interactive.
    FormReady { form: FormView },

    /// The form after a command was applied.
    FormState { form: FormView },

    /// A blocking notice. The client replies with `PromptReply` once dismissed.
    Alert {
        prompt_id: u64,
        title: String,
        message: String,
    },

    /// A yes/no question. The client replies with `PromptReply`.
    Confirm {
        prompt_id: u64,
        title: String,
        message: String,
    },

    /// Open the detail view of this trip.
    Navigate { trip_id: String },

    /// A malformed or out-of-place message.
    Error { message: String },
}

impl ServerMessage {
    pub fn alert(prompt_id: u64, notice: &Notice) -> Self {
        ServerMessage::Alert {
            prompt_id,
            title: notice.title.clone(),
            message: notice.message.clone(),
        }
    }

    pub fn confirm(prompt_id: u64, notice: &Notice) -> Self {
        ServerMessage::Confirm {
            prompt_id,
            title: notice.title.clone(),
            message: notice.message.clone(),
        }
    }
}

/// Everything a client needs to draw the form.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FormView {
    pub step: &'static str,
    pub overlay: &'static str,
    pub destination: String,
    pub destination_editable: bool,
    pub starts_at: Option<NaiveDate>,
    pub ends_at: Option<NaiveDate>,
    pub dates_text: String,
    pub marked_dates: BTreeMap<String, &'static str>,
    pub guests: Vec<String>,
    pub guest_badge: String,
    pub primary_action: &'static str,
    pub submitting: bool,
}

impl From<&StepFormController> for FormView {
    fn from(form: &StepFormController) -> Self {
        let step = match form.step() {
            FormStep::Details => "details",
            FormStep::Guests => "guests",
        };
        let overlay = match form.modal() {
            ModalState::None => "none",
            ModalState::CalendarOverlay => "calendar",
            ModalState::GuestOverlay => "guests",
        };
        let primary_action = match form.step() {
            FormStep::Details => "continue",
            FormStep::Guests => "confirm_trip",
        };
        let dates = form.dates();

        Self {
            step,
            overlay,
            destination: form.destination().to_string(),
            destination_editable: form.is_destination_editable(),
            starts_at: dates.starts_at(),
            ends_at: dates.ends_at(),
            dates_text: dates.display_text().to_string(),
            marked_dates: dates
                .marked_dates()
                .iter()
                .map(|(day, mark)| (day.clone(), mark.as_str()))
                .collect(),
            guests: form.guests().emails().to_vec(),
            guest_badge: form.guests().badge_text(),
            primary_action,
            submitting: form.phase() == SubmitPhase::Submitting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_commands() {
        let day: ClientMessage =
            serde_json::from_str(r#"{"type":"select_day","date":"2025-08-12"}"#).expect("parse");
        assert_eq!(
            day,
            ClientMessage::SelectDay {
                date: NaiveDate::from_ymd_opt(2025, 8, 12).unwrap()
            }
        );

        let reply: ClientMessage =
            serde_json::from_str(r#"{"type":"prompt_reply","prompt_id":3,"accepted":true}"#)
                .expect("parse");
        assert_eq!(
            reply,
            ClientMessage::PromptReply {
                prompt_id: 3,
                accepted: true
            }
        );

        let advance: ClientMessage = serde_json::from_str(r#"{"type":"advance"}"#).expect("parse");
        assert_eq!(advance, ClientMessage::Advance);
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"launch"}"#).is_err());
    }

    #[test]
    fn fresh_form_view_shape() {
        let view = FormView::from(&StepFormController::new());
        let value = serde_json::to_value(ServerMessage::FormReady { form: view }).expect("json");

        assert_eq!(
            value,
            json!({
                "type": "form_ready",
                "form": {
                    "step": "details",
                    "overlay": "none",
                    "destination": "",
                    "destination_editable": true,
                    "starts_at": null,
                    "ends_at": null,
                    "dates_text": "",
                    "marked_dates": {},
                    "guests": [],
                    "guest_badge": "",
                    "primary_action": "continue",
                    "submitting": false
                }
            })
        );
    }

    #[test]
    fn calendar_marks_are_serialized_by_day() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let mut form = StepFormController::new();
        form.open_calendar().expect("calendar");
        form.select_day(NaiveDate::from_ymd_opt(2025, 8, 12).unwrap(), today)
            .expect("start");
        form.select_day(NaiveDate::from_ymd_opt(2025, 8, 14).unwrap(), today)
            .expect("end");

        let value = serde_json::to_value(FormView::from(&form)).expect("json");

        assert_eq!(value["overlay"], "calendar");
        assert_eq!(value["dates_text"], "12/08 a 14/08");
        assert_eq!(
            value["marked_dates"],
            json!({ "2025-08-12": "start", "2025-08-13": "in-range", "2025-08-14": "end" })
        );
    }
}
