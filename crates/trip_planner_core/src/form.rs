//! crates/trip_planner_core/src/form.rs
//!
//! The two-step trip form. Step one collects destination and dates, step two
//! collects guests and submits. The active step and the visible overlay are a
//! single state value so an overlay can never be open on the wrong step.

use crate::calendar::{select_day, DateSelection};
use crate::domain::{Notice, TripDraft};
use crate::guests::{GuestEmailRegistry, GuestError};
use crate::ports::Notifier;
use chrono::{Days, NaiveDate};
use tracing::{debug, info};

const MIN_DESTINATION_LEN: usize = 4;

/// How far ahead of today a trip day may be picked, unless configured.
pub const DEFAULT_BOOKING_HORIZON_DAYS: u32 = 730;

//=========================================================================================
// State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    Details,
    Guests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    None,
    CalendarOverlay,
    GuestOverlay,
}

/// The step of the form combined with the overlay shown on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// Destination and dates, no overlay.
    Details,
    /// Calendar overlay on top of the details step.
    Calendar,
    /// Guest step, no overlay.
    Guests,
    /// Guest list overlay on top of the guest step.
    GuestList,
}

impl FormState {
    pub fn step(self) -> FormStep {
        match self {
            FormState::Details | FormState::Calendar => FormStep::Details,
            FormState::Guests | FormState::GuestList => FormStep::Guests,
        }
    }

    pub fn modal(self) -> ModalState {
        match self {
            FormState::Details | FormState::Guests => ModalState::None,
            FormState::Calendar => ModalState::CalendarOverlay,
            FormState::GuestList => ModalState::GuestOverlay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    Idle,
    Submitting,
}

//=========================================================================================
// Errors and Outcomes
//=========================================================================================

/// Reasons the trip details cannot move forward. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("destination is empty")]
    MissingDestination,
    #[error("trip dates are not selected")]
    MissingDates,
    #[error("destination must have at least 4 characters")]
    DestinationTooShort,
}

impl ValidationError {
    pub fn notice(self) -> Notice {
        match self {
            ValidationError::MissingDestination | ValidationError::MissingDates => Notice::new(
                "Trip details",
                "Fill in all the trip information to continue.",
            ),
            ValidationError::DestinationTooShort => Notice::new(
                "Trip details",
                format!("The destination must have at least {MIN_DESTINATION_LEN} characters."),
            ),
        }
    }
}

/// An action the current form state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("the destination can only be changed on the details step")]
    DestinationLocked,
    #[error("the calendar is only available on the details step")]
    CalendarUnavailable,
    #[error("the guest list is only available on the guests step")]
    GuestListUnavailable,
    #[error("the calendar is not open")]
    CalendarClosed,
    #[error("the guest list is not open")]
    GuestListClosed,
    #[error("{0} is outside the selectable days")]
    DayNotSelectable(NaiveDate),
    #[error("already on the details step")]
    AlreadyOnDetails,
    #[error(transparent)]
    Guest(#[from] GuestError),
}

impl FormError {
    /// The notice for errors the user can fix; `None` for actions a
    /// well-behaved client never sends.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            FormError::Guest(GuestError::InvalidEmailFormat(_)) => {
                Some(Notice::new("Guest", "Invalid e-mail."))
            }
            FormError::Guest(GuestError::DuplicateEmail(_)) => {
                Some(Notice::new("Guest", "E-mail already added."))
            }
            _ => None,
        }
    }
}

/// What pressing the primary action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Validation failed; the notice was shown and nothing changed.
    Rejected(ValidationError),
    MovedToGuests,
    /// The user answered "no" to the confirmation prompt.
    Declined,
    /// The user confirmed; the draft may now be submitted.
    Confirmed(TripDraft),
    /// A submission is still running.
    Busy,
}

//=========================================================================================
// The Controller
//=========================================================================================

#[derive(Debug, Clone)]
pub struct StepFormController {
    state: FormState,
    phase: SubmitPhase,
    destination: String,
    dates: DateSelection,
    guests: GuestEmailRegistry,
    booking_horizon_days: u32,
}

impl Default for StepFormController {
    fn default() -> Self {
        Self::new()
    }
}

impl StepFormController {
    pub fn new() -> Self {
        Self {
            state: FormState::Details,
            phase: SubmitPhase::Idle,
            destination: String::new(),
            dates: DateSelection::new(),
            guests: GuestEmailRegistry::new(),
            booking_horizon_days: DEFAULT_BOOKING_HORIZON_DAYS,
        }
    }

    /// A form whose calendar offers days up to `days` after today.
    pub fn with_booking_horizon(days: u32) -> Self {
        Self {
            booking_horizon_days: days,
            ..Self::new()
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn step(&self) -> FormStep {
        self.state.step()
    }

    pub fn modal(&self) -> ModalState {
        self.state.modal()
    }

    pub fn phase(&self) -> SubmitPhase {
        self.phase
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn dates(&self) -> &DateSelection {
        &self.dates
    }

    pub fn guests(&self) -> &GuestEmailRegistry {
        &self.guests
    }

    pub fn is_destination_editable(&self) -> bool {
        self.step() == FormStep::Details
    }

    // --- Field input ---

    pub fn set_destination(&mut self, destination: &str) -> Result<(), FormError> {
        if !self.is_destination_editable() {
            return Err(FormError::DestinationLocked);
        }
        self.destination = destination.to_string();
        Ok(())
    }

    /// Applies a calendar tap. Only days from `today` up to the booking
    /// horizon can be picked.
    pub fn select_day(&mut self, day: NaiveDate, today: NaiveDate) -> Result<(), FormError> {
        if self.state != FormState::Calendar {
            return Err(FormError::CalendarClosed);
        }
        let last_day = today
            .checked_add_days(Days::new(u64::from(self.booking_horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        if day < today || day > last_day {
            return Err(FormError::DayNotSelectable(day));
        }
        self.dates = select_day(&self.dates, day);
        debug!(day = %day, range = %self.dates.display_text(), "Day selected");
        Ok(())
    }

    pub fn add_guest(&mut self, email: &str) -> Result<(), FormError> {
        if self.state != FormState::GuestList {
            return Err(FormError::GuestListClosed);
        }
        self.guests.add(email)?;
        Ok(())
    }

    pub fn remove_guest(&mut self, email: &str) -> Result<bool, FormError> {
        if self.state != FormState::GuestList {
            return Err(FormError::GuestListClosed);
        }
        Ok(self.guests.remove(email))
    }

    // --- Overlays ---

    pub fn open_calendar(&mut self) -> Result<(), FormError> {
        if self.step() != FormStep::Details {
            return Err(FormError::CalendarUnavailable);
        }
        self.state = FormState::Calendar;
        Ok(())
    }

    pub fn open_guests(&mut self) -> Result<(), FormError> {
        if self.step() != FormStep::Guests {
            return Err(FormError::GuestListUnavailable);
        }
        self.state = FormState::GuestList;
        Ok(())
    }

    pub fn close_overlay(&mut self) {
        self.state = match self.step() {
            FormStep::Details => FormState::Details,
            FormStep::Guests => FormState::Guests,
        };
    }

    // --- Step transitions ---

    /// Checks the trip details without touching any state.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let trimmed = self.destination.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingDestination);
        }
        if !self.dates.is_complete() {
            return Err(ValidationError::MissingDates);
        }
        if self.destination.chars().count() < MIN_DESTINATION_LEN {
            return Err(ValidationError::DestinationTooShort);
        }
        Ok(())
    }

    /// The primary "continue" / "confirm trip" action.
    pub async fn request_advance(&mut self, notifier: &dyn Notifier) -> Advance {
        if self.phase == SubmitPhase::Submitting {
            return Advance::Busy;
        }
        if let Err(reason) = self.validate() {
            info!(?reason, "Trip details rejected");
            notifier.alert(&reason.notice()).await;
            return Advance::Rejected(reason);
        }

        match self.step() {
            FormStep::Details => {
                self.state = FormState::Guests;
                Advance::MovedToGuests
            }
            FormStep::Guests => {
                if !notifier.confirm(&Notice::confirm_trip()).await {
                    return Advance::Declined;
                }
                match self.draft() {
                    Some(draft) => Advance::Confirmed(draft),
                    None => Advance::Rejected(ValidationError::MissingDates),
                }
            }
        }
    }

    pub fn request_step_back(&mut self) -> Result<(), FormError> {
        if self.step() != FormStep::Guests {
            return Err(FormError::AlreadyOnDetails);
        }
        self.state = FormState::Details;
        Ok(())
    }

    /// The current form contents, once the dates are complete.
    pub fn draft(&self) -> Option<TripDraft> {
        let (starts_at, ends_at) = self.dates.bounds()?;
        Some(TripDraft {
            destination: self.destination.trim().to_string(),
            starts_at,
            ends_at,
            emails_to_invite: self.guests.emails().to_vec(),
        })
    }

    // --- Submission phase ---

    pub fn begin_submission(&mut self) {
        self.phase = SubmitPhase::Submitting;
    }

    /// Always called once a create attempt has ended, whatever the outcome,
    /// so the user can try again.
    pub fn finish_submission(&mut self) {
        self.phase = SubmitPhase::Idle;
    }
}
