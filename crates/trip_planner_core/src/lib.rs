pub mod calendar;
pub mod domain;
pub mod form;
pub mod guests;
pub mod orchestrator;
pub mod ports;

pub use calendar::{select_day, DateSelection, DayMark};
pub use domain::{NewTrip, Notice, Trip, TripDraft, TripId};
pub use form::{
    Advance, FormError, FormState, FormStep, ModalState, StepFormController, SubmitPhase,
    ValidationError,
};
pub use guests::{GuestEmailRegistry, GuestError};
pub use orchestrator::{OrchestratorError, ResumeOutcome, SubmitOutcome, TripOrchestrator};
pub use ports::{Navigator, Notifier, PortError, PortResult, TripService, TripStorage};
