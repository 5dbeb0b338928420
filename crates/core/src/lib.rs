//! # Salon Core
//!
//! Appointment rules for a single salon: working windows and breaks, the
//! availability engine that accepts or rejects a proposed visit, and the
//! booking service that keeps an employee from ever holding two overlapping
//! commitments.
//!
//! Storage is reached only through the collaborator traits
//! ([`schedule::ScheduleModel`], [`availability::VisitLookup`],
//! [`booking::VisitStore`], [`booking::ServiceCatalog`]).

pub mod availability;
pub mod booking;
pub mod errors;
pub mod interval;
pub mod models;
pub mod schedule;
