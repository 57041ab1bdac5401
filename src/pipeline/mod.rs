//! The staged export pipeline.
//!
//! A run flows through the stages in a fixed order:
//!
//! ```text
//! assets  →  card  →  capture  →  layout  →  assemble
//! (gate)   (scene)   (raster)   (place)    (PDF)
//! ```
//!
//! * [`assets`] — decode every QR source up front; the all-or-nothing
//!   readiness gate.
//! * [`card`] — the [`card::CardRenderer`] collaborator turns one record
//!   plus its decoded QR into a draw list.
//! * [`capture`] — rasterise one card scene to an RGB snapshot on a white
//!   background.
//! * [`layout`] — pure pagination arithmetic: index → page, slot,
//!   millimetre offset.
//! * [`assemble`] — accumulate snapshots into the multi-page PDF.
//!
//! The stages are glued together by [`crate::export::ExportController`],
//! which owns the state machine and the sequencing guarantees.

pub mod assemble;
pub mod assets;
pub mod capture;
pub mod card;
pub mod layout;
