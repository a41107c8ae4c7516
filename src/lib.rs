//! KANGWOON consultation site core: the lead-qualification dialogue and the
//! services around it.

pub mod api;
pub mod cli;
pub mod config;
pub mod consult;
pub mod error;
pub mod handoff;
pub mod i18n;
pub mod llm;
pub mod site;
