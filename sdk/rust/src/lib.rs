//! Client for the resilience toggle service's HTTP API.

pub mod client;

pub use client::{
    ExternalResponse, FaultSettings, MockConfigureResponse, PatternStatus, ResilienceStatus,
    SdkError, ToggleClient, ToggleResponse,
};
