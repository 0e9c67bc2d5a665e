//! # duo-service
//!
//! Application layer containing business logic and use cases.

pub mod services;

pub use services::{
    JoinOutcome, LeaveOutcome, MessageStore, RoomRegistry, ServiceContext, ServiceContextBuilder,
    ServiceError, ServiceResult, SessionDirectory, SessionHistoryRecorder,
};
